use std::io;

use anyhow::{anyhow, Context};
use byteorder::{LittleEndian, ReadBytesExt};
use clap::Parser;
use log::{info, LevelFilter};

use navtold::NavtexReceiverBuilder;

mod cli;

use cli::{Args, CliError};

// Samples pushed into the receiver per batch
const CHUNK_SAMPLES: usize = 8192;

fn main() {
    match navdec() {
        Ok(()) => {}
        Err(cli_error) => cli_error.exit(),
    }
}

fn navdec() -> Result<(), CliError> {
    // parse options and start logging
    let args = Args::try_parse()?;
    log_setup(&args);

    // file setup: locks stdin in case we need it
    let stdin = io::stdin();
    let stdin_handle = stdin.lock();
    let mut inbuf = file_setup(&args, stdin_handle)?;

    // the decoder writes characters and messages straight to stdout
    let stdout = io::stdout();
    let mut rx = NavtexReceiverBuilder::new(args.rate)
        .with_sitor_b(args.sitor_b)
        .with_reverse(args.reverse)
        .build(stdout.lock())
        .map_err(anyhow::Error::new)?;

    // processing: read i16 samples until the input is exhausted
    let mut samples = Vec::with_capacity(CHUNK_SAMPLES);
    loop {
        samples.clear();
        read_chunk(&mut inbuf, &mut samples).map_err(anyhow::Error::new)?;
        if samples.is_empty() {
            break;
        }
        rx.process_data(&samples)
            .context("write to standard output failed")?;
    }

    // push any buffered signal tail through the decoder
    rx.flush().context("write to standard output failed")?;

    Ok(())
}

// Read up to one chunk of i16 samples, converted to f32 in ±1.0
fn read_chunk<R: io::BufRead>(input: &mut R, samples: &mut Vec<f32>) -> io::Result<()> {
    for _i in 0..CHUNK_SAMPLES {
        match input.read_i16::<LittleEndian>() {
            Ok(pcm) => samples.push(pcm as f32 / 32767.0),
            Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => break,
            Err(err) => return Err(err),
        }
    }
    Ok(())
}

fn log_setup(args: &Args) {
    if args.quiet {
        // no logging
        return;
    } else if std::env::var_os("RUST_LOG").is_none() {
        // parameter controls
        let log_filter = match args.verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        };

        pretty_env_logger::formatted_builder()
            .filter_module("navtold", log_filter)
            .filter_module("navdec", log_filter)
            .init();
    } else {
        // environment controls
        pretty_env_logger::init();
    }
}

fn file_setup<'stdin>(
    args: &Args,
    stdin: std::io::StdinLock<'stdin>,
) -> Result<Box<dyn io::BufRead + 'stdin>, anyhow::Error> {
    if args.input_is_stdin() {
        info!("NAVTEX decoder reading standard input");
        if !is_terminal(&std::io::stdin()) {
            Ok(Box::new(io::BufReader::new(stdin)))
        } else {
            Err(anyhow!(
                "cowardly refusing to read audio samples from a terminal.

Pipe a source of raw uncompressed audio from sox, parec, rtl_fm,
or similar into this program."
            ))
        }
    } else {
        info!("NAVTEX decoder reading file: \"{}\"", &args.file);
        Ok(Box::new(io::BufReader::new(
            std::fs::File::open(&args.file)
                .with_context(|| format!("unable to open \"{}\"", args.file))?,
        )))
    }
}

#[cfg(not(target_os = "windows"))]
fn is_terminal<S>(stream: &S) -> bool
where
    S: std::os::fd::AsRawFd,
{
    terminal_size::terminal_size_using_fd(stream.as_raw_fd()).is_some()
}

#[cfg(target_os = "windows")]
fn is_terminal<S>(stream: &S) -> bool
where
    S: std::os::windows::io::AsRawHandle,
{
    terminal_size::terminal_size_using_handle(stream.as_raw_handle()).is_some()
}
