use std::fmt::Display;

use clap::{error::ErrorKind, CommandFactory, Parser};

/// Standard input filename
const STDIN_FILE: &str = "-";

const USAGE_SHORT: &str = r#"
This program accepts raw PCM samples in signed 16-bit little-endian (i16) format, at the given sampling RATE, and decodes any NAVTEX broadcasts that are present. Decoded text is printed to standard output.

See --help for more details.
"#;

const USAGE_LONG: &str = r#"
This program accepts raw PCM samples in signed 16-bit little-endian (i16) format, at the given sampling RATE, and decodes any NAVTEX broadcasts that are present. Decoded text is printed to standard output.

You can pipe in an audio file with sox

    sox navtex.wav -t raw -r 11025 -e signed -b 16 -c 1 - \
        | navdec 11025

or decode a live signal from your sound card

    parec --channels 1 --format s16le --rate 11025 \
        | navdec 11025

Tune the radio to 518 kHz in SSB mode so that the FSK tones land near 1000 Hz in the audio pass-band. Use --sitor-b to emit the raw SITOR-B character stream without NAVTEX message framing, and --reverse if your radio is tuned to the opposite sideband.
"#;

/// Top-level program arguments
#[derive(Parser, Clone, Debug)]
#[command(version)]
#[command(about, long_about = None)]
#[command(after_help = USAGE_SHORT, after_long_help = USAGE_LONG)]
#[command(max_term_width = 100)]
pub struct Args {
    /// Sampling rate (Hz)
    ///
    /// Set to the sampling rate of your audio source. Avoid
    /// resampling the audio; 11025 and 48000 both work.
    #[arg(default_value_t = 11025)]
    pub rate: u32,

    /// Input file (or "-" for stdin)
    ///
    /// The input must be one-channel (mono), signed 16-bit
    /// little-endian at RATE.
    #[arg(default_value_t = STDIN_FILE.to_string())]
    pub file: String,

    /// Decode raw SITOR-B without NAVTEX message framing
    #[arg(long)]
    pub sitor_b: bool,

    /// Invert the mark and space tones
    #[arg(long)]
    pub reverse: bool,

    /// Verbosity level (-vvv for more)
    #[arg(short, long, default_value_t = 0, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Print nothing but decoded text
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    /// Return true if the user requests input from stdin
    pub fn input_is_stdin(&self) -> bool {
        self.file == STDIN_FILE
    }
}

/// A program-level error with exit code
#[derive(Debug)]
pub struct CliError {
    error: anyhow::Error,
    exit_code: i32,
}

impl CliError {
    /// Create new error with a custom exit code
    pub fn new(error: anyhow::Error, code: i32) -> CliError {
        CliError {
            error,
            exit_code: code,
        }
    }

    /// Print this error to the terminal
    ///
    /// Errors from clap are printed verbatim. Other types of errors
    /// are printed indirectly via clap's fancy formatter.
    pub fn print(&self) -> std::io::Result<()> {
        if let Some(e) = self.error.downcast_ref::<clap::Error>() {
            e.print()
        } else {
            Args::command()
                .error(ErrorKind::Format, self.to_string())
                .print()
        }
    }

    /// Print this error to the terminal and exit
    pub fn exit(&self) -> ! {
        drop(self.print());
        std::process::exit(self.exit_code);
    }
}

impl Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.error)
    }
}

impl std::error::Error for CliError {}

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> CliError {
        CliError::new(err, 1)
    }
}

impl From<clap::Error> for CliError {
    fn from(err: clap::Error) -> CliError {
        let code = if err.use_stderr() { 1 } else { 0 };
        CliError::new(err.into(), code)
    }
}
