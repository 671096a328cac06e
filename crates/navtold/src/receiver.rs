//! Full receiver chain

mod atc;
mod charsync;
mod fftfilt;
mod mixer;
mod multicorr;
pub mod waveform;

#[cfg(not(test))]
use log::{debug, info};

#[cfg(test)]
use std::{println as debug, println as info};

use std::io;

use num_complex::Complex;

use crate::builder::NavtexReceiverBuilder;
use crate::ccir476;
use crate::message::{cleanup, CcirMessage};

use self::atc::AtcDiscriminator;
use self::charsync::{BitBuffer, BIT_BUFFER_LEN};
use self::fftfilt::FftFilter;
use self::mixer::Mixer;
use self::multicorr::Multicorrelator;

// FFT length of the mark and space low-pass filters
const FILTER_LEN: usize = 512;

// Idle seconds before the current message is flushed
const MESSAGE_TIMEOUT_SECS: f64 = 600.0;

// Return to sync search after this many accumulated decode errors
const MAX_ERROR_COUNT: i32 = 5;

// Receiver state
//
// `SyncSetup` clears the decoder, `Sync` hunts for the alpha/rep
// phase, and `ReadData` decodes characters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
enum State {
    SyncSetup,
    Sync,
    ReadData,
}

/// A complete NAVTEX / SITOR-B receiver chain
///
/// The receive chain takes `f32` audio samples and performs the
/// following operations:
///
/// 1. Quadrature downconversion of the mark and space tones, each
///    through its own FFT low-pass filter
/// 2. Envelope and noise tracking with an automatic-threshold
///    mark/space discriminator
/// 3. Bit synchronization with an early/prompt/late multicorrelator
/// 4. Character synchronization against the SITOR-B alpha/rep
///    structure, with soft-decision forward error correction
/// 5. NAVTEX message framing (`ZCZC …` / `NNNN`), unless the
///    receiver is configured for raw SITOR-B output
///
/// Decoded characters and delivered messages are written to the
/// output sink as they are produced. To create the receiver, first
/// create its [builder](crate::NavtexReceiverBuilder):
///
/// ```
/// use navtold::NavtexReceiverBuilder;
///
/// let mut rx = NavtexReceiverBuilder::new(11025)
///     .build(Vec::new())
///     .expect("sample rate");
/// rx.process_data(&[0.0f32; 512]).expect("write failed");
/// ```
///
/// The receiver is strictly synchronous: `process_data()` runs to
/// completion before the caller may push more samples, and time
/// advances only with the sample count.
pub struct NavtexReceiver<W: io::Write> {
    sample_rate: u32,
    only_sitor_b: bool,
    out: W,

    mark_mixer: Mixer,
    space_mixer: Mixer,
    mark_lowpass: FftFilter,
    space_lowpass: FftFilter,

    atc: AtcDiscriminator,
    multicorr: Multicorrelator,

    // lifetime count of filtered samples, and the wall clock
    // derived from it
    sample_count: u64,
    time_sec: f64,
    message_time: f64,

    state: State,
    error_count: i32,
    shift: bool,
    alpha_phase: bool,
    last_char: i32,

    bits: BitBuffer,
    bit_cursor: usize,

    header_found: bool,
    curr_msg: CcirMessage,
}

impl<W: io::Write> NavtexReceiver<W> {
    pub(crate) fn new(cfg: &NavtexReceiverBuilder, out: W) -> Self {
        let sample_rate = cfg.sample_rate();
        let fs = sample_rate as f64;
        let bit_sample_count = waveform::samples_per_bit(sample_rate);
        let cutoff = waveform::BAUD_HZ / fs;
        let mark_freq = waveform::CENTER_FREQ_HZ + waveform::DEVIATION_HZ;
        let space_freq = waveform::CENTER_FREQ_HZ - waveform::DEVIATION_HZ;

        Self {
            sample_rate,
            only_sitor_b: cfg.only_sitor_b(),
            out,
            mark_mixer: Mixer::new(mark_freq, fs),
            space_mixer: Mixer::new(space_freq, fs),
            mark_lowpass: FftFilter::new(cutoff, FILTER_LEN),
            space_lowpass: FftFilter::new(cutoff, FILTER_LEN),
            atc: AtcDiscriminator::new(bit_sample_count),
            multicorr: Multicorrelator::new(bit_sample_count, cfg.reverse()),
            sample_count: 0,
            time_sec: 0.0,
            message_time: 0.0,
            state: State::SyncSetup,
            error_count: 0,
            shift: false,
            alpha_phase: false,
            last_char: 0,
            bits: BitBuffer::new(),
            bit_cursor: 0,
            header_found: false,
            curr_msg: CcirMessage::new(),
        }
    }

    /// Process a batch of audio samples
    ///
    /// Accepts mono PCM samples in `[-1.0, 1.0]` at the configured
    /// [`sample_rate()`](NavtexReceiver::sample_rate), in any batch
    /// size. Decoded characters and delivered messages are written
    /// to the output sink as they appear. Write failures are
    /// returned to the caller; the receiver does not retry.
    pub fn process_data(&mut self, samples: &[f32]) -> io::Result<()> {
        self.process_timeout()?;

        for &sample in samples {
            self.time_sec = (self.sample_count / self.sample_rate as u64) as f64;

            let dv = 32767.0 * sample as f64;
            let z = Complex::new(dv, dv);

            let zmark = self.mark_mixer.mix(z);
            self.mark_lowpass.run(zmark);

            let zspace = self.space_mixer.mix(z);
            let n_out = self.space_lowpass.run(zspace);

            // both filters buffer identically; the space filter's
            // count gates the batch for both branches
            if n_out > 0 {
                self.process_filter_output(n_out)?;
            }
        }

        Ok(())
    }

    /// Push the buffered tail of the signal through the decoder
    ///
    /// The FFT filters and the bit buffer impose delay. When
    /// processing a recording that is cut close to the end of a
    /// transmission, call `flush()` after the last sample so the
    /// final characters make it out.
    pub fn flush(&mut self) -> io::Result<()> {
        let silence = vec![0.0f32; self.sample_rate as usize / 2];
        self.process_data(&silence)
    }

    /// Input sampling rate (Hz)
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Lifetime count of filtered samples processed
    pub fn sample_count(&self) -> u64 {
        self.sample_count
    }

    /// Borrow the output sink
    pub fn sink(&self) -> &W {
        &self.out
    }

    /// Consume the receiver and return the output sink
    pub fn into_sink(self) -> W {
        self.out
    }

    // Run the decode pipeline over one burst of filtered samples
    fn process_filter_output(&mut self, n_out: usize) -> io::Result<()> {
        for i in 0..n_out {
            let mark_abs = self.mark_lowpass.output()[i].norm();
            let space_abs = self.space_lowpass.output()[i].norm();

            self.multicorr.align(self.sample_count);

            let soft_bit = self.atc.input(mark_abs, space_abs);
            self.multicorr.accumulate(soft_bit);
            let prompt = self.multicorr.sample_events(self.sample_count);

            match self.state {
                State::SyncSetup => {
                    self.error_count = 0;
                    self.shift = false;
                    self.set_state(State::Sync);
                }
                State::Sync | State::ReadData => {
                    if let Some(mark_state) = prompt {
                        self.handle_bit_value(mark_state)?;
                    }
                }
            }

            self.sample_count += 1;
        }

        Ok(())
    }

    // Shift a decided bit into the buffer and run the character
    // state machine
    fn handle_bit_value(&mut self, accumulator: i32) -> io::Result<()> {
        self.bits.push(accumulator);
        self.bit_cursor = self.bit_cursor.saturating_sub(1);

        // find the most likely location where characters start
        if self.state == State::Sync {
            match charsync::find_alpha_characters(&self.bits) {
                Some(offset) => {
                    self.set_state(State::ReadData);
                    self.bit_cursor = offset;
                    self.alpha_phase = true;
                }
                None => self.set_state(State::SyncSetup),
            }
        }

        // process 7-bit characters as they come in, skipping the
        // rep (duplicate) copies
        if self.state == State::ReadData && self.bit_cursor < BIT_BUFFER_LEN - 7 {
            if self.alpha_phase {
                let (status, code) = charsync::process_bytes(&self.bits, self.bit_cursor);
                if let Some(code) = code {
                    self.process_char(code)?;
                }
                self.error_count -= status;
                if self.error_count > MAX_ERROR_COUNT {
                    self.set_state(State::SyncSetup);
                }
                if self.error_count < 0 {
                    self.error_count = 0;
                }
            }
            self.alpha_phase = !self.alpha_phase;
            self.bit_cursor += 7;
        }

        Ok(())
    }

    // Interpret one decoded codeword
    fn process_char(&mut self, code: u8) -> io::Result<()> {
        let mut last = code as i32;
        match code {
            ccir476::REP => {
                // two rep codes in a row while decoding the alpha
                // phase: the phase is wrong, fix it so the FEC
                // pairing works again
                if self.last_char == ccir476::REP as i32 {
                    debug!("fixing rep/alpha sync");
                    self.alpha_phase = false;
                }
            }
            ccir476::ALPHA | ccir476::BETA | ccir476::CHAR32 => {}
            ccir476::LTRS => self.shift = false,
            ccir476::FIGS => self.shift = true,
            _ => match ccir476::code_to_char(code, self.shift) {
                Some(ch) => {
                    last = ch as i32;
                    self.filter_print(ch)?;
                    self.process_messages(ch)?;
                }
                None => {
                    info!("missed this code: {:x}", code);
                    last = -(code as i32);
                }
            },
        }
        self.last_char = last;
        Ok(())
    }

    // Write one character of raw decoded output
    fn filter_print(&mut self, ch: u8) -> io::Result<()> {
        if ch == ccir476::BELL {
            self.put_rx_char(b'\'')
        } else if ch != b'\r' && ch != ccir476::ALPHA && ch != ccir476::REP {
            self.put_rx_char(ch)
        } else {
            Ok(())
        }
    }

    fn put_rx_char(&mut self, ch: u8) -> io::Result<()> {
        self.out.write_all(&[ch])
    }

    // Accumulate a character into the current message and watch for
    // its delimiters
    fn process_messages(&mut self, ch: u8) -> io::Result<()> {
        // no headers nor trailers in plain SITOR-B
        if self.only_sitor_b {
            return Ok(());
        }

        self.curr_msg.push(ch as char);

        if let Some(cut) = self.curr_msg.detect_header() {
            // whatever came before this header belongs to the
            // previous transmission, whose trailer never arrived
            if self.header_found {
                let alt = format!("{}:[Lost trailer]", cut.text());
                self.deliver(&alt)?;
            } else if !cut.is_empty() {
                let alt = format!("[Lost header]:{}:[Lost trailer]", cut.text());
                self.deliver(&alt)?;
            }
            self.header_found = true;
            self.message_time = self.time_sec;
        } else if self.curr_msg.detect_end() {
            self.flush_message("")?;
        }

        Ok(())
    }

    // Deliver the current message, annotated when its header was
    // never seen
    fn flush_message(&mut self, extra_info: &str) -> io::Result<()> {
        let alt = if self.header_found {
            self.header_found = false;
            format!("{}{}", self.curr_msg.text(), extra_info)
        } else {
            format!("[Lost header]:{}{}", self.curr_msg.text(), extra_info)
        };
        self.deliver(&alt)?;
        self.curr_msg.reset();
        self.message_time = self.time_sec;
        Ok(())
    }

    // Normalize and write a delivered message
    fn deliver(&mut self, alt_string: &str) -> io::Result<()> {
        let delivered = cleanup(alt_string);
        info!("{}", delivered);
        self.out.write_all(delivered.as_bytes())
    }

    // Flush the message if the receiver has been idle too long
    fn process_timeout(&mut self) -> io::Result<()> {
        // no messaging in SITOR-B
        if self.only_sitor_b {
            return Ok(());
        }

        if self.time_sec - self.message_time <= MESSAGE_TIMEOUT_SECS {
            return Ok(());
        }
        info!(
            "timeout: time_sec={}, message_time={}",
            self.time_sec, self.message_time
        );

        self.flush_message(":<TIMEOUT>")
    }

    fn set_state(&mut self, state: State) {
        if state != self.state {
            self.state = state;
            debug!("state: {}", self.state);
        }
    }
}
