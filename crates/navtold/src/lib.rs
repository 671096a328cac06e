//! # navtold: NAVTEX / SITOR-B demodulation
//!
//! This crate provides a digital demodulator and decoder for
//! [NAVTEX](https://en.wikipedia.org/wiki/Navtex) maritime safety
//! broadcasts and for the underlying SITOR-B character stream. It
//! accepts baseband audio samples and writes decoded text to a sink
//! of your choosing.
//!
//! ## Example
//!
//! You will first need to recover *baseband audio* from a receiver
//! tuned to a NAVTEX frequency (usually 518 kHz) in SSB mode, so
//! that the FSK tones land near 1000 Hz in the audio pass-band.
//! Obtaining the audio is beyond the scope of this crate: use a
//! radio's line out jack or a software-defined radio, mix to mono,
//! and convert the samples to `f32`.
//!
//! ```
//! use navtold::NavtexReceiverBuilder;
//!
//! // create a receiver with your audio sampling rate; decoded
//! // text is written to the sink
//! let mut rx = NavtexReceiverBuilder::new(11025)
//!     .build(std::io::stdout())
//!     .expect("sample rate too low");
//!
//! // push sample batches as they arrive
//! let samples = vec![0.0f32; 8192];
//! rx.process_data(&samples).expect("output write failed");
//! ```
//!
//! ## Background
//!
//! NAVTEX messages are sent with the SITOR-B (FEC) transmission
//! system at 100 baud. Each character is a seven-bit CCIR-476
//! codeword with exactly four one bits; each is transmitted twice,
//! the second ("alpha") copy trailing the first ("rep") copy by five
//! character times. The receiver exploits both the codeword weight
//! and the time diversity to correct errors, using soft decisions
//! from the demodulator to arbitrate when neither copy is clean.
//!
//! A NAVTEX message is framed by a `ZCZC xxnn` header line and an
//! `NNNN` trailer. The receiver delivers each message to the sink as
//! one chunk, with whitespace normalized, annotating messages whose
//! header or trailer was lost to noise. In `sitor_b` mode the framer
//! is bypassed entirely and the raw character stream is emitted.

mod builder;
pub mod ccir476;
mod message;
mod receiver;

pub use builder::{ConfigError, NavtexReceiverBuilder};
pub use message::{cleanup, CcirMessage};
pub use receiver::waveform;
pub use receiver::NavtexReceiver;
