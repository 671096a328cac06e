use std::io;

use thiserror::Error;

use crate::receiver::NavtexReceiver;

/// Minimum supported sampling rate (Hz)
///
/// The receive chain needs a few samples per cycle of the 1085 Hz
/// mark tone to have anything to work with.
const MIN_SAMPLE_RATE: u32 = 1000;

/// Invalid receiver configuration
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// The sampling rate is too low to carry the signal
    #[error("sample rate {0} Hz is below the {MIN_SAMPLE_RATE} Hz minimum")]
    SampleRateTooLow(u32),
}

/// Builds a NAVTEX / SITOR-B receiver
///
/// The builder comes with sensible defaults: all you really need to
/// provide is the input sampling rate. NAVTEX receivers commonly run
/// at 11025 Hz, but any rate that comfortably carries the 1000 Hz
/// audio pass-band works.
///
/// ```
/// use navtold::NavtexReceiverBuilder;
///
/// let rx = NavtexReceiverBuilder::new(11025)
///     .with_sitor_b(false)
///     .with_reverse(false)
///     .build(std::io::sink())
///     .expect("valid sample rate");
/// assert_eq!(rx.sample_rate(), 11025);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NavtexReceiverBuilder {
    sample_rate: u32,
    only_sitor_b: bool,
    reverse: bool,
}

impl NavtexReceiverBuilder {
    /// New builder for the given input sampling rate, in Hz
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            only_sitor_b: false,
            reverse: false,
        }
    }

    /// Decode raw SITOR-B instead of NAVTEX
    ///
    /// When set, no header/trailer framing or timeout logic runs,
    /// and every decoded printable character is emitted as-is.
    pub fn with_sitor_b(&mut self, only_sitor_b: bool) -> &mut Self {
        self.only_sitor_b = only_sitor_b;
        self
    }

    /// Invert the mark and space tones
    ///
    /// Useful when the radio is tuned to the opposite sideband.
    pub fn with_reverse(&mut self, reverse: bool) -> &mut Self {
        self.reverse = reverse;
        self
    }

    /// Build a receiver which writes decoded output to `out`
    ///
    /// Once built, the receiver is immediately ready to process
    /// samples.
    pub fn build<W: io::Write>(&self, out: W) -> Result<NavtexReceiver<W>, ConfigError> {
        if self.sample_rate < MIN_SAMPLE_RATE {
            return Err(ConfigError::SampleRateTooLow(self.sample_rate));
        }
        Ok(NavtexReceiver::new(self, out))
    }

    /// Input sampling rate (Hz)
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// True if the receiver decodes raw SITOR-B
    pub fn only_sitor_b(&self) -> bool {
        self.only_sitor_b
    }

    /// True if mark and space are inverted
    pub fn reverse(&self) -> bool {
        self.reverse
    }
}

impl std::default::Default for NavtexReceiverBuilder {
    fn default() -> Self {
        Self::new(11025)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let builder = NavtexReceiverBuilder::default();
        assert_eq!(builder.sample_rate(), 11025);
        assert!(!builder.only_sitor_b());
        assert!(!builder.reverse());
    }

    #[test]
    fn test_rejects_low_sample_rate() {
        let result = NavtexReceiverBuilder::new(999).build(std::io::sink());
        assert_eq!(
            result.err().map(|e| e.to_string()),
            Some("sample rate 999 Hz is below the 1000 Hz minimum".to_string())
        );
    }

    #[test]
    fn test_accepts_common_rates() {
        for rate in [1000, 8000, 11025, 22050, 44100, 48000] {
            assert!(NavtexReceiverBuilder::new(rate).build(std::io::sink()).is_ok());
        }
    }
}
