//! Mark/space discrimination with automatic threshold correction
//!
//! Tracks a fast-attack/slow-decay envelope and a slow-attack/
//! fast-decay noise floor for each tone branch, then slices the
//! mark/space decision with W7AY's automatic threshold correction
//! (ATC) formula:
//!
//! <http://www.w7ay.net/site/Technical/ATC/>
//!
//! The ATC weighs each branch by how far its envelope stands above
//! the common noise floor, which keeps the decision centered even
//! when the two tones are received with very different strengths.
//!
//! The output is the natural logarithm of the discriminator level,
//! truncated to an integer and signed by the decision. Taking the
//! logarithm tells the bit synchronizer and the FEC decoder which
//! samples were decoded confidently and which were marginal, which
//! helps fish characters out of the noise.

/// Exponential decay average
///
/// Moves `avg` toward `value` by `1/divisor` of the difference.
pub(crate) fn decayavg(avg: f64, value: f64, divisor: f64) -> f64 {
    avg + (value - avg) / divisor
}

/// Envelope, noise floor, and ATC state for both tone branches
#[derive(Clone, Debug)]
pub struct AtcDiscriminator {
    // samples per bit, fractional
    bit_sample_count: f64,

    mark_env: f64,
    mark_noise: f64,
    space_env: f64,
    space_noise: f64,
}

impl AtcDiscriminator {
    /// New discriminator for `bit_sample_count` samples per bit
    pub fn new(bit_sample_count: f64) -> Self {
        Self {
            bit_sample_count,
            mark_env: 0.0,
            mark_noise: 0.0,
            space_env: 0.0,
            space_noise: 0.0,
        }
    }

    /// Process one pair of branch magnitudes into a soft bit
    ///
    /// Accepts the post-filter magnitudes of the mark and space
    /// branches. Returns the signed log-confidence soft bit:
    /// positive for mark, negative for space.
    pub fn input(&mut self, mark_abs: f64, space_abs: f64) -> i32 {
        self.mark_env = self.envelope_decay(self.mark_env, mark_abs);
        self.mark_noise = self.noise_decay(self.mark_noise, mark_abs);

        self.space_env = self.envelope_decay(self.space_env, space_abs);
        self.space_noise = self.noise_decay(self.space_noise, space_abs);

        let noise_floor = (self.space_noise + self.mark_noise) / 2.0;

        // clip mark & space to envelope & floor
        let mark_abs = mark_abs.min(self.mark_env).max(noise_floor);
        let space_abs = space_abs.min(self.space_env).max(noise_floor);

        let logic_level = (mark_abs - noise_floor) * (self.mark_env - noise_floor)
            - (space_abs - noise_floor) * (self.space_env - noise_floor)
            - 0.5
                * ((self.mark_env - noise_floor) * (self.mark_env - noise_floor)
                    - (self.space_env - noise_floor) * (self.space_env - noise_floor));

        let mark_state = (1.0 + logic_level.abs()).ln() as i32;
        if logic_level < 0.0 {
            -mark_state
        } else {
            mark_state
        }
    }

    // envelope average decays fast up, slow down
    fn envelope_decay(&self, avg: f64, value: f64) -> f64 {
        let divisor = if value > avg {
            (self.bit_sample_count / 4.0).trunc()
        } else {
            (self.bit_sample_count * 16.0).trunc()
        };
        decayavg(avg, value, divisor)
    }

    // noise average decays fast down, slow up
    fn noise_decay(&self, avg: f64, value: f64) -> f64 {
        let divisor = if value < avg {
            (self.bit_sample_count / 4.0).trunc()
        } else {
            (self.bit_sample_count * 48.0).trunc()
        };
        decayavg(avg, value, divisor)
    }

    /// Mark-branch envelope estimate
    #[cfg(test)]
    pub fn mark_envelope(&self) -> f64 {
        self.mark_env
    }

    /// Combined noise floor estimate
    #[cfg(test)]
    pub fn noise_floor(&self) -> f64 {
        (self.space_noise + self.mark_noise) / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use assert_approx_eq::assert_approx_eq;

    const B: f64 = 110.25;

    #[test]
    fn test_decayavg() {
        assert_approx_eq!(decayavg(0.0, 64.0, 64.0), 1.0);
        assert_approx_eq!(decayavg(10.0, 10.0, 27.0), 10.0);
        assert_approx_eq!(decayavg(4.0, 0.0, 2.0), 2.0);
    }

    #[test]
    fn test_envelope_attacks_fast_decays_slow() {
        let mut atc = AtcDiscriminator::new(B);

        // a steady mark tone: the envelope catches up within a
        // couple of bit times
        for _i in 0..(4 * B as usize) {
            atc.input(1000.0, 0.0);
        }
        assert!(atc.mark_envelope() > 900.0);

        // when the tone disappears, the envelope lingers
        let before = atc.mark_envelope();
        for _i in 0..(B as usize) {
            atc.input(0.0, 0.0);
        }
        assert!(atc.mark_envelope() > before * 0.9);
    }

    #[test]
    fn test_envelope_bounds_signal() {
        let mut atc = AtcDiscriminator::new(B);
        for i in 0..10_000 {
            // noisy-ish deterministic magnitude between 100 and 900
            let value = 500.0 + 400.0 * f64::sin(i as f64 * 0.37);
            atc.input(value, 0.0);
        }
        // the envelope rides above the running mean of the signal
        // it tracks, and the noise floor sits below the envelope
        assert!(atc.mark_envelope() >= 500.0);
        assert!(atc.noise_floor() <= atc.mark_envelope());
    }

    #[test]
    fn test_soft_bit_sign_follows_tone() {
        let mut atc = AtcDiscriminator::new(B);

        let mut soft = 0;
        for _i in 0..(8 * B as usize) {
            soft = atc.input(1000.0, 10.0);
        }
        assert!(soft > 0, "mark tone must slice positive, got {}", soft);

        for _i in 0..(8 * B as usize) {
            soft = atc.input(10.0, 1000.0);
        }
        assert!(soft < 0, "space tone must slice negative, got {}", soft);
    }

    #[test]
    fn test_zero_input_is_zero_confidence() {
        let mut atc = AtcDiscriminator::new(B);
        for _i in 0..1000 {
            assert_eq!(atc.input(0.0, 0.0), 0);
        }
    }
}
