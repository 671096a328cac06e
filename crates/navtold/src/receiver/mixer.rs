//! Quadrature downconversion
//!
//! Each FSK tone gets its own [`Mixer`], which multiplies the input
//! by a complex exponential to shift that tone to DC. The mark and
//! space branches then share identical low-pass filters, and the
//! magnitude of each branch measures how much energy sits on its
//! tone.

use num_complex::Complex;

/// A numerically-controlled oscillator and mixer for one tone
#[derive(Clone, Debug)]
pub struct Mixer {
    phase: f64,
    increment: f64,
}

impl Mixer {
    /// New mixer for a tone at `freq` Hz, sampled at `sample_rate` Hz
    pub fn new(freq: f64, sample_rate: f64) -> Self {
        Self {
            phase: 0.0,
            increment: 2.0 * std::f64::consts::PI * freq / sample_rate,
        }
    }

    /// Downconvert one sample
    ///
    /// Multiplies `input` by the current oscillator phasor, then
    /// retards the phase by one sample. The phase is kept within
    /// `(-2π, 0]`.
    pub fn mix(&mut self, input: Complex<f64>) -> Complex<f64> {
        let z = Complex::new(self.phase.cos(), self.phase.sin()) * input;

        self.phase -= self.increment;
        if self.phase < -2.0 * std::f64::consts::PI {
            self.phase += 2.0 * std::f64::consts::PI;
        }

        z
    }
}
