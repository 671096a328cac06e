//! Multicorrelator bit synchronization
//!
//! The signal is sampled at three points per bit: early, prompt, and
//! late. The prompt event is where the bit is decided; early and late
//! exist only to steer the sampling instant onto the incoming signal.
//! Each event empties its own accumulator, into which every soft
//! discriminator sample is summed. The early event leads the prompt by
//! one fifth of a bit, and the late event trails by the same amount.
//!
//! If the early accumulator magnitude runs consistently larger than
//! the late one, the decision instant is late, and vice versa. Every
//! eight bit periods the schedule is nudged along that slope. When the
//! prompt magnitude sits in a valley below both neighbors, the
//! schedule jumps a full fifth of a bit toward the stronger side
//! instead of crawling.
//!
//! A bit occupies a fractional number of samples (110.25 at 11025 Hz),
//! so the schedule is kept in floating point. Rounding the bit period
//! to an integer would make the tracker chase a quarter sample of
//! drift on every bit.

#[cfg(not(test))]
use log::debug;

#[cfg(test)]
use std::println as debug;

use super::atc::decayavg;

// Decay divisor for the early/prompt/late magnitude averages
const AVERAGE_DIVISOR: f64 = 64.0;

// Empirical hysteresis margin for minimum detection
const VALLEY_MARGIN: f64 = 1.05;

/// Early/prompt/late accumulator bank and sampling schedule
#[derive(Clone, Debug)]
pub struct Multicorrelator {
    // samples per bit, fractional
    bit_sample_count: f64,

    early_accumulator: f64,
    prompt_accumulator: f64,
    late_accumulator: f64,

    next_early_event: f64,
    next_prompt_event: f64,
    next_late_event: f64,

    average_early_signal: f64,
    average_prompt_signal: f64,
    average_late_signal: f64,

    reverse: bool,
}

impl Multicorrelator {
    /// New multicorrelator for `bit_sample_count` samples per bit
    ///
    /// A narrower spread between the sampling points centers on the
    /// pulses better; a wider spread is more robust in noise. One
    /// fifth of a bit is the compromise that works.
    pub fn new(bit_sample_count: f64, reverse: bool) -> Self {
        Self {
            bit_sample_count,
            early_accumulator: 0.0,
            prompt_accumulator: 0.0,
            late_accumulator: 0.0,
            next_early_event: 0.0,
            next_prompt_event: bit_sample_count / 5.0,
            next_late_event: bit_sample_count * 2.0 / 5.0,
            average_early_signal: 0.0,
            average_prompt_signal: 0.0,
            average_late_signal: 0.0,
            reverse,
        }
    }

    /// Re-align the sampling schedule
    ///
    /// Runs once every eight bit periods; other calls return
    /// immediately. Compares the averaged early, prompt, and late
    /// magnitudes and shifts all three event times together so the
    /// prompt event lands where the accumulator peaks.
    pub fn align(&mut self, sample_count: u64) {
        if sample_count % ((self.bit_sample_count * 8.0) as u64) != 0 {
            return;
        }

        // slope between the early and late magnitudes steers the
        // sampling toward the received signal
        let mut slope = self.average_late_signal - self.average_early_signal;

        if self.average_prompt_signal * VALLEY_MARGIN < self.average_early_signal
            && self.average_prompt_signal * VALLEY_MARGIN < self.average_late_signal
        {
            // at a signal minimum: get out quickly
            if self.average_early_signal > self.average_late_signal {
                // move prompt to where early is
                slope = self.next_early_event - self.next_prompt_event;
                slope = (slope - self.bit_sample_count) % self.bit_sample_count;
                self.average_late_signal = self.average_prompt_signal;
                self.average_prompt_signal = self.average_early_signal;
            } else {
                // move prompt to where late is
                slope = self.next_late_event - self.next_prompt_event;
                slope = (slope + self.bit_sample_count) % self.bit_sample_count;
                self.average_early_signal = self.average_prompt_signal;
                self.average_prompt_signal = self.average_late_signal;
            }
        } else {
            slope /= 1024.0;
        }

        if slope != 0.0 {
            self.next_early_event += slope;
            self.next_prompt_event += slope;
            self.next_late_event += slope;
            debug!(
                "adjusting by {:.2}, early {:.1}, prompt {:.1}, late {:.1}",
                slope,
                self.average_early_signal,
                self.average_prompt_signal,
                self.average_late_signal
            );
        }
    }

    /// Sum one soft sample into all three accumulators
    pub fn accumulate(&mut self, soft_bit: i32) {
        self.early_accumulator += soft_bit as f64;
        self.prompt_accumulator += soft_bit as f64;
        self.late_accumulator += soft_bit as f64;
    }

    /// Fire any sampling events due at `sample_count`
    ///
    /// Each event updates its magnitude average, advances its next
    /// event time by one bit, and empties its accumulator. If the
    /// prompt event fired, the bit decision is returned: the prompt
    /// accumulator, negated when the receiver is in `reverse` mode.
    ///
    /// Events are checked independently, in early, late, prompt
    /// order, so coincident events within one sample period are each
    /// processed.
    pub fn sample_events(&mut self, sample_count: u64) -> Option<i32> {
        let now = sample_count as f64;

        if now >= self.next_early_event {
            self.average_early_signal = decayavg(
                self.average_early_signal,
                self.early_accumulator.abs(),
                AVERAGE_DIVISOR,
            );
            self.next_early_event += self.bit_sample_count;
            self.early_accumulator = 0.0;
        }

        if now >= self.next_late_event {
            self.average_late_signal = decayavg(
                self.average_late_signal,
                self.late_accumulator.abs(),
                AVERAGE_DIVISOR,
            );
            self.next_late_event += self.bit_sample_count;
            self.late_accumulator = 0.0;
        }

        // the prompt event is the end of a signal pulse: the
        // accumulator should be at maximum deviation
        if now >= self.next_prompt_event {
            self.average_prompt_signal = decayavg(
                self.average_prompt_signal,
                self.prompt_accumulator.abs(),
                AVERAGE_DIVISOR,
            );
            self.next_prompt_event += self.bit_sample_count;
            let mut mark_state = self.prompt_accumulator as i32;
            if self.reverse {
                mark_state = -mark_state;
            }
            self.prompt_accumulator = 0.0;
            Some(mark_state)
        } else {
            None
        }
    }
}
