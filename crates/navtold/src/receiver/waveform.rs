//! NAVTEX waveform parameters
//!
//! NAVTEX broadcasts SITOR-B at 100 baud, frequency-shift keyed with
//! ±85 Hz of deviation. After the radio's SSB demodulator the signal
//! lands in the audio pass-band centered near 1000 Hz: the mark tone
//! at 1085 Hz and the space tone at 915 Hz.

/// Center frequency of the audio FSK signal (Hz)
pub const CENTER_FREQ_HZ: f64 = 1000.0;

/// Tone deviation from the center frequency (Hz)
///
/// Mark sits at `CENTER_FREQ_HZ + DEVIATION_HZ`, space at
/// `CENTER_FREQ_HZ - DEVIATION_HZ`.
pub const DEVIATION_HZ: f64 = 85.0;

/// Symbol rate (baud)
pub const BAUD_HZ: f64 = 100.0;

/// Samples per bit at the given sampling rate, fractional
///
/// At 11025 Hz this is 110.25 samples. The fraction matters: the
/// receiver's sampling schedule is kept in floating point so it does
/// not drift a quarter sample every bit.
pub fn samples_per_bit(sample_rate: u32) -> f64 {
    sample_rate as f64 / BAUD_HZ
}

/// Encode text into CCIR-476 codewords, inserting shifts
#[cfg(test)]
pub fn encode_message(text: &str) -> Vec<u8> {
    let mut shift = false;
    let mut codes = Vec::new();
    for &ch in text.as_bytes() {
        crate::ccir476::char_to_code(&mut codes, ch, &mut shift);
    }
    codes
}

/// Interleave codewords into a SITOR-B slot stream
///
/// Every codeword is transmitted twice: first in a "rep" slot, and
/// again in an "alpha" slot five slots (35 bit times) later. The
/// stream opens with `nphase` REP/ALPHA phasing pairs, and slots with
/// no data carry the phasing codes.
#[cfg(test)]
pub fn interleave(codes: &[u8], nphase: usize) -> Vec<u8> {
    let nslots = 2 * nphase + 2 * codes.len() + 5;
    let mut slots = Vec::with_capacity(nslots);
    for slot in 0..nslots {
        let code = if slot % 2 == 0 {
            match (slot / 2)
                .checked_sub(nphase)
                .and_then(|j| codes.get(j))
            {
                Some(&code) => code,
                None => crate::ccir476::REP,
            }
        } else {
            match slot
                .checked_sub(5)
                .and_then(|s| (s / 2).checked_sub(nphase))
                .and_then(|j| codes.get(j))
            {
                Some(&code) => code,
                None => crate::ccir476::ALPHA,
            }
        };
        slots.push(code);
    }
    slots
}

/// Modulate a slot stream into a continuous-phase FSK waveform
///
/// Bits are sent least significant first, one bits as mark. Bit
/// boundaries fall at fractional sample positions, exactly as a real
/// transmitter's clock would place them.
#[cfg(test)]
pub fn modulate(slots: &[u8], sample_rate: u32) -> nalgebra::DVector<f64> {
    use std::f64::consts::PI;

    let b = samples_per_bit(sample_rate);
    let mark_step = 2.0 * PI * (CENTER_FREQ_HZ + DEVIATION_HZ) / sample_rate as f64;
    let space_step = 2.0 * PI * (CENTER_FREQ_HZ - DEVIATION_HZ) / sample_rate as f64;

    let nbits = slots.len() * 7;
    let nsamples = (nbits as f64 * b).floor() as usize;
    let mut out = nalgebra::DVector::zeros(nsamples);
    let mut phase = 0.0f64;
    for (i, sample) in out.iter_mut().enumerate() {
        let bit_index = (i as f64 / b) as usize;
        let code = slots[bit_index / 7];
        let mark = (code >> (bit_index % 7)) & 1 == 1;
        phase += if mark { mark_step } else { space_step };
        if phase > 2.0 * PI {
            phase -= 2.0 * PI;
        }
        *sample = 0.5 * phase.cos();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::ccir476::{ALPHA, REP};

    #[test]
    fn test_samples_per_bit() {
        assert_eq!(samples_per_bit(11025), 110.25);
        assert_eq!(samples_per_bit(48000), 480.0);
    }

    #[test]
    fn test_interleave_rep_leads_alpha() {
        let codes = encode_message("NAUTICAL");
        let slots = interleave(&codes, 2);

        // every data code appears as rep first, then as alpha five
        // slots later
        for (j, &code) in codes.iter().enumerate() {
            let rep_slot = 2 * (j + 2);
            assert_eq!(slots[rep_slot], code);
            assert_eq!(slots[rep_slot + 5], code);
        }

        // phasing pairs open the stream
        assert_eq!(&slots[0..4], &[REP, ALPHA, REP, ALPHA]);
    }

    #[test]
    fn test_modulate_length_and_range() {
        let slots = interleave(&encode_message("N"), 1);
        let wave = modulate(&slots, 11025);
        assert_eq!(wave.len(), (slots.len() as f64 * 7.0 * 110.25) as usize);
        for &sample in wave.iter() {
            assert!(sample.abs() <= 0.5);
        }
    }
}
