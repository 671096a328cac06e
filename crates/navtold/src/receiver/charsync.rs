//! Character synchronization and forward error correction
//!
//! SITOR-B repeats every character: a "rep" copy leads its "alpha"
//! copy by five character times (35 bit times). The [`BitBuffer`]
//! holds one second of soft bits; [`find_alpha_characters`] locates
//! the alpha/rep phase within it, and [`process_bytes`] combines the
//! two copies into a decoded codeword, spending the soft-decision
//! confidence values to repair single-bit damage.

use arraydeque::ArrayDeque;

#[cfg(not(test))]
use log::debug;

#[cfg(test)]
use std::println as debug;

use crate::ccir476;

/// Soft bits retained for decoding: one second at 100 baud
pub(crate) const BIT_BUFFER_LEN: usize = 100;

// A rep precedes its alpha by five characters
const FEC_OFFSET: usize = 35;

/// One second of soft bit history
///
/// New soft bits shift in at the tail; the oldest bit falls off the
/// head. The buffer is always full, so positions are stable between
/// pushes: position `i` simply moves to `i - 1`.
#[derive(Clone, Debug)]
pub(crate) struct BitBuffer(ArrayDeque<i32, BIT_BUFFER_LEN, arraydeque::Wrapping>);

impl BitBuffer {
    pub fn new() -> Self {
        let mut deque: ArrayDeque<i32, BIT_BUFFER_LEN, arraydeque::Wrapping> = ArrayDeque::new();
        for _i in 0..BIT_BUFFER_LEN {
            deque.push_back(0);
        }
        Self(deque)
    }

    /// Shift in a new soft bit, discarding the oldest
    pub fn push(&mut self, soft_bit: i32) {
        self.0.push_back(soft_bit);
    }

    /// Copy the seven soft bits starting at `pos`
    pub fn soft_bits(&self, pos: usize) -> [i32; 7] {
        let mut out = [0i32; 7];
        for (i, slot) in out.iter_mut().enumerate() {
            *slot = self.0[pos + i];
        }
        out
    }

    /// The codeword formed by the seven soft bits at `pos`
    pub fn code_at(&self, pos: usize) -> u8 {
        ccir476::bits_to_code(&self.soft_bits(pos))
    }

    /// True if the seven soft bits at `pos` form a valid codeword
    pub fn valid_char_at(&self, pos: usize) -> bool {
        ccir476::valid_soft_bits(&self.soft_bits(pos))
    }
}

impl std::ops::Index<usize> for BitBuffer {
    type Output = i32;

    fn index(&self, pos: usize) -> &i32 {
        &self.0[pos]
    }
}

/// Search the bit buffer for the alpha/rep phase
///
/// Tries each of the 14 possible alignments of the first alpha
/// character that has a rep within the buffer. Each alignment is
/// scored by its count of valid codewords, plus the number of
/// confirmed alpha/rep pairings. An alignment whose "pairings" are
/// phasing codes spaced oddly is rejected outright.
///
/// Returns the bit offset of the best alignment, if it is good
/// enough: at least 3 confirmed reps and more than 8 total points.
pub(crate) fn find_alpha_characters(bits: &BitBuffer) -> Option<usize> {
    let mut best_offset = 0;
    let mut best_score = 0u32;
    let limit = BIT_BUFFER_LEN - 7;

    for offset in FEC_OFFSET..FEC_OFFSET + 14 {
        let mut score = 0u32;
        let mut reps = 0u32;

        // the largest run of valid characters, characters paired
        // with their own rep counting double
        let mut pos = offset;
        while pos < limit {
            if bits.valid_char_at(pos) {
                let code = bits.code_at(pos);
                let rep = bits.code_at(pos - FEC_OFFSET);

                score += 1;

                if code == rep {
                    if code == ccir476::ALPHA || code == ccir476::REP {
                        // rep and alpha are spaced oddly: this
                        // offset is wrong
                        score = 0;
                        pos += 7;
                        continue;
                    }
                    reps += 1;
                } else if code == ccir476::ALPHA && bits.code_at(pos - 7) == ccir476::REP {
                    // an alpha phasing code with its rep right
                    // before it
                    reps += 1;
                }
            }
            pos += 7;
        }

        if reps >= 3 && score + reps > best_score {
            best_score = score + reps;
            best_offset = offset;
        }
    }

    // the buffer fits 14 characters; demand at least 9 good ones
    if best_score > 8 {
        Some(best_offset)
    } else {
        None
    }
}

/// Decode the seven soft bits at `cursor` with FEC
///
/// Returns the decode status and the decoded codeword, if any:
///
/// * `1` — the alpha copy was valid
/// * `0` — decoded from the rep copy (no error charge)
/// * `-1` — decoded by soft combination or bit flipping
/// * `-2` — hard failure
///
/// The caller subtracts the status from its running error count.
pub(crate) fn process_bytes(bits: &BitBuffer, cursor: usize) -> (i32, Option<u8>) {
    let alpha = bits.soft_bits(cursor);
    let code = ccir476::bits_to_code(&alpha);

    if ccir476::check_bits(code) {
        debug!("valid code : {:x}", code);
        return (1, Some(code));
    }

    let Some(rep_pos) = cursor.checked_sub(FEC_OFFSET) else {
        // no rep available yet
        return (-1, None);
    };

    // The alpha (primary) copy was not correct. Try the rep copy,
    // and some permutations, to see if the character can be found.
    let rep = bits.soft_bits(rep_pos);
    let rep_code = ccir476::bits_to_code(&rep);
    if ccir476::check_bits(rep_code) {
        if rep_code == ccir476::REP {
            // the alpha is probably a phasing code; skip decoding
            // to avoid switching phase
            return (0, None);
        }
        debug!("FEC replacement: {:x} -> {:x}", code, rep_code);
        return (0, Some(rep_code));
    }

    // Neither copy is valid on its own. Try the sum of the two.
    let mut avg = [0i32; 7];
    for (slot, (&a, &r)) in avg.iter_mut().zip(alpha.iter().zip(rep.iter())) {
        *slot = a + r;
    }
    let calc = ccir476::bits_to_code(&avg);
    if ccir476::check_bits(calc) {
        debug!("FEC calculation: {:x} & {:x} -> {:x}", code, rep_code, calc);
        return (-1, Some(calc));
    }

    // Flip the lowest confidence bit in alpha.
    let mut trial = alpha;
    flip_smallest_bit(&mut trial);
    let calc = ccir476::bits_to_code(&trial);
    if ccir476::check_bits(calc) {
        debug!("FEC calculation: {:x} & {:x} -> {:x}", code, rep_code, calc);
        return (-1, Some(calc));
    }

    // Restore alpha; flip the lowest confidence bit in rep.
    let mut trial = rep;
    flip_smallest_bit(&mut trial);
    let calc = ccir476::bits_to_code(&trial);
    if ccir476::check_bits(calc) {
        debug!("FEC calculation: {:x} & {:x} -> {:x}", code, rep_code, calc);
        return (-1, Some(calc));
    }

    // Last try: the lowest confidence bit of the sum.
    let mut trial = avg;
    flip_smallest_bit(&mut trial);
    let calc = ccir476::bits_to_code(&trial);
    if ccir476::check_bits(calc) {
        debug!("FEC calculation: {:x} & {:x} -> {:x}", code, rep_code, calc);
        return (-1, Some(calc));
    }

    debug!("decode fail {:x}, {:x}", code, rep_code);
    (-2, None)
}

/// Flip the sign of the least certain bit
///
/// A valid character has three zeros and four ones. With four zeros
/// or five ones (as counted below), flipping the bit closest to zero
/// confidence can make the character valid. The ones count starts at
/// one, an asymmetry inherited from every decoder in this lineage;
/// the practical effect is that only a four-zero (or zero-valued)
/// imbalance is ever corrected from the ones side.
fn flip_smallest_bit(soft_bits: &mut [i32; 7]) {
    let mut min_zero = i32::MIN;
    let mut min_one = i32::MAX;
    let mut min_zero_pos = None;
    let mut min_one_pos = None;
    let mut count_zero = 0;
    let mut count_one = 1;

    for (i, &val) in soft_bits.iter().enumerate() {
        if val < 0 {
            count_zero += 1;
            if val > min_zero {
                min_zero = val;
                min_zero_pos = Some(i);
            }
        } else {
            count_one += 1;
            if val < min_one {
                min_one = val;
                min_one_pos = Some(i);
            }
        }
    }

    if count_zero == 4 {
        if let Some(pos) = min_zero_pos {
            soft_bits[pos] = -soft_bits[pos];
        }
    } else if count_one == 5 {
        if let Some(pos) = min_one_pos {
            soft_bits[pos] = -soft_bits[pos];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::ccir476::{ALPHA, REP};

    // write `code` as strong soft bits at `pos`
    fn write_code(bits: &mut Vec<i32>, code: u8) {
        for i in 0..7 {
            if code & (1 << i) != 0 {
                bits.push(100);
            } else {
                bits.push(-100);
            }
        }
    }

    // fill a BitBuffer from the *end* of a soft bit sequence
    fn buffer_from(soft: &[i32]) -> BitBuffer {
        let mut buf = BitBuffer::new();
        for &bit in soft.iter() {
            buf.push(bit);
        }
        buf
    }

    // a phasing-style stream: REP in rep slots, ALPHA in alpha
    // slots, with `codes` interleaved so that each code appears
    // first as rep and again, 35 bits later, as alpha
    fn interleaved_stream(codes: &[u8], nphase: usize) -> Vec<i32> {
        let nslots = 2 * nphase + 2 * codes.len() + 5;
        let mut bits = Vec::new();
        for slot in 0..nslots {
            let code = if slot % 2 == 0 {
                match (slot / 2).checked_sub(nphase).and_then(|j| codes.get(j)) {
                    Some(&c) => c,
                    None => REP,
                }
            } else {
                match slot
                    .checked_sub(5)
                    .and_then(|s| (s / 2).checked_sub(nphase))
                    .and_then(|j| codes.get(j))
                {
                    Some(&c) => c,
                    None => ALPHA,
                }
            };
            write_code(&mut bits, code);
        }
        bits
    }

    #[test]
    fn test_bit_buffer_shifts() {
        let mut buf = BitBuffer::new();
        assert_eq!(buf[0], 0);
        buf.push(7);
        assert_eq!(buf[BIT_BUFFER_LEN - 1], 7);
        buf.push(9);
        assert_eq!(buf[BIT_BUFFER_LEN - 2], 7);
        assert_eq!(buf[BIT_BUFFER_LEN - 1], 9);
    }

    #[test]
    fn test_find_alpha_in_phasing() {
        // 'N' 'A' 'U' over a phasing preamble
        let stream = interleaved_stream(&[0x59, 0x47, 0x4e], 12);
        let buf = buffer_from(&stream);

        let offset = find_alpha_characters(&buf).expect("expected sync");
        // the accepted offset must land on alpha slots: walking
        // forward by 7 never hits an invalid character
        let mut pos = offset;
        while pos < BIT_BUFFER_LEN - 7 {
            assert!(buf.valid_char_at(pos));
            pos += 7;
        }
        assert!((FEC_OFFSET..FEC_OFFSET + 14).contains(&offset));
    }

    #[test]
    fn test_find_alpha_rejects_silence() {
        let buf = BitBuffer::new();
        assert_eq!(find_alpha_characters(&buf), None);
    }

    #[test]
    fn test_find_alpha_rejects_noise() {
        // alternating weak bits everywhere: plenty of "valid"
        // popcounts will not occur, and no rep structure exists
        let soft: Vec<i32> = (0..BIT_BUFFER_LEN as i32)
            .map(|i| if i % 3 == 0 { 1 } else { -1 })
            .collect();
        let buf = buffer_from(&soft);
        assert_eq!(find_alpha_characters(&buf), None);
    }

    // Fill a buffer with 14 copies of `code`, 98 bits, leaving two
    // zero bits at the head. Code boundaries land at 2 + 7k, so
    // cursor 44 is code index 6 and its rep position 9 is index 1.
    fn buffer_of_code(code: u8) -> (Vec<i32>, BitBuffer) {
        let mut soft = Vec::new();
        for _i in 0..14 {
            write_code(&mut soft, code);
        }
        let buf = buffer_from(&soft);
        (soft, buf)
    }

    // Like `buffer_of_code`, with `overrides` of (bit index within
    // the 98-bit stream, replacement soft value) applied
    fn damaged_buffer_of_code(code: u8, overrides: &[(usize, i32)]) -> BitBuffer {
        let (mut soft, _) = buffer_of_code(code);
        for &(pos, val) in overrides {
            soft[pos] = val;
        }
        buffer_from(&soft)
    }

    // cursor 44 in the buffer is bit 42 of the 98-bit stream
    const CURSOR: usize = 44;
    const STREAM_CURSOR: usize = CURSOR - 2;
    const STREAM_REP: usize = STREAM_CURSOR - 35;

    #[test]
    fn test_process_bytes_clean_alpha() {
        let (_, buf) = buffer_of_code(0x59); // 'N'

        let (status, code) = process_bytes(&buf, CURSOR);
        assert_eq!(status, 1);
        assert_eq!(code, Some(0x59));
    }

    #[test]
    fn test_process_bytes_rep_replacement() {
        // knock out one bit of the alpha copy: the rep 35 bits
        // earlier is used instead, with no error charge
        let buf = damaged_buffer_of_code(0x59, &[(STREAM_CURSOR, -100)]);

        let (status, code) = process_bytes(&buf, CURSOR);
        assert_eq!(status, 0);
        assert_eq!(code, Some(0x59));
    }

    #[test]
    fn test_process_bytes_rep_of_rep_skips_decode() {
        // a REP phasing stream with a broken alpha copy: the rep
        // path is consulted but deliberately not decoded
        let buf = damaged_buffer_of_code(REP, &[(STREAM_CURSOR, 100)]);

        let (status, code) = process_bytes(&buf, CURSOR);
        assert_eq!(status, 0);
        assert_eq!(code, None);
    }

    #[test]
    fn test_process_bytes_soft_average() {
        // alpha and rep each have one (different) weak flipped bit;
        // their sum decodes cleanly
        let buf = damaged_buffer_of_code(
            0x47, // 'A' = 1000111
            &[(STREAM_CURSOR, -10), (STREAM_REP + 1, -10)],
        );

        let (status, code) = process_bytes(&buf, CURSOR);
        assert_eq!(status, -1);
        assert_eq!(code, Some(0x47));
    }

    #[test]
    fn test_process_bytes_hard_failure() {
        // constant mark: popcount 7 everywhere, and no flip can fix it
        let soft = vec![1i32; BIT_BUFFER_LEN];
        let buf = buffer_from(&soft);
        let (status, code) = process_bytes(&buf, CURSOR);
        assert_eq!(status, -2);
        assert_eq!(code, None);
    }

    #[test]
    fn test_flip_smallest_bit_fixes_three_ones() {
        // popcount 3: the weakest zero flips to one
        let mut bits = [100, -3, -80, 100, 100, -90, 0];
        // 0 counts on the ones side here, so this is four ones as
        // far as the flipper is concerned... popcount is still 3
        flip_smallest_bit(&mut bits);
        // count_zero == 3, count_one == 5: the weakest "one" (the
        // zero) is negated, which changes nothing
        assert_eq!(bits, [100, -3, -80, 100, 100, -90, 0]);

        let mut bits = [100, -3, -80, 100, 100, -90, -1];
        // count_zero == 4: flip the -1
        flip_smallest_bit(&mut bits);
        assert_eq!(bits, [100, -3, -80, 100, 100, -90, 1]);
    }

    #[test]
    fn test_flip_smallest_bit_ignores_five_ones() {
        // popcount 5 never triggers either arm: count_one lands at 6
        let mut bits = [100, 3, -80, 100, 100, -90, 1];
        let before = bits;
        flip_smallest_bit(&mut bits);
        assert_eq!(bits, before);
    }

    #[test]
    fn test_flip_recovers_single_error() {
        // bit 0 wrong in both copies, weakly so in alpha: the sum
        // stays invalid, and the alpha flip path repairs it
        let buf = damaged_buffer_of_code(
            0x47, // 'A'
            &[(STREAM_CURSOR, -5), (STREAM_REP, -100)],
        );

        let (status, code) = process_bytes(&buf, CURSOR);
        assert_eq!(status, -1);
        assert_eq!(code, Some(0x47));
    }
}
