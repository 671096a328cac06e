//! CCIR-476 seven-bit character code
//!
//! CCIR Recommendation 476 defines the character code used by SITOR-B
//! and NAVTEX. Every valid codeword has exactly four one bits and three
//! zero bits, which leaves three bits of redundancy for error detection.
//! Characters are interpreted against a shift state: the letters case or
//! the figures case. Two control codes (`LTRS` and `FIGS`) select the
//! case, and the remaining control codes are used for phasing and idle
//! fill.

use lazy_static::lazy_static;

/// Shift to letters case
pub const LTRS: u8 = 0x5a;

/// Shift to figures case
pub const FIGS: u8 = 0x36;

/// Phasing signal 1 / idle alpha
pub const ALPHA: u8 = 0x0f;

/// Idle beta
pub const BETA: u8 = 0x33;

/// Unassigned control (called "char32" in most decoders)
pub const CHAR32: u8 = 0x6a;

/// Phasing signal 2 / repeat marker
pub const REP: u8 = 0x66;

/// The bell character, figures case
pub const BELL: u8 = 0x07;

// Letters case. `_` marks codewords with no assignment.
const CODE_TO_LTRS: [u8; 128] = [
    //0    1     2     3     4     5     6     7     8     9     a     b     c     d     e     f
    b'_', b'_', b'_', b'_', b'_', b'_', b'_', b'_', b'_', b'_', b'_', b'_', b'_', b'_', b'_', b'_', // 0
    b'_', b'_', b'_', b'_', b'_', b'_', b'_', b'J', b'_', b'_', b'_', b'F', b'_', b'C', b'K', b'_', // 1
    b'_', b'_', b'_', b'_', b'_', b'_', b'_', b'W', b'_', b'_', b'_', b'Y', b'_', b'P', b'Q', b'_', // 2
    b'_', b'_', b'_', b'_', b'_', b'G', b'_', b'_', b'_', b'M', b'X', b'_', b'V', b'_', b'_', b'_', // 3
    b'_', b'_', b'_', b'_', b'_', b'_', b'_', b'A', b'_', b'_', b'_', b'S', b'_', b'I', b'U', b'_', // 4
    b'_', b'_', b'_', b'D', b'_', b'R', b'E', b'_', b'_', b'N', b'_', b'_', b' ', b'_', b'_', b'_', // 5
    b'_', b'_', b'_', b'Z', b'_', b'L', b'_', b'_', b'_', b'H', b'_', b'_', b'\n', b'_', b'_', b'_', // 6
    b'_', b'O', b'B', b'_', b'T', b'_', b'_', b'_', b'\r', b'_', b'_', b'_', b'_', b'_', b'_', b'_', // 7
];

// Figures case
const CODE_TO_FIGS: [u8; 128] = [
    //0    1     2     3     4     5     6     7     8     9     a     b     c     d     e     f
    b'_', b'_', b'_', b'_', b'_', b'_', b'_', b'_', b'_', b'_', b'_', b'_', b'_', b'_', b'_', b'_', // 0
    b'_', b'_', b'_', b'_', b'_', b'_', b'_', b'\'', b'_', b'_', b'_', b'!', b'_', b':', b'(', b'_', // 1
    b'_', b'_', b'_', b'_', b'_', b'_', b'_', b'2', b'_', b'_', b'_', b'6', b'_', b'0', b'1', b'_', // 2
    b'_', b'_', b'_', b'_', b'_', b'&', b'_', b'_', b'_', b'.', b'/', b'_', b';', b'_', b'_', b'_', // 3
    b'_', b'_', b'_', b'_', b'_', b'_', b'_', b'-', b'_', b'_', b'_', b'\x07', b'_', b'8', b'7', b'_', // 4
    b'_', b'_', b'_', b'$', b'_', b'4', b'3', b'_', b'_', b',', b'_', b'_', b' ', b'_', b'_', b'_', // 5
    b'_', b'_', b'_', b'"', b'_', b')', b'_', b'_', b'_', b'#', b'_', b'_', b'\n', b'_', b'_', b'_', // 6
    b'_', b'9', b'?', b'_', b'5', b'_', b'_', b'_', b'\r', b'_', b'_', b'_', b'_', b'_', b'_', b'_', // 7
];

lazy_static! {
    // Reverse lookup, letters case. Zero marks unencodable characters.
    static ref LTRS_TO_CODE: [u8; 128] = reverse_table(&CODE_TO_LTRS);

    // Reverse lookup, figures case
    static ref FIGS_TO_CODE: [u8; 128] = reverse_table(&CODE_TO_FIGS);
}

fn reverse_table(forward: &[u8; 128]) -> [u8; 128] {
    let mut out = [0u8; 128];
    for (code, &ch) in forward.iter().enumerate() {
        if check_bits(code as u8) && ch != b'_' {
            out[ch as usize] = code as u8;
        }
    }
    out
}

/// True if `code` is a valid CCIR-476 codeword
///
/// Valid codewords have exactly four of their seven bits set.
pub fn check_bits(code: u8) -> bool {
    (code & 0x7f).count_ones() == 4
}

/// Look up the character for a codeword
///
/// Interprets `code` against the current `shift` state:
/// `false` for letters, `true` for figures. Returns `None`
/// for codewords with no assignment in that case.
pub fn code_to_char(code: u8, shift: bool) -> Option<u8> {
    let table = if shift { &CODE_TO_FIGS } else { &CODE_TO_LTRS };
    match table[(code & 0x7f) as usize] {
        b'_' => None,
        ch => Some(ch),
    }
}

/// Encode a character, inserting shifts as needed
///
/// Appends the codeword for `ch` to `out`. If the character is not
/// available in the current `shift` case, the appropriate `LTRS` or
/// `FIGS` control code is emitted first and `shift` is updated.
/// Unencodable characters are dropped.
pub fn char_to_code(out: &mut Vec<u8>, ch: u8, shift: &mut bool) {
    let ch = (ch.to_ascii_uppercase() & 0x7f) as usize;
    if *shift && FIGS_TO_CODE[ch] != 0 {
        out.push(FIGS_TO_CODE[ch]);
    } else if !*shift && LTRS_TO_CODE[ch] != 0 {
        out.push(LTRS_TO_CODE[ch]);
    } else if FIGS_TO_CODE[ch] != 0 {
        *shift = true;
        out.push(FIGS);
        out.push(FIGS_TO_CODE[ch]);
    } else if LTRS_TO_CODE[ch] != 0 {
        *shift = false;
        out.push(LTRS);
        out.push(LTRS_TO_CODE[ch]);
    }
}

/// Slice seven soft bits into a codeword
///
/// Bit `i` of the output is set when `soft_bits[i]` is positive.
/// Only the signs of the soft bits matter.
pub fn bits_to_code(soft_bits: &[i32]) -> u8 {
    let mut code = 0u8;
    for (i, &bit) in soft_bits.iter().take(7).enumerate() {
        code |= ((bit > 0) as u8) << i;
    }
    code
}

/// True if seven soft bits form a valid codeword
///
/// Checks that exactly four of the seven soft bits are positive.
pub fn valid_soft_bits(soft_bits: &[i32]) -> bool {
    soft_bits.iter().take(7).filter(|&&bit| bit > 0).count() == 4
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_codes_are_valid() {
        for code in [LTRS, FIGS, ALPHA, BETA, CHAR32, REP] {
            assert!(check_bits(code), "control code {:#04x} popcount", code);
        }
    }

    #[test]
    fn test_tables_only_assign_valid_codes() {
        for code in 0..128u8 {
            if !check_bits(code) {
                assert_eq!(CODE_TO_LTRS[code as usize], b'_');
                assert_eq!(CODE_TO_FIGS[code as usize], b'_');
            }
        }
    }

    #[test]
    fn test_roundtrip_letters() {
        for code in 0..128u8 {
            let Some(ch) = code_to_char(code, false) else {
                continue;
            };
            let mut shift = false;
            let mut encoded = Vec::new();
            char_to_code(&mut encoded, ch, &mut shift);
            assert_eq!(encoded, vec![code], "letters roundtrip {:?}", ch as char);
            assert!(!shift);
        }
    }

    #[test]
    fn test_roundtrip_figures() {
        for code in 0..128u8 {
            let Some(ch) = code_to_char(code, true) else {
                continue;
            };
            let mut shift = true;
            let mut encoded = Vec::new();
            char_to_code(&mut encoded, ch, &mut shift);
            assert_eq!(encoded, vec![code], "figures roundtrip {:#04x}", ch);
            assert!(shift);
        }
    }

    #[test]
    fn test_shift_insertion() {
        // "A1" requires a FIGS shift before the digit
        let mut shift = false;
        let mut encoded = Vec::new();
        char_to_code(&mut encoded, b'A', &mut shift);
        char_to_code(&mut encoded, b'1', &mut shift);
        assert_eq!(encoded, vec![0x47, FIGS, 0x2e]);
        assert!(shift);

        // and a LTRS shift to get back
        char_to_code(&mut encoded, b'N', &mut shift);
        assert_eq!(&encoded[3..], &[LTRS, 0x59]);
        assert!(!shift);
    }

    #[test]
    fn test_bits_to_code_signs_only() {
        const STRONG: &[i32] = &[900, 14, -2, 3, -80, -1, 7];
        const WEAK: &[i32] = &[1, 1, -1, 1, -1, -1, 1];

        assert_eq!(bits_to_code(STRONG), bits_to_code(WEAK));
        assert!(valid_soft_bits(STRONG));
        assert!(valid_soft_bits(WEAK));
    }

    #[test]
    fn test_valid_soft_bits_popcount() {
        assert!(!valid_soft_bits(&[1, 1, 1, 1, 1, -1, -1]));
        assert!(!valid_soft_bits(&[1, 1, 1, -1, -1, -1, -1]));
        assert!(!valid_soft_bits(&[0, 0, 0, 0, 0, 0, 0]));
    }

    #[test]
    fn test_spot_checks() {
        assert_eq!(code_to_char(0x47, false), Some(b'A'));
        assert_eq!(code_to_char(0x47, true), Some(b'-'));
        assert_eq!(code_to_char(0x4b, true), Some(BELL));
        assert_eq!(code_to_char(0x78, false), Some(b'\r'));
        assert_eq!(code_to_char(0x6c, true), Some(b'\n'));
        // valid popcount, no assignment in either case
        assert_eq!(code_to_char(0x1b, false), Some(b'F'));
        assert_eq!(code_to_char(ALPHA, false), None);
        assert_eq!(code_to_char(REP, true), None);
    }
}
