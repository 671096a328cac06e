//! NAVTEX message accumulation
//!
//! A NAVTEX broadcast is plain text framed by a header and a trailer:
//!
//! ```txt
//! ZCZC BA07
//! <message text>
//! NNNN
//! ```
//!
//! The four characters after `ZCZC ` identify the transmitting
//! station (`B`), the subject category (`A`), and a two-digit serial
//! number (`07`). The [`CcirMessage`] accumulates decoded characters
//! and watches its own tail for these delimiters; the receiver uses
//! the detection results to cut message boundaries and annotate
//! whatever context was lost to noise.

use lazy_static::lazy_static;
use regex::Regex;

/// Length of a NAVTEX header: `ZCZC xxnn` plus a line break
const HEADER_LEN: usize = 10;

/// Message trailer
const TRAILER: &str = "NNNN";

lazy_static! {
    // station and subject may be any alphanumeric; the serial number
    // is always two digits
    static ref HEADER_RE: Regex = Regex::new(r"^ZCZC [0-9A-Za-z]{2}[0-9]{2}[\r\n]$").unwrap();
}

/// An accumulating NAVTEX message
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CcirMessage {
    text: String,
    origin: char,
    subject: char,
    number: u32,
}

impl CcirMessage {
    /// New empty message with unknown header fields
    pub fn new() -> Self {
        Self {
            text: String::new(),
            origin: '?',
            subject: '?',
            number: 0,
        }
    }

    /// Append one decoded character
    pub fn push(&mut self, ch: char) {
        self.text.push(ch);
    }

    /// Accumulated message text
    pub fn text(&self) -> &str {
        &self.text
    }

    /// True if no characters have accumulated
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Station identifier from the header, or `'?'`
    pub fn origin(&self) -> char {
        self.origin
    }

    /// Subject indicator from the header, or `'?'`
    pub fn subject(&self) -> char {
        self.subject
    }

    /// Two-digit message serial number from the header
    pub fn number(&self) -> u32 {
        self.number
    }

    /// Discard all text and header fields
    pub fn reset(&mut self) {
        self.text.clear();
        self.origin = '?';
        self.subject = '?';
        self.number = 0;
    }

    /// Check whether the last ten characters form a header
    ///
    /// On a match, the header fields are captured, the text before
    /// the header is split off and returned (it belongs to whatever
    /// transmission preceded this one), and the accumulator is
    /// cleared for the new message.
    pub fn detect_header(&mut self) -> Option<CcirMessage> {
        if self.text.len() < HEADER_LEN {
            return None;
        }

        let split = self.text.len() - HEADER_LEN;
        let tail = &self.text[split..];
        if !HEADER_RE.is_match(tail) {
            return None;
        }

        let tail = tail.as_bytes();
        let cut = CcirMessage {
            text: self.text[..split].to_string(),
            origin: self.origin,
            subject: self.subject,
            number: self.number,
        };
        self.origin = tail[5] as char;
        self.subject = tail[6] as char;
        self.number = (tail[7] - b'0') as u32 * 10 + (tail[8] - b'0') as u32;
        self.text.clear();
        Some(cut)
    }

    /// Check whether the message ends with the `NNNN` trailer
    ///
    /// Tolerates trailers with missing line breaks. On a match the
    /// trailer is stripped from the text.
    pub fn detect_end(&mut self) -> bool {
        if self.text.ends_with(TRAILER) {
            let truncated = self.text.len() - TRAILER.len();
            self.text.truncate(truncated);
            true
        } else {
            false
        }
    }
}

impl Default for CcirMessage {
    fn default() -> Self {
        Self::new()
    }
}

/// Normalize whitespace for delivery
///
/// Runs of carriage returns and newlines collapse to a single `\n`,
/// runs of spaces and tabs to a single space, and any whitespace
/// before the first printable character is dropped.
pub fn cleanup(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut was_delim = false;
    let mut was_space = false;
    let mut seen = false;
    for ch in text.chars() {
        match ch {
            '\n' | '\r' => was_delim = true,
            ' ' | '\t' => was_space = true,
            _ => {
                if seen {
                    if was_delim {
                        out.push('\n');
                    } else if was_space {
                        out.push(' ');
                    }
                }
                was_delim = false;
                was_space = false;
                seen = true;
                out.push(ch);
            }
        }
    }
    out
}
