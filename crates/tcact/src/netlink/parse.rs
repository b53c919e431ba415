//! Command-line token helpers shared by the action codecs.
//!
//! The grammar follows the classic tc conventions: keywords may be
//! abbreviated to any non-empty prefix, and numbers take C-style base
//! prefixes when parsed with base 0.

use std::num::IntErrorKind;

/// Error type for token parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("invalid number: {0:?}")]
    InvalidNumber(String),

    #[error("number out of range: {0}")]
    OutOfRange(String),

    #[error("invalid format: {0}")]
    InvalidFormat(String),

    #[error("command line is not complete after {0:?}")]
    MissingArgument(String),
}

pub type Result<T> = std::result::Result<T, ParseError>;

/// Check whether `arg` abbreviates `keyword`.
///
/// An empty argument never matches.
pub fn matches(arg: &str, keyword: &str) -> bool {
    !arg.is_empty() && keyword.starts_with(arg)
}

/// Parse a u32 in the given base (0 auto-detects `0x` and `0` prefixes).
pub fn get_u32(s: &str, base: u32) -> Result<u32> {
    let value = parse_unsigned(s, base)?;
    u32::try_from(value).map_err(|_| ParseError::OutOfRange(s.to_string()))
}

/// Parse a u16 in the given base (0 auto-detects `0x` and `0` prefixes).
pub fn get_u16(s: &str, base: u32) -> Result<u16> {
    let value = parse_unsigned(s, base)?;
    u16::try_from(value).map_err(|_| ParseError::OutOfRange(s.to_string()))
}

fn strip_hex(s: &str) -> Option<&str> {
    s.strip_prefix("0x").or_else(|| s.strip_prefix("0X"))
}

fn parse_unsigned(s: &str, base: u32) -> Result<u64> {
    let invalid = || ParseError::InvalidNumber(s.to_string());

    let (digits, radix) = match base {
        0 => {
            if let Some(hex) = strip_hex(s) {
                (hex, 16)
            } else if s.len() > 1 && s.starts_with('0') {
                (&s[1..], 8)
            } else {
                (s, 10)
            }
        }
        16 => (strip_hex(s).unwrap_or(s), 16),
        2..=36 => (s, base),
        _ => return Err(invalid()),
    };

    // from_str_radix tolerates a leading '+', the classic parser does not
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return Err(invalid());
    }

    u64::from_str_radix(digits, radix).map_err(|e| match e.kind() {
        IntErrorKind::PosOverflow => ParseError::OutOfRange(s.to_string()),
        _ => invalid(),
    })
}

/// Cursor over the tokens of one command line.
///
/// Codecs consume tokens left to right and hand the cursor back to the
/// caller, which decides what to do with anything left over.
#[derive(Debug, Clone)]
pub struct Args<'a> {
    tokens: Vec<&'a str>,
    pos: usize,
}

impl<'a> Args<'a> {
    /// Create a cursor over `tokens`.
    pub fn new<S: AsRef<str>>(tokens: &'a [S]) -> Self {
        Self {
            tokens: tokens.iter().map(AsRef::as_ref).collect(),
            pos: 0,
        }
    }

    /// Current token without consuming it.
    pub fn peek(&self) -> Option<&'a str> {
        self.tokens.get(self.pos).copied()
    }

    /// Check whether the current token abbreviates `keyword`.
    pub fn peek_matches(&self, keyword: &str) -> bool {
        self.peek().is_some_and(|arg| matches(arg, keyword))
    }

    /// Consume and return the current token.
    pub fn next_token(&mut self) -> Option<&'a str> {
        let token = self.peek()?;
        self.pos += 1;
        Some(token)
    }

    /// Skip the current token.
    pub fn advance(&mut self) {
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
    }

    /// Step back one token.
    pub fn rewind(&mut self) {
        self.pos = self.pos.saturating_sub(1);
    }

    /// Consume the value that must follow `keyword`.
    pub fn next_value(&mut self, keyword: &str) -> Result<&'a str> {
        self.next_token()
            .ok_or_else(|| ParseError::MissingArgument(keyword.to_string()))
    }

    /// Number of tokens not yet consumed.
    pub fn remaining(&self) -> usize {
        self.tokens.len() - self.pos
    }

    /// Check whether every token has been consumed.
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_prefix() {
        assert!(matches("zone", "zone"));
        assert!(matches("zo", "zone"));
        assert!(matches("d", "dscp"));
        assert!(!matches("", "zone"));
        assert!(!matches("zones", "zone"));
        assert!(!matches("index", "zone"));
    }

    #[test]
    fn test_get_u32_auto_base() {
        assert_eq!(get_u32("0x1e", 0).unwrap(), 0x1e);
        assert_eq!(get_u32("0X3F", 0).unwrap(), 0x3f);
        assert_eq!(get_u32("010", 0).unwrap(), 8);
        assert_eq!(get_u32("0", 0).unwrap(), 0);
        assert_eq!(get_u32("42", 0).unwrap(), 42);
        assert_eq!(get_u32("0xffffffff", 0).unwrap(), u32::MAX);
    }

    #[test]
    fn test_get_u32_fixed_base() {
        assert_eq!(get_u32("010", 10).unwrap(), 10);
        assert_eq!(get_u32("ff", 16).unwrap(), 255);
        assert_eq!(get_u32("0xff", 16).unwrap(), 255);
        assert!(get_u32("0x10", 10).is_err());
    }

    #[test]
    fn test_get_u32_rejects_junk() {
        for bad in ["", "zone", "12abc", "0x", "08", "+5", "-1", " 7", "0x+5"] {
            assert!(
                matches!(get_u32(bad, 0), Err(ParseError::InvalidNumber(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_get_u32_overflow() {
        assert!(matches!(
            get_u32("0x100000000", 0),
            Err(ParseError::OutOfRange(_))
        ));
        assert!(matches!(
            get_u32("99999999999999999999999", 10),
            Err(ParseError::OutOfRange(_))
        ));
    }

    #[test]
    fn test_get_u16() {
        assert_eq!(get_u16("65535", 10).unwrap(), 65535);
        assert!(matches!(get_u16("65536", 10), Err(ParseError::OutOfRange(_))));
        assert!(get_u16("0x10", 10).is_err());
    }

    #[test]
    fn test_args_cursor() {
        let tokens = ["cpmark", "zone", "9"];
        let mut args = Args::new(&tokens);

        assert!(args.peek_matches("cpmark"));
        assert_eq!(args.next_token(), Some("cpmark"));
        assert_eq!(args.next_token(), Some("zone"));
        args.rewind();
        assert_eq!(args.remaining(), 2);
        assert_eq!(args.peek(), Some("zone"));

        args.advance();
        assert_eq!(args.next_value("zone").unwrap(), "9");
        assert!(args.is_empty());
        assert_eq!(
            args.next_value("index"),
            Err(ParseError::MissingArgument("index".into()))
        );
    }
}
