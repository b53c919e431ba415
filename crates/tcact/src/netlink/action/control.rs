//! Control verbs: what happens to the packet after an action ran.

use std::fmt;

use serde_json::{Value, json};

use crate::netlink::parse::{self, Args, ParseError, get_u32, matches};

pub const TC_ACT_UNSPEC: i32 = -1;
pub const TC_ACT_OK: i32 = 0;
pub const TC_ACT_RECLASSIFY: i32 = 1;
pub const TC_ACT_SHOT: i32 = 2;
pub const TC_ACT_PIPE: i32 = 3;
pub const TC_ACT_STOLEN: i32 = 4;
pub const TC_ACT_QUEUED: i32 = 5;
pub const TC_ACT_REPEAT: i32 = 6;
pub const TC_ACT_REDIRECT: i32 = 7;
pub const TC_ACT_TRAP: i32 = 8;

/// Extended verbs keep their opcode in the top four bits.
pub const TC_ACT_EXT_SHIFT: u32 = 28;
pub const TC_ACT_EXT_VAL_MASK: u32 = (1 << TC_ACT_EXT_SHIFT) - 1;
pub const TC_ACT_EXT_OPCODE_MAX: u32 = !TC_ACT_EXT_VAL_MASK;
pub const TC_ACT_JUMP: u32 = 1 << TC_ACT_EXT_SHIFT;
pub const TC_ACT_GOTO_CHAIN: u32 = 2 << TC_ACT_EXT_SHIFT;

/// Recognized spellings, tried in order against the abbreviated token.
const VERBS: &[(&str, i32)] = &[
    ("continue", TC_ACT_UNSPEC),
    ("drop", TC_ACT_SHOT),
    ("shot", TC_ACT_SHOT),
    ("pass", TC_ACT_OK),
    ("ok", TC_ACT_OK),
    ("reclassify", TC_ACT_RECLASSIFY),
    ("pipe", TC_ACT_PIPE),
    ("goto", TC_ACT_GOTO_CHAIN as i32),
    ("jump", TC_ACT_JUMP as i32),
    ("trap", TC_ACT_TRAP),
];

/// A control verb as carried in `tc_gen.action`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActionControl(i32);

impl Default for ActionControl {
    fn default() -> Self {
        Self::PIPE
    }
}

impl ActionControl {
    pub const CONTINUE: Self = Self(TC_ACT_UNSPEC);
    pub const PASS: Self = Self(TC_ACT_OK);
    pub const RECLASSIFY: Self = Self(TC_ACT_RECLASSIFY);
    pub const DROP: Self = Self(TC_ACT_SHOT);
    pub const PIPE: Self = Self(TC_ACT_PIPE);
    pub const STOLEN: Self = Self(TC_ACT_STOLEN);
    pub const TRAP: Self = Self(TC_ACT_TRAP);

    /// Wrap a raw kernel value.
    pub const fn from_raw(code: i32) -> Self {
        Self(code)
    }

    /// Raw kernel value.
    pub const fn code(self) -> i32 {
        self.0
    }

    /// `goto chain N`.
    pub fn goto_chain(chain: u32) -> Option<Self> {
        (chain <= TC_ACT_EXT_VAL_MASK).then(|| Self((TC_ACT_GOTO_CHAIN | chain) as i32))
    }

    /// `jump N`: skip the next N actions.
    pub fn jump(count: u32) -> Option<Self> {
        (count <= TC_ACT_EXT_VAL_MASK).then(|| Self((TC_ACT_JUMP | count) as i32))
    }

    fn ext_opcode(self) -> u32 {
        (self.0 as u32) & TC_ACT_EXT_OPCODE_MAX
    }

    fn ext_value(self) -> u32 {
        (self.0 as u32) & TC_ACT_EXT_VAL_MASK
    }

    /// Chain index when this is a `goto chain` verb.
    pub fn chain(self) -> Option<u32> {
        (self.ext_opcode() == TC_ACT_GOTO_CHAIN).then(|| self.ext_value())
    }

    /// Jump count when this is a `jump` verb.
    pub fn jump_count(self) -> Option<u32> {
        (self.ext_opcode() == TC_ACT_JUMP).then(|| self.ext_value())
    }

    /// Parse an optional control clause at the cursor.
    ///
    /// Returns `Ok(None)` without consuming anything when the current token
    /// is not a verb. `goto chain N` and `jump N` consume their arguments.
    pub fn parse(args: &mut Args<'_>) -> parse::Result<Option<Self>> {
        let Some(token) = args.peek() else {
            return Ok(None);
        };
        let Some(&(verb, code)) = VERBS.iter().find(|(verb, _)| matches(token, verb)) else {
            return Ok(None);
        };
        args.advance();

        let control = match verb {
            "goto" => {
                let chain = args.next_value("goto")?;
                if !matches(chain, "chain") {
                    return Err(ParseError::InvalidFormat(format!(
                        "bad action type goto, expected \"chain\" but got {chain:?}"
                    )));
                }
                let index = args.next_value("chain")?;
                let index = get_u32(index, 10)?;
                Self::goto_chain(index)
                    .ok_or_else(|| ParseError::OutOfRange(format!("chain index {index}")))?
            }
            "jump" => {
                let count = args.next_value("jump")?;
                let count = get_u32(count, 10)?;
                Self::jump(count)
                    .ok_or_else(|| ParseError::OutOfRange(format!("jump count {count}")))?
            }
            _ => Self(code),
        };

        Ok(Some(control))
    }

    /// Parse an optional control clause, falling back to `default`.
    pub fn parse_or(args: &mut Args<'_>, default: Self) -> parse::Result<Self> {
        Ok(Self::parse(args)?.unwrap_or(default))
    }

    /// JSON form, `{"type": "...", ...}`.
    pub fn to_json(self) -> Value {
        if let Some(chain) = self.chain() {
            json!({"type": "goto", "chain": chain})
        } else if let Some(count) = self.jump_count() {
            json!({"type": "jump", "jump": count})
        } else {
            json!({"type": self.to_string()})
        }
    }
}

impl fmt::Display for ActionControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(chain) = self.chain() {
            return write!(f, "goto chain {chain}");
        }
        if let Some(count) = self.jump_count() {
            return write!(f, "jump {count}");
        }
        match self.0 {
            TC_ACT_UNSPEC => f.write_str("continue"),
            TC_ACT_OK => f.write_str("pass"),
            TC_ACT_SHOT => f.write_str("drop"),
            TC_ACT_RECLASSIFY => f.write_str("reclassify"),
            TC_ACT_PIPE => f.write_str("pipe"),
            TC_ACT_STOLEN => f.write_str("stolen"),
            TC_ACT_TRAP => f.write_str("trap"),
            other => write!(f, "{other}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_all(tokens: &[&str]) -> (parse::Result<Option<ActionControl>>, usize) {
        let mut args = Args::new(tokens);
        let result = ActionControl::parse(&mut args);
        (result, args.remaining())
    }

    #[test]
    fn test_simple_verbs() {
        let cases = [
            ("continue", ActionControl::CONTINUE),
            ("drop", ActionControl::DROP),
            ("shot", ActionControl::DROP),
            ("pass", ActionControl::PASS),
            ("ok", ActionControl::PASS),
            ("reclassify", ActionControl::RECLASSIFY),
            ("pipe", ActionControl::PIPE),
            ("trap", ActionControl::TRAP),
        ];
        for (token, expected) in cases {
            let (result, left) = parse_all(&[token, "index", "3"]);
            assert_eq!(result.unwrap(), Some(expected), "{token}");
            assert_eq!(left, 2);
        }
    }

    #[test]
    fn test_prefix_order() {
        // "p" hits "pass" before "pipe", "pi" only matches "pipe"
        assert_eq!(parse_all(&["p"]).0.unwrap(), Some(ActionControl::PASS));
        assert_eq!(parse_all(&["pi"]).0.unwrap(), Some(ActionControl::PIPE));
        assert_eq!(parse_all(&["rec"]).0.unwrap(), Some(ActionControl::RECLASSIFY));
    }

    #[test]
    fn test_not_a_verb() {
        let (result, left) = parse_all(&["index", "5"]);
        assert_eq!(result.unwrap(), None);
        assert_eq!(left, 2);

        let mut args = Args::new(&["zone"]);
        assert_eq!(
            ActionControl::parse_or(&mut args, ActionControl::PIPE).unwrap(),
            ActionControl::PIPE
        );
        assert_eq!(parse_all(&[]).0.unwrap(), None);
    }

    #[test]
    fn test_goto_chain() {
        let (result, left) = parse_all(&["goto", "chain", "42", "index", "1"]);
        let control = result.unwrap().unwrap();
        assert_eq!(control.chain(), Some(42));
        assert_eq!(control.to_string(), "goto chain 42");
        assert_eq!(control.to_json(), json!({"type": "goto", "chain": 42}));
        assert_eq!(left, 2);
    }

    #[test]
    fn test_malformed_goto() {
        assert!(matches!(
            parse_all(&["goto", "42"]).0,
            Err(ParseError::InvalidFormat(_))
        ));
        assert!(matches!(
            parse_all(&["goto", "chain"]).0,
            Err(ParseError::MissingArgument(_))
        ));
        assert!(matches!(
            parse_all(&["goto", "chain", "0x10"]).0,
            Err(ParseError::InvalidNumber(_))
        ));
        assert!(matches!(
            parse_all(&["goto", "chain", "268435456"]).0,
            Err(ParseError::OutOfRange(_))
        ));
    }

    #[test]
    fn test_jump() {
        let control = parse_all(&["jump", "2"]).0.unwrap().unwrap();
        assert_eq!(control.jump_count(), Some(2));
        assert_eq!(control.to_string(), "jump 2");
        assert!(matches!(
            parse_all(&["jump"]).0,
            Err(ParseError::MissingArgument(_))
        ));
    }

    #[test]
    fn test_render() {
        assert_eq!(ActionControl::default().to_string(), "pipe");
        assert_eq!(ActionControl::CONTINUE.to_string(), "continue");
        assert_eq!(ActionControl::PASS.to_string(), "pass");
        assert_eq!(ActionControl::STOLEN.to_string(), "stolen");
        assert_eq!(ActionControl::from_raw(TC_ACT_QUEUED).to_string(), "5");
        assert_eq!(ActionControl::PIPE.to_json(), json!({"type": "pipe"}));
    }
}
