//! Error types for action encoding, decoding and transport.

use std::io;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// `NLMSG_ERROR` with a nonzero code; `errno` is positive.
    #[error("kernel error: {message} (errno {errno})")]
    Kernel { errno: i32, message: String },

    #[error("{operation}: {message} (errno {errno})")]
    KernelWithContext {
        operation: String,
        errno: i32,
        message: String,
    },

    /// Payload is shorter than the structure it should hold.
    #[error("message truncated: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    #[error("invalid message: {0}")]
    InvalidMessage(String),

    #[error("invalid attribute: {0}")]
    InvalidAttribute(String),

    /// A mandatory attribute is absent from an action reply.
    #[error("{kind}: missing attribute {attr}")]
    MissingAttribute {
        kind: &'static str,
        attr: &'static str,
    },

    /// Malformed action parameters, carrying the action's usage text.
    #[error("{message}")]
    Usage {
        message: String,
        usage: &'static str,
    },

    /// A write would take the request past its buffer capacity.
    #[error("message too large: need {needed} bytes, capacity is {capacity}")]
    MessageTooLarge { needed: usize, capacity: usize },

    #[error("parse error: {0}")]
    Parse(String),
}

impl Error {
    /// Map the (negative) error code of an `NLMSG_ERROR` reply.
    pub fn from_errno(code: i32) -> Self {
        let errno = code.saturating_abs();
        Self::Kernel {
            errno,
            message: io::Error::from_raw_os_error(errno).to_string(),
        }
    }

    pub fn usage(message: impl Into<String>, usage: &'static str) -> Self {
        Self::Usage {
            message: message.into(),
            usage,
        }
    }

    /// Name the operation a kernel error belongs to. Other errors pass through.
    pub fn with_context(self, operation: impl Into<String>) -> Self {
        let Self::Kernel { errno, message } = self else {
            return self;
        };
        Self::KernelWithContext {
            operation: operation.into(),
            errno,
            message,
        }
    }

    /// Positive errno carried by a kernel error.
    pub fn errno(&self) -> Option<i32> {
        match self {
            Self::Kernel { errno, .. } | Self::KernelWithContext { errno, .. } => Some(*errno),
            _ => None,
        }
    }

    pub fn is_usage(&self) -> bool {
        matches!(self, Self::Usage { .. })
    }

    /// Canonical usage text to print after a usage error.
    pub fn usage_text(&self) -> Option<&'static str> {
        match self {
            Self::Usage { usage, .. } => Some(usage),
            _ => None,
        }
    }

    /// The kernel has no such action, or no module for its kind.
    pub fn is_not_found(&self) -> bool {
        matches!(self.errno(), Some(libc::ENOENT | libc::ENODEV))
    }

    pub fn is_permission_denied(&self) -> bool {
        matches!(self.errno(), Some(libc::EPERM | libc::EACCES))
    }
}

impl From<super::parse::ParseError> for Error {
    fn from(err: super::parse::ParseError) -> Self {
        Self::Parse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_errno() {
        let err = Error::from_errno(-1); // EPERM
        assert!(err.is_permission_denied());
        assert_eq!(err.errno(), Some(1));
    }

    #[test]
    fn test_with_context() {
        let err = Error::from_errno(-2).with_context("adding ctinfo action");
        assert!(err.is_not_found());
        let msg = err.to_string();
        assert!(msg.contains("adding ctinfo action"));
        assert!(msg.contains("No such file or directory"));
    }

    #[test]
    fn test_usage_error() {
        let err = Error::usage("ctinfo: Illegal \"zone\"", "Usage: ... ctinfo");
        assert!(err.is_usage());
        assert_eq!(err.to_string(), "ctinfo: Illegal \"zone\"");
        assert_eq!(err.usage_text(), Some("Usage: ... ctinfo"));
        assert!(err.errno().is_none());
    }

    #[test]
    fn test_error_messages() {
        let err = Error::MessageTooLarge {
            needed: 20000,
            capacity: 16384,
        };
        assert_eq!(
            err.to_string(),
            "message too large: need 20000 bytes, capacity is 16384"
        );

        let err = Error::MissingAttribute {
            kind: "ctinfo",
            attr: "TCA_CTINFO_ACT",
        };
        assert_eq!(err.to_string(), "ctinfo: missing attribute TCA_CTINFO_ACT");
    }

    #[test]
    fn test_from_parse_error() {
        let err: Error = super::super::parse::ParseError::MissingArgument("index".into()).into();
        assert!(matches!(err, Error::Parse(_)));
        assert!(err.to_string().contains("\"index\""));
    }
}
