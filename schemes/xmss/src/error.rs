//! Error types for XMSS signature operations.

use std::fmt;

/// Errors that can occur during XMSS signature operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmssError {
    /// Signature verification failed.
    InvalidSignature,

    /// The provided key is malformed or invalid.
    InvalidKey {
        /// Description of the key issue.
        reason: &'static str,
    },

    /// Invalid parameter set specified.
    InvalidParams {
        /// Description of why the parameters are invalid.
        reason: &'static str,
    },

    /// All one-time key indices of this key pair have been consumed.
    ///
    /// Signing with an exhausted key would reuse a WOTS+ key and forfeit
    /// all security guarantees, so this is a hard failure.
    KeyExhausted,

    /// Decoding/unpacking failed.
    DecodingError {
        /// What was being decoded.
        context: &'static str,
    },
}

impl fmt::Display for XmssError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            XmssError::InvalidSignature => {
                write!(f, "signature verification failed")
            }
            XmssError::InvalidKey { reason } => {
                write!(f, "invalid key: {}", reason)
            }
            XmssError::InvalidParams { reason } => {
                write!(f, "invalid parameters: {}", reason)
            }
            XmssError::KeyExhausted => {
                write!(f, "all one-time signature indices have been used")
            }
            XmssError::DecodingError { context } => {
                write!(f, "decoding error: {}", context)
            }
        }
    }
}

impl std::error::Error for XmssError {}

/// Result type alias for XMSS operations.
pub type Result<T> = std::result::Result<T, XmssError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = XmssError::InvalidParams {
            reason: "d must divide full_height",
        };
        assert_eq!(err.to_string(), "invalid parameters: d must divide full_height");
        assert_eq!(
            XmssError::KeyExhausted.to_string(),
            "all one-time signature indices have been used"
        );
    }
}
