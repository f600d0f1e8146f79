//! Common error types for fieldseal.

use thiserror::Error;

use crate::types::RecipientId;

/// Top-level error type for fieldseal operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Authentication tag mismatch: the ciphertext was tampered with,
    /// truncated, or decrypted under the wrong key.
    #[error("Integrity check failed: ciphertext is corrupted or was tampered with")]
    Integrity,

    /// Structurally malformed envelope, record, or key encoding.
    #[error("Malformed input: {0}")]
    Format(String),

    /// The caller is not among the current recipients, or supplied a
    /// private key that does not open their entry.
    #[error("Recipient {0} is not authorized to read this field")]
    RecipientNotAuthorized(RecipientId),

    /// A wrapped key did not open under the supplied private key.
    #[error("Wrapped key does not match the supplied private key")]
    KeyMismatch,

    /// Encryption was requested for zero recipients.
    #[error("At least one recipient is required")]
    EmptyRecipientSet,

    /// The recipient already has an entry on this field.
    #[error("Recipient {0} already has access to this field")]
    DuplicateRecipient(RecipientId),

    /// Removing the recipient would leave the field unreadable.
    #[error("Cannot remove recipient {0}: it is the last one able to read this field")]
    LastRecipient(RecipientId),

    /// Configuration rejected at construction.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Cryptographic primitive failure unrelated to the input data
    /// (e.g. the randomness source is unavailable).
    #[error("Cryptographic error: {0}")]
    Crypto(String),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Coarse classification used to keep data corruption apart from
/// access-control outcomes in logs and telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Corrupted or malformed data, or a bug upstream.
    Corruption,
    /// Expected access-control denial.
    Authorization,
    /// Caller violated a precondition of the operation.
    Usage,
    /// Environment or primitive failure.
    Internal,
}

impl ErrorKind {
    /// Stable label for structured log fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Corruption => "corruption",
            ErrorKind::Authorization => "authorization",
            ErrorKind::Usage => "usage",
            ErrorKind::Internal => "internal",
        }
    }
}

impl Error {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Integrity | Error::Format(_) | Error::Serialization(_) => ErrorKind::Corruption,
            Error::RecipientNotAuthorized(_) | Error::KeyMismatch => ErrorKind::Authorization,
            Error::EmptyRecipientSet
            | Error::DuplicateRecipient(_)
            | Error::LastRecipient(_)
            | Error::Config(_) => ErrorKind::Usage,
            Error::Crypto(_) | Error::Io(_) => ErrorKind::Internal,
        }
    }

    /// True for failures that indicate corrupted data rather than a denial.
    pub fn is_corruption(&self) -> bool {
        self.kind() == ErrorKind::Corruption
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integrity_and_format_are_corruption() {
        assert_eq!(Error::Integrity.kind(), ErrorKind::Corruption);
        assert!(Error::Format("bad iv".to_string()).is_corruption());
    }

    #[test]
    fn test_denials_are_not_corruption() {
        let err = Error::RecipientNotAuthorized(RecipientId::Int(4));
        assert_eq!(err.kind(), ErrorKind::Authorization);
        assert!(!err.is_corruption());
        assert_eq!(Error::KeyMismatch.kind(), ErrorKind::Authorization);
    }

    #[test]
    fn test_display_names_recipient() {
        let err = Error::LastRecipient(RecipientId::Int(12));
        assert!(err.to_string().contains("12"));
    }
}
