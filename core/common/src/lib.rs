//! Common utilities and types shared across fieldseal crates.
//!
//! This module provides the error taxonomy and the small value types that
//! every layer agrees on, ensuring consistency and type safety.

pub mod error;
pub mod types;

pub use error::{Error, ErrorKind, Result};
pub use types::{RecipientId, SensitiveBytes};
