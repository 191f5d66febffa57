//! Resource-layer errors
//!
//! The mapping engine itself reports out-of-range requests with `None`;
//! these are failures of the surrounding NIF plumbing.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValueError {
    #[error("mutex_poisoned")]
    MutexPoisoned,

    #[error("invalid_utf8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    #[error("unknown_kind")]
    UnknownKind,

    #[error("invalid_dtd: {0}")]
    InvalidDtd(String),

    #[error("not_char_boundary")]
    NotCharBoundary,
}
