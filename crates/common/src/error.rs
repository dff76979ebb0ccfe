//! Common error types.

use thiserror::Error;

/// Main error type for the kit creator.
///
/// Nothing here is fatal to the process: every variant describes a single
/// failed operation whose prior state is left untouched.
#[derive(Error, Debug)]
pub enum KitError {
    #[error("Invalid part index: {0}")]
    InvalidPart(usize),

    #[error("Invalid selection: {0}")]
    InvalidSelection(String),

    #[error("Invalid color: {0}")]
    InvalidColor(String),

    #[error("Invalid stack index {index} (stack has {len} entries)")]
    InvalidStackIndex { index: usize, len: usize },

    #[error("Merge stack is empty")]
    EmptyStack,

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Image load failed: {0}")]
    ImageLoad(String),

    #[error("Backend request failed: {0}")]
    Backend(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type KitResult<T> = Result<T, KitError>;

impl KitError {
    pub fn selection(msg: impl Into<String>) -> Self {
        Self::InvalidSelection(msg.into())
    }

    pub fn color(msg: impl Into<String>) -> Self {
        Self::InvalidColor(msg.into())
    }

    pub fn state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    pub fn image_load(msg: impl Into<String>) -> Self {
        Self::ImageLoad(msg.into())
    }

    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether the error was caused by the caller's input rather than I/O.
    pub fn is_rejected_input(&self) -> bool {
        matches!(
            self,
            Self::InvalidPart(_)
                | Self::InvalidSelection(_)
                | Self::InvalidColor(_)
                | Self::InvalidStackIndex { .. }
                | Self::EmptyStack
        )
    }
}
