use thiserror::Error;

use dropspot_store::StoreError;

/// Which record a [`EngineError::NotFound`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Drop,
    Claim,
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Entity::Drop => f.write_str("Drop"),
            Entity::Claim => f.write_str("Claim"),
        }
    }
}

/// Which side of the claim window a rejected claim fell on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotOpenReason {
    NotStarted,
    Ended,
}

impl std::fmt::Display for NotOpenReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotOpenReason::NotStarted => f.write_str("Claim window has not started yet"),
            NotOpenReason::Ended => f.write_str("Claim window has ended"),
        }
    }
}

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("{0} not found")]
    NotFound(Entity),

    /// Semantically invalid admin input.
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Drop is sold out")]
    SoldOut,

    #[error("{0}")]
    WindowNotOpen(NotOpenReason),

    /// Joining after the claim window has closed for good.
    #[error("This drop is no longer available")]
    WindowClosed,

    #[error("You must join the waitlist first")]
    WaitlistRequired,

    #[error("Failed to generate a unique claim code after {0} attempts")]
    CodeGenerationExhausted(u32),

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl EngineError {
    /// `true` for failures that are not part of the domain taxonomy and
    /// should be reported to operators rather than to the caller.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            EngineError::CodeGenerationExhausted(_)
                | EngineError::Storage(_)
                | EngineError::Internal(_)
        )
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, EngineError>;
