use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SharedError {
    #[error("Invalid claim code format: {0}")]
    InvalidClaimCode(String),

    #[error("Invalid user id: {0}")]
    InvalidUserId(String),
}
