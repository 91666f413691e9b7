use thiserror::Error;

use parley_shared::types::ChatroomId;
use parley_shared::SharedError;
use parley_store::StoreError;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Chatroom not found: {0}")]
    ChatroomNotFound(ChatroomId),

    #[error("Message needs text or an image")]
    EmptyMessage,

    #[error("Not signed in")]
    NotAuthenticated,

    #[error("No OTP has been requested")]
    OtpNotRequested,

    #[error("Invalid OTP")]
    InvalidOtp,

    #[error("{0}")]
    Validation(String),

    #[error("Lock poisoned: {0}")]
    LockPoisoned(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error(transparent)]
    Shared(#[from] SharedError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, ClientError>;
