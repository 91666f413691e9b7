use thiserror::Error;

#[derive(Error, Debug)]
pub enum SharedError {
    #[error("Invalid identifier: {0}")]
    InvalidId(#[from] uuid::Error),
}
