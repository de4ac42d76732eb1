use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorkError {
    #[error("work generation cancelled")]
    Cancelled,

    #[error("work pool is stopped")]
    Stopped,
}
