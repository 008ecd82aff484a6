use thiserror::Error;

#[derive(Error, Debug)]
pub enum PathingError {
    #[error("Invalid parameters: {0}")]
    InvalidParams(&'static str),

    #[error("No time signature in effect on the first beat")]
    MissingTimeSignature,

    #[error("Not enough star power phrases/sustains to deploy even once")]
    NoDeployments,

    #[error("Search canceled by user")]
    Canceled,

    #[error("Internal logic error: {0}")]
    Logic(String),

    #[error("Worker process failure: {0}")]
    Worker(String),

    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Message Encoding Error: {0}")]
    Codec(#[from] bincode::Error),
}

pub type PfResult<T> = Result<T, PathingError>;
