use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed queue document: {0}")]
    Format(#[from] serde_json::Error),

    #[error("queue is empty")]
    EmptyQueue,

    #[error("indexes out of range: from={from} to={to} (queue length {len})")]
    IndexOutOfRange {
        from: usize,
        to: usize,
        len: usize,
    },

    #[error("attachment ingestion failed: {0}")]
    Attachment(String),

    #[error("clipboard has no usable content")]
    ClipboardEmpty,
}

pub type Result<T> = std::result::Result<T, Error>;
