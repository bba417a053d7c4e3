use thiserror::Error;

#[derive(Error, Debug)]
pub enum BrdError {
    #[error("unknown section: ${0}")]
    UnknownSection(String),

    #[error("structural violation: {0}")]
    Structural(String),

    #[error("malformed record: {0}")]
    MalformedRecord(String),

    #[error("no propagation delay defined for layer {0}")]
    UnknownLayerDelay(u32),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
