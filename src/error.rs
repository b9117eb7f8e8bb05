use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("initialization error: {0}")]
    Initialization(String),

    #[error("tick parse error: {0}")]
    TickParse(String),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("persistence error: {0}")]
    Persistence(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
