use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("invalid zip code {0:?}")]
    InvalidZip(String),

    #[error("unknown density label {0:?}")]
    UnknownDensityLabel(String),

    #[error("zip {0} reached the join with no density value (blank label in source row)")]
    BlankDensity(String),

    #[error("reference zip universe is empty")]
    EmptyReferenceUniverse,

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("geocode task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing required column: {0}")]
    MissingColumn(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
