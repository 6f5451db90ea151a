use thiserror::Error;

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("preference storage failed for key `{key}`: {source}")]
    Storage {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("preference storage is unavailable: {0}")]
    StorageUnavailable(String),

    #[error("malformed telemetry document: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("a global telemetry context is already installed")]
    AlreadyInstalled,

    #[error("invalid telemetry configuration: {0}")]
    Config(String),
}
