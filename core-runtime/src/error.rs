use thiserror::Error;

/// Errors raised while configuring or bootstrapping the runtime.
#[derive(Error, Debug)]
pub enum Error {
    /// A configuration value is missing or out of range.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The stream URL is not an absolute http(s) URL.
    #[error("Invalid stream URL: {0}")]
    InvalidStreamUrl(String),

    /// A host bridge required by the configuration was not provided.
    #[error("Capability missing: {capability} - {message}")]
    CapabilityMissing { capability: String, message: String },
}

pub type Result<T> = std::result::Result<T, Error>;
