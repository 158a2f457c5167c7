//! Error types for Idstore

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    // Configuration Errors
    #[error("No URL was provided to the identity store")]
    MissingUrl,

    #[error("An empty password is invalid")]
    EmptyPassword,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to read config: {0}")]
    ConfigRead(String),

    #[error("Failed to parse config: {0}")]
    ConfigParse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            Error::MissingUrl.to_string(),
            "No URL was provided to the identity store"
        );
        assert_eq!(
            Error::InvalidConfig("use_for is empty".into()).to_string(),
            "Invalid configuration: use_for is empty"
        );
    }
}
