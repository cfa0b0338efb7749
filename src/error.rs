//! Error types for CA bundle patching

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// The named webhook configuration does not exist in the store
    #[error("webhook configuration \"{0}\" not found")]
    ConfigNotFound(String),

    /// The configuration exists but has no entry with the requested name
    #[error("webhook entry \"{webhook}\" not found in config \"{config}\"")]
    EntryNotFound { webhook: String, config: String },

    /// Kubernetes API error
    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    /// Failure reported by a non-Kubernetes store
    #[error("Store error: {0}")]
    StoreError(String),

    /// Invalid input or configuration
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_not_found_names_the_config() {
        let err = Error::ConfigNotFound("config1".to_string());
        assert!(err.to_string().contains("\"config1\" not found"));
    }

    #[test]
    fn entry_not_found_names_webhook_and_config() {
        let err = Error::EntryNotFound {
            webhook: "webhook1".to_string(),
            config: "config1".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "webhook entry \"webhook1\" not found in config \"config1\""
        );
    }
}
