use thiserror::Error;

/// Errors raised while discovering, merging, or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A config file could not be read.
    #[error("failed to read {path}: {source}")]
    ReadError {
        /// The file that could not be read.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// A config file's TOML failed to parse.
    #[error("failed to parse {path}: {source}")]
    ParseError {
        /// The file (or `<embedded defaults>`/`<merged config>`) that failed.
        path: String,
        /// Underlying TOML error.
        #[source]
        source: toml::de::Error,
    },
    /// A merged value failed a post-load sanity check.
    #[error("invalid configuration at {field}: {message}")]
    ValidationError {
        /// Dotted field path.
        field: String,
        /// What's wrong with it.
        message: String,
    },
    /// The user's home directory could not be determined.
    #[error("could not determine the home directory")]
    NoHomeDir,
}

/// Convenience alias.
pub type ConfigResult<T> = Result<T, ConfigError>;
