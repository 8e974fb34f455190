use thiserror::Error;

/// Configuration could not be loaded. At startup this is fatal; at watchlist
/// reload time the previous snapshot stays in effect.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {message}")]
    Parse { path: String, message: String },

    #[error("{0} environment variable is required")]
    Missing(&'static str),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
