use attohttpc::StatusCode;
use std::path::PathBuf;

/// Top level error for an export run.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Write(#[from] WriteError),

    /// The upstream returned nothing and the empty policy says that is a failure.
    #[error("no {noun} found")]
    Empty { noun: &'static str },
}

/// A required setting is missing or unusable.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required setting `{0}`")]
    Missing(&'static str),

    #[error("`{key}` is not a valid http(s) url: {value:?}")]
    InvalidUrl { key: &'static str, value: String },

    #[error("`{key}` must be numeric, got {value:?}")]
    NotNumeric { key: &'static str, value: String },

    #[error("timeout must be between 1 and 300 seconds, got {0}")]
    Timeout(u64),
}

/// Retrieving a collection from an upstream failed.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("upstream responded with status {0}")]
    Status(StatusCode),

    #[error("request failed: {0}")]
    Transport(#[from] attohttpc::Error),

    #[error("invalid response body: {0}")]
    Body(#[from] serde_json::Error),

    #[error("malformed response: {0}")]
    Malformed(String),

    /// The upstream answered successfully but reported an error in the body.
    #[error("upstream error: {0}")]
    Api(String),

    #[error("gave up after {0} pages without reaching the end of the collection")]
    PageLimit(usize),

    #[error("invalid header value for `{0}`")]
    InvalidHeader(String),
}

/// Persisting an export file failed. The destination is left untouched.
#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error("directory for '{}' does not exist", .0.display())]
    MissingParent(PathBuf),

    #[error("failed to write '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write csv to '{}': {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("failed to encode json for '{}': {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
