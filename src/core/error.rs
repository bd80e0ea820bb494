use std::path::PathBuf;
use thiserror::Error;

/// Coarse classification shared by every component error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InputValidation,
    Network,
    Io,
    Deserialization,
    Configuration,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InputValidation => write!(f, "input validation"),
            Self::Network => write!(f, "network"),
            Self::Io => write!(f, "io"),
            Self::Deserialization => write!(f, "deserialization"),
            Self::Configuration => write!(f, "configuration"),
        }
    }
}

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("invalid url {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("invalid header {name:?}: {reason}")]
    InvalidHeader { name: String, reason: String },

    #[error("request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned {status}: {body}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("failed to decode response from {url}: {source}. Body: {body}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
        body: String,
    },
}

impl HttpError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidUrl { .. } | Self::InvalidHeader { .. } => ErrorKind::InputValidation,
            Self::Client(_) => ErrorKind::Configuration,
            Self::Network { .. } | Self::Status { .. } => ErrorKind::Network,
            Self::Decode { .. } => ErrorKind::Deserialization,
        }
    }
}

#[derive(Debug, Error)]
pub enum TokenStoreError {
    #[error("failed to read refresh token from {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("refresh token file {} is empty", path.display())]
    Empty { path: PathBuf },

    #[error("failed to remove old refresh token {}: {source}", path.display())]
    Remove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write refresh token to {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl TokenStoreError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Io
    }
}

#[derive(Debug, Error)]
pub enum RefreshError {
    #[error(transparent)]
    Store(#[from] TokenStoreError),

    #[error(transparent)]
    Http(#[from] HttpError),

    #[error("token endpoint returned an empty access_token")]
    MissingAccessToken,
}

impl RefreshError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Store(e) => e.kind(),
            Self::Http(e) => e.kind(),
            Self::MissingAccessToken => ErrorKind::Deserialization,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("could not determine config directory")]
    NoConfigDir,

    #[error("{0}")]
    Invalid(String),
}

impl ConfigError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Configuration
    }
}

/// Shortens a response body so it can be carried inside an error message.
pub(crate) fn preview(body: &str) -> String {
    const LIMIT: usize = 200;
    body.char_indices()
        .nth(LIMIT)
        .map(|(idx, _)| format!("{}...<truncated>", &body[..idx]))
        .unwrap_or_else(|| body.to_string())
}
