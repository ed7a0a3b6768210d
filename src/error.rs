use thiserror::Error;

/// Custom error type for the envdash core
#[derive(Error, Debug)]
pub enum DashError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Fetch error: {0}")]
    Fetch(String),

    #[error("{0}")]
    Other(String),
}

/// Why a single reading was rejected at the transport boundary.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("reading is not a JSON object")]
    NotAnObject,

    #[error("missing field `{0}`")]
    MissingField(&'static str),

    #[error("field `{0}` is not a number")]
    NotANumber(&'static str),

    #[error("field `{0}` is not finite")]
    NonFinite(&'static str),

    #[error("field `{0}` is falsy")]
    Falsy(&'static str),

    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),
}

/// Result type alias for envdash
pub type Result<T> = std::result::Result<T, DashError>;

impl DashError {
    /// Create a config error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        DashError::Config(msg.into())
    }

    /// Create a transport error
    pub fn transport<S: Into<String>>(msg: S) -> Self {
        DashError::Transport(msg.into())
    }

    /// Create a decode error
    pub fn decode<S: Into<String>>(msg: S) -> Self {
        DashError::Decode(msg.into())
    }

    /// Create a fetch error
    pub fn fetch<S: Into<String>>(msg: S) -> Self {
        DashError::Fetch(msg.into())
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        DashError::Other(msg.into())
    }

    pub fn is_fetch(&self) -> bool {
        matches!(self, DashError::Fetch(_))
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, DashError::Transport(_))
    }
}
