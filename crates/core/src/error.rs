use std::fmt;

/// Classified failure of a publish attempt.
///
/// Every pipeline stage returns one of these; the HTTP layer maps each
/// variant onto a fixed status code and a message safe to show untrusted
/// clients. Raw provider payloads stay in the logs.
#[derive(Debug)]
pub enum Error {
    /// Layout document could not be parsed or repaired. User-correctable.
    Layout(String),
    /// Workspace skeleton could not be written.
    Scaffold(String),
    /// The build toolchain failed; carries captured stderr.
    Build(String),
    /// The hosting provider rejected a request or flagged the deployment.
    Deployment(String),
    /// The deployment never reached a terminal state within budget.
    Timeout(String),
    /// The caller's deadline expired or the attempt was cancelled.
    Cancelled(String),
    /// Alias/domain binding failed. Never fatal to a publish.
    Alias(String),
    /// A publish is already in progress for this store.
    Busy(String),
    /// Provider credentials or settings are missing or malformed.
    Config(String),
    /// A referenced store does not exist.
    NotFound(String),
    IoError(std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Layout(msg) => write!(f, "Layout error: {}", msg),
            Error::Scaffold(msg) => write!(f, "Scaffold error: {}", msg),
            Error::Build(msg) => write!(f, "Build failed: {}", msg),
            Error::Deployment(msg) => write!(f, "Deployment error: {}", msg),
            Error::Timeout(msg) => write!(f, "Timed out: {}", msg),
            Error::Cancelled(msg) => write!(f, "Cancelled: {}", msg),
            Error::Alias(msg) => write!(f, "Alias error: {}", msg),
            Error::Busy(msg) => write!(f, "Busy: {}", msg),
            Error::Config(msg) => write!(f, "Configuration error: {}", msg),
            Error::NotFound(msg) => write!(f, "Not found: {}", msg),
            Error::IoError(err) => write!(f, "IO error: {}", err),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IoError(err)
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}

impl Error {
    /// True for errors the user can fix by correcting their input.
    pub fn is_user_error(&self) -> bool {
        matches!(self, Error::Layout(_))
    }

    /// True for errors worth retrying without any change on the caller's side.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Timeout(_) | Error::Busy(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
