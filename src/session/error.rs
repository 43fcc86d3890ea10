use std::fmt;

/// Failures surfaced by session operations.
///
/// `Expired` means the session is gone and the user has to sign in again;
/// callers should treat it as a state, not a fault to display loudly.
#[derive(Clone, Debug)]
pub enum SessionError {
    Config(String),
    Validation(String),
    Network(String),
    Timeout(String),
    Server { status: u16, message: String },
    Parse(String),
    Storage(String),
    Expired,
}

impl SessionError {
    /// True for the authorization rejection that triggers the silent
    /// refresh-and-retry path.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Server { status: 401, .. })
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::Config(message) => write!(formatter, "Config error: {message}"),
            SessionError::Validation(message) => write!(formatter, "{message}"),
            SessionError::Network(message) => write!(formatter, "Network error: {message}"),
            SessionError::Timeout(message) => write!(formatter, "Timeout: {message}"),
            SessionError::Server { status, message } => {
                write!(formatter, "Request failed ({status}): {message}")
            }
            SessionError::Parse(message) => write!(formatter, "Response error: {message}"),
            SessionError::Storage(message) => write!(formatter, "Storage error: {message}"),
            SessionError::Expired => write!(formatter, "Session expired, please log in again"),
        }
    }
}

impl std::error::Error for SessionError {}
