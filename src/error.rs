use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Every failure the data-access layer can surface to a view.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// No token is stored; raised before any request is built.
    #[error("not logged in")]
    Unauthenticated,

    /// The server rejected the credential. The session has been cleared.
    #[error("session expired: {0}")]
    Unauthorized(String),

    #[error("invalid input: {0}")]
    Validation(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("{}", status_message(.status, .message.as_deref(), "server error"))]
    Server { status: u16, message: Option<String> },

    #[error("{}", status_message(.status, .message.as_deref(), "request rejected"))]
    Client { status: u16, message: Option<String> },

    #[error("email {0} not found")]
    NotFound(String),

    #[error("{0}")]
    Auth(String),

    #[error("unexpected response: {0}")]
    Decode(String),

    #[error("session storage: {0}")]
    Storage(String),

    #[error("no more pages to load")]
    NoMorePages,

    #[error("a page load is already in progress")]
    LoadInFlight,

    #[error("the message is already being sent")]
    SubmissionInFlight,

    #[error("the message was already sent")]
    AlreadySent,
}

fn status_message(status: &u16, message: Option<&str>, fallback: &str) -> String {
    match message {
        Some(m) if !m.trim().is_empty() => m.to_string(),
        _ => format!("{fallback} (HTTP {status})"),
    }
}

impl Error {
    /// True when the caller should send the user back to the login step.
    pub fn requires_login(&self) -> bool {
        matches!(self, Error::Unauthenticated | Error::Unauthorized(_))
    }
}

impl From<keyring::Error> for Error {
    fn from(e: keyring::Error) -> Self {
        Error::Storage(e.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Storage(e.to_string())
    }
}
