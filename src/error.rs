use thiserror::Error;

/// Fallback message when a failed response carries no usable `message`.
pub const GENERIC_FETCH_FAILURE: &str = "Failed to fetch pull requests";

const AUTH_HINT: &str =
    "Please check if your GitHub token is valid and has the necessary permissions.";
const NOT_FOUND_HINT: &str =
    "Please verify the owner and repository names are correct and you have access to them.";

/// Coarse classification of a failed fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    Auth,
    NotFound,
    Remote,
    Network,
    Parse,
}

/// Failure while retrieving pull requests from the forge.
///
/// The `Display` output is the human-readable message only, typically the
/// `message` field GitHub returned, so callers can show it verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// 401 or 403 from the API.
    #[error("{message}")]
    Auth { status: u16, message: String },

    /// 404 from the API.
    #[error("{message}")]
    NotFound { message: String },

    /// Any other non-success status.
    #[error("{message}")]
    Remote { status: u16, message: String },

    /// The request never produced a complete response.
    #[error("{0}")]
    Network(String),

    /// The response body was not the expected JSON.
    #[error("{0}")]
    Parse(String),
}

impl FetchError {
    /// Maps a non-success HTTP status and its message onto an error kind.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 | 403 => FetchError::Auth { status, message },
            404 => FetchError::NotFound { message },
            _ => FetchError::Remote { status, message },
        }
    }

    pub fn kind(&self) -> FetchErrorKind {
        match self {
            FetchError::Auth { .. } => FetchErrorKind::Auth,
            FetchError::NotFound { .. } => FetchErrorKind::NotFound,
            FetchError::Remote { .. } => FetchErrorKind::Remote,
            FetchError::Network(_) => FetchErrorKind::Network,
            FetchError::Parse(_) => FetchErrorKind::Parse,
        }
    }

    /// HTTP status, when the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Auth { status, .. } | FetchError::Remote { status, .. } => Some(*status),
            FetchError::NotFound { .. } => Some(404),
            FetchError::Network(_) | FetchError::Parse(_) => None,
        }
    }

    /// Static guidance shown alongside the message for well-known failures.
    pub fn hint(&self) -> Option<&'static str> {
        match self.kind() {
            FetchErrorKind::Auth => Some(AUTH_HINT),
            FetchErrorKind::NotFound => Some(NOT_FOUND_HINT),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            FetchError::Parse(err.to_string())
        } else {
            FetchError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::Parse(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepoError {
    #[error("repository owner must not be empty")]
    EmptyOwner,
    #[error("repository name must not be empty")]
    EmptyName,
    #[error("'{0}' must not contain '/'")]
    InvalidSegment(String),
    #[error("expected 'owner/repo', got '{0}'")]
    InvalidFormat(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("GitHub token must not be empty")]
    Empty,
    #[error("GitHub token contains characters that cannot be sent in a header")]
    InvalidCharacters,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ThresholdError {
    #[error("merged-after date must not be empty")]
    Empty,
    #[error("invalid date '{0}', expected YYYY-MM-DD")]
    Invalid(String),
}

/// Reasons a session refuses to start a search.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("a search is already in progress")]
    Busy,
    #[error("missing required field: {0}")]
    Incomplete(&'static str),
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error(transparent)]
    Token(#[from] TokenError),
    #[error(transparent)]
    Threshold(#[from] ThresholdError),
}
