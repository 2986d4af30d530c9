use reqwest::StatusCode;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("network error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server replied {status}: {}", .message.as_deref().unwrap_or("no details"))]
    Status {
        status: StatusCode,
        message: Option<String>,
    },

    /// No access token is stored; nothing was sent.
    #[error("not signed in")]
    NotAuthenticated,

    /// The server refused the credentials and they could not be refreshed.
    /// Stored credentials have already been cleared.
    #[error("session expired, sign in again")]
    SessionExpired,

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
}

impl Error {
    /// Text suitable for an alert or inline notice.
    pub fn user_message(&self) -> String {
        match self {
            Error::Status {
                message: Some(m), ..
            } => m.clone(),
            Error::Validation(v) => v.to_string(),
            Error::NotAuthenticated | Error::SessionExpired => {
                "Sign in to use this feature".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(e: toml::ser::Error) -> Self {
        Error::Config(e.to_string())
    }
}

/// Client-side checks that run before any request is issued.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("A message needs text or an image")]
    EmptyMessage,
    #[error("Choose a contact first")]
    NoRecipient,
    #[error("Please choose an image (PNG, JPG, JPEG), got {mime}")]
    NotAnImage { mime: String },
    #[error("Images must not exceed {} MB", .limit / (1024 * 1024))]
    ImageTooLarge { size: u64, limit: u64 },
}
