use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// A required setting (API key, URL list, notification email) is missing.
    #[error("{0}")]
    Configuration(String),

    #[error("{0}")]
    Transport(String),

    #[error("{0}")]
    Parse(String),

    #[error("API Error: {0}")]
    Api(String),

    #[error("{0}")]
    Content(String),

    /// The AI flagged the page as something other than a changelog.
    /// Carries the AI's own message verbatim.
    #[error("{0}")]
    NotAChangelog(String),

    #[error("{0}")]
    Mail(String),

    #[error("store error: {0}")]
    Store(String),
}

pub type Result<T> = std::result::Result<T, Error>;
