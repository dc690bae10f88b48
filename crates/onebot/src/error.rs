use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),

    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),

    /// The implementation answered with a failed envelope.
    #[error("onebot action {action} failed (retcode {retcode}): {message}")]
    Action {
        action: String,
        retcode: i64,
        message: String,
    },

    #[error("invalid onebot config: {message}")]
    Config { message: String },
}

impl Error {
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
