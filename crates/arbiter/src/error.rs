use std::error::Error as StdError;

/// Crate-wide result type for arbitration operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Why an inbound event could not produce an [`ArbitrationContext`].
///
/// [`ArbitrationContext`]: crate::ArbitrationContext
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContextError {
    /// The raw event is not a JSON object.
    #[error("inbound event is not an object")]
    NotAnObject,

    /// A required field is absent or null.
    #[error("missing field `{field}`")]
    MissingField { field: &'static str },

    /// A field is present but cannot be coerced to an integer.
    #[error("field `{field}` is not an integer: {value}")]
    InvalidField { field: &'static str, value: String },
}

/// Typed arbiter errors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Protocol precondition not met.
    #[error(transparent)]
    Context(#[from] ContextError),

    /// The annotation channel rejected or failed a request.
    #[error("annotation channel failed: {context}: {source}")]
    Channel {
        context: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    /// The annotation channel failed without an underlying source error.
    #[error("annotation channel failed: {message}")]
    Unavailable { message: String },
}

impl Error {
    #[must_use]
    pub fn channel(
        context: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::Channel {
            context: context.into(),
            source: Box::new(source),
        }
    }

    #[must_use]
    pub fn unavailable(message: impl std::fmt::Display) -> Self {
        Self::Unavailable {
            message: message.to_string(),
        }
    }
}
