use std::error::Error;
use thiserror::Error;

pub type BoxError = Box<dyn Error + Send + Sync + 'static>;

pub const DEFAULT_VALIDATION_MESSAGE: &str = "Validation error";

#[derive(Debug, Error)]
pub enum MediatorError {
    #[error("{0}")]
    Validation(String),

    #[error("MediatorError: No handler found for key: {0}")]
    HandlerNotFound(String),

    #[error("MediatorError: Incorrect Request type '{0}' by handler '{1}'")]
    IncorrectRequestType(String, String),

    #[error("MediatorError: Incorrect Response type '{0}' by handler '{1}'")]
    IncorrectResponseType(String, String),

    #[error("MediatorError: Cant build cache key for request '{0}' error '{1}'")]
    CacheKey(String, String),

    #[error("MediatorError: Invalid configuration: '{0}'")]
    InvalidConfiguration(String),

    #[error("{0}")]
    Handler(BoxError),
}

impl MediatorError {
    /// Wraps an arbitrary failure raised by a callback or middleware.
    pub fn handler(err: impl Into<BoxError>) -> Self {
        MediatorError::Handler(err.into())
    }

    /// The message carried by the fault, without the crate prefix for
    /// validation and callback faults.
    pub fn message(&self) -> String {
        match self {
            MediatorError::Validation(message) => message.clone(),
            MediatorError::Handler(err) => err.to_string(),
            other => other.to_string(),
        }
    }

    pub fn source_error(&self) -> Option<&(dyn Error + Send + Sync + 'static)> {
        match self {
            MediatorError::Handler(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

/// Where a fault came from inside a dispatch. Only callback faults go
/// through the global error middleware.
#[derive(Debug)]
pub(crate) enum Fault {
    Rejected(MediatorError),
    Callback(MediatorError),
}

impl Fault {
    pub(crate) fn into_error(self) -> MediatorError {
        match self {
            Fault::Rejected(err) | Fault::Callback(err) => err,
        }
    }
}
