use crate::core::error_mediator::{DEFAULT_VALIDATION_MESSAGE, Fault, MediatorError};
use crate::core::middleware::Next;
use async_trait::async_trait;
use std::any::Any;
use std::future::Future;

/// Type-erased request or response travelling through the mediator layer.
pub type AnyValue = Box<dyn Any + Send + Sync>;

#[async_trait]
pub trait IRequestHandler<Req, Res>: Send + Sync + 'static
where
    Req: Send + 'static,
    Res: Send + 'static,
{
    async fn handle_async(&self, request: Req) -> Result<Res, MediatorError>;
}

#[async_trait]
impl<Req, Res, F, Fut> IRequestHandler<Req, Res> for F
where
    Req: Send + 'static,
    Res: Send + 'static,
    F: Fn(Req) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Res, MediatorError>> + Send + 'static,
{
    async fn handle_async(&self, request: Req) -> Result<Res, MediatorError> {
        (self)(request).await
    }
}

/// A sequential step: receives the current value and returns the next one.
#[async_trait]
pub trait IMiddleware<T>: Send + Sync + 'static
where
    T: Send + 'static,
{
    async fn handle(&self, value: T) -> Result<T, MediatorError>;
}

#[async_trait]
impl<T, F, Fut> IMiddleware<T> for F
where
    T: Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, MediatorError>> + Send + 'static,
{
    async fn handle(&self, value: T) -> Result<T, MediatorError> {
        (self)(value).await
    }
}

/// A continuation-passing step. Calling `next.run(value)` executes the rest
/// of the chain; returning without calling it short-circuits.
#[async_trait]
pub trait IPipeline<T>: Send + Sync + 'static
where
    T: Send + 'static,
{
    async fn handle(&self, value: T, next: Next<T>) -> Result<T, MediatorError>;
}

#[async_trait]
impl<T, F, Fut> IPipeline<T> for F
where
    T: Send + 'static,
    F: Fn(T, Next<T>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, MediatorError>> + Send + 'static,
{
    async fn handle(&self, value: T, next: Next<T>) -> Result<T, MediatorError> {
        (self)(value, next).await
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub message: Option<String>,
}

impl ValidationResult {
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            message: None,
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            message: Some(message.into()),
        }
    }
}

/// Rejecting without a message falls back to the default validation message.
impl From<bool> for ValidationResult {
    fn from(is_valid: bool) -> Self {
        Self {
            is_valid,
            message: None,
        }
    }
}

#[async_trait]
pub trait IValidator<Req>: Send + Sync + 'static
where
    Req: Send + Sync + 'static,
{
    async fn validate(&self, request: &Req) -> ValidationResult;

    /// Turns a rejection into the fault the handler raises. An empty message
    /// counts as absent.
    async fn check(&self, request: &Req) -> Result<(), MediatorError> {
        let result = self.validate(request).await;
        if result.is_valid {
            return Ok(());
        }
        let message = result
            .message
            .filter(|message| !message.is_empty())
            .unwrap_or_else(|| DEFAULT_VALIDATION_MESSAGE.to_string());
        Err(MediatorError::Validation(message))
    }
}

#[async_trait]
impl<Req, F> IValidator<Req> for F
where
    Req: Send + Sync + 'static,
    F: Fn(&Req) -> ValidationResult + Send + Sync + 'static,
{
    async fn validate(&self, request: &Req) -> ValidationResult {
        (self)(request)
    }
}

/// Validator that returns the error to raise, or `None` to accept. The
/// returned error reaches the caller unchanged.
pub struct ErrorValidator<F> {
    inner: F,
}

impl<F> ErrorValidator<F> {
    pub fn new(inner: F) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<Req, F> IValidator<Req> for ErrorValidator<F>
where
    Req: Send + Sync + 'static,
    F: Fn(&Req) -> Option<MediatorError> + Send + Sync + 'static,
{
    async fn validate(&self, request: &Req) -> ValidationResult {
        match (self.inner)(request) {
            Some(err) => ValidationResult::invalid(err.message()),
            None => ValidationResult::valid(),
        }
    }

    async fn check(&self, request: &Req) -> Result<(), MediatorError> {
        match (self.inner)(request) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
pub(crate) trait IErasedHandler: Send + Sync {
    async fn handle(&self, request: AnyValue) -> Result<AnyValue, Fault>;
}
