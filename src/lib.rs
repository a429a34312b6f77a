//! Keyed request dispatch: callers send a request under a string key and the
//! mediator routes it through global middleware, the handler's own
//! pre-middleware, validation, an optional result cache, the callback and
//! post-middleware.

pub mod core;
pub mod routes;

pub use crate::core::clock::{IClock, ManualClock, SystemClock};
pub use crate::core::configuration::{
    DEFAULT_CACHE_TTL_MILLIS, MediatorConfiguration, MediatorConfigurationDto,
};
pub use crate::core::contracts::{
    AnyValue, ErrorValidator, IMiddleware, IPipeline, IRequestHandler, IValidator, ValidationResult,
};
pub use crate::core::error_mediator::{BoxError, MediatorError};
pub use crate::core::handler::{Handler, HandlerBuilder, HandlerOptions};
pub use crate::core::mediator::{HandlerRegistration, Mediator, MiddlewareStage};
pub use crate::core::middleware::{Next, TypedMiddleware};
pub use crate::core::normalizer::{cache_key, normalize};
pub use crate::routes::Route;

#[doc(hidden)]
pub mod __private {
    pub use futures::future::BoxFuture;
}
