use crate::core::cache::ResultCache;
use crate::core::clock::{IClock, SystemClock};
use crate::core::configuration::MediatorConfiguration;
use crate::core::contracts::{
    AnyValue, ErrorValidator, IErasedHandler, IMiddleware, IPipeline, IRequestHandler,
    IValidator, ValidationResult,
};
use crate::core::error_mediator::{Fault, MediatorError};
use crate::core::middleware::{Next, run_chain, run_pipeline};
use crate::core::normalizer::cache_key;
use async_trait::async_trait;
use serde::Serialize;
use std::any::type_name;
use std::future::Future;
use std::sync::Arc;

/// Options accepted at registration time.
pub struct HandlerOptions<Req>
where
    Req: Send + Sync + 'static,
{
    pub validate: Option<Arc<dyn IValidator<Req>>>,
}

impl<Req> Default for HandlerOptions<Req>
where
    Req: Send + Sync + 'static,
{
    fn default() -> Self {
        Self { validate: None }
    }
}

impl<Req> HandlerOptions<Req>
where
    Req: Send + Sync + 'static,
{
    pub fn with_validator<F>(mut self, validator: F) -> Self
    where
        F: Fn(&Req) -> ValidationResult + Send + Sync + 'static,
    {
        self.validate = Some(Arc::new(validator));
        self
    }

    /// Validator returning the error to raise. `Some(err)` reaches the caller
    /// as is and bypasses error middleware.
    pub fn with_error_validator<F>(mut self, validator: F) -> Self
    where
        F: Fn(&Req) -> Option<MediatorError> + Send + Sync + 'static,
    {
        self.validate = Some(Arc::new(ErrorValidator::new(validator)));
        self
    }
}

/// Mutable configuration of a handler. Consumed by [`HandlerBuilder::build`],
/// after which only the cache changes.
pub struct HandlerBuilder<Req, Res>
where
    Req: Serialize + Send + Sync + 'static,
    Res: Clone + Send + Sync + 'static,
{
    callback: Arc<dyn IRequestHandler<Req, Res>>,
    validator: Option<Arc<dyn IValidator<Req>>>,
    pre_middlewares: Vec<Arc<dyn IMiddleware<Req>>>,
    middlewares: Vec<Arc<dyn IPipeline<Req>>>,
    post_middlewares: Vec<Arc<dyn IMiddleware<Res>>>,
    error_middlewares: Vec<Arc<dyn IMiddleware<MediatorError>>>,
    caching: bool,
    configuration: MediatorConfiguration,
    clock: Arc<dyn IClock>,
}

impl<Req, Res> HandlerBuilder<Req, Res>
where
    Req: Serialize + Send + Sync + 'static,
    Res: Clone + Send + Sync + 'static,
{
    pub fn from_handler(callback: Arc<dyn IRequestHandler<Req, Res>>) -> Self {
        Self {
            callback,
            validator: None,
            pre_middlewares: Vec::new(),
            middlewares: Vec::new(),
            post_middlewares: Vec::new(),
            error_middlewares: Vec::new(),
            caching: false,
            configuration: MediatorConfiguration::default(),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_configuration(mut self, configuration: MediatorConfiguration) -> Self {
        self.configuration = configuration;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn IClock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_options(mut self, options: HandlerOptions<Req>) -> Self {
        if let Some(validator) = options.validate {
            self.validator = Some(validator);
        }
        self
    }

    pub fn enable_caching(mut self) -> Self {
        self.caching = true;
        self
    }

    /// Replaces any previously set validator.
    pub fn add_validator<F>(self, validator: F) -> Self
    where
        F: Fn(&Req) -> ValidationResult + Send + Sync + 'static,
    {
        self.add_validator_handler(Arc::new(validator))
    }

    pub fn add_validator_handler(mut self, validator: Arc<dyn IValidator<Req>>) -> Self {
        self.validator = Some(validator);
        self
    }

    pub fn add_pre_middleware<F, Fut>(mut self, middleware: F) -> Self
    where
        F: Fn(Req) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Req, MediatorError>> + Send + 'static,
    {
        self.pre_middlewares.push(Arc::new(middleware));
        self
    }

    pub fn add_post_middleware<F, Fut>(mut self, middleware: F) -> Self
    where
        F: Fn(Res) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Res, MediatorError>> + Send + 'static,
    {
        self.post_middlewares.push(Arc::new(middleware));
        self
    }

    pub fn add_error_middleware<F, Fut>(mut self, middleware: F) -> Self
    where
        F: Fn(MediatorError) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<MediatorError, MediatorError>> + Send + 'static,
    {
        self.error_middlewares.push(Arc::new(middleware));
        self
    }

    /// Legacy single-list form: continuation-passing steps that run after the
    /// pre-middleware and before validation.
    pub fn add_middleware<F, Fut>(mut self, middleware: F) -> Self
    where
        F: Fn(Req, Next<Req>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Req, MediatorError>> + Send + 'static,
    {
        self.middlewares.push(Arc::new(middleware));
        self
    }

    /// Moves the configuration out, leaving an empty builder that shares the
    /// same callback.
    pub(crate) fn take(&mut self) -> Self {
        Self {
            callback: Arc::clone(&self.callback),
            validator: self.validator.take(),
            pre_middlewares: std::mem::take(&mut self.pre_middlewares),
            middlewares: std::mem::take(&mut self.middlewares),
            post_middlewares: std::mem::take(&mut self.post_middlewares),
            error_middlewares: std::mem::take(&mut self.error_middlewares),
            caching: self.caching,
            configuration: self.configuration.clone(),
            clock: Arc::clone(&self.clock),
        }
    }

    pub fn build(self) -> Handler<Req, Res> {
        let cache = self
            .caching
            .then(|| ResultCache::new(self.configuration.cache_ttl(), self.clock.clone()));

        Handler {
            callback: self.callback,
            validator: self.validator,
            pre_middlewares: self.pre_middlewares,
            middlewares: Arc::from(self.middlewares),
            post_middlewares: self.post_middlewares,
            error_middlewares: self.error_middlewares,
            cache,
        }
    }
}

pub struct Handler<Req, Res>
where
    Req: Serialize + Send + Sync + 'static,
    Res: Clone + Send + Sync + 'static,
{
    callback: Arc<dyn IRequestHandler<Req, Res>>,
    validator: Option<Arc<dyn IValidator<Req>>>,
    pre_middlewares: Vec<Arc<dyn IMiddleware<Req>>>,
    middlewares: Arc<[Arc<dyn IPipeline<Req>>]>,
    post_middlewares: Vec<Arc<dyn IMiddleware<Res>>>,
    error_middlewares: Vec<Arc<dyn IMiddleware<MediatorError>>>,
    cache: Option<ResultCache<Res>>,
}

impl<Req, Res> Handler<Req, Res>
where
    Req: Serialize + Send + Sync + 'static,
    Res: Clone + Send + Sync + 'static,
{
    pub fn builder<F, Fut>(callback: F) -> HandlerBuilder<Req, Res>
    where
        F: Fn(Req) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Res, MediatorError>> + Send + 'static,
    {
        HandlerBuilder::from_handler(Arc::new(callback))
    }

    pub fn is_caching_enabled(&self) -> bool {
        self.cache.is_some()
    }

    pub fn cache(&self) -> Option<&ResultCache<Res>> {
        self.cache.as_ref()
    }

    /// Runs the request through the handler pipeline. Validation and callback
    /// faults are returned as `Err` to the caller directly; unlike
    /// `Mediator::send`, no global error middleware is involved.
    pub async fn execute(&self, request: Req) -> Result<Res, MediatorError> {
        self.run(request).await.map_err(Fault::into_error)
    }

    pub(crate) async fn run(&self, request: Req) -> Result<Res, Fault> {
        let request = run_chain(&self.pre_middlewares, request)
            .await
            .map_err(Fault::Rejected)?;
        let request = run_pipeline(Arc::clone(&self.middlewares), request)
            .await
            .map_err(Fault::Rejected)?;

        if let Some(validator) = &self.validator {
            validator.check(&request).await.map_err(Fault::Rejected)?;
        }

        let response = match &self.cache {
            Some(cache) => {
                let key = cache_key(&request).map_err(Fault::Rejected)?;
                match cache.lookup(&key) {
                    Some(cached) => {
                        #[cfg(feature = "logging")]
                        log::debug!("Mediator. Cache hit for '{}'", type_name::<Req>());
                        cached
                    }
                    None => {
                        let response = self.invoke(request).await?;
                        cache.store(key, response.clone());
                        response
                    }
                }
            }
            None => self.invoke(request).await?,
        };

        run_chain(&self.post_middlewares, response)
            .await
            .map_err(Fault::Rejected)
    }

    async fn invoke(&self, request: Req) -> Result<Res, Fault> {
        match self.callback.handle_async(request).await {
            Ok(response) => Ok(response),
            Err(err) => {
                #[cfg(feature = "logging")]
                log::debug!(
                    "Mediator. Handler for '{}' failed: {}",
                    type_name::<Req>(),
                    err
                );
                let err = run_chain(&self.error_middlewares, err)
                    .await
                    .unwrap_or_else(|middleware_err| middleware_err);
                Err(Fault::Callback(err))
            }
        }
    }
}

#[async_trait]
impl<Req, Res> IErasedHandler for Handler<Req, Res>
where
    Req: Serialize + Send + Sync + 'static,
    Res: Clone + Send + Sync + 'static,
{
    async fn handle(&self, request: AnyValue) -> Result<AnyValue, Fault> {
        let request = request.downcast::<Req>().map_err(|_| {
            Fault::Rejected(MediatorError::IncorrectRequestType(
                type_name::<Req>().to_string(),
                type_name::<Self>().to_string(),
            ))
        })?;
        let response = self.run(*request).await?;
        Ok(Box::new(response))
    }
}
