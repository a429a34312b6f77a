use crate::core::clock::{IClock, SystemClock};
use crate::core::configuration::MediatorConfiguration;
use crate::core::contracts::{
    AnyValue, IErasedHandler, IMiddleware, IRequestHandler, IValidator, ValidationResult,
};
use crate::core::error_mediator::{Fault, MediatorError};
use crate::core::handler::{Handler, HandlerBuilder, HandlerOptions};
use crate::core::middleware::{Next, TypedMiddleware, run_chain};
use crate::routes::Route;
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::Serialize;
use std::any::type_name;
use std::future::Future;
use std::sync::Arc;

/// Where a global middleware runs relative to the handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MiddlewareStage {
    Before,
    After,
}

/// Routes keyed requests to registered handlers.
///
/// Two error contracts coexist on purpose: [`Handler::execute`] hands its
/// faults straight back to the caller, while [`Mediator::send`] captures
/// every fault (including a missing handler) and returns it as a value,
/// after running callback faults through the global error middleware.
pub struct Mediator {
    handlers: DashMap<String, Arc<dyn IErasedHandler>>,
    before_middlewares: RwLock<Vec<Arc<dyn IMiddleware<AnyValue>>>>,
    after_middlewares: RwLock<Vec<Arc<dyn IMiddleware<AnyValue>>>>,
    error_middlewares: RwLock<Vec<Arc<dyn IMiddleware<MediatorError>>>>,
    configuration: MediatorConfiguration,
    clock: Arc<dyn IClock>,
}

impl Default for Mediator {
    fn default() -> Self {
        Self::new()
    }
}

impl Mediator {
    pub fn new() -> Self {
        Self::with_configuration(MediatorConfiguration::default())
    }

    pub fn with_configuration(configuration: MediatorConfiguration) -> Self {
        Self {
            handlers: DashMap::new(),
            before_middlewares: RwLock::new(Vec::new()),
            after_middlewares: RwLock::new(Vec::new()),
            error_middlewares: RwLock::new(Vec::new()),
            configuration,
            clock: Arc::new(SystemClock),
        }
    }

    /// Time source handed to the caches of handlers registered afterwards.
    pub fn with_clock(mut self, clock: Arc<dyn IClock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn configuration(&self) -> &MediatorConfiguration {
        &self.configuration
    }

    pub fn register<Req, Res, F, Fut>(
        &self,
        key: impl Into<String>,
        callback: F,
    ) -> HandlerRegistration<'_, Req, Res>
    where
        Req: Serialize + Send + Sync + 'static,
        Res: Clone + Send + Sync + 'static,
        F: Fn(Req) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Res, MediatorError>> + Send + 'static,
    {
        self.register_handler(key, callback)
    }

    pub fn register_with_options<Req, Res, F, Fut>(
        &self,
        key: impl Into<String>,
        callback: F,
        options: HandlerOptions<Req>,
    ) -> HandlerRegistration<'_, Req, Res>
    where
        Req: Serialize + Send + Sync + 'static,
        Res: Clone + Send + Sync + 'static,
        F: Fn(Req) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Res, MediatorError>> + Send + 'static,
    {
        let registration = self.register_handler(key, callback);
        registration.configure(|builder| builder.with_options(options))
    }

    pub fn register_handler<Req, Res>(
        &self,
        key: impl Into<String>,
        handler: impl IRequestHandler<Req, Res>,
    ) -> HandlerRegistration<'_, Req, Res>
    where
        Req: Serialize + Send + Sync + 'static,
        Res: Clone + Send + Sync + 'static,
    {
        let builder = HandlerBuilder::from_handler(Arc::new(handler))
            .with_configuration(self.configuration.clone())
            .with_clock(Arc::clone(&self.clock));

        HandlerRegistration {
            mediator: self,
            key: key.into(),
            builder,
            committed: false,
        }
    }

    /// Removes the handler. Returns whether one was registered.
    pub fn unregister(&self, key: &str) -> bool {
        let removed = self.handlers.remove(key).is_some();

        #[cfg(feature = "logging")]
        if removed {
            log::debug!("Mediator. Unregistered handler '{}'", key);
        }

        removed
    }

    pub fn is_registered(&self, key: &str) -> bool {
        self.handlers.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Global middleware over the erased request of every dispatch, applied
    /// before the handler's own pre-middleware.
    pub fn use_global_middleware<F, Fut>(&self, middleware: F)
    where
        F: Fn(AnyValue) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<AnyValue, MediatorError>> + Send + 'static,
    {
        self.use_middleware(MiddlewareStage::Before, Arc::new(middleware));
    }

    /// Global middleware that only sees requests of type `T`.
    pub fn use_global_middleware_for<T, F, Fut>(&self, middleware: F)
    where
        T: Send + Sync + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, MediatorError>> + Send + 'static,
    {
        self.use_middleware(
            MiddlewareStage::Before,
            Arc::new(TypedMiddleware::new(middleware)),
        );
    }

    pub fn use_middleware(&self, stage: MiddlewareStage, middleware: Arc<dyn IMiddleware<AnyValue>>) {
        match stage {
            MiddlewareStage::Before => self.before_middlewares.write().push(middleware),
            MiddlewareStage::After => self.after_middlewares.write().push(middleware),
        }
    }

    pub fn use_global_error_middleware<F, Fut>(&self, middleware: F)
    where
        F: Fn(MediatorError) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<MediatorError, MediatorError>> + Send + 'static,
    {
        self.error_middlewares.write().push(Arc::new(middleware));
    }

    pub fn use_error_middleware<F, Fut>(&self, middleware: F)
    where
        F: Fn(MediatorError) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<MediatorError, MediatorError>> + Send + 'static,
    {
        self.use_global_error_middleware(middleware);
    }

    /// A callable bound to `key`. The key is only resolved when called.
    pub fn route<Req, Res>(&self, key: impl Into<String>) -> Route<'_, Req, Res>
    where
        Req: Send + Sync + 'static,
        Res: Send + Sync + 'static,
    {
        Route::new(self, key.into())
    }

    /// Dispatches `request` to the handler registered under `key`. Never
    /// panics on a bad key or type: every fault comes back as `Err`.
    pub async fn send<Req, Res>(&self, key: &str, request: Req) -> Result<Res, MediatorError>
    where
        Req: Send + Sync + 'static,
        Res: Send + Sync + 'static,
    {
        let response = self.dispatch(key, Box::new(request)).await?;
        response.downcast::<Res>().map(|typed| *typed).map_err(|_| {
            MediatorError::IncorrectResponseType(type_name::<Res>().to_string(), key.to_string())
        })
    }

    pub async fn dispatch(&self, key: &str, request: AnyValue) -> Result<AnyValue, MediatorError> {
        let Some(handler) = self.handler(key) else {
            #[cfg(feature = "logging")]
            log::warn!("Mediator. No handler found for key '{}'", key);
            return Err(MediatorError::HandlerNotFound(key.to_string()));
        };

        match self.run_pipeline(handler, request).await {
            Ok(response) => Ok(response),
            Err(Fault::Rejected(err)) => Err(err),
            Err(Fault::Callback(err)) => {
                let chain = self.error_middlewares.read().clone();
                Err(run_chain(&chain, err)
                    .await
                    .unwrap_or_else(|middleware_err| middleware_err))
            }
        }
    }

    fn handler(&self, key: &str) -> Option<Arc<dyn IErasedHandler>> {
        self.handlers.get(key).map(|entry| Arc::clone(entry.value()))
    }

    async fn run_pipeline(
        &self,
        handler: Arc<dyn IErasedHandler>,
        request: AnyValue,
    ) -> Result<AnyValue, Fault> {
        let before = self.before_middlewares.read().clone();
        let request = run_chain(&before, request).await.map_err(Fault::Rejected)?;

        let response = handler.handle(request).await?;

        let after = self.after_middlewares.read().clone();
        run_chain(&after, response).await.map_err(Fault::Rejected)
    }

    fn insert(&self, key: String, handler: Arc<dyn IErasedHandler>) {
        let _replaced = self.handlers.insert(key.clone(), handler);

        #[cfg(feature = "logging")]
        if _replaced.is_some() {
            log::debug!("Mediator. Replaced handler '{}'", key);
        } else {
            log::debug!("Mediator. Registered handler '{}'", key);
        }
    }
}

/// Fluent configuration returned by [`Mediator::register`].
///
/// The handler lands in the registry when [`finish`](Self::finish) is called
/// or, failing that, when the registration is dropped. Once committed its
/// configuration can no longer change.
pub struct HandlerRegistration<'a, Req, Res>
where
    Req: Serialize + Send + Sync + 'static,
    Res: Clone + Send + Sync + 'static,
{
    mediator: &'a Mediator,
    key: String,
    builder: HandlerBuilder<Req, Res>,
    committed: bool,
}

impl<'a, Req, Res> HandlerRegistration<'a, Req, Res>
where
    Req: Serialize + Send + Sync + 'static,
    Res: Clone + Send + Sync + 'static,
{
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn enable_caching(self) -> Self {
        self.configure(HandlerBuilder::enable_caching)
    }

    pub fn add_validator<F>(self, validator: F) -> Self
    where
        F: Fn(&Req) -> ValidationResult + Send + Sync + 'static,
    {
        self.configure(|builder| builder.add_validator(validator))
    }

    pub fn add_validator_handler(self, validator: Arc<dyn IValidator<Req>>) -> Self {
        self.configure(|builder| builder.add_validator_handler(validator))
    }

    pub fn add_pre_middleware<F, Fut>(self, middleware: F) -> Self
    where
        F: Fn(Req) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Req, MediatorError>> + Send + 'static,
    {
        self.configure(|builder| builder.add_pre_middleware(middleware))
    }

    pub fn add_post_middleware<F, Fut>(self, middleware: F) -> Self
    where
        F: Fn(Res) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Res, MediatorError>> + Send + 'static,
    {
        self.configure(|builder| builder.add_post_middleware(middleware))
    }

    pub fn add_error_middleware<F, Fut>(self, middleware: F) -> Self
    where
        F: Fn(MediatorError) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<MediatorError, MediatorError>> + Send + 'static,
    {
        self.configure(|builder| builder.add_error_middleware(middleware))
    }

    pub fn add_middleware<F, Fut>(self, middleware: F) -> Self
    where
        F: Fn(Req, Next<Req>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Req, MediatorError>> + Send + 'static,
    {
        self.configure(|builder| builder.add_middleware(middleware))
    }

    /// Commits the handler and returns it for direct [`Handler::execute`] calls.
    pub fn finish(mut self) -> Arc<Handler<Req, Res>> {
        self.commit()
    }

    fn configure(
        mut self,
        apply: impl FnOnce(HandlerBuilder<Req, Res>) -> HandlerBuilder<Req, Res>,
    ) -> Self {
        self.builder = apply(self.builder.take());
        self
    }

    fn commit(&mut self) -> Arc<Handler<Req, Res>> {
        self.committed = true;
        let handler = Arc::new(self.builder.take().build());
        self.mediator
            .insert(self.key.clone(), Arc::clone(&handler) as Arc<dyn IErasedHandler>);
        handler
    }
}

impl<'a, Req, Res> Drop for HandlerRegistration<'a, Req, Res>
where
    Req: Serialize + Send + Sync + 'static,
    Res: Clone + Send + Sync + 'static,
{
    fn drop(&mut self) {
        if !self.committed {
            self.commit();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::ManualClock;
    use futures::future::join_all;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone, Serialize)]
    struct AddNumbers {
        a: i64,
        b: i64,
    }

    #[derive(Debug, Clone, Serialize)]
    struct User {
        username: String,
        password: String,
    }

    async fn add(request: AddNumbers) -> Result<i64, MediatorError> {
        Ok(request.a + request.b)
    }

    async fn failing(_: String) -> Result<String, MediatorError> {
        Err(MediatorError::handler("Handler error"))
    }

    #[tokio::test]
    async fn test_register_and_send() {
        let mediator = Mediator::new();
        mediator.register("testRequest", |_: String| async move {
            Ok::<_, MediatorError>("testResponse".to_string())
        });

        let result: String = mediator.send("testRequest", String::new()).await.unwrap();
        assert_eq!(result, "testResponse");
    }

    #[tokio::test]
    async fn test_send_with_object_request() {
        let mediator = Mediator::new();
        mediator.register("addNumbers", add);

        let result: i64 = mediator
            .send("addNumbers", AddNumbers { a: 2, b: 3 })
            .await
            .unwrap();
        assert_eq!(result, 5);
    }

    #[tokio::test]
    async fn test_validation_from_options_is_returned() {
        let mediator = Mediator::new();
        mediator.register_with_options(
            "user",
            |user: User| async move { Ok::<_, MediatorError>(user.username) },
            HandlerOptions::default()
                .with_validator(|_: &User| ValidationResult::invalid("Validation Error")),
        );

        let err = mediator
            .send::<User, String>(
                "user",
                User {
                    username: String::new(),
                    password: String::new(),
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.message(), "Validation Error");
    }

    #[tokio::test]
    async fn test_missing_handler_is_returned_not_raised() {
        let mediator = Mediator::new();

        let err = mediator
            .send::<String, String>("unregisteredRequest", String::new())
            .await
            .unwrap_err();

        assert!(matches!(err, MediatorError::HandlerNotFound(_)));
        assert_eq!(
            err.to_string(),
            "MediatorError: No handler found for key: unregisteredRequest"
        );
    }

    #[tokio::test]
    async fn test_callback_error_is_returned() {
        let mediator = Mediator::new();
        mediator.register("errorRequest", failing);

        let err = mediator
            .send::<String, String>("errorRequest", String::new())
            .await
            .unwrap_err();
        assert_eq!(err.message(), "Handler error");
    }

    #[tokio::test]
    async fn test_end_to_end_add_with_doubling_pre_middleware() {
        let mediator = Mediator::new();
        mediator
            .register("add", add)
            .add_pre_middleware(|request: AddNumbers| async move {
                Ok::<_, MediatorError>(AddNumbers {
                    a: request.a * 2,
                    b: request.b * 2,
                })
            });

        let result: i64 = mediator
            .send("add", AddNumbers { a: 2, b: 3 })
            .await
            .unwrap();
        assert_eq!(result, 10);
    }

    #[tokio::test]
    async fn test_global_middleware_runs_before_handler_middleware() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mediator = Mediator::new();

        let global_log = log.clone();
        mediator.use_global_middleware(move |request: AnyValue| {
            global_log.lock().push("global1");
            async move { Ok::<_, MediatorError>(request) }
        });
        let typed_log = log.clone();
        mediator.use_global_middleware_for(move |request: AddNumbers| {
            typed_log.lock().push("global2");
            async move {
                Ok::<_, MediatorError>(AddNumbers {
                    a: request.a + 1,
                    b: request.b,
                })
            }
        });

        let pre_log = log.clone();
        let post_log = log.clone();
        mediator
            .register("add", add)
            .add_pre_middleware(move |request: AddNumbers| {
                pre_log.lock().push("pre");
                async move { Ok::<_, MediatorError>(request) }
            })
            .add_post_middleware(move |response: i64| {
                post_log.lock().push("post");
                async move { Ok::<_, MediatorError>(response) }
            });

        let result: i64 = mediator
            .send("add", AddNumbers { a: 1, b: 1 })
            .await
            .unwrap();

        assert_eq!(result, 3);
        assert_eq!(*log.lock(), vec!["global1", "global2", "pre", "post"]);
    }

    #[tokio::test]
    async fn test_typed_global_middleware_ignores_other_requests() {
        let mediator = Mediator::new();
        mediator.use_global_middleware_for(|request: AddNumbers| async move {
            Ok::<_, MediatorError>(AddNumbers { a: 100, b: request.b })
        });
        mediator.register("echo", |text: String| async move {
            Ok::<_, MediatorError>(text)
        });

        let echoed: String = mediator.send("echo", "hi".to_string()).await.unwrap();
        assert_eq!(echoed, "hi");
    }

    #[tokio::test]
    async fn test_after_stage_middleware_sees_response() {
        let mediator = Mediator::new();
        mediator.use_middleware(
            MiddlewareStage::After,
            Arc::new(TypedMiddleware::new(|response: i64| async move {
                Ok::<_, MediatorError>(response * 10)
            })),
        );
        mediator.register("add", add);

        let result: i64 = mediator
            .send("add", AddNumbers { a: 1, b: 2 })
            .await
            .unwrap();
        assert_eq!(result, 30);
    }

    #[tokio::test]
    async fn test_global_error_middleware_transforms_callback_faults() {
        let mediator = Mediator::new();
        mediator.use_global_error_middleware(|err: MediatorError| async move {
            Ok::<_, MediatorError>(MediatorError::handler(format!("global: {}", err.message())))
        });
        mediator.use_error_middleware(|err: MediatorError| async move {
            Ok::<_, MediatorError>(MediatorError::handler(format!("{}!", err.message())))
        });
        mediator
            .register("errorRequest", failing)
            .add_error_middleware(|err: MediatorError| async move {
                Ok::<_, MediatorError>(MediatorError::handler(format!("local: {}", err.message())))
            });

        let err = mediator
            .send::<String, String>("errorRequest", String::new())
            .await
            .unwrap_err();
        assert_eq!(err.message(), "global: local: Handler error!");
    }

    #[tokio::test]
    async fn test_failing_global_error_middleware_replaces_fault() {
        let later = Arc::new(AtomicUsize::new(0));
        let mediator = Mediator::new();
        mediator.use_global_error_middleware(|_: MediatorError| async move {
            Err::<MediatorError, _>(MediatorError::handler("mw"))
        });
        let counter = later.clone();
        mediator.use_global_error_middleware(move |err: MediatorError| {
            counter.fetch_add(1, Ordering::SeqCst);
            async move {
                Ok::<_, MediatorError>(MediatorError::handler(format!("second: {}", err.message())))
            }
        });
        mediator.register("errorRequest", failing);

        let err = mediator
            .send::<String, String>("errorRequest", String::new())
            .await
            .unwrap_err();
        assert_eq!(err.message(), "mw");
        assert_eq!(later.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_options_error_validator_is_returned_unchanged() {
        let seen = Arc::new(AtomicUsize::new(0));
        let mediator = Mediator::new();
        let counter = seen.clone();
        mediator.use_global_error_middleware(move |err: MediatorError| {
            counter.fetch_add(1, Ordering::SeqCst);
            async move { Ok::<_, MediatorError>(err) }
        });
        mediator.register_with_options(
            "user",
            |user: User| async move { Ok::<_, MediatorError>(user.username) },
            HandlerOptions::default().with_error_validator(|user: &User| {
                user.password
                    .is_empty()
                    .then(|| MediatorError::handler("password required"))
            }),
        );

        let err = mediator
            .send::<User, String>(
                "user",
                User {
                    username: "ann".into(),
                    password: String::new(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, MediatorError::Handler(_)));
        assert_eq!(err.to_string(), "password required");
        assert_eq!(seen.load(Ordering::SeqCst), 0);

        let name: String = mediator
            .send(
                "user",
                User {
                    username: "ann".into(),
                    password: "secret".into(),
                },
            )
            .await
            .unwrap();
        assert_eq!(name, "ann");
    }

    #[tokio::test]
    async fn test_global_error_middleware_skips_other_faults() {
        let seen = Arc::new(AtomicUsize::new(0));
        let mediator = Mediator::new();
        let counter = seen.clone();
        mediator.use_global_error_middleware(move |err: MediatorError| {
            counter.fetch_add(1, Ordering::SeqCst);
            async move { Ok::<_, MediatorError>(err) }
        });
        mediator
            .register("add", add)
            .add_validator(|request: &AddNumbers| ValidationResult::from(request.a >= 0));

        let invalid = mediator
            .send::<AddNumbers, i64>("add", AddNumbers { a: -1, b: 0 })
            .await
            .unwrap_err();
        let missing = mediator
            .send::<AddNumbers, i64>("nope", AddNumbers { a: 1, b: 0 })
            .await
            .unwrap_err();

        assert!(matches!(invalid, MediatorError::Validation(_)));
        assert!(matches!(missing, MediatorError::HandlerNotFound(_)));
        assert_eq!(seen.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failing_global_middleware_is_returned() {
        let mediator = Mediator::new();
        mediator.use_global_middleware(|_: AnyValue| async move {
            Err::<AnyValue, _>(MediatorError::handler("blocked"))
        });
        mediator.register("add", add);

        let err = mediator
            .send::<AddNumbers, i64>("add", AddNumbers { a: 1, b: 1 })
            .await
            .unwrap_err();
        assert_eq!(err.message(), "blocked");
    }

    #[tokio::test]
    async fn test_unregister_then_send_is_missing_handler() {
        let mediator = Mediator::new();
        mediator.register("add", add);
        assert!(mediator.is_registered("add"));

        assert!(mediator.unregister("add"));
        assert!(!mediator.unregister("add"));
        assert!(mediator.is_empty());

        let err = mediator
            .send::<AddNumbers, i64>("add", AddNumbers { a: 1, b: 1 })
            .await
            .unwrap_err();
        assert!(matches!(err, MediatorError::HandlerNotFound(key) if key == "add"));
    }

    #[tokio::test]
    async fn test_last_registration_wins() {
        let mediator = Mediator::new();
        mediator.register("op", add);
        mediator.register("op", |request: AddNumbers| async move {
            Ok::<_, MediatorError>(request.a * request.b)
        });

        let result: i64 = mediator
            .send("op", AddNumbers { a: 3, b: 4 })
            .await
            .unwrap();
        assert_eq!(result, 12);
        assert_eq!(mediator.len(), 1);
    }

    #[tokio::test]
    async fn test_wrong_request_type_is_returned() {
        let mediator = Mediator::new();
        mediator.register("add", add);

        let err = mediator
            .send::<String, i64>("add", "not numbers".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, MediatorError::IncorrectRequestType(_, _)));
    }

    #[tokio::test]
    async fn test_wrong_response_type_is_returned() {
        let mediator = Mediator::new();
        mediator.register("add", add);

        let err = mediator
            .send::<AddNumbers, String>("add", AddNumbers { a: 1, b: 1 })
            .await
            .unwrap_err();
        assert!(matches!(err, MediatorError::IncorrectResponseType(_, key) if key == "add"));
    }

    #[tokio::test]
    async fn test_finish_returns_executable_handler() {
        let mediator = Mediator::new();
        let handler = mediator
            .register("add", add)
            .add_validator(|request: &AddNumbers| {
                if request.b == 0 {
                    ValidationResult::invalid("b must not be zero")
                } else {
                    ValidationResult::valid()
                }
            })
            .finish();

        assert_eq!(handler.execute(AddNumbers { a: 1, b: 2 }).await.unwrap(), 3);
        let err = handler
            .execute(AddNumbers { a: 1, b: 0 })
            .await
            .unwrap_err();
        assert_eq!(err.message(), "b must not be zero");
        assert!(mediator.is_registered("add"));
        assert_eq!(mediator.len(), 1);
    }

    #[tokio::test]
    async fn test_registration_commits_on_drop() {
        let mediator = Mediator::new();
        {
            let registration = mediator.register("add", add).enable_caching();
            assert_eq!(registration.key(), "add");
            assert!(!mediator.is_registered("add"));
        }
        assert!(mediator.is_registered("add"));
    }

    #[tokio::test]
    async fn test_cached_handler_through_mediator_respects_ttl() {
        let calls = Arc::new(AtomicUsize::new(0));
        let clock = Arc::new(ManualClock::default());
        let mediator = Mediator::with_configuration(
            MediatorConfiguration::new(crate::core::configuration::MediatorConfigurationDto {
                cache_ttl: std::time::Duration::from_secs(60),
            })
            .unwrap(),
        )
        .with_clock(clock.clone());

        let counter = calls.clone();
        mediator
            .register("add", move |request: AddNumbers| {
                counter.fetch_add(1, Ordering::SeqCst);
                async move { Ok::<_, MediatorError>(request.a + request.b) }
            })
            .enable_caching();

        for _ in 0..3 {
            let result: i64 = mediator
                .send("add", AddNumbers { a: 1, b: 2 })
                .await
                .unwrap();
            assert_eq!(result, 3);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        clock.advance(chrono::Duration::seconds(60));
        let _: i64 = mediator
            .send("add", AddNumbers { a: 1, b: 2 })
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_concurrent_misses_are_not_coalesced() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mediator = Mediator::new();
        let counter = calls.clone();
        mediator
            .register("slow", move |request: AddNumbers| {
                counter.fetch_add(1, Ordering::SeqCst);
                async move {
                    tokio::task::yield_now().await;
                    Ok::<_, MediatorError>(request.a + request.b)
                }
            })
            .enable_caching();

        let results = join_all((0..2).map(|_| {
            mediator.send::<AddNumbers, i64>("slow", AddNumbers { a: 2, b: 2 })
        }))
        .await;

        assert!(results.iter().all(|result| matches!(result, Ok(4))));
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        let _: i64 = mediator
            .send("slow", AddNumbers { a: 2, b: 2 })
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_mediator_shared_across_tasks() {
        let mediator = Arc::new(Mediator::new());
        mediator.register("add", add);

        let shared = Arc::clone(&mediator);
        let result = tokio::spawn(async move {
            shared
                .send::<AddNumbers, i64>("add", AddNumbers { a: 20, b: 22 })
                .await
        })
        .await
        .unwrap()
        .unwrap();

        assert_eq!(result, 42);
    }
}
