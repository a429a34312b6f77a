use crate::core::contracts::{AnyValue, IMiddleware, IPipeline};
use crate::core::error_mediator::MediatorError;
use async_trait::async_trait;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

/// Applies each step in order, feeding the output of one into the next.
/// The first failing step aborts the chain.
pub async fn run_chain<T>(chain: &[Arc<dyn IMiddleware<T>>], input: T) -> Result<T, MediatorError>
where
    T: Send + 'static,
{
    let mut current = input;
    for middleware in chain {
        current = middleware.handle(current).await?;
    }
    Ok(current)
}

pub async fn run_pipeline<T>(chain: Arc<[Arc<dyn IPipeline<T>>]>, input: T) -> Result<T, MediatorError>
where
    T: Send + 'static,
{
    Next { chain, index: 0 }.run(input).await
}

/// The remainder of a continuation-passing chain.
pub struct Next<T>
where
    T: Send + 'static,
{
    chain: Arc<[Arc<dyn IPipeline<T>>]>,
    index: usize,
}

impl<T> Next<T>
where
    T: Send + 'static,
{
    pub async fn run(self, value: T) -> Result<T, MediatorError> {
        let Some(pipeline) = self.chain.get(self.index).cloned() else {
            return Ok(value);
        };
        let next = Next {
            chain: Arc::clone(&self.chain),
            index: self.index + 1,
        };
        pipeline.handle(value, next).await
    }

    pub fn remaining(&self) -> usize {
        self.chain.len().saturating_sub(self.index)
    }
}

/// Lifts a typed step into an erased one. Values of any other type are
/// passed through unchanged.
pub struct TypedMiddleware<T, F> {
    inner: F,
    _phantom: PhantomData<fn(T)>,
}

impl<T, F> TypedMiddleware<T, F> {
    pub fn new<Fut>(inner: F) -> Self
    where
        F: Fn(T) -> Fut,
        Fut: Future<Output = Result<T, MediatorError>>,
    {
        Self {
            inner,
            _phantom: PhantomData,
        }
    }
}

#[async_trait]
impl<T, F, Fut> IMiddleware<AnyValue> for TypedMiddleware<T, F>
where
    T: Send + Sync + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, MediatorError>> + Send + 'static,
{
    async fn handle(&self, value: AnyValue) -> Result<AnyValue, MediatorError> {
        match value.downcast::<T>() {
            Ok(typed) => {
                let result = (self.inner)(*typed).await?;
                Ok(Box::new(result))
            }
            Err(other) => Ok(other),
        }
    }
}
