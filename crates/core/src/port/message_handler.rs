// Message Handler Port
// Implemented by application code; invoked by the dispatcher once per message

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;

/// Business failure reported by a handler.
///
/// Not fatal: the message is negatively acknowledged and redelivered by the
/// queue after the handler's `wait_time`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct HandlerError(String);

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    pub fn message(&self) -> &str {
        &self.0
    }
}

impl From<String> for HandlerError {
    fn from(message: String) -> Self {
        Self(message)
    }
}

impl From<&str> for HandlerError {
    fn from(message: &str) -> Self {
        Self(message.to_string())
    }
}

/// Per-queue message handler
///
/// Handlers are trusted to return in bounded time. A handler that never
/// returns keeps its concurrency permit forever.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Handle one message. `Ok` acknowledges it, `Err` schedules redelivery.
    async fn handle(&self, id: &str, body: Option<&str>) -> Result<(), HandlerError>;
}

#[async_trait]
impl<T: MessageHandler + ?Sized> MessageHandler for Arc<T> {
    async fn handle(&self, id: &str, body: Option<&str>) -> Result<(), HandlerError> {
        (**self).handle(id, body).await
    }
}

/// Handler backed by an async closure, see [`handler_fn`]
pub struct FnHandler<F> {
    f: F,
}

#[async_trait]
impl<F, Fut> MessageHandler for FnHandler<F>
where
    F: Fn(String, Option<String>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
{
    async fn handle(&self, id: &str, body: Option<&str>) -> Result<(), HandlerError> {
        (self.f)(id.to_string(), body.map(str::to_string)).await
    }
}

/// Build a handler from an async closure taking `(message_id, body)`
///
/// # Example
/// ```text
/// let handler = handler_fn(|id, body| async move {
///     tracing::info!(%id, ?body, "received");
///     Ok(())
/// });
/// ```
pub fn handler_fn<F, Fut>(f: F) -> FnHandler<F>
where
    F: Fn(String, Option<String>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
{
    FnHandler { f }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_handler_fn_receives_id_and_body() {
        let handler = handler_fn(|id, body| async move {
            if id == "m-1" && body.as_deref() == Some("payload") {
                Ok(())
            } else {
                Err(HandlerError::new("unexpected input"))
            }
        });

        assert!(handler.handle("m-1", Some("payload")).await.is_ok());
        assert_eq!(
            handler.handle("m-2", None).await,
            Err(HandlerError::new("unexpected input"))
        );
    }

    #[tokio::test]
    async fn test_arc_handler_delegates() {
        let handler: Arc<dyn MessageHandler> =
            Arc::new(handler_fn(|_, _| async { Err::<(), _>(HandlerError::new("always")) }));
        let shared = Arc::clone(&handler);

        let err = shared.handle("m-1", None).await.unwrap_err();
        assert_eq!(err.message(), "always");
    }
}
