// Subscriber - Multi-queue subscription engine

mod dispatcher;
mod fatal;
mod panic_guard;
mod poll_loop;
mod shutdown;

pub use dispatcher::Dispatcher;
pub use fatal::{fatal_channel, FatalReceiver, FatalSender};
pub use panic_guard::{abnormal_termination, panic_message};
pub use shutdown::{stop_channel, StopSender, StopToken};

use crate::application::registry::HandlerRegistry;
use crate::domain::{HandlerOptions, SubscriberOptions};
use crate::error::{AppError, Result};
use crate::port::{MessageHandler, Transport};
use poll_loop::PollLoop;
use std::sync::Arc;
use tracing::{error, info};

/// Subscribes to every registered queue and dispatches messages to handlers.
///
/// ```text
/// register(...) ──► subscribe()
///                      │
///                      ├─► poll loop per queue ─► Dispatcher (shared permits)
///                      │                              │
///                      │                      report_success / report_failure
///                      ▼                              │
///                fatal channel ◄──── transport error / panic
/// ```
///
/// Registration happens on `&mut self` and `subscribe` consumes the
/// subscriber, so the registry cannot change once subscription has started.
pub struct Subscriber {
    transport: Arc<dyn Transport>,
    registry: HandlerRegistry,
    options: SubscriberOptions,
}

impl Subscriber {
    /// Create a subscriber
    ///
    /// # Errors
    /// - AppError::Config if `options.concurrency_limit` is 0
    pub fn new(transport: Arc<dyn Transport>, options: SubscriberOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            transport,
            registry: HandlerRegistry::new(),
            options,
        })
    }

    /// Bind a handler to a queue, replacing any previous binding for that queue
    ///
    /// # Errors
    /// - AppError::Config if `options.wait_time` is negative
    pub fn register<H>(
        &mut self,
        queue_name: impl Into<String>,
        handler: H,
        options: HandlerOptions,
    ) -> Result<()>
    where
        H: MessageHandler + 'static,
    {
        self.registry.register(queue_name, handler, options)
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    pub fn options(&self) -> &SubscriberOptions {
        &self.options
    }

    /// Run until the first fatal error, and return it.
    ///
    /// There is no successful return: either a transport error or a recovered
    /// panic ends the subscription, or this waits forever. Once the first
    /// fatal error is taken, the remaining poll loops are told to stop after
    /// their current batch. Errors raised after the first are logged and
    /// dropped.
    pub async fn subscribe(self) -> AppError {
        let Subscriber {
            transport,
            registry,
            options,
        } = self;
        let registry = Arc::new(registry);

        let (fatal_tx, fatal_rx) = fatal_channel();
        let (stop_tx, stop_token) = stop_channel();
        let dispatcher = Arc::new(Dispatcher::new(
            Arc::clone(&transport),
            options.concurrency_limit,
            fatal_tx.clone(),
        ));

        info!(
            queues = registry.len(),
            concurrency_limit = options.concurrency_limit,
            "Subscriber starting"
        );

        // Background task spawning one poll loop per binding
        let launcher_fatal = fatal_tx.clone();
        let launcher = tokio::spawn(async move {
            for binding in registry.bindings() {
                let poll = PollLoop::new(
                    Arc::clone(binding),
                    Arc::clone(&transport),
                    Arc::clone(&dispatcher),
                    fatal_tx.clone(),
                );
                let stop = stop_token.clone();
                let loop_fatal = fatal_tx.clone();
                let handle = tokio::spawn(poll.run(stop));
                // Poll loop bookkeeping panics are fatal too
                tokio::spawn(async move {
                    if let Err(join_err) = handle.await {
                        loop_fatal.raise(abnormal_termination(join_err));
                    }
                });
            }
        });
        tokio::spawn(async move {
            if let Err(join_err) = launcher.await {
                launcher_fatal.raise(abnormal_termination(join_err));
            }
        });

        let err = fatal_rx.recv().await;
        error!(error = %err, "Subscription terminated");
        stop_tx.stop();
        err
    }
}
