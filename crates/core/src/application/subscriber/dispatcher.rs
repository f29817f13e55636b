// Bounded Dispatcher
//
// One permit pool shared by every poll loop caps the number of handler
// invocations running at once, process-wide.

use super::fatal::FatalSender;
use super::panic_guard::abnormal_termination;
use crate::application::registry::HandlerBinding;
use crate::domain::{Batch, Message, QueueId};
use crate::error::AppError;
use crate::port::Transport;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Runs each message of a batch on its own task, gated by the permit pool
pub struct Dispatcher {
    transport: Arc<dyn Transport>,
    permits: Arc<Semaphore>,
    fatal: FatalSender,
}

impl Dispatcher {
    pub fn new(transport: Arc<dyn Transport>, concurrency_limit: usize, fatal: FatalSender) -> Self {
        Self {
            transport,
            permits: Arc::new(Semaphore::new(concurrency_limit)),
            fatal,
        }
    }

    /// Permits currently free (diagnostics and tests)
    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }

    /// Dispatch every message of `batch` and wait until all of them are terminal.
    ///
    /// Messages of one batch run without ordering between them. This only
    /// returns after every dispatch task has finished and released its permit.
    pub async fn dispatch_batch(
        &self,
        queue_id: &QueueId,
        binding: &Arc<HandlerBinding>,
        batch: Batch,
    ) {
        let mut tasks = JoinSet::new();
        for message in batch {
            tasks.spawn(dispatch_one(
                Arc::clone(&self.transport),
                Arc::clone(&self.permits),
                queue_id.clone(),
                Arc::clone(binding),
                self.fatal.clone(),
                message,
            ));
        }

        while let Some(joined) = tasks.join_next().await {
            // The permit is owned by the task, so it is already back in the pool
            if let Err(join_err) = joined {
                self.fatal.raise(abnormal_termination(join_err));
            }
        }
    }
}

/// acquire → handle → report → release
async fn dispatch_one(
    transport: Arc<dyn Transport>,
    permits: Arc<Semaphore>,
    queue_id: QueueId,
    binding: Arc<HandlerBinding>,
    fatal: FatalSender,
    message: Message,
) {
    // Dropped on every exit path, including unwinding. The pool is never closed.
    let Ok(_permit) = permits.acquire_owned().await else {
        return;
    };

    debug!(
        queue = %binding.queue_name,
        message_id = %message.id,
        "Handling message"
    );

    let report = match binding.handler.handle(&message.id, message.body()).await {
        Ok(()) => {
            transport
                .report_success(&queue_id, &message.receipt_handle)
                .await
        }
        Err(e) => {
            warn!(
                queue = %binding.queue_name,
                message_id = %message.id,
                wait_time = binding.options.wait_time,
                error = %e,
                "Handler failed, message will be redelivered"
            );
            transport
                .report_failure(&queue_id, &message.receipt_handle, binding.options.wait_time)
                .await
        }
    };

    if let Err(e) = report {
        fatal.raise(AppError::Transport(e));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::subscriber::fatal::fatal_channel;
    use crate::domain::HandlerOptions;
    use crate::port::transport::mocks::MockTransport;
    use crate::port::{handler_fn, HandlerError, MessageHandler, TransportError};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn binding<H: MessageHandler + 'static>(handler: H, wait_time: i64) -> Arc<HandlerBinding> {
        Arc::new(HandlerBinding {
            queue_name: "orders".to_string(),
            handler: Arc::new(handler),
            options: HandlerOptions::new(wait_time),
        })
    }

    fn message(n: usize) -> Message {
        Message::new(format!("m-{n}"), format!("rh-{n}"), Some(format!("body-{n}")))
    }

    #[tokio::test]
    async fn test_success_and_failure_reports() {
        let transport = Arc::new(MockTransport::new());
        let (fatal, _rx) = fatal_channel();
        let dispatcher = Dispatcher::new(transport.clone(), 4, fatal);

        let handler = handler_fn(|id, _| async move {
            if id == "m-2" {
                Err(HandlerError::new("cannot process"))
            } else {
                Ok(())
            }
        });

        dispatcher
            .dispatch_batch(
                &"q-orders".to_string(),
                &binding(handler, 15),
                vec![message(1), message(2), message(3)],
            )
            .await;

        let mut successes = transport.success_reports();
        successes.sort();
        assert_eq!(
            successes,
            vec![
                ("q-orders".to_string(), "rh-1".to_string()),
                ("q-orders".to_string(), "rh-3".to_string()),
            ]
        );
        assert_eq!(
            transport.failure_reports(),
            vec![("q-orders".to_string(), "rh-2".to_string(), 15)]
        );
        assert_eq!(dispatcher.available_permits(), 4);
    }

    #[tokio::test]
    async fn test_permit_limit_respected_within_batch() {
        let transport = Arc::new(MockTransport::new());
        let (fatal, _rx) = fatal_channel();
        let dispatcher = Dispatcher::new(transport.clone(), 2, fatal);

        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let (r, p) = (running.clone(), peak.clone());
        let handler = handler_fn(move |_, _| {
            let (running, peak) = (r.clone(), p.clone());
            async move {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                running.fetch_sub(1, Ordering::SeqCst);
                Ok::<(), HandlerError>(())
            }
        });

        let batch = (0..6).map(message).collect();
        dispatcher
            .dispatch_batch(&"q-orders".to_string(), &binding(handler, 0), batch)
            .await;

        assert_eq!(peak.load(Ordering::SeqCst), 2);
        assert_eq!(transport.success_reports().len(), 6);
    }

    #[tokio::test]
    async fn test_panicking_handler_releases_permit_and_raises_fatal() {
        let transport = Arc::new(MockTransport::new());
        let (fatal, rx) = fatal_channel();
        let dispatcher = Dispatcher::new(transport.clone(), 1, fatal);

        let handler = handler_fn(|id, _| async move {
            if id == "m-1" {
                panic!("handler exploded");
            }
            Ok::<(), HandlerError>(())
        });

        dispatcher
            .dispatch_batch(
                &"q-orders".to_string(),
                &binding(handler, 0),
                vec![message(1), message(2)],
            )
            .await;

        // The panicking message is neither acked nor nacked
        assert_eq!(
            transport.success_reports(),
            vec![("q-orders".to_string(), "rh-2".to_string())]
        );
        assert!(transport.failure_reports().is_empty());
        assert_eq!(dispatcher.available_permits(), 1);

        match rx.recv().await {
            AppError::Abnormal(msg) => assert_eq!(msg, "handler exploded"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_report_error_is_fatal() {
        let transport = Arc::new(MockTransport::new());
        transport.fail_success_reports(TransportError::Backend("delete failed".into()));
        let (fatal, rx) = fatal_channel();
        let dispatcher = Dispatcher::new(transport.clone(), 1, fatal);

        let handler = handler_fn(|_, _| async { Ok::<(), HandlerError>(()) });
        dispatcher
            .dispatch_batch(&"q-orders".to_string(), &binding(handler, 0), vec![message(1)])
            .await;

        assert_eq!(dispatcher.available_permits(), 1);
        assert!(matches!(
            rx.recv().await,
            AppError::Transport(TransportError::Backend(_))
        ));
    }
}
