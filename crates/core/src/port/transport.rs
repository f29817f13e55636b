// Transport Port (queue & topic backend)
// Implementations own name resolution caching, long-polling and any retries

use crate::domain::{Batch, QueueId, TopicId};
use async_trait::async_trait;
use thiserror::Error;

/// Transport errors. Always fatal to a running subscription.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("There is no queue named {0}")]
    QueueNotFound(String),

    #[error("There is no topic named {0}")]
    TopicNotFound(String),

    #[error("Receipt handle not found or expired: {0}")]
    ReceiptNotFound(String),

    #[error("Backend error: {0}")]
    Backend(String),
}

/// Inbound side of a queue backend, consumed by the subscription engine
#[async_trait]
pub trait Transport: Send + Sync {
    /// Resolve a queue name to its opaque identifier
    ///
    /// # Errors
    /// - TransportError::QueueNotFound if no such queue exists
    async fn resolve_queue(&self, name: &str) -> Result<QueueId, TransportError>;

    /// Fetch up to the backend's maximum batch size.
    ///
    /// Long-polls: an empty batch is returned only after the backend's wait
    /// interval has elapsed, so callers can loop without sleeping.
    async fn fetch_batch(&self, queue_id: &QueueId) -> Result<Batch, TransportError>;

    /// Acknowledge a message (permanently removes it)
    async fn report_success(
        &self,
        queue_id: &QueueId,
        receipt_handle: &str,
    ) -> Result<(), TransportError>;

    /// Negatively acknowledge a message; it becomes visible again after `delay_secs`
    async fn report_failure(
        &self,
        queue_id: &QueueId,
        receipt_handle: &str,
        delay_secs: i64,
    ) -> Result<(), TransportError>;
}

/// Outbound side of a queue backend, consumed by the publisher
#[async_trait]
pub trait OutboundTransport: Transport {
    /// Resolve a topic name to its opaque identifier
    async fn resolve_topic(&self, name: &str) -> Result<TopicId, TransportError>;

    /// Publish to a topic (fan-out to every subscribed queue)
    async fn publish(
        &self,
        topic_id: &TopicId,
        subject: &str,
        body: &str,
    ) -> Result<(), TransportError>;

    /// Send directly to one queue
    async fn send_message(&self, queue_id: &QueueId, body: &str) -> Result<(), TransportError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::domain::ReceiptHandle;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::sync::Notify;

    /// Every call made against the mock, in call order
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum TransportCall {
        ResolveQueue(String),
        Fetch(QueueId),
        ReportSuccess {
            queue_id: QueueId,
            receipt_handle: ReceiptHandle,
        },
        ReportFailure {
            queue_id: QueueId,
            receipt_handle: ReceiptHandle,
            delay_secs: i64,
        },
        ResolveTopic(String),
        Publish {
            topic_id: TopicId,
            subject: String,
            body: String,
        },
        SendMessage {
            queue_id: QueueId,
            body: String,
        },
    }

    /// Scripted in-memory transport.
    ///
    /// Each queue serves the batches pushed for it in order; once the script
    /// is exhausted, fetches behave like an empty long-poll.
    pub struct MockTransport {
        queues: Mutex<HashMap<String, QueueId>>,
        topics: Mutex<HashMap<String, TopicId>>,
        batches: Mutex<HashMap<QueueId, VecDeque<Result<Batch, TransportError>>>>,
        calls: Mutex<Vec<TransportCall>>,
        success_error: Mutex<Option<TransportError>>,
        failure_error: Mutex<Option<TransportError>>,
        empty_poll_delay: Duration,
        changed: Notify,
    }

    impl Default for MockTransport {
        fn default() -> Self {
            Self::new()
        }
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self {
                queues: Mutex::new(HashMap::new()),
                topics: Mutex::new(HashMap::new()),
                batches: Mutex::new(HashMap::new()),
                calls: Mutex::new(Vec::new()),
                success_error: Mutex::new(None),
                failure_error: Mutex::new(None),
                empty_poll_delay: Duration::from_millis(10),
                changed: Notify::new(),
            }
        }

        pub fn with_queue(self, name: impl Into<String>, queue_id: impl Into<String>) -> Self {
            self.add_queue(name, queue_id);
            self
        }

        pub fn add_queue(&self, name: impl Into<String>, queue_id: impl Into<String>) {
            self.queues
                .lock()
                .unwrap()
                .insert(name.into(), queue_id.into());
        }

        pub fn add_topic(&self, name: impl Into<String>, topic_id: impl Into<String>) {
            self.topics
                .lock()
                .unwrap()
                .insert(name.into(), topic_id.into());
        }

        pub fn push_batch(&self, queue_id: impl Into<String>, batch: Batch) {
            self.batches
                .lock()
                .unwrap()
                .entry(queue_id.into())
                .or_default()
                .push_back(Ok(batch));
        }

        pub fn push_fetch_error(&self, queue_id: impl Into<String>, err: TransportError) {
            self.batches
                .lock()
                .unwrap()
                .entry(queue_id.into())
                .or_default()
                .push_back(Err(err));
        }

        /// Make every subsequent `report_success` fail
        pub fn fail_success_reports(&self, err: TransportError) {
            *self.success_error.lock().unwrap() = Some(err);
        }

        /// Make every subsequent `report_failure` fail
        pub fn fail_failure_reports(&self, err: TransportError) {
            *self.failure_error.lock().unwrap() = Some(err);
        }

        pub fn calls(&self) -> Vec<TransportCall> {
            self.calls.lock().unwrap().clone()
        }

        pub fn fetch_count(&self, queue_id: &str) -> usize {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|c| matches!(c, TransportCall::Fetch(id) if id == queue_id))
                .count()
        }

        pub fn success_reports(&self) -> Vec<(QueueId, ReceiptHandle)> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter_map(|c| match c {
                    TransportCall::ReportSuccess {
                        queue_id,
                        receipt_handle,
                    } => Some((queue_id.clone(), receipt_handle.clone())),
                    _ => None,
                })
                .collect()
        }

        pub fn failure_reports(&self) -> Vec<(QueueId, ReceiptHandle, i64)> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter_map(|c| match c {
                    TransportCall::ReportFailure {
                        queue_id,
                        receipt_handle,
                        delay_secs,
                    } => Some((queue_id.clone(), receipt_handle.clone(), *delay_secs)),
                    _ => None,
                })
                .collect()
        }

        /// Number of ack + nack calls so far
        pub fn report_count(&self) -> usize {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|c| {
                    matches!(
                        c,
                        TransportCall::ReportSuccess { .. } | TransportCall::ReportFailure { .. }
                    )
                })
                .count()
        }

        /// Wait until at least `n` ack/nack calls have been made
        pub async fn wait_for_reports(&self, n: usize) {
            loop {
                let notified = self.changed.notified();
                if self.report_count() >= n {
                    return;
                }
                notified.await;
            }
        }

        fn record(&self, call: TransportCall) {
            self.calls.lock().unwrap().push(call);
            self.changed.notify_waiters();
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn resolve_queue(&self, name: &str) -> Result<QueueId, TransportError> {
            self.record(TransportCall::ResolveQueue(name.to_string()));
            self.queues
                .lock()
                .unwrap()
                .get(name)
                .cloned()
                .ok_or_else(|| TransportError::QueueNotFound(name.to_string()))
        }

        async fn fetch_batch(&self, queue_id: &QueueId) -> Result<Batch, TransportError> {
            self.record(TransportCall::Fetch(queue_id.clone()));
            let next = self
                .batches
                .lock()
                .unwrap()
                .get_mut(queue_id)
                .and_then(|script| script.pop_front());

            match next {
                Some(result) => result,
                None => {
                    tokio::time::sleep(self.empty_poll_delay).await;
                    Ok(Vec::new())
                }
            }
        }

        async fn report_success(
            &self,
            queue_id: &QueueId,
            receipt_handle: &str,
        ) -> Result<(), TransportError> {
            self.record(TransportCall::ReportSuccess {
                queue_id: queue_id.clone(),
                receipt_handle: receipt_handle.to_string(),
            });
            match self.success_error.lock().unwrap().clone() {
                Some(err) => Err(err),
                None => Ok(()),
            }
        }

        async fn report_failure(
            &self,
            queue_id: &QueueId,
            receipt_handle: &str,
            delay_secs: i64,
        ) -> Result<(), TransportError> {
            self.record(TransportCall::ReportFailure {
                queue_id: queue_id.clone(),
                receipt_handle: receipt_handle.to_string(),
                delay_secs,
            });
            match self.failure_error.lock().unwrap().clone() {
                Some(err) => Err(err),
                None => Ok(()),
            }
        }
    }

    #[async_trait]
    impl OutboundTransport for MockTransport {
        async fn resolve_topic(&self, name: &str) -> Result<TopicId, TransportError> {
            self.record(TransportCall::ResolveTopic(name.to_string()));
            self.topics
                .lock()
                .unwrap()
                .get(name)
                .cloned()
                .ok_or_else(|| TransportError::TopicNotFound(name.to_string()))
        }

        async fn publish(
            &self,
            topic_id: &TopicId,
            subject: &str,
            body: &str,
        ) -> Result<(), TransportError> {
            self.record(TransportCall::Publish {
                topic_id: topic_id.clone(),
                subject: subject.to_string(),
                body: body.to_string(),
            });
            Ok(())
        }

        async fn send_message(&self, queue_id: &QueueId, body: &str) -> Result<(), TransportError> {
            self.record(TransportCall::SendMessage {
                queue_id: queue_id.clone(),
                body: body.to_string(),
            });
            Ok(())
        }
    }
}
