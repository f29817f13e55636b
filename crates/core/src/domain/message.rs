// Message Domain Model

use serde::{Deserialize, Serialize};

/// Message ID assigned by the transport
pub type MessageId = String;

/// Receipt handle: proof of one particular receive, needed to ack/nack
pub type ReceiptHandle = String;

/// A message received from a queue.
///
/// Consumed exactly once by the dispatcher: it is either acknowledged
/// (`report_success`) or negatively acknowledged (`report_failure`) and then
/// dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub receipt_handle: ReceiptHandle,
    pub body: Option<String>,
}

impl Message {
    pub fn new(
        id: impl Into<String>,
        receipt_handle: impl Into<String>,
        body: Option<String>,
    ) -> Self {
        Self {
            id: id.into(),
            receipt_handle: receipt_handle.into(),
            body,
        }
    }

    /// Borrow the body as `&str` (handlers receive `Option<&str>`)
    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }
}

/// Messages returned by a single fetch for a single queue
pub type Batch = Vec<Message>;
