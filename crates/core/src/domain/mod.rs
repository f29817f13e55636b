// Domain Layer - Messages, queues and subscription options

pub mod error;
pub mod message;
pub mod options;
pub mod queue;

// Re-exports
pub use error::DomainError;
pub use message::{Batch, Message, MessageId, ReceiptHandle};
pub use options::{HandlerOptions, SubscriberOptions};
pub use queue::{QueueId, QueueName, TopicId, TopicName};
