// Queue & Topic Domain Model

/// Logical queue name used for handler registration
pub type QueueName = String;

/// Opaque queue identifier issued by the transport (e.g. a queue URL)
pub type QueueId = String;

/// Logical topic name used by the publisher
pub type TopicName = String;

/// Opaque topic identifier issued by the transport (e.g. a topic ARN)
pub type TopicId = String;
