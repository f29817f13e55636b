// Application Layer - Subscription engine and publishing

pub mod publisher;
pub mod registry;
pub mod subscriber;

// Re-exports
pub use publisher::Publisher;
pub use registry::{HandlerBinding, HandlerRegistry};
pub use subscriber::{stop_channel, StopSender, StopToken, Subscriber};
