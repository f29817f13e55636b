// Port Layer - Interfaces for external dependencies

pub mod id_provider; // For deterministic testing
pub mod message_handler;
pub mod time_provider;
pub mod transport;

// Re-exports
pub use id_provider::IdProvider;
pub use message_handler::{handler_fn, FnHandler, HandlerError, MessageHandler};
pub use time_provider::TimeProvider;
pub use transport::{OutboundTransport, Transport, TransportError};
