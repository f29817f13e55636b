// Courier Infrastructure - SQLite Adapter
// Implements: Transport, OutboundTransport

mod config;
mod connection;
mod error;
mod migration;
mod transport;

pub use config::SqliteTransportConfig;
pub use connection::create_pool;
pub use migration::run_migrations;
pub use transport::SqliteTransport;
