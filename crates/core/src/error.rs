// Central Error Type for the Application

use thiserror::Error;

/// Application-level error type
///
/// `Config` errors are returned synchronously from construction and
/// registration. `Transport` and `Abnormal` errors are fatal once
/// subscription has started and surface from `Subscriber::subscribe`.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] crate::domain::DomainError),

    #[error("Transport error: {0}")]
    Transport(#[from] crate::port::TransportError),

    #[error("Abnormal termination: {0}")]
    Abnormal(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
