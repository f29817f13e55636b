// Abnormal termination recovery
//
// Dispatch tasks and poll loops run on their own tokio tasks; a panic inside
// one surfaces as a `JoinError` on its handle and is turned into an error here.
use crate::error::AppError;
use std::any::Any;
use tokio::task::JoinError;
use tracing::error;

/// Extract a readable message from a panic payload
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

/// Convert a failed join into `AppError::Abnormal`
pub fn abnormal_termination(join_err: JoinError) -> AppError {
    if join_err.is_panic() {
        let payload = join_err.into_panic();
        let panic_msg = panic_message(payload.as_ref());
        error!(panic_msg = %panic_msg, "Task panicked");
        AppError::Abnormal(panic_msg)
    } else {
        error!("Task cancelled: {:?}", join_err);
        AppError::Abnormal(format!("task cancelled: {}", join_err))
    }
}
