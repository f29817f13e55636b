// Fatal Signal Channel
//
// Single slot: the first error raised wins; anything raised while the slot is
// occupied, or after `subscribe` has taken its error, is logged and dropped.

use crate::error::AppError;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{error, warn};

/// Cloned into every poll loop and dispatch task
#[derive(Clone)]
pub struct FatalSender {
    tx: mpsc::Sender<AppError>,
}

impl FatalSender {
    /// Deliver a fatal error. Returns false if it was dropped.
    pub fn raise(&self, err: AppError) -> bool {
        match self.tx.try_send(err) {
            Ok(()) => true,
            Err(TrySendError::Full(err)) | Err(TrySendError::Closed(err)) => {
                warn!(error = %err, "Dropping fatal error: a fatal error was already raised");
                false
            }
        }
    }
}

/// Consumed once by `subscribe`
pub struct FatalReceiver {
    rx: mpsc::Receiver<AppError>,
}

impl FatalReceiver {
    /// Wait for the first fatal error.
    ///
    /// If every sender is gone without raising anything (no queues were
    /// registered), this never returns.
    pub async fn recv(mut self) -> AppError {
        match self.rx.recv().await {
            Some(err) => {
                error!(error = %err, "Fatal error received");
                err
            }
            None => {
                warn!("No poll loop is running; subscription will wait forever");
                std::future::pending().await
            }
        }
    }
}

pub fn fatal_channel() -> (FatalSender, FatalReceiver) {
    let (tx, rx) = mpsc::channel(1);
    (FatalSender { tx }, FatalReceiver { rx })
}
