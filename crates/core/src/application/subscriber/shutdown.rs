// Poll Loop Stop Signal
//
// Raised once the first fatal error has been taken by `subscribe`, so sibling
// poll loops stop fetching. Batches already being drained still complete.

use tokio::sync::watch;

/// Stop signal observed by poll loops
#[derive(Clone)]
pub struct StopToken {
    rx: watch::Receiver<bool>,
}

impl StopToken {
    /// Check if stop was requested
    pub fn is_stopped(&self) -> bool {
        *self.rx.borrow()
    }

    /// Wait for the stop signal.
    ///
    /// Also returns once the sender is dropped, e.g. when the `subscribe`
    /// future itself is dropped.
    pub async fn wait(&mut self) {
        let _ = self.rx.wait_for(|stopped| *stopped).await;
    }
}

/// Stop sender, owned by `subscribe`
pub struct StopSender {
    tx: watch::Sender<bool>,
}

impl StopSender {
    /// Signal every poll loop to stop
    pub fn stop(&self) {
        let _ = self.tx.send(true);
    }
}

/// Create a stop channel
pub fn stop_channel() -> (StopSender, StopToken) {
    let (tx, rx) = watch::channel(false);
    (StopSender { tx }, StopToken { rx })
}
