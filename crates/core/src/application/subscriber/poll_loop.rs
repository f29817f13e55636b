// Per-Queue Poll Loop
//
// Fetching ──(batch)──► Draining ──(all messages terminal)──► Fetching
//
// Leaves the cycle only when a transport error is raised or the stop signal
// fires.

use super::dispatcher::Dispatcher;
use super::fatal::FatalSender;
use super::shutdown::StopToken;
use crate::application::registry::HandlerBinding;
use crate::error::AppError;
use crate::port::Transport;
use std::sync::Arc;
use tracing::{debug, info};

pub struct PollLoop {
    binding: Arc<HandlerBinding>,
    transport: Arc<dyn Transport>,
    dispatcher: Arc<Dispatcher>,
    fatal: FatalSender,
}

impl PollLoop {
    pub fn new(
        binding: Arc<HandlerBinding>,
        transport: Arc<dyn Transport>,
        dispatcher: Arc<Dispatcher>,
        fatal: FatalSender,
    ) -> Self {
        Self {
            binding,
            transport,
            dispatcher,
            fatal,
        }
    }

    pub async fn run(self, mut stop: StopToken) {
        let queue_name = &self.binding.queue_name;

        // Resolved once for the lifetime of the loop
        let queue_id = match self.transport.resolve_queue(queue_name).await {
            Ok(id) => id,
            Err(e) => {
                self.fatal.raise(AppError::Transport(e));
                return;
            }
        };

        info!(queue = %queue_name, queue_id = %queue_id, "Poll loop started");

        loop {
            if stop.is_stopped() {
                break;
            }

            let batch = tokio::select! {
                fetched = self.transport.fetch_batch(&queue_id) => match fetched {
                    Ok(batch) => batch,
                    Err(e) => {
                        self.fatal.raise(AppError::Transport(e));
                        break;
                    }
                },
                _ = stop.wait() => break,
            };

            // Long-poll elapsed with nothing to do
            if batch.is_empty() {
                continue;
            }

            debug!(queue = %queue_name, batch_size = batch.len(), "Fetched batch");
            self.dispatcher
                .dispatch_batch(&queue_id, &self.binding, batch)
                .await;
        }

        info!(queue = %queue_name, "Poll loop stopped");
    }
}
