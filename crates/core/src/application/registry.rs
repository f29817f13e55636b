// Queue Binding Registry
//
// Written during setup, then frozen behind an Arc when subscription starts.

use crate::domain::{HandlerOptions, QueueName};
use crate::error::Result;
use crate::port::MessageHandler;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// A queue name bound to its handler and options
pub struct HandlerBinding {
    pub queue_name: QueueName,
    pub handler: Arc<dyn MessageHandler>,
    pub options: HandlerOptions,
}

impl std::fmt::Debug for HandlerBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerBinding")
            .field("queue_name", &self.queue_name)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Mapping from queue name to binding. No removal operation.
#[derive(Default, Debug)]
pub struct HandlerRegistry {
    bindings: HashMap<QueueName, Arc<HandlerBinding>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `handler` to `queue_name`, replacing any previous binding.
    ///
    /// Options are validated first; on error the registry is left untouched.
    pub fn register<H>(
        &mut self,
        queue_name: impl Into<String>,
        handler: H,
        options: HandlerOptions,
    ) -> Result<()>
    where
        H: MessageHandler + 'static,
    {
        let queue_name = queue_name.into();
        options.validate()?;

        debug!(queue = %queue_name, wait_time = options.wait_time, "Registering handler");

        let binding = HandlerBinding {
            queue_name: queue_name.clone(),
            handler: Arc::new(handler),
            options,
        };
        self.bindings.insert(queue_name, Arc::new(binding));
        Ok(())
    }

    pub fn get(&self, queue_name: &str) -> Option<&Arc<HandlerBinding>> {
        self.bindings.get(queue_name)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn bindings(&self) -> impl Iterator<Item = &Arc<HandlerBinding>> {
        self.bindings.values()
    }
}
