// SQLite transport settings (no magic values)
use std::time::Duration;

/// Maximum messages returned by one receive
pub const DEFAULT_MAX_BATCH_SIZE: u32 = 10;

/// How long a receive waits for messages before returning empty (20s)
pub const DEFAULT_LONG_POLL_WAIT: Duration = Duration::from_secs(20);

/// Re-check interval while long-polling an empty queue (200ms)
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// How long a received message stays hidden before it can be received again (30s)
pub const DEFAULT_VISIBILITY_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct SqliteTransportConfig {
    pub max_batch_size: u32,
    pub long_poll_wait: Duration,
    pub poll_interval: Duration,
    pub visibility_timeout: Duration,
}

impl Default for SqliteTransportConfig {
    fn default() -> Self {
        Self {
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            long_poll_wait: DEFAULT_LONG_POLL_WAIT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            visibility_timeout: DEFAULT_VISIBILITY_TIMEOUT,
        }
    }
}
