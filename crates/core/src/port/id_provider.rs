// ID Provider Port (for deterministic testing)

/// ID provider interface (message IDs, receipt handles, queue IDs)
pub trait IdProvider: Send + Sync {
    /// Generate a new unique ID
    fn generate_id(&self) -> String;
}

/// UUID v4 provider (production)
pub struct UuidProvider;

impl IdProvider for UuidProvider {
    fn generate_id(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

pub mod mocks {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    /// Produces `{prefix}-1`, `{prefix}-2`, ...
    pub struct SequentialIdProvider {
        prefix: String,
        next: AtomicU64,
    }

    impl SequentialIdProvider {
        pub fn new(prefix: impl Into<String>) -> Self {
            Self {
                prefix: prefix.into(),
                next: AtomicU64::new(1),
            }
        }
    }

    impl IdProvider for SequentialIdProvider {
        fn generate_id(&self) -> String {
            let n = self.next.fetch_add(1, Ordering::SeqCst);
            format!("{}-{}", self.prefix, n)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mocks::SequentialIdProvider;
    use super::*;

    #[test]
    fn test_uuid_ids_are_unique() {
        let provider = UuidProvider;
        assert_ne!(provider.generate_id(), provider.generate_id());
    }

    #[test]
    fn test_sequential_ids() {
        let provider = SequentialIdProvider::new("rh");
        assert_eq!(provider.generate_id(), "rh-1");
        assert_eq!(provider.generate_id(), "rh-2");
    }
}
