use super::Guid;
use std::sync::atomic::{AtomicU64, Ordering};

/// Source of fresh guids for elements the reducers synthesize (End, Root).
pub trait GuidGenerator: Send + Sync {
    fn next_guid(&self) -> Guid;
}

/// Random v4 uuids.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidGenerator;

impl GuidGenerator for UuidGenerator {
    fn next_guid(&self) -> Guid {
        uuid::Uuid::new_v4().to_string()
    }
}

/// Deterministic `{prefix}{n}` guids, used by tests and replay tooling.
#[derive(Debug)]
pub struct SequentialGuidGenerator {
    prefix: String,
    counter: AtomicU64,
}

impl SequentialGuidGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: AtomicU64::new(0),
        }
    }
}

impl Default for SequentialGuidGenerator {
    fn default() -> Self {
        Self::new("generated-")
    }
}

impl GuidGenerator for SequentialGuidGenerator {
    fn next_guid(&self) -> Guid {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        format!("{}{}", self.prefix, n)
    }
}
