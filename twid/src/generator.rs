use std::sync::atomic::{AtomicU64, Ordering};

/// Source of monotonically increasing values for unique ids and fallbacks.
pub trait IdGenerator: Send + Sync + std::fmt::Debug {
    fn next_id(&self) -> u64;
}

/// Atomic counter scoped to the owning hasher (process start by default).
#[derive(Debug, Default)]
pub struct AtomicIdGenerator {
    next: AtomicU64,
}

impl AtomicIdGenerator {
    pub const fn new() -> Self {
        Self {
            next: AtomicU64::new(0),
        }
    }

    pub const fn starting_at(value: u64) -> Self {
        Self {
            next: AtomicU64::new(value),
        }
    }
}

impl IdGenerator for AtomicIdGenerator {
    fn next_id(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}
