use std::sync::atomic::{AtomicU64, Ordering};

// Monotonically increasing, globally unique transaction identifier.
//
// The consecutive-wait counter used for deadlock resolution is not carried
// here: it's per-(transaction, lock attempt) bookkeeping that only the lock
// manager needs, so it lives in LockManager's own table instead of on this
// Copy id (see lock_manager.rs).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransactionId {
    tid: u64,
}

impl TransactionId {
    // Begins a new transaction with a fresh, process-wide unique id.
    pub fn start() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        let tid = COUNTER.fetch_add(1, Ordering::SeqCst);
        TransactionId { tid }
    }

    pub fn id(&self) -> u64 {
        self.tid
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique_and_increasing() {
        let t1 = TransactionId::start();
        let t2 = TransactionId::start();
        assert_ne!(t1, t2);
        assert!(t2.id() > t1.id());
    }
}
