use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use log::{debug, warn};

use crate::common::PageId;
use crate::error::{DbError, Result};
use crate::transaction::TransactionId;

// Page-level lock mode. Shared readers may coexist; Exclusive is solitary.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum LockMode {
    Shared,
    Exclusive,
}

// Interval between failed grant attempts while a transaction waits on a
// conflicting lock.
const LOCK_WAIT_MS: u64 = 10;

// ~100 * LOCK_WAIT_MS is roughly one second of futile retry before a
// transaction is presumed deadlocked and aborted.
const DEADLOCK_RETRY_THRESHOLD: u32 = 100;

#[derive(Default)]
struct PageLocks {
    shared: HashSet<TransactionId>,
    exclusive: Option<TransactionId>,
}

impl PageLocks {
    fn is_empty(&self) -> bool {
        self.shared.is_empty() && self.exclusive.is_none()
    }
}

struct State {
    pages: HashMap<PageId, PageLocks>,
    held_by: HashMap<TransactionId, HashSet<PageId>>,
    wait_counts: HashMap<TransactionId, u32>,
}

// Grants and tracks shared/exclusive page locks under strict two-phase
// locking. Deadlocks are resolved not by a waits-for graph but by a
// consecutive-wait counter per transaction: every failed grant attempt
// increments it, every successful one resets it, and crossing
// DEADLOCK_RETRY_THRESHOLD aborts the waiter.
pub struct LockManager {
    state: Mutex<State>,
}

impl LockManager {
    pub fn new() -> Self {
        LockManager {
            state: Mutex::new(State {
                pages: HashMap::new(),
                held_by: HashMap::new(),
                wait_counts: HashMap::new(),
            }),
        }
    }

    // Acquires `mode` on `pid` for `tid`, blocking (and retrying) until
    // granted or until the wait counter crosses the deadlock threshold.
    pub fn acquire(&self, tid: TransactionId, pid: PageId, mode: LockMode) -> Result<()> {
        loop {
            {
                let mut state = self.state.lock().unwrap();
                if Self::try_grant(&mut state, tid, pid, mode) {
                    state.wait_counts.remove(&tid);
                    debug!("{:?} granted {:?} on {:?}", tid, mode, pid);
                    return Ok(());
                }
                let count = state.wait_counts.entry(tid).or_insert(0);
                *count += 1;
                if *count > DEADLOCK_RETRY_THRESHOLD {
                    state.wait_counts.remove(&tid);
                    warn!("{:?} deadlocked waiting for {:?} on {:?}", tid, mode, pid);
                    return Err(DbError::Deadlock(pid));
                }
            }
            thread::sleep(Duration::from_millis(LOCK_WAIT_MS));
        }
    }

    // Attempts to grant `mode` to `tid` on `pid` without blocking, recording
    // it if granted.
    fn try_grant(state: &mut State, tid: TransactionId, pid: PageId, mode: LockMode) -> bool {
        let locks = state.pages.entry(pid).or_default();

        let granted = match mode {
            LockMode::Shared => {
                locks.exclusive.is_none() || locks.exclusive == Some(tid)
            }
            LockMode::Exclusive => {
                if locks.exclusive == Some(tid) {
                    true
                } else if locks.exclusive.is_some() {
                    false
                } else {
                    // Upgrade: sole shared holder may become exclusive.
                    locks.shared.is_empty()
                        || (locks.shared.len() == 1 && locks.shared.contains(&tid))
                }
            }
        };

        if !granted {
            return false;
        }

        match mode {
            LockMode::Shared => {
                locks.shared.insert(tid);
            }
            LockMode::Exclusive => {
                locks.shared.remove(&tid);
                locks.exclusive = Some(tid);
            }
        }
        state.held_by.entry(tid).or_default().insert(pid);
        true
    }

    // Releases whatever lock `tid` holds on `pid`, regardless of mode.
    //
    // Hazardous: breaks strict 2PL if called before commit/abort. The only
    // caller in this crate is HeapFile::insert_tuple's free-slot probe,
    // which only ever reads page metadata through this lock; do not expose
    // this as a general API.
    pub(crate) fn release(&self, tid: TransactionId, pid: PageId) {
        let mut state = self.state.lock().unwrap();
        if let Some(locks) = state.pages.get_mut(&pid) {
            locks.shared.remove(&tid);
            if locks.exclusive == Some(tid) {
                locks.exclusive = None;
            }
            if locks.is_empty() {
                state.pages.remove(&pid);
            }
        }
        if let Some(pids) = state.held_by.get_mut(&tid) {
            pids.remove(&pid);
        }
    }

    pub fn release_all(&self, tid: TransactionId) {
        let mut state = self.state.lock().unwrap();
        let pids = state.held_by.remove(&tid).unwrap_or_default();
        for pid in pids {
            if let Some(locks) = state.pages.get_mut(&pid) {
                locks.shared.remove(&tid);
                if locks.exclusive == Some(tid) {
                    locks.exclusive = None;
                }
                if locks.is_empty() {
                    state.pages.remove(&pid);
                }
            }
        }
        state.wait_counts.remove(&tid);
    }

    pub fn holds_lock(&self, tid: TransactionId, pid: PageId) -> bool {
        let state = self.state.lock().unwrap();
        state
            .pages
            .get(&pid)
            .map(|locks| locks.exclusive == Some(tid) || locks.shared.contains(&tid))
            .unwrap_or(false)
    }

    pub fn locked_pages(&self, tid: TransactionId) -> HashSet<PageId> {
        let state = self.state.lock().unwrap();
        state.held_by.get(&tid).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn pid(n: i32) -> PageId {
        (0, n)
    }

    #[test]
    fn shared_locks_coexist() {
        let lm = LockManager::new();
        let t1 = TransactionId::start();
        let t2 = TransactionId::start();
        lm.acquire(t1, pid(0), LockMode::Shared).unwrap();
        lm.acquire(t2, pid(0), LockMode::Shared).unwrap();
        assert!(lm.holds_lock(t1, pid(0)));
        assert!(lm.holds_lock(t2, pid(0)));
    }

    #[test]
    fn exclusive_excludes_others() {
        let lm = Arc::new(LockManager::new());
        let t1 = TransactionId::start();
        let t2 = TransactionId::start();
        lm.acquire(t1, pid(0), LockMode::Exclusive).unwrap();

        let lm2 = Arc::clone(&lm);
        let handle = thread::spawn(move || lm2.acquire(t2, pid(0), LockMode::Exclusive));
        thread::sleep(Duration::from_millis(50));
        assert!(!handle.is_finished());

        lm.release_all(t1);
        handle.join().unwrap().unwrap();
        assert!(lm.holds_lock(t2, pid(0)));
    }

    #[test]
    fn sole_shared_holder_upgrades_to_exclusive() {
        let lm = LockManager::new();
        let t1 = TransactionId::start();
        lm.acquire(t1, pid(0), LockMode::Shared).unwrap();
        lm.acquire(t1, pid(0), LockMode::Exclusive).unwrap();
        assert!(lm.holds_lock(t1, pid(0)));
    }

    #[test]
    fn contended_upgrade_eventually_deadlocks() {
        let lm = LockManager::new();
        let t1 = TransactionId::start();
        let t2 = TransactionId::start();
        lm.acquire(t1, pid(0), LockMode::Shared).unwrap();
        lm.acquire(t2, pid(0), LockMode::Shared).unwrap();
        let result = lm.acquire(t1, pid(0), LockMode::Exclusive);
        assert!(matches!(result, Err(DbError::Deadlock(_))));
    }

    // T1 holds S(A) and wants X(B); T2 holds S(B) and wants X(A) -- a
    // classic cross deadlock. Exactly one side must be aborted within
    // bounded time; the other then completes. Mirrors how
    // BufferPool::get_page reacts to Deadlock: release every lock the
    // aborted side holds as soon as its acquire fails, so the survivor's
    // next retry can succeed.
    #[test]
    fn cross_deadlock_aborts_exactly_one_side() {
        let lm = Arc::new(LockManager::new());
        let t1 = TransactionId::start();
        let t2 = TransactionId::start();
        lm.acquire(t1, pid(0), LockMode::Shared).unwrap(); // T1 holds A
        lm.acquire(t2, pid(1), LockMode::Shared).unwrap(); // T2 holds B

        let lm1 = Arc::clone(&lm);
        let h1 = thread::spawn(move || {
            let result = lm1.acquire(t1, pid(1), LockMode::Exclusive); // T1 wants B
            if result.is_err() {
                lm1.release_all(t1);
            }
            result
        });
        let lm2 = Arc::clone(&lm);
        let h2 = thread::spawn(move || {
            let result = lm2.acquire(t2, pid(0), LockMode::Exclusive); // T2 wants A
            if result.is_err() {
                lm2.release_all(t2);
            }
            result
        });

        let r1 = h1.join().unwrap();
        let r2 = h2.join().unwrap();
        let aborted = [&r1, &r2].iter().filter(|r| matches!(r, Err(DbError::Deadlock(_)))).count();
        let granted = [&r1, &r2].iter().filter(|r| r.is_ok()).count();
        assert_eq!(aborted, 1);
        assert_eq!(granted, 1);
    }

    #[test]
    fn release_all_frees_every_page() {
        let lm = LockManager::new();
        let t1 = TransactionId::start();
        lm.acquire(t1, pid(0), LockMode::Shared).unwrap();
        lm.acquire(t1, pid(1), LockMode::Exclusive).unwrap();
        lm.release_all(t1);
        assert!(!lm.holds_lock(t1, pid(0)));
        assert!(!lm.holds_lock(t1, pid(1)));
        assert!(lm.locked_pages(t1).is_empty());
    }
}
