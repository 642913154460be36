use thiserror::Error;

use crate::common::PageId;

// Every fallible operation in this crate returns one of these. Nothing
// downstream of the buffer pool panics on an expected condition.
#[derive(Error, Debug)]
pub enum DbError {
    // The current transaction must roll back. Always propagated to the top
    // of the iterator stack, whose caller must call
    // `transaction_complete(tid, commit = false)`.
    #[error("transaction aborted")]
    TransactionAborted,

    // Raised inside the lock manager when a transaction's consecutive-wait
    // counter crosses the retry threshold. Always translated into
    // `TransactionAborted` by the time it reaches `BufferPool::get_page`.
    #[error("deadlock detected while waiting for lock on {0:?}")]
    Deadlock(PageId),

    // Buffer full with every resident page dirty, schema mismatch, tuple
    // not found on its stated page, operator protocol misuse, and similar
    // logic errors.
    #[error("{0}")]
    DbLogicError(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    // Iterator exhausted; raised only when `next` is called past the end,
    // never by `has_next`.
    #[error("no such element")]
    NoSuchElement,

    // Schema index out of range, unsupported aggregate/type combination,
    // inverted histogram bounds, and similar caller errors.
    #[error("illegal argument: {0}")]
    IllegalArgument(String),
}

pub type Result<T> = std::result::Result<T, DbError>;
