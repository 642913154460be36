// Pull-based query operators: the iterator tree that sits above the
// buffer pool / lock manager / heap file substrate.
//
// Every operator implements `open, has_next, next, rewind, close, schema`.
// Children are plain struct fields filled in once at construction --
// operators form a DAG rooted at the query top and are never rewired after
// being built (see `Join`, which owns its left/right children directly
// rather than through a mutable accessor).

use crate::error::Result;
use crate::schema::Schema;
use crate::tuple::Tuple;

pub mod aggregate;
pub mod delete;
pub mod filter;
pub mod insert;
pub mod join;
pub mod seq_scan;

pub use aggregate::{AggOp, Aggregate};
pub use delete::Delete;
pub use filter::{Filter, Predicate};
pub use insert::Insert;
pub use join::{Join, JoinPredicate};
pub use seq_scan::SeqScan;

// A node in the query operator tree.
//
// `next` fails with `DbError::TransactionAborted` whenever the underlying
// buffer-pool access aborts; operators never swallow that error, they
// propagate it straight to the caller, who must end the transaction.
pub trait Operator {
    fn open(&mut self) -> Result<()>;
    fn has_next(&mut self) -> Result<bool>;
    fn next(&mut self) -> Result<Tuple>;
    fn rewind(&mut self) -> Result<()>;
    fn close(&mut self);
    fn schema(&self) -> &Schema;
}
