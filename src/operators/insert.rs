use std::sync::Arc;

use lazy_static::lazy_static;

use super::Operator;
use crate::buffer_pool::BufferPool;
use crate::common::TableId;
use crate::error::{DbError, Result};
use crate::fields::Field;
use crate::schema::Schema;
use crate::transaction::TransactionId;
use crate::tuple::Tuple;
use crate::types::Type;

lazy_static! {
    static ref COUNT_SCHEMA: Schema = Schema::with_names(vec![(Type::Int, "count")]);
}

// Drains its child on `open`, inserting every tuple into `table_id` through
// the buffer pool, and exposes exactly one result tuple: the number
// inserted. A failure partway through (including `TransactionAborted`)
// propagates immediately -- there is no partial-success count.
pub struct Insert {
    child: Box<dyn Operator>,
    bp: Arc<BufferPool>,
    tid: TransactionId,
    table_id: TableId,
    result: Option<Tuple>,
    opened: bool,
}

impl Insert {
    pub fn new(child: Box<dyn Operator>, bp: Arc<BufferPool>, tid: TransactionId, table_id: TableId) -> Self {
        Insert {
            child,
            bp,
            tid,
            table_id,
            result: None,
            opened: false,
        }
    }
}

impl Operator for Insert {
    fn open(&mut self) -> Result<()> {
        self.child.open()?;
        let mut count = 0i32;
        while self.child.has_next()? {
            let tuple = self.child.next()?;
            self.bp.insert_tuple(self.tid, self.table_id, tuple)?;
            count += 1;
        }
        self.result = Some(Tuple::new(vec![Field::Int(count)], &COUNT_SCHEMA));
        self.opened = true;
        Ok(())
    }

    fn has_next(&mut self) -> Result<bool> {
        if !self.opened {
            return Err(DbError::DbLogicError("has_next called before open".into()));
        }
        Ok(self.result.is_some())
    }

    fn next(&mut self) -> Result<Tuple> {
        if !self.opened {
            return Err(DbError::DbLogicError("next called before open".into()));
        }
        self.result.take().ok_or(DbError::NoSuchElement)
    }

    fn rewind(&mut self) -> Result<()> {
        Err(DbError::DbLogicError(
            "Insert cannot be rewound: it has already performed its writes".into(),
        ))
    }

    fn close(&mut self) {
        self.child.close();
        self.opened = false;
    }

    fn schema(&self) -> &Schema {
        &COUNT_SCHEMA
    }
}
