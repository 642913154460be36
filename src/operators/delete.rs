use std::sync::Arc;

use lazy_static::lazy_static;

use super::Operator;
use crate::buffer_pool::BufferPool;
use crate::error::{DbError, Result};
use crate::fields::Field;
use crate::schema::Schema;
use crate::transaction::TransactionId;
use crate::tuple::Tuple;
use crate::types::Type;

lazy_static! {
    static ref COUNT_SCHEMA: Schema = Schema::with_names(vec![(Type::Int, "count")]);
}

// Analogous to `Insert`: drains its child on `open`, deleting each tuple
// (via its `RecordId`) through the buffer pool, and exposes the count of
// tuples deleted as its sole result tuple.
pub struct Delete {
    child: Box<dyn Operator>,
    bp: Arc<BufferPool>,
    tid: TransactionId,
    result: Option<Tuple>,
    opened: bool,
}

impl Delete {
    pub fn new(child: Box<dyn Operator>, bp: Arc<BufferPool>, tid: TransactionId) -> Self {
        Delete {
            child,
            bp,
            tid,
            result: None,
            opened: false,
        }
    }
}

impl Operator for Delete {
    fn open(&mut self) -> Result<()> {
        self.child.open()?;
        let mut count = 0i32;
        while self.child.has_next()? {
            let tuple = self.child.next()?;
            let table_id = tuple
                .record_id()
                .map(|rid| rid.page_id().0)
                .ok_or_else(|| DbError::DbLogicError("tuple has no record id to delete".into()))?;
            self.bp.delete_tuple(self.tid, table_id, &tuple)?;
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
            "Delete cannot be rewound: it has already performed its writes".into(),
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer_pool::BufferPoolConfig;
    use crate::heap_file::HeapFile;
    use crate::operators::SeqScan;
    use tempfile::tempdir;

    #[test]
    fn deletes_every_tuple_scanned_by_its_child() {
        let dir = tempdir().unwrap();
        let schema = Schema::with_names(vec![(Type::Int, "a")]);
        let bp = Arc::new(BufferPool::new(BufferPoolConfig { capacity: 10 }));
        let tid = TransactionId::start();

        let file = Arc::new(HeapFile::new(dir.path().join("t.dat"), schema.clone()).unwrap());
        bp.register_file(&file);
        for i in 0..3 {
            file.insert_tuple(&bp, tid, Tuple::new(vec![Field::Int(i)], &schema))
                .unwrap();
        }

        let scan = SeqScan::new(Arc::clone(&file), Arc::clone(&bp), tid);
        let mut delete = Delete::new(Box::new(scan), Arc::clone(&bp), tid);
        delete.open().unwrap();
        let result = delete.next().unwrap();
        assert_eq!(result.field(0).unwrap().as_int().unwrap(), 3);

        let mut rescan = SeqScan::new(Arc::clone(&file), Arc::clone(&bp), tid);
        rescan.open().unwrap();
        assert!(!rescan.has_next().unwrap());
    }
}
