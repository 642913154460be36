use super::Operator;
use crate::error::{DbError, Result};
use crate::fields::{CompareOp, Field};
use crate::schema::Schema;
use crate::tuple::Tuple;

// A single-field comparison against a constant, applied by `Filter`.
pub struct Predicate {
    pub field_idx: usize,
    pub op: CompareOp,
    pub value: Field,
}

impl Predicate {
    pub fn new(field_idx: usize, op: CompareOp, value: Field) -> Self {
        Predicate { field_idx, op, value }
    }

    fn matches(&self, tuple: &Tuple) -> Result<bool> {
        let field = tuple.field(self.field_idx).ok_or_else(|| {
            DbError::IllegalArgument(format!("field index {} out of range", self.field_idx))
        })?;
        Ok(field.compare(self.op, &self.value))
    }
}

// Drains its child until a tuple satisfies `predicate`, or EOF.
pub struct Filter {
    child: Box<dyn Operator>,
    predicate: Predicate,
    pending: Option<Tuple>,
    opened: bool,
}

impl Filter {
    pub fn new(child: Box<dyn Operator>, predicate: Predicate) -> Self {
        Filter {
            child,
            predicate,
            pending: None,
            opened: false,
        }
    }

    fn fetch_next(&mut self) -> Result<Option<Tuple>> {
        while self.child.has_next()? {
            let tuple = self.child.next()?;
            if self.predicate.matches(&tuple)? {
                return Ok(Some(tuple));
            }
        }
        Ok(None)
    }
}

impl Operator for Filter {
    fn open(&mut self) -> Result<()> {
        self.child.open()?;
        self.pending = None;
        self.opened = true;
        Ok(())
    }

    fn has_next(&mut self) -> Result<bool> {
        if !self.opened {
            return Err(DbError::DbLogicError("has_next called before open".into()));
        }
        if self.pending.is_none() {
            self.pending = self.fetch_next()?;
        }
        Ok(self.pending.is_some())
    }

    fn next(&mut self) -> Result<Tuple> {
        if !self.opened {
            return Err(DbError::DbLogicError("next called before open".into()));
        }
        if self.pending.is_none() {
            self.pending = self.fetch_next()?;
        }
        self.pending.take().ok_or(DbError::NoSuchElement)
    }

    fn rewind(&mut self) -> Result<()> {
        self.child.rewind()?;
        self.pending = None;
        Ok(())
    }

    fn close(&mut self) {
        self.child.close();
        self.opened = false;
    }

    fn schema(&self) -> &Schema {
        self.child.schema()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer_pool::{BufferPool, BufferPoolConfig};
    use crate::heap_file::HeapFile;
    use crate::operators::SeqScan;
    use crate::transaction::TransactionId;
    use crate::types::Type;
    use std::sync::Arc;
    use tempfile::tempdir;

    #[test]
    fn passes_through_only_matching_tuples() {
        let dir = tempdir().unwrap();
        let schema = Schema::with_names(vec![(Type::Int, "a")]);
        let file = Arc::new(HeapFile::new(dir.path().join("t.dat"), schema.clone()).unwrap());
        let bp = Arc::new(BufferPool::new(BufferPoolConfig { capacity: 10 }));
        bp.register_file(&file);
        let tid = TransactionId::start();
        for i in 0..5 {
            file.insert_tuple(&bp, tid, Tuple::new(vec![Field::Int(i)], &schema))
                .unwrap();
        }

        let scan = SeqScan::new(Arc::clone(&file), Arc::clone(&bp), tid);
        let mut filter = Filter::new(
            Box::new(scan),
            Predicate::new(0, CompareOp::Gt, Field::Int(2)),
        );
        filter.open().unwrap();
        let mut seen = vec![];
        while filter.has_next().unwrap() {
            seen.push(filter.next().unwrap().field(0).unwrap().as_int().unwrap());
        }
        seen.sort();
        assert_eq!(seen, vec![3, 4]);
    }
}
