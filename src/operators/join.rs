use super::Operator;
use crate::error::{DbError, Result};
use crate::fields::CompareOp;
use crate::schema::Schema;
use crate::tuple::Tuple;

// `lhs.field(left_field) <op> rhs.field(right_field)`, evaluated for every
// pair of left/right tuples in the nested-loop scan.
pub struct JoinPredicate {
    pub left_field: usize,
    pub op: CompareOp,
    pub right_field: usize,
}

impl JoinPredicate {
    pub fn new(left_field: usize, op: CompareOp, right_field: usize) -> Self {
        JoinPredicate {
            left_field,
            op,
            right_field,
        }
    }
}

// Nested-loop join: for each left tuple, rewinds and scans the right child
// looking for matches. Output schema is the concatenation of both
// children's schemas.
pub struct Join {
    left: Box<dyn Operator>,
    right: Box<dyn Operator>,
    predicate: JoinPredicate,
    schema: Schema,
    current_left: Option<Tuple>,
    pending: Option<Tuple>,
    opened: bool,
}

impl Join {
    pub fn new(left: Box<dyn Operator>, right: Box<dyn Operator>, predicate: JoinPredicate) -> Self {
        let schema = Schema::concat(left.schema(), right.schema());
        Join {
            left,
            right,
            predicate,
            schema,
            current_left: None,
            pending: None,
            opened: false,
        }
    }

    fn fetch_next(&mut self) -> Result<Option<Tuple>> {
        loop {
            if self.current_left.is_none() {
                if !self.left.has_next()? {
                    return Ok(None);
                }
                self.current_left = Some(self.left.next()?);
                self.right.rewind()?;
            }

            let left_tuple = self.current_left.as_ref().unwrap();
            while self.right.has_next()? {
                let right_tuple = self.right.next()?;
                let lf = left_tuple.field(self.predicate.left_field).ok_or_else(|| {
                    DbError::IllegalArgument(format!(
                        "left field index {} out of range",
                        self.predicate.left_field
                    ))
                })?;
                let rf = right_tuple.field(self.predicate.right_field).ok_or_else(|| {
                    DbError::IllegalArgument(format!(
                        "right field index {} out of range",
                        self.predicate.right_field
                    ))
                })?;
                if lf.compare(self.predicate.op, rf) {
                    return Ok(Some(Tuple::concat(left_tuple, &right_tuple)));
                }
            }
            // Right side exhausted for this left tuple; advance.
            self.current_left = None;
        }
    }
}

impl Operator for Join {
    fn open(&mut self) -> Result<()> {
        self.left.open()?;
        self.right.open()?;
        self.current_left = None;
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
        self.left.rewind()?;
        self.right.rewind()?;
        self.current_left = None;
        self.pending = None;
        Ok(())
    }

    fn close(&mut self) {
        self.left.close();
        self.right.close();
        self.opened = false;
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer_pool::{BufferPool, BufferPoolConfig};
    use crate::fields::Field;
    use crate::heap_file::HeapFile;
    use crate::operators::SeqScan;
    use crate::transaction::TransactionId;
    use crate::types::Type;
    use std::sync::Arc;
    use tempfile::tempdir;

    #[test]
    fn nested_loop_join_matches_on_equality() {
        let dir = tempdir().unwrap();
        let schema = Schema::with_names(vec![(Type::Int, "id")]);
        let bp = Arc::new(BufferPool::new(BufferPoolConfig { capacity: 10 }));
        let tid = TransactionId::start();

        let left_file = Arc::new(HeapFile::new(dir.path().join("l.dat"), schema.clone()).unwrap());
        bp.register_file(&left_file);
        for i in 0..3 {
            left_file
                .insert_tuple(&bp, tid, Tuple::new(vec![Field::Int(i)], &schema))
                .unwrap();
        }
        let right_file = Arc::new(HeapFile::new(dir.path().join("r.dat"), schema.clone()).unwrap());
        bp.register_file(&right_file);
        for i in [1, 2, 2, 5] {
            right_file
                .insert_tuple(&bp, tid, Tuple::new(vec![Field::Int(i)], &schema))
                .unwrap();
        }

        let left = SeqScan::new(Arc::clone(&left_file), Arc::clone(&bp), tid);
        let right = SeqScan::new(Arc::clone(&right_file), Arc::clone(&bp), tid);
        let mut join = Join::new(
            Box::new(left),
            Box::new(right),
            JoinPredicate::new(0, CompareOp::Eq, 0),
        );
        join.open().unwrap();
        let mut count = 0;
        while join.has_next().unwrap() {
            join.next().unwrap();
            count += 1;
        }
        // (1,1), (2,2), (2,2) -> 3 matches
        assert_eq!(count, 3);
    }
}
