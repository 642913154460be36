use std::collections::HashMap;

use super::Operator;
use crate::error::{DbError, Result};
use crate::fields::Field;
use crate::schema::Schema;
use crate::tuple::Tuple;
use crate::types::Type;

// String-valued aggregate fields only ever support `Count`; `Aggregate::new`
// rejects any other combination with `IllegalArgument`.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum AggOp {
    Min,
    Max,
    Sum,
    Avg,
    Count,
}

#[derive(Default, Clone)]
struct Accumulator {
    sum: i64,
    count: i64,
    min: Option<i32>,
    max: Option<i32>,
}

impl Accumulator {
    fn update(&mut self, field: &Field) {
        self.count += 1;
        if let Field::Int(v) = field {
            self.sum += *v as i64;
            self.min = Some(self.min.map_or(*v, |m| m.min(*v)));
            self.max = Some(self.max.map_or(*v, |m| m.max(*v)));
        }
    }

    fn finalize(&self, op: AggOp) -> Result<Field> {
        match op {
            AggOp::Count => Ok(Field::Int(self.count as i32)),
            AggOp::Sum => Ok(Field::Int(self.sum as i32)),
            AggOp::Min => self
                .min
                .map(Field::Int)
                .ok_or_else(|| DbError::IllegalArgument("MIN over an empty group".into())),
            AggOp::Max => self
                .max
                .map(Field::Int)
                .ok_or_else(|| DbError::IllegalArgument("MAX over an empty group".into())),
            AggOp::Avg => {
                if self.count == 0 {
                    return Err(DbError::IllegalArgument("AVG over an empty group".into()));
                }
                // Integer division truncated toward zero.
                Ok(Field::Int((self.sum / self.count) as i32))
            }
        }
    }
}

// A hashable stand-in for a grouping `Field`. `Field` itself only derives
// `PartialEq` (see fields.rs); this mirrors its two variants with `Hash` so
// they can key the group-by map.
#[derive(PartialEq, Eq, Hash, Clone)]
enum GroupKey {
    None,
    Int(i32),
    Str(String),
}

impl GroupKey {
    fn from_field(field: Option<&Field>) -> Self {
        match field {
            None => GroupKey::None,
            Some(Field::Int(v)) => GroupKey::Int(*v),
            Some(Field::String(s)) => GroupKey::Str(s.value().to_string()),
        }
    }
}

// Drains its child fully on `open` into a `group_value -> accumulator`
// map, then emits one `(group, agg)` tuple per group (or a single `(agg)`
// tuple when there is no grouping field). Group iteration order is not
// guaranteed; callers that care about order must sort downstream.
pub struct Aggregate {
    child: Box<dyn Operator>,
    agg_field: usize,
    group_field: Option<usize>,
    op: AggOp,
    schema: Schema,
    results: Vec<Tuple>,
    cursor: usize,
    opened: bool,
}

impl Aggregate {
    pub fn new(
        child: Box<dyn Operator>,
        agg_field: usize,
        group_field: Option<usize>,
        op: AggOp,
    ) -> Result<Self> {
        let agg_type = child.schema().field_type(agg_field).ok_or_else(|| {
            DbError::IllegalArgument(format!("aggregate field index {} out of range", agg_field))
        })?;
        if matches!(agg_type, Type::String(_)) && op != AggOp::Count {
            return Err(DbError::IllegalArgument(
                "string columns only support COUNT".to_string(),
            ));
        }
        if let Some(idx) = group_field {
            if child.schema().field_type(idx).is_none() {
                return Err(DbError::IllegalArgument(format!(
                    "group field index {} out of range",
                    idx
                )));
            }
        }

        let schema = match group_field {
            Some(idx) => Schema::new(
                vec![child.schema().field_type(idx).unwrap(), Type::Int],
                vec![
                    child.schema().field_name(idx).map(str::to_string),
                    Some("agg".to_string()),
                ],
            ),
            None => Schema::with_names(vec![(Type::Int, "agg")]),
        };

        Ok(Aggregate {
            child,
            agg_field,
            group_field,
            op,
            schema,
            results: Vec::new(),
            cursor: 0,
            opened: false,
        })
    }

    fn drain_and_compute(&mut self) -> Result<()> {
        let mut groups: HashMap<GroupKey, (Option<Field>, Accumulator)> = HashMap::new();
        self.child.open()?;
        while self.child.has_next()? {
            let tuple = self.child.next()?;
            let group_value = self.group_field.and_then(|idx| tuple.field(idx)).cloned();
            let key = GroupKey::from_field(group_value.as_ref());
            let entry = groups.entry(key).or_insert_with(|| (group_value, Accumulator::default()));
            let agg_value = tuple.field(self.agg_field).ok_or_else(|| {
                DbError::IllegalArgument(format!("aggregate field index {} out of range", self.agg_field))
            })?;
            entry.1.update(agg_value);
        }
        self.child.close();

        self.results = groups
            .into_values()
            .map(|(group_value, acc)| {
                let agg_field = acc.finalize(self.op)?;
                let fields = match group_value {
                    Some(g) => vec![g, agg_field],
                    None => vec![agg_field],
                };
                Ok(Tuple::new(fields, &self.schema))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(())
    }
}

impl Operator for Aggregate {
    fn open(&mut self) -> Result<()> {
        self.drain_and_compute()?;
        self.cursor = 0;
        self.opened = true;
        Ok(())
    }

    fn has_next(&mut self) -> Result<bool> {
        if !self.opened {
            return Err(DbError::DbLogicError("has_next called before open".into()));
        }
        Ok(self.cursor < self.results.len())
    }

    fn next(&mut self) -> Result<Tuple> {
        if !self.opened {
            return Err(DbError::DbLogicError("next called before open".into()));
        }
        let tuple = self.results.get(self.cursor).cloned().ok_or(DbError::NoSuchElement)?;
        self.cursor += 1;
        Ok(tuple)
    }

    fn rewind(&mut self) -> Result<()> {
        self.cursor = 0;
        Ok(())
    }

    fn close(&mut self) {
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
    use crate::heap_file::HeapFile;
    use crate::operators::SeqScan;
    use crate::transaction::TransactionId;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn schema() -> Schema {
        Schema::with_names(vec![(Type::Int, "grp"), (Type::Int, "val")])
    }

    #[test]
    fn avg_groups_and_truncates_toward_zero() {
        let dir = tempdir().unwrap();
        let schema = schema();
        let bp = Arc::new(BufferPool::new(BufferPoolConfig { capacity: 10 }));
        let tid = TransactionId::start();
        let file = Arc::new(HeapFile::new(dir.path().join("t.dat"), schema.clone()).unwrap());
        bp.register_file(&file);
        for (g, v) in [(1, 10), (1, 20), (2, 5), (2, 5), (2, 20)] {
            file.insert_tuple(&bp, tid, Tuple::new(vec![Field::Int(g), Field::Int(v)], &schema))
                .unwrap();
        }

        let scan = SeqScan::new(Arc::clone(&file), Arc::clone(&bp), tid);
        let mut agg = Aggregate::new(Box::new(scan), 1, Some(0), AggOp::Avg).unwrap();
        agg.open().unwrap();
        let mut seen = vec![];
        while agg.has_next().unwrap() {
            let tuple = agg.next().unwrap();
            seen.push((
                tuple.field(0).unwrap().as_int().unwrap(),
                tuple.field(1).unwrap().as_int().unwrap(),
            ));
        }
        seen.sort();
        assert_eq!(seen, vec![(1, 15), (2, 10)]);
    }

    #[test]
    fn string_aggregate_rejects_non_count() {
        let dir = tempdir().unwrap();
        let schema = Schema::with_names(vec![(Type::String(8), "name")]);
        let bp = Arc::new(BufferPool::new(BufferPoolConfig { capacity: 10 }));
        let tid = TransactionId::start();
        let file = Arc::new(HeapFile::new(dir.path().join("t.dat"), schema.clone()).unwrap());
        let scan = SeqScan::new(file, bp, tid);
        let result = Aggregate::new(Box::new(scan), 0, None, AggOp::Sum);
        assert!(matches!(result, Err(DbError::IllegalArgument(_))));
    }
}
