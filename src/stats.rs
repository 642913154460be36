use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use lazy_static::lazy_static;
use log::debug;

use crate::buffer_pool::BufferPool;
use crate::common::TableId;
use crate::error::Result;
use crate::fields::{CompareOp, Field};
use crate::heap_file::HeapFile;
use crate::histogram::{IntHistogram, StringHistogram};
use crate::operators::{Operator, SeqScan};
use crate::schema::Schema;
use crate::transaction::TransactionId;
use crate::types::Type;

// Bucket count every histogram `TableStats` builds is constructed with.
const NUM_HISTOGRAM_BUCKETS: usize = 100;

enum ColumnHistogram {
    Int(IntHistogram),
    Str(StringHistogram),
}

impl ColumnHistogram {
    fn add(&mut self, field: &Field) {
        match (self, field) {
            (ColumnHistogram::Int(h), Field::Int(v)) => h.add_value(*v),
            (ColumnHistogram::Str(h), Field::String(s)) => h.add_value(s.value()),
            _ => {}
        }
    }

    fn estimate(&self, op: CompareOp, field: &Field) -> f64 {
        match (self, field) {
            (ColumnHistogram::Int(h), Field::Int(v)) => h.estimate(op, *v),
            (ColumnHistogram::Str(h), Field::String(s)) => h.estimate(op, s.value()),
            _ => 0.0,
        }
    }
}

// Per-column histograms and scan-cost estimate for one table, built by two
// full scans: the first to learn integer columns' `(min, max)`, the second
// to populate every column's histogram.
pub struct TableStats {
    table_id: TableId,
    histograms: Vec<ColumnHistogram>,
    num_tuples: u64,
    io_cost_per_page: f64,
}

impl TableStats {
    // Scans `file` twice, each scan under its own committed transaction,
    // to build one histogram per column.
    pub fn compute(file: &Arc<HeapFile>, bp: &Arc<BufferPool>, io_cost_per_page: f64) -> Result<Self> {
        let schema = file.schema().clone();

        let mut minmax: Vec<Option<(i32, i32)>> = vec![None; schema.num_fields()];
        let first_scan_tid = TransactionId::start();
        {
            let mut scan = SeqScan::new(Arc::clone(file), Arc::clone(bp), first_scan_tid);
            scan.open()?;
            while scan.has_next()? {
                let tuple = scan.next()?;
                for (i, field) in tuple.fields().iter().enumerate() {
                    if let Field::Int(v) = field {
                        minmax[i] = Some(match minmax[i] {
                            Some((lo, hi)) => (lo.min(*v), hi.max(*v)),
                            None => (*v, *v),
                        });
                    }
                }
            }
            scan.close();
        }
        bp.transaction_complete(first_scan_tid, true);

        let mut histograms = Vec::with_capacity(schema.num_fields());
        for (i, ty) in schema.types().iter().enumerate() {
            histograms.push(match ty {
                Type::Int => {
                    let (lo, hi) = minmax[i].unwrap_or((0, 0));
                    ColumnHistogram::Int(IntHistogram::new(NUM_HISTOGRAM_BUCKETS, lo, hi)?)
                }
                Type::String(_) => ColumnHistogram::Str(StringHistogram::new()),
            });
        }

        let second_scan_tid = TransactionId::start();
        let mut num_tuples = 0u64;
        {
            let mut scan = SeqScan::new(Arc::clone(file), Arc::clone(bp), second_scan_tid);
            scan.open()?;
            while scan.has_next()? {
                let tuple = scan.next()?;
                for (i, field) in tuple.fields().iter().enumerate() {
                    histograms[i].add(field);
                }
                num_tuples += 1;
            }
            scan.close();
        }
        bp.transaction_complete(second_scan_tid, true);

        debug!(
            "built table stats for table {}: {} tuples",
            file.id(),
            num_tuples
        );

        Ok(TableStats {
            table_id: file.id(),
            histograms,
            num_tuples,
            io_cost_per_page,
        })
    }

    pub fn estimate_scan_cost(&self) -> f64 {
        self.num_tuples as f64 * self.io_cost_per_page
    }

    pub fn estimate_selectivity(&self, field_idx: usize, op: CompareOp, value: &Field) -> Result<f64> {
        let histogram = self.histograms.get(field_idx).ok_or_else(|| {
            crate::error::DbError::IllegalArgument(format!("field index {} out of range", field_idx))
        })?;
        Ok(histogram.estimate(op, value))
    }

    pub fn table_id(&self) -> TableId {
        self.table_id
    }

    pub fn num_tuples(&self) -> u64 {
        self.num_tuples
    }
}

lazy_static! {
    // Process-wide `tablename -> TableStats` registry, populated explicitly
    // by the catalog loader at startup. Mirrors the `database::get_global_db`
    // singleton pattern already used for the buffer pool/catalog.
    static ref REGISTRY: RwLock<HashMap<String, Arc<TableStats>>> = RwLock::new(HashMap::new());
}

pub fn register(table_name: &str, stats: TableStats) {
    REGISTRY
        .write()
        .unwrap()
        .insert(table_name.to_string(), Arc::new(stats));
}

pub fn get(table_name: &str) -> Option<Arc<TableStats>> {
    REGISTRY.read().unwrap().get(table_name).cloned()
}
