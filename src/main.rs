mod buffer_pool;
mod catalog;
mod common;
mod database;
mod error;
mod fields;
mod heap_file;
mod heap_page;
mod histogram;
mod lock_manager;
mod operators;
mod schema;
mod stats;
mod transaction;
mod tuple;
mod types;

use std::sync::Arc;
use std::thread;

use fields::Field;
use heap_file::HeapFile;
use operators::{AggOp, Aggregate, Filter, Operator, Predicate, SeqScan};
use schema::Schema;
use transaction::TransactionId;
use tuple::Tuple;
use types::Type;

// Bootstraps a tiny demo table, inserts a few rows from concurrent
// transactions, then runs a filter + aggregate pipeline over the result.
// The catalog/schema loading this would normally front is stubbed out
// here with a single hardcoded table.
fn main() {
    env_logger::init();

    let data_dir = std::env::temp_dir().join("rustic_db_demo");
    std::fs::create_dir_all(&data_dir).expect("failed to create demo data directory");

    let db = database::get_global_db();
    let schema = Schema::with_names(vec![(Type::Int, "id"), (Type::String(16), "name")]);
    let file = HeapFile::new(data_dir.join("employees.dat"), schema.clone())
        .expect("failed to open demo heap file");
    let table_id = db.catalog().add_table("employees", file);

    println!("table id: {}", table_id);

    let handles: Vec<_> = (0..3)
        .map(|worker| {
            let schema = schema.clone();
            thread::spawn(move || {
                let db = database::get_global_db();
                let bp = db.buffer_pool();
                let tid = TransactionId::start();
                for i in 0..3 {
                    let name = format!("W{}_{}", worker, i);
                    let tuple = Tuple::new(
                        vec![
                            Field::Int(worker * 10 + i),
                            Field::String(fields::StringField::new(name, 16)),
                        ],
                        &schema,
                    );
                    bp.insert_tuple(tid, table_id, tuple)
                        .expect("insert should not abort in this uncontended demo");
                }
                bp.transaction_complete(tid, true);
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let bp = db.buffer_pool();
    let file = db.catalog().file(table_id).unwrap();

    // Filter to workers 1 and 2's rows, then count them per worker group.
    let read_tid = TransactionId::start();
    let scan = SeqScan::new(Arc::clone(&file), Arc::clone(&bp), read_tid);
    let filter = Filter::new(
        Box::new(scan),
        Predicate::new(0, fields::CompareOp::Ge, Field::Int(10)),
    );
    let mut aggregate = Aggregate::new(Box::new(filter), 0, None, AggOp::Count)
        .expect("count aggregate over an Int column is always valid");
    aggregate.open().expect("demo pipeline should not abort uncontended");
    while aggregate.has_next().unwrap() {
        let row = aggregate.next().unwrap();
        println!("rows from workers 1+: {}", row.field(0).unwrap());
    }
    aggregate.close();
    bp.transaction_complete(read_tid, true);
}
