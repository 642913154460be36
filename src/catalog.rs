use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::{Arc, RwLock};

use crate::error::{DbError, Result};
use crate::heap_file::HeapFile;
use crate::schema::Schema;
use crate::types::Type;

// The set of tables known to the database: name and id both resolve to the
// same underlying `HeapFile`.
pub struct Catalog {
    by_name: RwLock<HashMap<String, Arc<HeapFile>>>,
    by_id: RwLock<HashMap<i32, Arc<HeapFile>>>,
}

impl Catalog {
    pub fn new() -> Self {
        Catalog {
            by_name: RwLock::new(HashMap::new()),
            by_id: RwLock::new(HashMap::new()),
        }
    }

    pub fn add_table(&self, name: &str, file: HeapFile) -> i32 {
        let id = file.id();
        let file = Arc::new(file);
        self.by_name
            .write()
            .unwrap()
            .insert(name.to_string(), Arc::clone(&file));
        self.by_id.write().unwrap().insert(id, file);
        id
    }

    pub fn table_named(&self, name: &str) -> Result<Arc<HeapFile>> {
        self.by_name
            .read()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or_else(|| DbError::NoSuchElement)
    }

    pub fn file(&self, table_id: i32) -> Result<Arc<HeapFile>> {
        self.by_id
            .read()
            .unwrap()
            .get(&table_id)
            .cloned()
            .ok_or_else(|| DbError::NoSuchElement)
    }

    pub fn schema(&self, table_id: i32) -> Result<Schema> {
        Ok(self.file(table_id)?.schema().clone())
    }

    // Parses a catalog text file where each line looks like
    // `tablename (col1: Int, col2: String(20))` and opens a `HeapFile` for
    // each table under `data_dir`.
    pub fn load_schema(&self, catalog_path: impl AsRef<Path>, data_dir: impl AsRef<Path>) -> Result<()> {
        let data_dir = data_dir.as_ref();
        let reader = BufReader::new(File::open(catalog_path)?);
        for line in reader.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let open = line
                .find('(')
                .ok_or_else(|| DbError::DbLogicError(format!("malformed catalog line: {}", line)))?;
            let close = line
                .rfind(')')
                .ok_or_else(|| DbError::DbLogicError(format!("malformed catalog line: {}", line)))?;
            let table_name = line[..open].trim().to_string();
            let fields_str = &line[open + 1..close];

            let mut types = Vec::new();
            let mut names = Vec::new();
            for field in fields_str.split(',') {
                let mut parts = field.splitn(2, ':');
                let field_name = parts
                    .next()
                    .ok_or_else(|| DbError::DbLogicError(format!("malformed field: {}", field)))?
                    .trim()
                    .to_string();
                let field_type = parts
                    .next()
                    .ok_or_else(|| DbError::DbLogicError(format!("malformed field: {}", field)))?
                    .trim();
                let ty = if field_type == "Int" {
                    Type::Int
                } else if let Some(width) = field_type
                    .strip_prefix("String(")
                    .and_then(|s| s.strip_suffix(')'))
                {
                    let width: u32 = width.trim().parse().map_err(|_| {
                        DbError::DbLogicError(format!("invalid String width: {}", field_type))
                    })?;
                    Type::String(width)
                } else {
                    return Err(DbError::DbLogicError(format!(
                        "invalid field type: {}",
                        field_type
                    )));
                };
                names.push(field_name);
                types.push(ty);
            }

            let schema = Schema::new(types, names.into_iter().map(Some).collect());
            let path = data_dir.join(format!("{}.dat", table_name));
            let file = HeapFile::new(path, schema)?;
            self.add_table(&table_name, file);
        }
        Ok(())
    }
}
