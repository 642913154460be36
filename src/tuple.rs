use std::fmt::{Display, Formatter};

use crate::common::PageId;
use crate::fields::Field;
use crate::schema::Schema;

// Reference to a tuple living on a specific slot of a specific page.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct RecordId {
    pid: PageId,
    slot: usize,
}

impl RecordId {
    pub fn new(pid: PageId, slot: usize) -> Self {
        RecordId { pid, slot }
    }

    pub fn page_id(&self) -> PageId {
        self.pid
    }

    pub fn slot(&self) -> usize {
        self.slot
    }
}

// A fixed-schema record: an array of fields matching the schema's arity
// and types, plus an optional RecordId assigned once the tuple lives on
// a page.
#[derive(Debug, Clone)]
pub struct Tuple {
    fields: Vec<Field>,
    schema: Schema,
    rid: Option<RecordId>,
}

impl PartialEq for Tuple {
    fn eq(&self, other: &Self) -> bool {
        self.fields == other.fields
    }
}

impl Display for Tuple {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let rendered: Vec<String> = self
            .fields
            .iter()
            .enumerate()
            .map(|(i, field)| match field {
                Field::Int(v) => match self.schema.field_name(i) {
                    Some(name) => format!("{}: {}", name, v),
                    None => v.to_string(),
                },
                Field::String(s) => match self.schema.field_name(i) {
                    Some(name) => format!("{}: {}", name, s.value()),
                    None => s.value().to_string(),
                },
            })
            .collect();
        write!(f, "{{{}}}", rendered.join(", "))
    }
}

impl Tuple {
    pub fn new(fields: Vec<Field>, schema: &Schema) -> Self {
        Tuple {
            fields,
            schema: schema.clone(),
            rid: None,
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn record_id(&self) -> Option<RecordId> {
        self.rid
    }

    pub fn set_record_id(&mut self, rid: RecordId) {
        self.rid = Some(rid);
    }

    pub fn clear_record_id(&mut self) {
        self.rid = None;
    }

    pub fn field(&self, i: usize) -> Option<&Field> {
        self.fields.get(i)
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.schema.size());
        for field in &self.fields {
            bytes.extend(field.serialize());
        }
        bytes
    }

    pub fn deserialize(bytes: &[u8], schema: &Schema) -> crate::error::Result<Self> {
        let mut offset = 0;
        let mut fields = Vec::with_capacity(schema.num_fields());
        for t in schema.types() {
            let field = t.parse(&bytes[offset..])?;
            offset += t.len();
            fields.push(field);
        }
        Ok(Tuple::new(fields, schema))
    }

    // Concatenates two tuples under a merged schema, as Join does.
    pub fn concat(left: &Tuple, right: &Tuple) -> Tuple {
        let schema = Schema::concat(&left.schema, &right.schema);
        let mut fields = left.fields.clone();
        fields.extend(right.fields.clone());
        Tuple::new(fields, &schema)
    }
}
