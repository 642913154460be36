use crate::common::{PageId, PAGE_SIZE};
use crate::error::{DbError, Result};
use crate::schema::Schema;
use crate::transaction::TransactionId;
use crate::tuple::{RecordId, Tuple};

// Requested page access mode, used by the buffer pool to pick a lock mode.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum Permission {
    Read,
    Write,
}

// Bitmap header (one bit per slot, set iff the slot holds a live tuple)
// followed by num_slots fixed-size tuple slots.
#[derive(Debug, Clone)]
pub struct HeapPage {
    pid: PageId,
    schema: Schema,
    header: Vec<u8>,
    slots: Vec<Option<Tuple>>,
    num_slots: usize,
    dirtying_tid: Option<TransactionId>,
}

impl PartialEq for HeapPage {
    fn eq(&self, other: &Self) -> bool {
        self.pid == other.pid && self.schema == other.schema && self.slots == other.slots
    }
}

impl HeapPage {
    // Largest n such that ceil(n/8) + n*schema.size() <= PAGE_SIZE, rearranged
    // to a single division.
    pub fn slot_count(schema: &Schema) -> usize {
        let tuple_size = schema.size();
        if tuple_size == 0 {
            return 0;
        }
        (PAGE_SIZE * 8) / (tuple_size * 8 + 1)
    }

    fn header_size(num_slots: usize) -> usize {
        (num_slots + 7) / 8
    }

    fn get_bit(header: &[u8], i: usize) -> bool {
        let byte = header[i / 8];
        (byte & (1 << (i % 8))) != 0
    }

    fn set_bit(header: &mut [u8], i: usize, value: bool) {
        let mask = 1 << (i % 8);
        if value {
            header[i / 8] |= mask;
        } else {
            header[i / 8] &= !mask;
        }
    }

    // Parses a page image read from disk. `bytes` must be exactly PAGE_SIZE long.
    pub fn new(pid: PageId, bytes: &[u8], schema: Schema) -> Result<Self> {
        let num_slots = Self::slot_count(&schema);
        let header_size = Self::header_size(num_slots);
        let header = bytes[..header_size].to_vec();
        let tuple_size = schema.size();

        let mut slots = Vec::with_capacity(num_slots);
        for i in 0..num_slots {
            if Self::get_bit(&header, i) {
                let start = header_size + i * tuple_size;
                let end = start + tuple_size;
                let mut tuple = Tuple::deserialize(&bytes[start..end], &schema)?;
                tuple.set_record_id(RecordId::new(pid, i));
                slots.push(Some(tuple));
            } else {
                slots.push(None);
            }
        }

        Ok(HeapPage {
            pid,
            schema,
            header,
            slots,
            num_slots,
            dirtying_tid: None,
        })
    }

    pub fn empty(pid: PageId, schema: Schema) -> Self {
        let num_slots = Self::slot_count(&schema);
        let header = vec![0u8; Self::header_size(num_slots)];
        HeapPage {
            pid,
            schema,
            header,
            slots: vec![None; num_slots],
            num_slots,
            dirtying_tid: None,
        }
    }

    pub fn id(&self) -> PageId {
        self.pid
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn empty_slot_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_none()).count()
    }

    // Inserts into the lowest-indexed empty slot, assigning the tuple's RecordId.
    pub fn insert(&mut self, mut tuple: Tuple) -> Result<()> {
        if tuple.schema() != &self.schema {
            return Err(DbError::DbLogicError(
                "tuple schema does not match page schema".to_string(),
            ));
        }
        let slot = self
            .slots
            .iter()
            .position(|s| s.is_none())
            .ok_or_else(|| DbError::DbLogicError("page has no empty slots".to_string()))?;
        tuple.set_record_id(RecordId::new(self.pid, slot));
        Self::set_bit(&mut self.header, slot, true);
        self.slots[slot] = Some(tuple);
        Ok(())
    }

    pub fn delete(&mut self, tuple: &Tuple) -> Result<()> {
        let rid = tuple
            .record_id()
            .ok_or_else(|| DbError::DbLogicError("tuple has no record id".to_string()))?;
        if rid.page_id() != self.pid {
            return Err(DbError::DbLogicError(
                "tuple's record id does not belong to this page".to_string(),
            ));
        }
        let slot = rid.slot();
        if slot >= self.num_slots || !Self::get_bit(&self.header, slot) {
            return Err(DbError::DbLogicError(format!(
                "no live tuple at slot {}",
                slot
            )));
        }
        Self::set_bit(&mut self.header, slot, false);
        self.slots[slot] = None;
        Ok(())
    }

    // Produces a PAGE_SIZE-byte image such that new(pid, serialize(), schema) == self.
    pub fn serialize(&self) -> Vec<u8> {
        let mut data = self.header.clone();
        let tuple_size = self.schema.size();
        for slot in &self.slots {
            match slot {
                Some(tuple) => data.extend(tuple.serialize()),
                None => data.extend(std::iter::repeat(0u8).take(tuple_size)),
            }
        }
        data.resize(PAGE_SIZE, 0);
        data
    }

    pub fn mark_dirty(&mut self, tid: Option<TransactionId>) {
        self.dirtying_tid = tid;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirtying_tid.is_some()
    }

    pub fn dirtying_tid(&self) -> Option<TransactionId> {
        self.dirtying_tid
    }

    // Live tuples in slot-index order. Not restartable -- build a fresh one
    // for each scan.
    pub fn iter_tuples(&self) -> impl Iterator<Item = &Tuple> {
        self.slots.iter().filter_map(|s| s.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::Field;
    use crate::types::Type;

    fn schema() -> Schema {
        Schema::with_names(vec![(Type::Int, "a"), (Type::Int, "b")])
    }

    #[test]
    fn serialize_parse_round_trips() {
        let schema = schema();
        let pid = (0, 0);
        let mut page = HeapPage::empty(pid, schema.clone());
        page.insert(Tuple::new(vec![Field::Int(1), Field::Int(10)], &schema))
            .unwrap();
        page.insert(Tuple::new(vec![Field::Int(2), Field::Int(20)], &schema))
            .unwrap();

        let bytes = page.serialize();
        let parsed = HeapPage::new(pid, &bytes, schema).unwrap();
        assert_eq!(page, parsed);
        assert_eq!(parsed.iter_tuples().count(), 2);
    }

    #[test]
    fn insert_assigns_lowest_empty_slot_and_delete_clears_it() {
        let schema = schema();
        let mut page = HeapPage::empty((0, 0), schema.clone());
        let before = page.empty_slot_count();
        page.insert(Tuple::new(vec![Field::Int(1), Field::Int(10)], &schema))
            .unwrap();
        assert_eq!(page.empty_slot_count(), before - 1);

        let tuple = page.iter_tuples().next().unwrap().clone();
        page.delete(&tuple).unwrap();
        assert_eq!(page.empty_slot_count(), before);
    }

    #[test]
    fn insert_rejects_schema_mismatch() {
        let schema = schema();
        let other = Schema::with_names(vec![(Type::Int, "x")]);
        let mut page = HeapPage::empty((0, 0), schema);
        let result = page.insert(Tuple::new(vec![Field::Int(1)], &other));
        assert!(matches!(result, Err(DbError::DbLogicError(_))));
    }

    #[test]
    fn insert_fails_when_full() {
        let schema = schema();
        let mut page = HeapPage::empty((0, 0), schema.clone());
        let n = page.empty_slot_count();
        for i in 0..n {
            page.insert(Tuple::new(vec![Field::Int(i as i32), Field::Int(0)], &schema))
                .unwrap();
        }
        let result = page.insert(Tuple::new(vec![Field::Int(0), Field::Int(0)], &schema));
        assert!(matches!(result, Err(DbError::DbLogicError(_))));
    }
}
