use std::sync::Arc;

use super::Operator;
use crate::buffer_pool::BufferPool;
use crate::error::{DbError, Result};
use crate::heap_file::HeapFile;
use crate::heap_page::Permission;
use crate::schema::Schema;
use crate::transaction::TransactionId;
use crate::tuple::Tuple;

// Leaf operator wrapping a full table scan through the buffer pool. Not
// restartable in the sense the heap file itself isn't cached across
// passes: `rewind` starts a fresh page walk from page 0, exactly like
// `HeapFile::iter`.
pub struct SeqScan {
    file: Arc<HeapFile>,
    bp: Arc<BufferPool>,
    tid: TransactionId,
    next_page: i32,
    num_pages: i32,
    buffered: std::vec::IntoIter<Tuple>,
    pending: Option<Tuple>,
    opened: bool,
}

impl SeqScan {
    pub fn new(file: Arc<HeapFile>, bp: Arc<BufferPool>, tid: TransactionId) -> Self {
        SeqScan {
            file,
            bp,
            tid,
            next_page: 0,
            num_pages: 0,
            buffered: Vec::new().into_iter(),
            pending: None,
            opened: false,
        }
    }

    fn advance_page(&mut self) -> Result<bool> {
        while self.next_page < self.num_pages {
            let pid = (self.file.id(), self.next_page);
            self.next_page += 1;
            let page = self.bp.get_page(self.tid, pid, Permission::Read)?;
            let guard = page.read().unwrap();
            let tuples: Vec<Tuple> = guard.iter_tuples().cloned().collect();
            drop(guard);
            if !tuples.is_empty() {
                self.buffered = tuples.into_iter();
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn fetch_next(&mut self) -> Result<Option<Tuple>> {
        loop {
            if let Some(tuple) = self.buffered.next() {
                return Ok(Some(tuple));
            }
            if !self.advance_page()? {
                return Ok(None);
            }
        }
    }
}

impl Operator for SeqScan {
    fn open(&mut self) -> Result<()> {
        self.num_pages = self.file.num_pages()?;
        self.next_page = 0;
        self.buffered = Vec::new().into_iter();
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
        self.open()
    }

    fn close(&mut self) {
        self.opened = false;
    }

    fn schema(&self) -> &Schema {
        self.file.schema()
    }
}
