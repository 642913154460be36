// Stable identifier for a table, derived from a hash of its backing file
// path (see `HeapFile::id`).
pub type TableId = i32;
pub type PageNo = i32;

// A page within a table: the table it belongs to plus its offset.
pub type PageId = (TableId, PageNo);

pub const PAGE_SIZE: usize = 4096;
