pub mod backend;
pub mod collections;
pub mod memory;
pub mod record;

pub use backend::{
    Filter, FilterOp, Patch, Record, RecordStore, Result, Sort, SortDir, StoreError, Update,
};
pub use memory::MemoryStore;
pub use record::{from_record, to_record};
