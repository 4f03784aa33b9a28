mod access;
mod btree;
mod codec;
mod cursor;
mod error;
mod format;
mod heap;
mod index;
mod join;
mod schema;
mod table;

pub use access::{
    BTreeIndex, HashIndex, binary_index_get, binary_index_range, sequential_file_get,
    sequential_file_range, sequential_index_get, sequential_index_range,
};
pub use btree::BPlusTree;
pub use cursor::Cursor;
pub use error::{DbError, Result};
pub use format::{INDEX_ENTRY_SIZE, IndexEntry, RECORD_HEADER_SIZE, RecordHeader};
pub use heap::HeapFile;
pub use index::{IndexFile, PrimaryIndex};
pub use join::{Join, JoinType};
pub use schema::{ColumnType, ColumnValue, ID_COLUMN, Schema, SchemaColumn};
pub use table::Table;
