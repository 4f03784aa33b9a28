//! Point and range access paths over the `_id` column.
//!
//! Every path resolves id to heap offset and then materializes the row
//! through [`Table::get_row`]; they differ only in how the offset is found,
//! which is the whole point of keeping all five around.

use std::collections::HashMap;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use crate::btree::BPlusTree;
use crate::error::{DbError, Result};
use crate::format::RECORD_HEADER_SIZE;
use crate::table::Table;

/// Walk the heap file record by record, reading only the header and the
/// leading `_id` column and seeking past the rest on a miss.
pub fn sequential_file_get(table: &Table, id: i64) -> Result<Option<Vec<String>>> {
    let heap = table.heap();
    if !heap.exists() {
        return Ok(None);
    }
    let mut file = heap.open_read()?;
    loop {
        let offset = file
            .stream_position()
            .map_err(|e| DbError::io(heap.path(), e))?;
        let Some(header) = heap.read_header(&mut file)? else {
            return Ok(None);
        };
        let row_id = read_leading_id(heap.path(), &mut file, offset)?;
        if row_id == id {
            return table.get_row(offset as i64).map(Some);
        }
        skip_record_rest(heap.path(), &mut file, offset, header.registry_size)?;
    }
}

/// Heap-file walk returning every row with `min <= _id <= max`. The file is
/// id-ordered by construction, so the walk stops at the first id past `max`.
pub fn sequential_file_range(table: &Table, min: i64, max: i64) -> Result<Vec<Vec<String>>> {
    let heap = table.heap();
    let mut rows = Vec::new();
    if !heap.exists() {
        return Ok(rows);
    }
    let mut file = heap.open_read()?;
    loop {
        let offset = file
            .stream_position()
            .map_err(|e| DbError::io(heap.path(), e))?;
        let Some(header) = heap.read_header(&mut file)? else {
            return Ok(rows);
        };
        let row_id = read_leading_id(heap.path(), &mut file, offset)?;
        if row_id > max {
            return Ok(rows);
        }
        if row_id >= min {
            rows.push(table.get_row(offset as i64)?);
        }
        skip_record_rest(heap.path(), &mut file, offset, header.registry_size)?;
    }
}

/// Linear walk of the in-memory index.
pub fn sequential_index_get(table: &Table, id: i64) -> Result<Option<Vec<String>>> {
    match table.index().lookup_linear(id) {
        Some(offset) => table.get_row(offset).map(Some),
        None => Ok(None),
    }
}

pub fn sequential_index_range(table: &Table, min: i64, max: i64) -> Result<Vec<Vec<String>>> {
    table
        .index()
        .range_linear(min, max)
        .iter()
        .map(|e| table.get_row(e.offset))
        .collect()
}

/// Binary search on the id-ordered in-memory index.
pub fn binary_index_get(table: &Table, id: i64) -> Result<Option<Vec<String>>> {
    match table.index().lookup_binary(id) {
        Some(offset) => table.get_row(offset).map(Some),
        None => Ok(None),
    }
}

pub fn binary_index_range(table: &Table, min: i64, max: i64) -> Result<Vec<Vec<String>>> {
    table
        .index()
        .range_binary(min, max)
        .iter()
        .map(|e| table.get_row(e.offset))
        .collect()
}

/// Cached `id -> offset` map built once from the in-memory index.
pub struct HashIndex {
    map: HashMap<i64, i64>,
}

impl HashIndex {
    pub fn build(table: &Table) -> HashIndex {
        HashIndex {
            map: table.index().build_hash(),
        }
    }

    pub fn get(&self, table: &Table, id: i64) -> Result<Option<Vec<String>>> {
        match self.map.get(&id) {
            Some(&offset) => table.get_row(offset).map(Some),
            None => Ok(None),
        }
    }

    /// Probes every id in `min..=max` individually; the map has no order of
    /// its own, so the result follows the probe order.
    pub fn range(&self, table: &Table, min: i64, max: i64) -> Result<Vec<Vec<String>>> {
        let mut rows = Vec::new();
        for id in min..=max {
            if let Some(&offset) = self.map.get(&id) {
                rows.push(table.get_row(offset)?);
            }
        }
        Ok(rows)
    }
}

/// B+-tree access path. The tree file is populated from the in-memory index
/// with one `(str(id), offset)` pair per record.
pub struct BTreeIndex {
    tree: BPlusTree,
}

impl BTreeIndex {
    pub fn build(table: &Table, path: impl AsRef<Path>) -> Result<BTreeIndex> {
        let tree = BPlusTree::create(path.as_ref())?;
        for e in table.index().entries() {
            tree.insert(&e.id.to_string(), e.offset)?;
        }
        Ok(BTreeIndex { tree })
    }

    pub fn get(&self, table: &Table, id: i64) -> Result<Option<Vec<String>>> {
        match self.tree.search(&id.to_string())? {
            Some(offset) => table.get_row(offset).map(Some),
            None => Ok(None),
        }
    }

    /// Native range scan by key string; stops past `max` or once `capacity`
    /// offsets have been collected.
    pub fn range(
        &self,
        table: &Table,
        min: i64,
        max: i64,
        capacity: usize,
    ) -> Result<Vec<Vec<String>>> {
        let offsets = self
            .tree
            .search_range(&min.to_string(), &max.to_string(), capacity)?;
        offsets
            .into_iter()
            .map(|offset| table.get_row(offset))
            .collect()
    }
}

fn read_leading_id(path: &Path, file: &mut std::fs::File, offset: u64) -> Result<i64> {
    let mut buf = [0u8; 8];
    file.read_exact(&mut buf).map_err(|e| match e.kind() {
        std::io::ErrorKind::UnexpectedEof => DbError::corrupt(path, offset, "short body read"),
        _ => DbError::io(path, e),
    })?;
    Ok(i64::from_ne_bytes(buf))
}

/// After the header and the 8-byte `_id` have been read, seek to the next
/// record header.
fn skip_record_rest(
    path: &Path,
    file: &mut std::fs::File,
    offset: u64,
    registry_size: u32,
) -> Result<()> {
    let rest = (registry_size as i64) - RECORD_HEADER_SIZE as i64 - 8;
    if rest < 0 {
        return Err(DbError::corrupt(
            path,
            offset,
            format!("registry_size {registry_size} smaller than the record header"),
        ));
    }
    file.seek(SeekFrom::Current(rest))
        .map_err(|e| DbError::io(path, e))?;
    Ok(())
}
