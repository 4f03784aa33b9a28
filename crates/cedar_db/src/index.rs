use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use memmap2::Mmap;
use zerocopy::{FromBytes, IntoBytes};

use crate::error::{DbError, Result};
use crate::format::IndexEntry;

/// The `<table>_h.dat` companion file of `(id, offset)` pairs. Ids are
/// auto-incremented from 0, so the file is sorted by id by construction.
pub struct IndexFile {
    path: PathBuf,
}

impl IndexFile {
    pub fn new(path: impl Into<PathBuf>) -> IndexFile {
        IndexFile { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, entry: IndexEntry) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| DbError::io(&self.path, e))?;
        file.write_all(entry.as_bytes())
            .map_err(|e| DbError::io(&self.path, e))?;
        file.sync_all().map_err(|e| DbError::io(&self.path, e))?;
        Ok(())
    }

    /// Load every `(id, offset)` pair. A missing file is an empty index; a
    /// trailing partial entry is corruption.
    pub fn load(&self) -> Result<Vec<IndexEntry>> {
        let file = match fs::File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(DbError::io(&self.path, e)),
        };
        let len = file
            .metadata()
            .map_err(|e| DbError::io(&self.path, e))?
            .len();
        if len == 0 {
            return Ok(Vec::new());
        }
        let mmap = unsafe { Mmap::map(&file) }.map_err(|e| DbError::io(&self.path, e))?;
        let entries = <[IndexEntry]>::ref_from_bytes(&mmap[..])
            .map_err(|_| DbError::corrupt(&self.path, len, "ragged index file"))?;
        Ok(entries.to_vec())
    }

    pub fn delete(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(DbError::io(&self.path, e)),
        }
    }
}

/// In-memory mirror of the index file, one entry per heap record, ordered
/// by id.
#[derive(Debug, Default)]
pub struct PrimaryIndex {
    entries: Vec<IndexEntry>,
}

impl PrimaryIndex {
    pub fn from_entries(entries: Vec<IndexEntry>) -> PrimaryIndex {
        PrimaryIndex { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    pub fn push(&mut self, entry: IndexEntry) {
        self.entries.push(entry);
    }

    /// Linear walk from the start. O(n).
    pub fn lookup_linear(&self, id: i64) -> Option<i64> {
        self.entries.iter().find(|e| e.id == id).map(|e| e.offset)
    }

    /// Binary search over the id-ordered entries. O(log n).
    pub fn lookup_binary(&self, id: i64) -> Option<i64> {
        self.entries
            .binary_search_by_key(&id, |e| e.id)
            .ok()
            .map(|i| self.entries[i].offset)
    }

    /// Entries with `min <= id <= max`, walking forward from the start and
    /// stopping at the first id past `max`.
    pub fn range_linear(&self, min: i64, max: i64) -> Vec<IndexEntry> {
        let mut out = Vec::new();
        for e in &self.entries {
            if e.id > max {
                break;
            }
            if e.id >= min {
                out.push(*e);
            }
        }
        out
    }

    /// Same range, located by binary search on both bounds.
    pub fn range_binary(&self, min: i64, max: i64) -> &[IndexEntry] {
        let start = self.entries.partition_point(|e| e.id < min);
        let end = start + self.entries[start..].partition_point(|e| e.id <= max);
        &self.entries[start..end]
    }

    /// Build an `id -> offset` map over the whole index.
    pub fn build_hash(&self) -> HashMap<i64, i64> {
        self.entries.iter().map(|e| (e.id, e.offset)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entry(id: i64, offset: i64) -> IndexEntry {
        IndexEntry { id, offset }
    }

    #[test]
    fn append_and_load() {
        let dir = TempDir::new().unwrap();
        let file = IndexFile::new(dir.path().join("t_h.dat"));

        assert!(file.load().unwrap().is_empty());

        file.append(entry(0, 0)).unwrap();
        file.append(entry(1, 535)).unwrap();
        assert_eq!(file.load().unwrap(), vec![entry(0, 0), entry(1, 535)]);
    }

    #[test]
    fn ragged_file_is_corruption() {
        let dir = TempDir::new().unwrap();
        let file = IndexFile::new(dir.path().join("t_h.dat"));
        fs::write(file.path(), [0u8; 20]).unwrap();
        assert!(matches!(file.load(), Err(DbError::Corruption { .. })));
    }

    #[test]
    fn lookups_agree() {
        let index =
            PrimaryIndex::from_entries((0..10).map(|i| entry(i, i * 100)).collect());
        for id in 0..10 {
            assert_eq!(index.lookup_linear(id), Some(id * 100));
            assert_eq!(index.lookup_binary(id), Some(id * 100));
        }
        assert_eq!(index.lookup_linear(10), None);
        assert_eq!(index.lookup_binary(10), None);
        assert_eq!(index.lookup_binary(-1), None);
    }

    #[test]
    fn ranges_agree() {
        let index =
            PrimaryIndex::from_entries((0..10).map(|i| entry(i, i * 100)).collect());
        let linear = index.range_linear(3, 6);
        let binary = index.range_binary(3, 6);
        assert_eq!(linear, binary);
        assert_eq!(linear.len(), 4);
        assert_eq!(linear[0].id, 3);
        assert_eq!(linear[3].id, 6);

        assert!(index.range_binary(20, 30).is_empty());
        // A range wider than the table clips to it.
        assert_eq!(index.range_binary(-5, 100).len(), 10);
    }
}
