//! Disk-backed B+-tree keyed by fixed-width strings.
//!
//! Page 0 is the meta page; every other page is a leaf or branch node.
//! Keys are zero-padded to [`KEY_SIZE`] bytes and ordered bytewise, which
//! matches C-string comparison for the short decimal keys the access paths
//! feed in. Leaves are chained through `next` links so a range scan walks
//! the bottom level in key order. Values are `i64` heap offsets; inserting
//! an existing key overwrites its value.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::error::{DbError, Result};

pub const PAGE_SIZE: usize = 4096;
pub const KEY_SIZE: usize = 24;

const MAGIC: u32 = 0x4342_5054; // "CBPT"
const VERSION: u32 = 1;

const TAG_BRANCH: u8 = 0;
const TAG_LEAF: u8 = 1;

// Leaf: tag, count at 2..4, next-leaf page at 8..16, then count * (key, i64).
const LEAF_HDR: usize = 16;
const LEAF_CAP: usize = (PAGE_SIZE - LEAF_HDR) / (KEY_SIZE + 8);

// Branch: tag, count at 2..4, then count keys followed by count + 1 children.
const BRANCH_HDR: usize = 8;
const BRANCH_CAP: usize = (PAGE_SIZE - BRANCH_HDR - 8) / (KEY_SIZE + 8);

type Key = [u8; KEY_SIZE];

#[derive(Debug, Clone, Copy)]
struct Meta {
    root: u64,
    pages: u64,
}

enum Node {
    Leaf {
        keys: Vec<Key>,
        values: Vec<i64>,
        next: u64,
    },
    Branch {
        keys: Vec<Key>,
        children: Vec<u64>,
    },
}

pub struct BPlusTree {
    path: PathBuf,
}

impl BPlusTree {
    /// Create a fresh tree file, truncating anything already at `path`.
    pub fn create(path: impl Into<PathBuf>) -> Result<BPlusTree> {
        let tree = BPlusTree { path: path.into() };
        let mut file = File::create(&tree.path).map_err(|e| DbError::io(&tree.path, e))?;
        let meta = Meta { root: 1, pages: 2 };
        tree.write_meta(&mut file, &meta)?;
        let root = Node::Leaf {
            keys: Vec::new(),
            values: Vec::new(),
            next: 0,
        };
        tree.write_node(&mut file, 1, &root)?;
        Ok(tree)
    }

    /// Open an existing tree file, validating the meta page.
    pub fn open(path: impl Into<PathBuf>) -> Result<BPlusTree> {
        let tree = BPlusTree { path: path.into() };
        let mut file = tree.open_read()?;
        tree.read_meta(&mut file)?;
        Ok(tree)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Insert `key -> value`, overwriting the value of an existing key.
    pub fn insert(&self, key: &str, value: i64) -> Result<()> {
        let key = self.make_key(key)?;
        let mut file = self.open_rw()?;
        let mut meta = self.read_meta(&mut file)?;
        let old_root = meta.root;
        if let Some((sep, right)) = self.insert_rec(&mut file, &mut meta, old_root, key, value)? {
            let page = self.alloc_page(&mut meta);
            let node = Node::Branch {
                keys: vec![sep],
                children: vec![old_root, right],
            };
            self.write_node(&mut file, page, &node)?;
            meta.root = page;
        }
        self.write_meta(&mut file, &meta)?;
        Ok(())
    }

    /// Point search; `None` on a miss.
    pub fn search(&self, key: &str) -> Result<Option<i64>> {
        let key = self.make_key(key)?;
        let mut file = self.open_read()?;
        let meta = self.read_meta(&mut file)?;
        let mut page = meta.root;
        loop {
            match self.read_node(&mut file, page)? {
                Node::Branch { keys, children } => {
                    page = children[keys.partition_point(|k| *k <= key)];
                }
                Node::Leaf { keys, values, .. } => {
                    return Ok(keys.binary_search(&key).ok().map(|i| values[i]));
                }
            }
        }
    }

    /// Values of every key in `[from, to]`, in key order, at most `limit` of
    /// them. Walks the leaf chain from the first qualifying key.
    pub fn search_range(&self, from: &str, to: &str, limit: usize) -> Result<Vec<i64>> {
        let from = self.make_key(from)?;
        let to = self.make_key(to)?;
        let mut out = Vec::new();
        if limit == 0 || from > to {
            return Ok(out);
        }

        let mut file = self.open_read()?;
        let meta = self.read_meta(&mut file)?;
        let mut page = meta.root;
        let (mut keys, mut values, mut next) = loop {
            match self.read_node(&mut file, page)? {
                Node::Branch { keys, children } => {
                    page = children[keys.partition_point(|k| *k <= from)];
                }
                Node::Leaf { keys, values, next } => break (keys, values, next),
            }
        };

        let mut i = keys.partition_point(|k| *k < from);
        loop {
            while i < keys.len() {
                if keys[i] > to {
                    return Ok(out);
                }
                out.push(values[i]);
                if out.len() == limit {
                    return Ok(out);
                }
                i += 1;
            }
            if next == 0 {
                return Ok(out);
            }
            match self.read_node(&mut file, next)? {
                Node::Leaf {
                    keys: k,
                    values: v,
                    next: n,
                } => {
                    keys = k;
                    values = v;
                    next = n;
                    i = 0;
                }
                Node::Branch { .. } => {
                    return Err(DbError::corrupt(
                        &self.path,
                        next * PAGE_SIZE as u64,
                        "leaf chain points at a branch page",
                    ));
                }
            }
        }
    }

    // --- Insertion ---

    /// Returns the separator and new right page when `page` split.
    fn insert_rec(
        &self,
        file: &mut File,
        meta: &mut Meta,
        page: u64,
        key: Key,
        value: i64,
    ) -> Result<Option<(Key, u64)>> {
        match self.read_node(file, page)? {
            Node::Leaf {
                mut keys,
                mut values,
                next,
            } => {
                match keys.binary_search(&key) {
                    Ok(i) => {
                        values[i] = value;
                        self.write_node(file, page, &Node::Leaf { keys, values, next })?;
                        return Ok(None);
                    }
                    Err(i) => {
                        keys.insert(i, key);
                        values.insert(i, value);
                    }
                }
                if keys.len() <= LEAF_CAP {
                    self.write_node(file, page, &Node::Leaf { keys, values, next })?;
                    return Ok(None);
                }

                // Split: the right half moves to a new page and its first
                // key is copied up as the separator.
                let mid = keys.len() / 2;
                let right_keys = keys.split_off(mid);
                let right_values = values.split_off(mid);
                let sep = right_keys[0];
                let right_page = self.alloc_page(meta);
                self.write_node(
                    file,
                    right_page,
                    &Node::Leaf {
                        keys: right_keys,
                        values: right_values,
                        next,
                    },
                )?;
                self.write_node(
                    file,
                    page,
                    &Node::Leaf {
                        keys,
                        values,
                        next: right_page,
                    },
                )?;
                Ok(Some((sep, right_page)))
            }
            Node::Branch {
                mut keys,
                mut children,
            } => {
                let i = keys.partition_point(|k| *k <= key);
                let Some((sep, new_page)) = self.insert_rec(file, meta, children[i], key, value)?
                else {
                    return Ok(None);
                };
                keys.insert(i, sep);
                children.insert(i + 1, new_page);
                if keys.len() <= BRANCH_CAP {
                    self.write_node(file, page, &Node::Branch { keys, children })?;
                    return Ok(None);
                }

                // Split: the middle key is pushed up, not copied.
                let mid = keys.len() / 2;
                let sep_up = keys[mid];
                let right_keys = keys.split_off(mid + 1);
                keys.pop();
                let right_children = children.split_off(mid + 1);
                let right_page = self.alloc_page(meta);
                self.write_node(
                    file,
                    right_page,
                    &Node::Branch {
                        keys: right_keys,
                        children: right_children,
                    },
                )?;
                self.write_node(file, page, &Node::Branch { keys, children })?;
                Ok(Some((sep_up, right_page)))
            }
        }
    }

    fn alloc_page(&self, meta: &mut Meta) -> u64 {
        let page = meta.pages;
        meta.pages += 1;
        page
    }

    // --- Page I/O ---

    fn open_read(&self) -> Result<File> {
        File::open(&self.path).map_err(|e| DbError::io(&self.path, e))
    }

    fn open_rw(&self) -> Result<File> {
        OpenOptions::new()
            .read(true)
            .write(true)
            .open(&self.path)
            .map_err(|e| DbError::io(&self.path, e))
    }

    fn read_page(&self, file: &mut File, page: u64) -> Result<[u8; PAGE_SIZE]> {
        let offset = page * PAGE_SIZE as u64;
        file.seek(SeekFrom::Start(offset))
            .map_err(|e| DbError::io(&self.path, e))?;
        let mut buf = [0u8; PAGE_SIZE];
        file.read_exact(&mut buf).map_err(|e| match e.kind() {
            std::io::ErrorKind::UnexpectedEof => {
                DbError::corrupt(&self.path, offset, "short page read")
            }
            _ => DbError::io(&self.path, e),
        })?;
        Ok(buf)
    }

    fn write_page(&self, file: &mut File, page: u64, buf: &[u8; PAGE_SIZE]) -> Result<()> {
        file.seek(SeekFrom::Start(page * PAGE_SIZE as u64))
            .map_err(|e| DbError::io(&self.path, e))?;
        file.write_all(buf).map_err(|e| DbError::io(&self.path, e))
    }

    fn read_meta(&self, file: &mut File) -> Result<Meta> {
        let buf = self.read_page(file, 0)?;
        let magic = u32::from_ne_bytes(buf[0..4].try_into().unwrap());
        let version = u32::from_ne_bytes(buf[4..8].try_into().unwrap());
        if magic != MAGIC || version != VERSION {
            return Err(DbError::corrupt(&self.path, 0, "bad meta page"));
        }
        Ok(Meta {
            root: u64::from_ne_bytes(buf[8..16].try_into().unwrap()),
            pages: u64::from_ne_bytes(buf[16..24].try_into().unwrap()),
        })
    }

    fn write_meta(&self, file: &mut File, meta: &Meta) -> Result<()> {
        let mut buf = [0u8; PAGE_SIZE];
        buf[0..4].copy_from_slice(&MAGIC.to_ne_bytes());
        buf[4..8].copy_from_slice(&VERSION.to_ne_bytes());
        buf[8..16].copy_from_slice(&meta.root.to_ne_bytes());
        buf[16..24].copy_from_slice(&meta.pages.to_ne_bytes());
        self.write_page(file, 0, &buf)
    }

    fn read_node(&self, file: &mut File, page: u64) -> Result<Node> {
        let buf = self.read_page(file, page)?;
        let count = u16::from_ne_bytes(buf[2..4].try_into().unwrap()) as usize;
        match buf[0] {
            TAG_LEAF => {
                let next = u64::from_ne_bytes(buf[8..16].try_into().unwrap());
                let mut keys = Vec::with_capacity(count);
                let mut values = Vec::with_capacity(count);
                let mut pos = LEAF_HDR;
                for _ in 0..count {
                    keys.push(buf[pos..pos + KEY_SIZE].try_into().unwrap());
                    pos += KEY_SIZE;
                    values.push(i64::from_ne_bytes(buf[pos..pos + 8].try_into().unwrap()));
                    pos += 8;
                }
                Ok(Node::Leaf { keys, values, next })
            }
            TAG_BRANCH => {
                let mut keys = Vec::with_capacity(count);
                let mut pos = BRANCH_HDR;
                for _ in 0..count {
                    keys.push(buf[pos..pos + KEY_SIZE].try_into().unwrap());
                    pos += KEY_SIZE;
                }
                let mut children = Vec::with_capacity(count + 1);
                for _ in 0..count + 1 {
                    children.push(u64::from_ne_bytes(buf[pos..pos + 8].try_into().unwrap()));
                    pos += 8;
                }
                Ok(Node::Branch { keys, children })
            }
            tag => Err(DbError::corrupt(
                &self.path,
                page * PAGE_SIZE as u64,
                format!("unknown node tag {tag}"),
            )),
        }
    }

    fn write_node(&self, file: &mut File, page: u64, node: &Node) -> Result<()> {
        let mut buf = [0u8; PAGE_SIZE];
        match node {
            Node::Leaf { keys, values, next } => {
                buf[0] = TAG_LEAF;
                buf[2..4].copy_from_slice(&(keys.len() as u16).to_ne_bytes());
                buf[8..16].copy_from_slice(&next.to_ne_bytes());
                let mut pos = LEAF_HDR;
                for (key, value) in keys.iter().zip(values) {
                    buf[pos..pos + KEY_SIZE].copy_from_slice(key);
                    pos += KEY_SIZE;
                    buf[pos..pos + 8].copy_from_slice(&value.to_ne_bytes());
                    pos += 8;
                }
            }
            Node::Branch { keys, children } => {
                buf[0] = TAG_BRANCH;
                buf[2..4].copy_from_slice(&(keys.len() as u16).to_ne_bytes());
                let mut pos = BRANCH_HDR;
                for key in keys {
                    buf[pos..pos + KEY_SIZE].copy_from_slice(key);
                    pos += KEY_SIZE;
                }
                for child in children {
                    buf[pos..pos + 8].copy_from_slice(&child.to_ne_bytes());
                    pos += 8;
                }
            }
        }
        self.write_page(file, page, &buf)
    }

    fn make_key(&self, key: &str) -> Result<Key> {
        let bytes = key.as_bytes();
        if bytes.len() > KEY_SIZE {
            return Err(DbError::SchemaMismatch(format!(
                "b+ tree key longer than {KEY_SIZE} bytes: {key:?}"
            )));
        }
        let mut out = [0u8; KEY_SIZE];
        out[..bytes.len()].copy_from_slice(bytes);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn tree(dir: &TempDir) -> BPlusTree {
        BPlusTree::create(dir.path().join("t_bpt.dat")).unwrap()
    }

    #[test]
    fn insert_and_search() {
        let dir = TempDir::new().unwrap();
        let tree = tree(&dir);
        tree.insert("10", 100).unwrap();
        tree.insert("2", 20).unwrap();
        tree.insert("1", 10).unwrap();

        assert_eq!(tree.search("1").unwrap(), Some(10));
        assert_eq!(tree.search("2").unwrap(), Some(20));
        assert_eq!(tree.search("10").unwrap(), Some(100));
        assert_eq!(tree.search("3").unwrap(), None);
    }

    #[test]
    fn duplicate_key_overwrites() {
        let dir = TempDir::new().unwrap();
        let tree = tree(&dir);
        tree.insert("7", 1).unwrap();
        tree.insert("7", 2).unwrap();
        assert_eq!(tree.search("7").unwrap(), Some(2));
    }

    #[test]
    fn splits_keep_every_key_findable() {
        let dir = TempDir::new().unwrap();
        let tree = tree(&dir);
        // Well past one leaf and one branch level.
        for id in 0..1000_i64 {
            tree.insert(&id.to_string(), id * 10).unwrap();
        }
        for id in 0..1000_i64 {
            assert_eq!(tree.search(&id.to_string()).unwrap(), Some(id * 10));
        }
        assert_eq!(tree.search("1000").unwrap(), None);
    }

    #[test]
    fn range_scan_is_key_ordered() {
        let dir = TempDir::new().unwrap();
        let tree = tree(&dir);
        for id in 0..1000_i64 {
            tree.insert(&id.to_string(), id).unwrap();
        }

        // All decimal keys in ["120", "125"] have three digits, so byte
        // order and numeric order agree here.
        let hits = tree.search_range("120", "125", 100).unwrap();
        assert_eq!(hits, vec![120, 121, 122, 123, 124, 125]);

        // The limit caps the scan.
        let capped = tree.search_range("120", "125", 3).unwrap();
        assert_eq!(capped, vec![120, 121, 122]);

        // A full scan walks the leaf chain in byte order of the keys.
        let all = tree.search_range("", "~", 2000).unwrap();
        assert_eq!(all.len(), 1000);
        let mut expected: Vec<String> = (0..1000_i64).map(|i| i.to_string()).collect();
        expected.sort();
        let got: Vec<String> = all.iter().map(|v| v.to_string()).collect();
        assert_eq!(got, expected);
    }

    #[test]
    fn empty_range_and_miss_range() {
        let dir = TempDir::new().unwrap();
        let tree = tree(&dir);
        tree.insert("5", 50).unwrap();
        assert!(tree.search_range("6", "7", 10).unwrap().is_empty());
        assert!(tree.search_range("7", "6", 10).unwrap().is_empty());
        assert!(tree.search_range("5", "5", 0).unwrap().is_empty());
        assert_eq!(tree.search_range("5", "5", 10).unwrap(), vec![50]);
    }

    #[test]
    fn reopen_sees_previous_inserts() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("t_bpt.dat");
        {
            let tree = BPlusTree::create(&path).unwrap();
            for id in 0..300_i64 {
                tree.insert(&id.to_string(), id).unwrap();
            }
        }
        let tree = BPlusTree::open(&path).unwrap();
        assert_eq!(tree.search("299").unwrap(), Some(299));
        assert_eq!(tree.search("300").unwrap(), None);
    }

    #[test]
    fn garbage_file_is_corruption() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("junk.dat");
        std::fs::write(&path, vec![0xAB; PAGE_SIZE]).unwrap();
        assert!(matches!(
            BPlusTree::open(&path),
            Err(DbError::Corruption { .. })
        ));
    }
}
