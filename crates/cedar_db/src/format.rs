use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Width of the zero-padded table-name field in every record header.
pub const TABLE_NAME_WIDTH: usize = 255;

/// On-disk record header width: the three fields written back to back.
pub const RECORD_HEADER_SIZE: usize = TABLE_NAME_WIDTH + 4 + 8;

/// Per-record preface in the heap file. `registry_size` counts header and
/// body together; `timestamp` is seconds since the epoch at insertion.
///
/// The fields are written back to back with no padding in between, so the
/// header is encoded by hand instead of derived with zerocopy.
#[derive(Debug, Clone)]
pub struct RecordHeader {
    pub table_name: [u8; TABLE_NAME_WIDTH],
    pub registry_size: u32,
    pub timestamp: i64,
}

impl RecordHeader {
    pub fn new(table: &str, registry_size: u32, timestamp: i64) -> RecordHeader {
        let mut table_name = [0u8; TABLE_NAME_WIDTH];
        let n = table.len().min(TABLE_NAME_WIDTH);
        table_name[..n].copy_from_slice(&table.as_bytes()[..n]);
        RecordHeader {
            table_name,
            registry_size,
            timestamp,
        }
    }

    pub fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.table_name);
        out.extend_from_slice(&self.registry_size.to_ne_bytes());
        out.extend_from_slice(&self.timestamp.to_ne_bytes());
    }

    pub fn decode(bytes: &[u8; RECORD_HEADER_SIZE]) -> RecordHeader {
        let mut table_name = [0u8; TABLE_NAME_WIDTH];
        table_name.copy_from_slice(&bytes[..TABLE_NAME_WIDTH]);
        let registry_size = u32::from_ne_bytes(
            bytes[TABLE_NAME_WIDTH..TABLE_NAME_WIDTH + 4]
                .try_into()
                .unwrap(),
        );
        let timestamp = i64::from_ne_bytes(bytes[TABLE_NAME_WIDTH + 4..].try_into().unwrap());
        RecordHeader {
            table_name,
            registry_size,
            timestamp,
        }
    }

    /// Table name up to its NUL padding.
    pub fn name(&self) -> String {
        let end = self
            .table_name
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(TABLE_NAME_WIDTH);
        String::from_utf8_lossy(&self.table_name[..end]).into_owned()
    }
}

/// One `(id, offset)` pair of the index file: primary key and the byte
/// offset of the record's header in the heap file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct IndexEntry {
    pub id: i64,
    pub offset: i64,
}

pub const INDEX_ENTRY_SIZE: usize = std::mem::size_of::<IndexEntry>();
