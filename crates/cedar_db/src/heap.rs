use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::codec;
use crate::error::{DbError, Result};
use crate::format::{RECORD_HEADER_SIZE, RecordHeader};
use crate::schema::Schema;

/// Append-only heap file of typed records, `[Header | Body][Header | Body]...`
/// The file is opened and closed within each call; appends are synced before
/// returning.
pub struct HeapFile {
    path: PathBuf,
}

impl HeapFile {
    pub fn new(path: impl Into<PathBuf>) -> HeapFile {
        HeapFile { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Current end-of-file offset; 0 when the file does not exist yet.
    pub fn end_offset(&self) -> Result<u64> {
        match fs::metadata(&self.path) {
            Ok(m) => Ok(m.len()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(0),
            Err(e) => Err(DbError::io(&self.path, e)),
        }
    }

    /// Append one record. Returns the offset its header was written at.
    pub fn append(&self, header: &RecordHeader, body: &[u8]) -> Result<u64> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| DbError::io(&self.path, e))?;
        let offset = file
            .seek(SeekFrom::End(0))
            .map_err(|e| DbError::io(&self.path, e))?;
        let mut buf = Vec::with_capacity(RECORD_HEADER_SIZE + body.len());
        header.encode(&mut buf);
        buf.extend_from_slice(body);
        file.write_all(&buf).map_err(|e| DbError::io(&self.path, e))?;
        file.sync_all().map_err(|e| DbError::io(&self.path, e))?;
        Ok(offset)
    }

    pub fn open_read(&self) -> Result<File> {
        File::open(&self.path).map_err(|e| DbError::io(&self.path, e))
    }

    /// Read the record header at the reader's position. `Ok(None)` means the
    /// end of the file: a short header read terminates a scan cleanly.
    pub fn read_header(&self, file: &mut File) -> Result<Option<RecordHeader>> {
        let mut buf = [0u8; RECORD_HEADER_SIZE];
        match fill(file, &mut buf) {
            Ok(true) => Ok(Some(RecordHeader::decode(&buf))),
            Ok(false) => Ok(None),
            Err(e) => Err(DbError::io(&self.path, e)),
        }
    }

    /// Read and decode the whole record at `offset` into one string per
    /// column, `_id` first.
    pub fn get_row(&self, schema: &Schema, offset: u64) -> Result<Vec<String>> {
        let mut file = self.open_read()?;
        file.seek(SeekFrom::Start(offset))
            .map_err(|e| DbError::io(&self.path, e))?;
        let header = self
            .read_header(&mut file)?
            .ok_or_else(|| DbError::corrupt(&self.path, offset, "offset past the last record"))?;

        let expect = (RECORD_HEADER_SIZE + schema.size()) as u32;
        if header.registry_size != expect {
            return Err(DbError::corrupt(
                &self.path,
                offset,
                format!(
                    "registry_size {} disagrees with header + body size {}",
                    header.registry_size, expect
                ),
            ));
        }

        let mut body = vec![0u8; schema.size()];
        file.read_exact(&mut body).map_err(|e| match e.kind() {
            std::io::ErrorKind::UnexpectedEof => {
                DbError::corrupt(&self.path, offset, "short body read")
            }
            _ => DbError::io(&self.path, e),
        })?;

        let mut row = Vec::with_capacity(schema.number_of_columns());
        let mut pos = 0;
        for col in schema.columns() {
            let width = col.width();
            let value = codec::decode(col, &body[pos..pos + width]);
            row.push(codec::render(&value));
            pos += width;
        }
        Ok(row)
    }

    pub fn delete(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(DbError::io(&self.path, e)),
        }
    }
}

/// Fill `buf` completely, or report `false` when the file ends before the
/// first byte or mid-way through.
fn fill(file: &mut File, buf: &mut [u8]) -> std::io::Result<bool> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = file.read(&mut buf[filled..])?;
        if n == 0 {
            return Ok(false);
        }
        filled += n;
    }
    Ok(true)
}
