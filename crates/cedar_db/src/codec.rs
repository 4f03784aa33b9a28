use crate::error::{DbError, Result};
use crate::schema::{ColumnType, ColumnValue, SchemaColumn};

fn parse_err(value: &str, expected: &'static str) -> DbError {
    DbError::CodecParse {
        value: value.to_string(),
        expected,
    }
}

/// Parse a string value for the given column type.
pub fn parse_value(col_type: ColumnType, value: &str) -> Result<ColumnValue> {
    Ok(match col_type {
        ColumnType::Int32 => {
            ColumnValue::Int32(value.parse().map_err(|_| parse_err(value, "int32"))?)
        }
        ColumnType::Int64 | ColumnType::ForeignKey => {
            ColumnValue::Int64(value.parse().map_err(|_| parse_err(value, "int64"))?)
        }
        ColumnType::Float => {
            ColumnValue::Float(value.parse().map_err(|_| parse_err(value, "float"))?)
        }
        ColumnType::Double => {
            ColumnValue::Double(value.parse().map_err(|_| parse_err(value, "double"))?)
        }
        ColumnType::Char => ColumnValue::Char(value.as_bytes().to_vec()),
    })
}

/// Encode one column value, appending exactly `col.width()` bytes to `out`.
///
/// Char data is copied up to the column width and zero-padded; at full width
/// it is not NUL-terminated. A numeric column with extra array slots stores
/// the parsed scalar in the first slot, the rest stay zero.
pub fn encode(col: &SchemaColumn, value: &str, out: &mut Vec<u8>) -> Result<()> {
    let width = col.width();
    let start = out.len();
    match parse_value(col.col_type, value)? {
        ColumnValue::Int32(v) => out.extend_from_slice(&v.to_ne_bytes()),
        ColumnValue::Int64(v) => out.extend_from_slice(&v.to_ne_bytes()),
        ColumnValue::Float(v) => out.extend_from_slice(&v.to_ne_bytes()),
        ColumnValue::Double(v) => out.extend_from_slice(&v.to_ne_bytes()),
        ColumnValue::Char(bytes) => {
            let n = bytes.len().min(width);
            out.extend_from_slice(&bytes[..n]);
        }
    }
    out.resize(start + width, 0);
    Ok(())
}

/// Decode one column from its on-disk bytes. `bytes` must span the whole
/// column width; numeric columns read the first slot.
pub fn decode(col: &SchemaColumn, bytes: &[u8]) -> ColumnValue {
    debug_assert_eq!(bytes.len(), col.width());
    match col.col_type {
        ColumnType::Int32 => ColumnValue::Int32(i32::from_ne_bytes(bytes[..4].try_into().unwrap())),
        ColumnType::Int64 | ColumnType::ForeignKey => {
            ColumnValue::Int64(i64::from_ne_bytes(bytes[..8].try_into().unwrap()))
        }
        ColumnType::Float => ColumnValue::Float(f32::from_ne_bytes(bytes[..4].try_into().unwrap())),
        ColumnType::Double => {
            ColumnValue::Double(f64::from_ne_bytes(bytes[..8].try_into().unwrap()))
        }
        ColumnType::Char => ColumnValue::Char(bytes.to_vec()),
    }
}

/// Render a decoded value back to its string form. Numeric rendering is
/// shortest round-trip; Char stops at the first NUL or runs the full width.
pub fn render(value: &ColumnValue) -> String {
    match value {
        ColumnValue::Int32(v) => v.to_string(),
        ColumnValue::Int64(v) => v.to_string(),
        ColumnValue::Float(v) => v.to_string(),
        ColumnValue::Double(v) => v.to_string(),
        ColumnValue::Char(bytes) => {
            let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
            String::from_utf8_lossy(&bytes[..end]).into_owned()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn col(col_type: ColumnType, array_size: u32) -> SchemaColumn {
        SchemaColumn {
            name: "c".into(),
            col_type,
            array_size,
        }
    }

    fn roundtrip(col_type: ColumnType, array_size: u32, value: &str) -> String {
        let col = col(col_type, array_size);
        let mut bytes = Vec::new();
        encode(&col, value, &mut bytes).unwrap();
        assert_eq!(bytes.len(), col.width());
        render(&decode(&col, &bytes))
    }

    #[test]
    fn numeric_roundtrips() {
        assert_eq!(roundtrip(ColumnType::Int32, 0, "-42"), "-42");
        assert_eq!(roundtrip(ColumnType::Int64, 0, "9007199254740993"), "9007199254740993");
        assert_eq!(roundtrip(ColumnType::ForeignKey, 0, "7"), "7");
        assert_eq!(roundtrip(ColumnType::Float, 0, "1.5"), "1.5");
        assert_eq!(roundtrip(ColumnType::Double, 0, "-0.125"), "-0.125");
    }

    #[test]
    fn char_pads_and_truncates() {
        assert_eq!(roundtrip(ColumnType::Char, 255, "ana"), "ana");
        // At full width the value is cut, not NUL-terminated.
        assert_eq!(roundtrip(ColumnType::Char, 2, "anabel"), "ana");
        assert_eq!(roundtrip(ColumnType::Char, 255, ""), "");
    }

    #[test]
    fn numeric_array_slots_stay_zero() {
        let col = col(ColumnType::Int32, 3);
        let mut bytes = Vec::new();
        encode(&col, "9", &mut bytes).unwrap();
        assert_eq!(bytes.len(), 16);
        assert_eq!(&bytes[4..], &[0u8; 12]);
        assert_eq!(render(&decode(&col, &bytes)), "9");
    }

    #[test]
    fn unparseable_value_is_an_error() {
        let mut out = Vec::new();
        assert!(matches!(
            encode(&col(ColumnType::Int32, 0), "ana", &mut out),
            Err(DbError::CodecParse { .. })
        ));
        assert!(matches!(
            encode(&col(ColumnType::Double, 0), "", &mut out),
            Err(DbError::CodecParse { .. })
        ));
        // No atoi-style silent zero for a fractional int.
        assert!(matches!(
            encode(&col(ColumnType::Int64, 0), "1.5", &mut out),
            Err(DbError::CodecParse { .. })
        ));
    }
}
