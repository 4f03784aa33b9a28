use std::fs;
use std::path::Path;

use crate::error::{DbError, Result};

/// Name of the implicit primary-key column. It is always the first column
/// of every schema and is assigned automatically on insert.
pub const ID_COLUMN: &str = "_id";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Int32,
    Int64,
    Char,
    Float,
    Double,
    /// Stored exactly like `Int64`; the tag only marks intent.
    ForeignKey,
}

impl ColumnType {
    pub fn parse(s: &str) -> Option<ColumnType> {
        match s {
            "int32" => Some(ColumnType::Int32),
            "int64" => Some(ColumnType::Int64),
            "char" => Some(ColumnType::Char),
            "float" => Some(ColumnType::Float),
            "double" => Some(ColumnType::Double),
            "foreign_key" => Some(ColumnType::ForeignKey),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ColumnType::Int32 => "int32",
            ColumnType::Int64 => "int64",
            ColumnType::Char => "char",
            ColumnType::Float => "float",
            ColumnType::Double => "double",
            ColumnType::ForeignKey => "foreign_key",
        }
    }

    /// Width in bytes of one element of this type.
    pub fn unit_width(self) -> usize {
        match self {
            ColumnType::Int32 | ColumnType::Float => 4,
            ColumnType::Int64 | ColumnType::ForeignKey | ColumnType::Double => 8,
            ColumnType::Char => 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SchemaColumn {
    pub name: String,
    pub col_type: ColumnType,
    pub array_size: u32,
}

impl SchemaColumn {
    /// On-disk width: one element plus `array_size` additional ones, so a
    /// scalar declares `array_size = 0` and occupies a single slot.
    pub fn width(&self) -> usize {
        self.col_type.unit_width() * (self.array_size as usize + 1)
    }
}

/// Ordered typed column list of one table. `_id: int64` is inserted at
/// construction, before any user column.
#[derive(Debug, Clone)]
pub struct Schema {
    cols: Vec<SchemaColumn>,
    size: usize,
}

impl Schema {
    pub fn new() -> Schema {
        let id = SchemaColumn {
            name: ID_COLUMN.to_string(),
            col_type: ColumnType::Int64,
            array_size: 0,
        };
        let size = id.width();
        Schema {
            cols: vec![id],
            size,
        }
    }

    /// Parse a schema file: one column per non-empty line, in the form
    /// `name:type[:array_size]`. A missing array size means 0. Whitespace
    /// is significant and is not trimmed.
    pub fn import(path: impl AsRef<Path>) -> Result<Schema> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| DbError::io(path, e))?;
        let mut schema = Schema::new();
        for line in content.lines() {
            if line.is_empty() {
                continue;
            }
            let mut parts = line.split(':');
            let name = parts.next().unwrap_or_default();
            let type_str = parts
                .next()
                .ok_or_else(|| DbError::schema(line, "missing column type"))?;
            let col_type = ColumnType::parse(type_str)
                .ok_or_else(|| DbError::schema(line, format!("unknown type: {type_str}")))?;
            let array_size = match parts.next() {
                Some(s) => s
                    .parse()
                    .map_err(|_| DbError::schema(line, format!("bad array size: {s}")))?,
                None => 0,
            };
            if parts.next().is_some() {
                return Err(DbError::schema(line, "too many fields"));
            }
            schema.add_column(name, col_type, array_size)?;
        }
        Ok(schema)
    }

    pub fn add_column(&mut self, name: &str, col_type: ColumnType, array_size: u32) -> Result<()> {
        if name == ID_COLUMN {
            return Err(DbError::schema(name, "the primary key column is implicit"));
        }
        let col = SchemaColumn {
            name: name.to_string(),
            col_type,
            array_size,
        };
        self.size += col.width();
        self.cols.push(col);
        Ok(())
    }

    pub fn columns(&self) -> &[SchemaColumn] {
        &self.cols
    }

    /// Total body width in bytes of one record.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn number_of_columns(&self) -> usize {
        self.cols.len()
    }

    pub fn column_position(&self, name: &str) -> Option<usize> {
        self.cols.iter().position(|c| c.name == name)
    }
}

impl Default for Schema {
    fn default() -> Schema {
        Schema::new()
    }
}

/// A single decoded column value.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValue {
    Int32(i32),
    Int64(i64),
    Float(f32),
    Double(f64),
    Char(Vec<u8>),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn implicit_id_column() {
        let schema = Schema::new();
        assert_eq!(schema.number_of_columns(), 1);
        assert_eq!(schema.columns()[0].name, ID_COLUMN);
        assert_eq!(schema.columns()[0].col_type, ColumnType::Int64);
        assert_eq!(schema.size(), 8);
    }

    #[test]
    fn column_widths() {
        let scalar = |t| SchemaColumn {
            name: "c".into(),
            col_type: t,
            array_size: 0,
        };
        assert_eq!(scalar(ColumnType::Int32).width(), 4);
        assert_eq!(scalar(ColumnType::Float).width(), 4);
        assert_eq!(scalar(ColumnType::Int64).width(), 8);
        assert_eq!(scalar(ColumnType::ForeignKey).width(), 8);
        assert_eq!(scalar(ColumnType::Double).width(), 8);
        assert_eq!(scalar(ColumnType::Char).width(), 1);

        // One element plus array_size additional ones.
        let name = SchemaColumn {
            name: "name".into(),
            col_type: ColumnType::Char,
            array_size: 255,
        };
        assert_eq!(name.width(), 256);
    }

    #[test]
    fn size_accumulates() {
        let mut schema = Schema::new();
        schema.add_column("name", ColumnType::Char, 255).unwrap();
        schema.add_column("grade", ColumnType::Int32, 0).unwrap();
        assert_eq!(schema.size(), 8 + 256 + 4);
        assert_eq!(schema.number_of_columns(), 3);
    }

    #[test]
    fn column_position_by_name() {
        let mut schema = Schema::new();
        schema.add_column("name", ColumnType::Char, 255).unwrap();
        schema.add_column("grade", ColumnType::Int32, 0).unwrap();
        assert_eq!(schema.column_position(ID_COLUMN), Some(0));
        assert_eq!(schema.column_position("name"), Some(1));
        assert_eq!(schema.column_position("grade"), Some(2));
        assert_eq!(schema.column_position("missing"), None);
    }

    #[test]
    fn cannot_shadow_id() {
        let mut schema = Schema::new();
        assert!(matches!(
            schema.add_column(ID_COLUMN, ColumnType::Int64, 0),
            Err(DbError::SchemaParse { .. })
        ));
    }

    #[test]
    fn import_schema_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("person_schema.txt");
        fs::write(&path, "name:char:255\npoints:int32\nbalance:double\n").unwrap();

        let schema = Schema::import(&path).unwrap();
        assert_eq!(schema.number_of_columns(), 4);
        assert_eq!(schema.columns()[1].name, "name");
        assert_eq!(schema.columns()[1].array_size, 255);
        assert_eq!(schema.columns()[2].col_type, ColumnType::Int32);
        assert_eq!(schema.columns()[2].array_size, 0);
        assert_eq!(schema.size(), 8 + 256 + 4 + 8);
    }

    #[test]
    fn import_rejects_unknown_type() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad_schema.txt");
        fs::write(&path, "flag:boolean\n").unwrap();
        assert!(matches!(
            Schema::import(&path),
            Err(DbError::SchemaParse { .. })
        ));
    }

    #[test]
    fn import_rejects_missing_type() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad_schema.txt");
        fs::write(&path, "name\n").unwrap();
        assert!(matches!(
            Schema::import(&path),
            Err(DbError::SchemaParse { .. })
        ));
    }
}
