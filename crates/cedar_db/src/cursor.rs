use crate::schema::Schema;

/// Forward-only cursor over a materialized result set: a schema plus the
/// rows of one query. Iteration can be restarted any number of times with
/// [`move_to_first`].
///
/// [`move_to_first`]: Cursor::move_to_first
pub struct Cursor {
    schema: Schema,
    rows: Vec<Vec<String>>,
    pos: Option<usize>,
}

impl Cursor {
    pub fn new(schema: Schema, rows: Vec<Vec<String>>) -> Cursor {
        Cursor {
            schema,
            rows,
            pos: None,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rewind to the first row. False when the result set is empty.
    pub fn move_to_first(&mut self) -> bool {
        if self.rows.is_empty() {
            self.pos = None;
            false
        } else {
            self.pos = Some(0);
            true
        }
    }

    /// Advance one row. False once the cursor runs off the end, and from
    /// then on until the next [`move_to_first`].
    ///
    /// [`move_to_first`]: Cursor::move_to_first
    pub fn move_to_next(&mut self) -> bool {
        match self.pos {
            Some(p) if p + 1 < self.rows.len() => {
                self.pos = Some(p + 1);
                true
            }
            _ => {
                self.pos = None;
                false
            }
        }
    }

    /// Value of the given column in the current row; `None` when the cursor
    /// is not positioned or the index is out of range.
    pub fn get_string(&self, column_index: usize) -> Option<&str> {
        let row = &self.rows[self.pos?];
        row.get(column_index).map(|s| s.as_str())
    }

    pub fn get_column_index(&self, column_name: &str) -> Option<usize> {
        self.schema.column_position(column_name)
    }

    pub fn get_string_by_name(&self, column_name: &str) -> Option<&str> {
        self.get_string(self.get_column_index(column_name)?)
    }
}
