//! Binary inner joins over two tables.
//!
//! The result is a vector of `(left_offset, right_offset)` pairs into the
//! two heap files. Join keys are compared as their string renderings, even
//! for numeric columns, so all three algorithms agree on any input.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::error::{DbError, Result};
use crate::table::Table;

/// Join algorithm, selected once at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    /// Materializes every left row against every right row. O(|L| * |R|)
    /// row reads.
    NestedIndex,
    /// Builds a value-to-offsets multimap over the left side and probes it
    /// with the right side.
    Hash,
    /// Extracts, sorts and merges `(value, offset)` arrays from both sides.
    SortMerge,
}

pub struct Join {
    pairs: Vec<(i64, i64)>,
}

impl Join {
    /// Inner-join `left.left_column = right.right_column`. Unknown column
    /// names fail; an empty side yields an empty result.
    pub fn new(
        left: &Table,
        left_column: &str,
        right: &Table,
        right_column: &str,
        join_type: JoinType,
    ) -> Result<Join> {
        let left_pos = left
            .schema()
            .column_position(left_column)
            .ok_or_else(|| DbError::UnknownColumn(left_column.to_string()))?;
        let right_pos = right
            .schema()
            .column_position(right_column)
            .ok_or_else(|| DbError::UnknownColumn(right_column.to_string()))?;

        let pairs = match join_type {
            JoinType::NestedIndex => nested_index_join(left, left_pos, right, right_pos)?,
            JoinType::Hash => hash_join(left, left_pos, right, right_pos)?,
            JoinType::SortMerge => sort_merge_join(left, left_pos, right, right_pos)?,
        };
        Ok(Join { pairs })
    }

    /// Matched `(left_offset, right_offset)` pairs. Emit order depends on
    /// the algorithm.
    pub fn pairs(&self) -> &[(i64, i64)] {
        &self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Materialize up to `limit` result rows, left columns then right
    /// columns.
    pub fn rows(
        &self,
        left: &Table,
        right: &Table,
        limit: Option<usize>,
    ) -> Result<Vec<Vec<String>>> {
        let n = limit.unwrap_or(self.pairs.len()).min(self.pairs.len());
        let mut out = Vec::with_capacity(n);
        for &(l, r) in &self.pairs[..n] {
            let mut row = left.get_row(l)?;
            row.extend(right.get_row(r)?);
            out.push(row);
        }
        Ok(out)
    }
}

fn nested_index_join(
    left: &Table,
    left_pos: usize,
    right: &Table,
    right_pos: usize,
) -> Result<Vec<(i64, i64)>> {
    let mut pairs = Vec::new();
    for l in left.index().entries() {
        let left_row = left.get_row(l.offset)?;
        let left_value = &left_row[left_pos];
        for r in right.index().entries() {
            let right_row = right.get_row(r.offset)?;
            if *left_value == right_row[right_pos] {
                pairs.push((l.offset, r.offset));
            }
        }
    }
    Ok(pairs)
}

fn hash_join(
    left: &Table,
    left_pos: usize,
    right: &Table,
    right_pos: usize,
) -> Result<Vec<(i64, i64)>> {
    // Build side: duplicate keys keep every offset.
    let mut build: HashMap<String, Vec<i64>> = HashMap::new();
    for (value, offset) in column_values(left, left_pos)? {
        build.entry(value).or_default().push(offset);
    }

    let mut pairs = Vec::new();
    for r in right.index().entries() {
        let mut row = right.get_row(r.offset)?;
        let value = row.swap_remove(right_pos);
        if let Some(offsets) = build.get(&value) {
            for &l in offsets {
                pairs.push((l, r.offset));
            }
        }
    }
    Ok(pairs)
}

fn sort_merge_join(
    left: &Table,
    left_pos: usize,
    right: &Table,
    right_pos: usize,
) -> Result<Vec<(i64, i64)>> {
    let mut a = column_values(left, left_pos)?;
    let mut b = column_values(right, right_pos)?;
    a.sort();
    b.sort();

    let mut pairs = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].0.cmp(&b[j].0) {
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
            Ordering::Equal => {
                // Equal runs on both sides emit their cross product.
                let key = a[i].0.clone();
                let i_end = i + a[i..].iter().take_while(|(k, _)| *k == key).count();
                let j_end = j + b[j..].iter().take_while(|(k, _)| *k == key).count();
                for x in i..i_end {
                    for y in j..j_end {
                        pairs.push((a[x].1, b[y].1));
                    }
                }
                i = i_end;
                j = j_end;
            }
        }
    }
    Ok(pairs)
}

/// One `(value, offset)` per record, the value taken from column `pos` as a
/// string.
fn column_values(table: &Table, pos: usize) -> Result<Vec<(String, i64)>> {
    table
        .index()
        .entries()
        .iter()
        .map(|e| {
            let mut row = table.get_row(e.offset)?;
            Ok((row.swap_remove(pos), e.offset))
        })
        .collect()
}
