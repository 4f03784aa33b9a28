use std::collections::HashSet;
use std::time::Instant;

use cedar_db::{ID_COLUMN, Join, JoinType, Table};

/// Above this row count the quadratic nested loop is skipped; its cost is
/// the lesson, not something to sit through.
const NESTED_LIMIT: usize = 2000;

pub fn run(person: &Table, worked: &Table) {
    println!(
        "Join person._id = worked.person_id ({} x {} rows):",
        person.index().len(),
        worked.index().len()
    );

    let mut results: Vec<(&str, HashSet<(i64, i64)>)> = Vec::new();
    let algorithms: &[(&str, JoinType)] = &[
        ("nested index loop", JoinType::NestedIndex),
        ("hash join", JoinType::Hash),
        ("sort-merge join", JoinType::SortMerge),
    ];

    for &(label, join_type) in algorithms {
        if join_type == JoinType::NestedIndex && person.index().len() > NESTED_LIMIT {
            println!("  {label:<28} skipped (> {NESTED_LIMIT} rows)");
            continue;
        }
        let t = Instant::now();
        let join = Join::new(person, ID_COLUMN, worked, "person_id", join_type)
            .expect("join failed");
        println!(
            "  {label:<28} {:>10.3?}  ({} pairs)",
            t.elapsed(),
            join.len()
        );
        results.push((label, join.pairs().iter().copied().collect()));
    }

    // Every algorithm that ran must agree.
    if let Some((first_label, first)) = results.first() {
        for (label, pairs) in &results[1..] {
            assert_eq!(
                first, pairs,
                "{first_label} and {label} disagree on the join result"
            );
        }
    }
}
