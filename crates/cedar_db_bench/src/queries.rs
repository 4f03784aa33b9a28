use std::path::Path;
use std::time::Instant;

use cedar_db::{
    BTreeIndex, HashIndex, Table, binary_index_get, binary_index_range, sequential_file_get,
    sequential_file_range, sequential_index_get, sequential_index_range,
};

fn timed<T>(label: &str, f: impl FnOnce() -> T) -> T {
    let t = Instant::now();
    let out = f();
    println!("  {label:<28} {:>10.3?}", t.elapsed());
    out
}

/// Run one point lookup and one range query through every access path and
/// check that they all report the same rows.
pub fn run(table: &Table, dir: &Path) {
    let n = table.index().len() as i64;
    let id = n / 2;
    let (min, max) = ((n / 2 - 3).max(0), n / 2 + 2);
    let capacity = (max - min + 1) as usize;

    println!("Point query for _id = {id}:");
    let expected = timed("sequential file scan", || {
        sequential_file_get(table, id).expect("sequential file scan failed")
    });
    let row = timed("sequential index scan", || {
        sequential_index_get(table, id).expect("sequential index scan failed")
    });
    assert_eq!(row, expected);
    let row = timed("binary search index", || {
        binary_index_get(table, id).expect("binary index search failed")
    });
    assert_eq!(row, expected);

    let hash = timed("hash map build", || HashIndex::build(table));
    let row = timed("hash lookup", || {
        hash.get(table, id).expect("hash lookup failed")
    });
    assert_eq!(row, expected);

    let btree = timed("b+ tree build", || {
        BTreeIndex::build(table, dir.join(format!("{}_bpt.dat", table.name())))
            .expect("b+ tree build failed")
    });
    let row = timed("b+ tree lookup", || {
        btree.get(table, id).expect("b+ tree lookup failed")
    });
    assert_eq!(row, expected);

    println!("Range query for _id in [{min}, {max}]:");
    let expected = timed("sequential file scan", || {
        sequential_file_range(table, min, max).expect("sequential file range failed")
    });
    let rows = timed("sequential index scan", || {
        sequential_index_range(table, min, max).expect("sequential index range failed")
    });
    assert_eq!(rows, expected);
    let rows = timed("binary search index", || {
        binary_index_range(table, min, max).expect("binary index range failed")
    });
    assert_eq!(rows, expected);
    let rows = timed("hash probes", || {
        hash.range(table, min, max).expect("hash range failed")
    });
    assert_eq!(rows, expected);
    let rows = timed("b+ tree range scan", || {
        btree
            .range(table, min, max, capacity)
            .expect("b+ tree range failed")
    });
    assert_eq!(rows, expected);
}
