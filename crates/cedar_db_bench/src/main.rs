mod generate;
mod joins;
mod queries;

use std::time::Instant;

use cedar_db::Table;

fn main() {
    pretty_env_logger::init();
    let total = Instant::now();

    let rows: u64 = std::env::var("CEDAR_BENCH_ROWS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(1000);

    let scratch = tempfile::tempdir().expect("failed to create scratch dir");
    let dir = scratch.path();

    // --- Phase 1: Generate the dataset ---
    println!("Phase 1: Generating {rows}-row dataset...");
    let t = Instant::now();
    generate::write_dataset(dir, rows);
    println!("  done ({:.1}s)", t.elapsed().as_secs_f64());

    // --- Phase 2: Ingest the CSVs ---
    println!("Phase 2: Ingesting CSVs...");
    let t = Instant::now();

    let mut person = Table::open(dir, "person").expect("failed to open person");
    person
        .import_schema(dir.join("person_schema.txt"))
        .expect("failed to import person schema");
    person
        .ingest_csv(dir.join("person.csv"))
        .expect("failed to ingest person.csv");

    let mut company = Table::open(dir, "company").expect("failed to open company");
    company
        .import_schema(dir.join("company_schema.txt"))
        .expect("failed to import company schema");
    company
        .ingest_csv(dir.join("company.csv"))
        .expect("failed to ingest company.csv");

    let mut worked = Table::open(dir, "worked").expect("failed to open worked");
    worked
        .import_schema(dir.join("worked_schema.txt"))
        .expect("failed to import worked schema");
    worked
        .ingest_csv(dir.join("worked.csv"))
        .expect("failed to ingest worked.csv");

    println!(
        "  ingested {} + {} + {} rows ({:.1}s)",
        person.index().len(),
        company.index().len(),
        worked.index().len(),
        t.elapsed().as_secs_f64()
    );

    // --- Phase 3: Access paths ---
    println!("Phase 3: Access paths on person...");
    queries::run(&person, dir);

    // --- Phase 4: Joins ---
    println!("Phase 4: Joins...");
    joins::run(&person, &worked);

    // --- Phase 5: Drop ---
    println!("Phase 5: Dropping tables...");
    person.drop_table().expect("failed to drop person");
    company.drop_table().expect("failed to drop company");
    worked.drop_table().expect("failed to drop worked");

    println!(
        "\nAll done! Total time: {:.1}s",
        total.elapsed().as_secs_f64()
    );
}
