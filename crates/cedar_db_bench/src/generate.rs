use std::fs;
use std::path::Path;

/// Deterministic generator so runs are comparable.
pub struct Lcg(u64);

impl Lcg {
    pub fn new(seed: u64) -> Lcg {
        Lcg(seed)
    }

    pub fn next(&mut self, bound: u64) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (self.0 >> 33) % bound
    }
}

/// Write the three schema files and CSVs under `dir`. `rows` people,
/// `rows / 4` companies, `rows` work relations.
pub fn write_dataset(dir: &Path, rows: u64) {
    let companies = (rows / 4).max(1);

    fs::write(
        dir.join("person_schema.txt"),
        "name:char:255\npoints:int32\n",
    )
    .expect("failed to write person schema");
    fs::write(dir.join("company_schema.txt"), "name:char:255\n")
        .expect("failed to write company schema");
    fs::write(
        dir.join("worked_schema.txt"),
        "company_id:foreign_key\nperson_id:foreign_key\n",
    )
    .expect("failed to write worked schema");

    let mut person = String::from("name,points\n");
    for i in 0..rows {
        person.push_str(&format!("person_{i},{}\n", i % 100));
    }
    fs::write(dir.join("person.csv"), person).expect("failed to write person.csv");

    let mut company = String::from("name\n");
    for i in 0..companies {
        company.push_str(&format!("company_{i}\n"));
    }
    fs::write(dir.join("company.csv"), company).expect("failed to write company.csv");

    let mut lcg = Lcg::new(7);
    let mut worked = String::from("company_id,person_id\n");
    for _ in 0..rows {
        worked.push_str(&format!("{},{}\n", lcg.next(companies), lcg.next(rows)));
    }
    fs::write(dir.join("worked.csv"), worked).expect("failed to write worked.csv");
}
