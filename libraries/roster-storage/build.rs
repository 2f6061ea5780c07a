//! Rebuild roster-storage whenever a file under `migrations/` changes, so
//! the embedded `MIGRATOR` never goes stale.

fn main() {
    println!("cargo:rerun-if-changed=migrations");
}
