//! Schema migrations embedded at compile time.
//!
//! Each entry pairs a migration name with its SQL, pulled in through
//! include_str! so the binary never depends on files on disk. Slice
//! order is application order, and names never change once shipped:
//! the bookkeeping table records them verbatim.

pub const MIGRATIONS: &[(&str, &str)] = &[
    ("000_migrations.sql", include_str!("000_migrations.sql")),
    ("001_initial_schema.sql", include_str!("001_initial_schema.sql")),
];
