//! Migrations for the activity log database.
//!
//! The log keeps its own logs.duckdb with an independent migration
//! sequence; evolving the log schema never touches the ledger. Slice
//! order is application order.

pub const LOG_MIGRATIONS: &[(&str, &str)] = &[
    ("000_migrations.sql", include_str!("000_migrations.sql")),
    (
        "001_initial_schema.sql",
        include_str!("001_initial_schema.sql"),
    ),
];
