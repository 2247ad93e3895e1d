//! Concrete backends for the port traits: DuckDB for durable storage,
//! and an in-memory store for tests and embedders.

pub mod duckdb;
pub mod memory;
