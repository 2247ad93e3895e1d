//! Storage traits the service layer is written against.
//!
//! Everything above the adapters names these traits only; no service
//! knows which database sits behind them.

mod repository;

pub use repository::{StatementRepository, UserRepository};
