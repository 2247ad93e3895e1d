//! Business entities and the rules that guard them.
//!
//! Plain data plus validation; nothing in this module performs I/O.

pub mod balance;
pub mod result;
mod statement;
mod user;

pub use balance::{compute_balance, BalanceSheet};
pub use statement::{OperationType, Statement};
pub use user::{User, UserProfile};
