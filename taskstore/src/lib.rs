//! taskstore - generic persistent state management
//!
//! A `Store` keeps one SQLite-indexed table and one append-only JSONL
//! durability log per collection. Callers implement `Record` for each type
//! they want to persist, declaring which fields should be filterable via
//! `Filter`/`FilterOp` in `Store::list`.

mod error;
mod filter;
mod record;
mod store;

pub use error::StoreError;
pub use filter::{Filter, FilterOp};
pub use record::{IndexValue, Record};
pub use store::{now_ms, Store};
