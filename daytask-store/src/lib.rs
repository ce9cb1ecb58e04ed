//! Storage and domain types for `daytask`.
//!
//! Holds the [`task::Task`] model, the SQLite-backed [`store::TaskStore`],
//! weekday helpers for the day buckets, and the completion progress bar
//! shown on the server console.

pub mod day;
pub mod progress;
pub mod store;
pub mod task;

pub use store::{StoreError, TaskStore};
pub use task::Task;
