//! The task model shared by the store and the HTTP API.

use serde::{Deserialize, Serialize};

/// A single to-do item belonging to one day bucket.
///
/// The `day` label is used for filtering only and never appears in
/// serialized output; clients see `{id, description, done}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Row id assigned by the store on insert. Never reused.
    pub id: i64,
    /// Free-form text. Not unique within a day.
    pub description: String,
    /// Completion flag, `false` at creation.
    pub done: bool,
    /// Day bucket label (e.g. `"Monday"`).
    #[serde(skip)]
    pub day: String,
}
