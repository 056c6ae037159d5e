//! Task data structure.
//!
//! A task is the only entity the tracker knows about. Its on-disk shape uses
//! PascalCase keys (`Id`, `Name`, `IsCompleted`) so files written by earlier
//! versions of the tool keep loading unchanged.

use serde::{Deserialize, Deserializer, Serialize};

/// A single named unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Task {
    pub id: u64,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub name: String,
    #[serde(rename = "IsCompleted", default)]
    pub completed: bool,
}

impl Task {
    /// Create an open task with the given id and name.
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Task {
            id,
            name: name.into(),
            completed: false,
        }
    }
}

/// Older files may carry `"Name": null`; treat it as an empty label.
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
