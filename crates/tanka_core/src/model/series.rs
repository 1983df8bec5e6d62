//! Series domain model.
//!
//! # Responsibility
//! - Define the named, ordered grouping of entry ids ("連作").
//! - Report progress against an optional planned count.
//!
//! # Invariants
//! - `entries` holds no duplicate ids.
//! - `plan_count == 0` means no target is set.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Named, ordered grouping of entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Series {
    pub id: String,
    pub name: String,
    /// Target number of entries; `0` means no target.
    #[serde(default, deserialize_with = "plan_count_from_stored")]
    pub plan_count: u32,
    /// Member entry ids in deck order.
    #[serde(default)]
    pub entries: Vec<String>,
}

impl Series {
    /// Creates an empty series.
    pub fn new(id: impl Into<String>, name: impl Into<String>, plan_count: u32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            plan_count,
            entries: Vec::new(),
        }
    }

    pub fn contains(&self, entry_id: &str) -> bool {
        self.entries.iter().any(|id| id == entry_id)
    }

    /// Appends `entry_id` unless already listed. Returns whether it was added.
    pub fn push_unique(&mut self, entry_id: &str) -> bool {
        if self.contains(entry_id) {
            return false;
        }
        self.entries.push(entry_id.to_string());
        true
    }

    /// Removes every occurrence of `entry_id`. Returns whether one was found.
    pub fn remove(&mut self, entry_id: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|id| id != entry_id);
        before != self.entries.len()
    }

    pub fn progress(&self) -> SeriesProgress {
        SeriesProgress {
            count: self.entries.len(),
            plan: self.plan_count,
        }
    }
}

/// Member count against the planned target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeriesProgress {
    pub count: usize,
    pub plan: u32,
}

impl SeriesProgress {
    /// `true` once a target is set and reached.
    pub fn is_complete(&self) -> bool {
        self.plan > 0 && self.count >= self.plan as usize
    }

    /// Display label, e.g. `3/10 首` or `3 首` without a target.
    pub fn label(&self) -> String {
        if self.plan > 0 {
            format!("{}/{} 首", self.count, self.plan)
        } else {
            format!("{} 首", self.count)
        }
    }
}

/// Reads a persisted plan. Anything that is not a non-negative number
/// (or numeric string) reads as `0`.
fn plan_count_from_stored<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let plan = match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(number)) => number
            .as_u64()
            .or_else(|| number.as_f64().filter(|value| *value >= 0.0).map(|value| value as u64)),
        Some(Value::String(text)) => text.trim().parse::<u64>().ok(),
        _ => None,
    };
    Ok(plan.map_or(0, |value| u32::try_from(value).unwrap_or(u32::MAX)))
}
