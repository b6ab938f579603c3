//! This module defines the `Entity` type, one tracked member of the
//! watch-list.

use serde::{Deserialize, Serialize};

/// A tracked entity from the static watch-list.
///
/// Entities are created once at startup from the configured watch-list and
/// are immutable for the process lifetime. The `id` is the position of the
/// entity in the watch-list, which is also the canonical output order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    /// Unique identifier for the entity, assigned in watch-list order.
    pub id: i64,

    /// The canonical display name of the entity, matched against incoming
    /// event titles.
    pub display_name: String,
}

impl Entity {
    /// Builds the watch-list from the configured display names, assigning
    /// ids in configuration order.
    pub fn watchlist(names: &[String]) -> Vec<Entity> {
        names
            .iter()
            .enumerate()
            .map(|(i, name)| Entity { id: i as i64, display_name: name.clone() })
            .collect()
    }
}
