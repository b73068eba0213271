//! Social graph module: graph construction from bulk records and BFS path finding.
//!
//! Users and directed connections arrive as flat JSON records (one table each)
//! and are folded into id/name lookups plus an adjacency index.

mod builder;
mod path;

pub use builder::build_graph;
pub use path::shortest_path;

use std::collections::HashMap;

use crate::{RelsearchError, Result};

/// Entity id as stored in the user table.
pub type UserId = i64;

/// A flat record as returned by the bulk-record endpoint.
pub type RawRecord = serde_json::Map<String, serde_json::Value>;

/// Directed connection (source --connected_to--> target).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Edge {
    pub source: UserId,
    pub target: UserId,
}

/// Lookup tables and adjacency index built once from the bulk records.
///
/// Immutable after construction.
#[derive(Debug, Clone, Default)]
pub struct SocialGraph {
    id_to_name: HashMap<UserId, String>,
    name_to_id: HashMap<String, UserId>,
    adjacency: HashMap<UserId, Vec<UserId>>,
}

impl SocialGraph {
    /// Display name for an id.
    pub fn name_of(&self, id: UserId) -> Option<&str> {
        self.id_to_name.get(&id).map(String::as_str)
    }

    /// Id for a name, matched case-insensitively.
    pub fn id_of(&self, name: &str) -> Option<UserId> {
        self.name_to_id.get(&name.to_lowercase()).copied()
    }

    /// Outgoing neighbours in edge-record order. Unknown ids are dead ends.
    pub fn neighbors(&self, id: UserId) -> &[UserId] {
        self.adjacency.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn user_count(&self) -> usize {
        self.id_to_name.len()
    }

    pub fn edge_count(&self) -> usize {
        self.adjacency.values().map(Vec::len).sum()
    }

    /// Shortest directed path between two ids (empty when unreachable).
    pub fn shortest_path(&self, source: UserId, target: UserId) -> Vec<UserId> {
        shortest_path(&self.adjacency, source, target)
    }

    /// Resolve both names, run BFS and map the path back to display names.
    ///
    /// Unknown names are rejected before the search runs. An empty result
    /// means the target is unreachable.
    pub fn path_between_names(&self, source: &str, target: &str) -> Result<Vec<String>> {
        let source_id = self
            .id_of(source)
            .ok_or_else(|| RelsearchError::UnknownEntity(source.to_string()))?;
        let target_id = self
            .id_of(target)
            .ok_or_else(|| RelsearchError::UnknownEntity(target.to_string()))?;

        let path = self.shortest_path(source_id, target_id);
        path.into_iter()
            .map(|id| {
                self.name_of(id)
                    .map(str::to_string)
                    .ok_or_else(|| RelsearchError::UnknownEntity(format!("id {}", id)))
            })
            .collect()
    }
}
