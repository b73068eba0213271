//! Graph construction from user and connection records.

use std::collections::{HashMap, HashSet};

use serde_json::Value;

use super::{Edge, RawRecord, SocialGraph, UserId};
use crate::{RelsearchError, Result};

/// Build lookup tables and the adjacency index.
///
/// `users` rows need `id` and `username`; `connections` rows need `user1_id`
/// and `user2_id`. Ids may be JSON integers or integer strings. Any malformed
/// row, or an edge pointing at an id without a user row, rejects the whole
/// build. Usernames that fold to the same lowercase key: last one wins.
pub fn build_graph(users: &[RawRecord], connections: &[RawRecord]) -> Result<SocialGraph> {
    let mut id_to_name = HashMap::with_capacity(users.len());
    let mut name_to_id = HashMap::with_capacity(users.len());

    for (index, user) in users.iter().enumerate() {
        let id = parse_id(user, "id", "users", index)?;
        let username = parse_username(user, index)?;
        name_to_id.insert(username.to_lowercase(), id);
        id_to_name.insert(id, username);
    }

    let mut adjacency: HashMap<UserId, Vec<UserId>> = HashMap::new();
    let mut seen = HashSet::with_capacity(connections.len());

    for (index, conn) in connections.iter().enumerate() {
        let edge = Edge {
            source: parse_id(conn, "user1_id", "connections", index)?,
            target: parse_id(conn, "user2_id", "connections", index)?,
        };

        for endpoint in [edge.source, edge.target] {
            if !id_to_name.contains_key(&endpoint) {
                return Err(RelsearchError::MalformedRecord(format!(
                    "connections[{}]: references unknown user id {}",
                    index, endpoint
                )));
            }
        }

        // Parallel edges collapse to the first occurrence
        if seen.insert(edge) {
            adjacency.entry(edge.source).or_default().push(edge.target);
        }
    }

    log::debug!(
        "Built graph: {} users, {} unique edges ({} connection rows)",
        id_to_name.len(),
        seen.len(),
        connections.len()
    );

    Ok(SocialGraph {
        id_to_name,
        name_to_id,
        adjacency,
    })
}

fn parse_id(record: &RawRecord, field: &str, table: &str, index: usize) -> Result<UserId> {
    let value = record.get(field).ok_or_else(|| {
        RelsearchError::MalformedRecord(format!("{}[{}]: missing field `{}`", table, index, field))
    })?;

    let parsed = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<UserId>().ok(),
        _ => None,
    };

    parsed.ok_or_else(|| {
        RelsearchError::MalformedRecord(format!(
            "{}[{}]: field `{}` is not an integer id: {}",
            table, index, field, value
        ))
    })
}

fn parse_username(record: &RawRecord, index: usize) -> Result<String> {
    match record.get("username") {
        Some(Value::String(name)) if !name.trim().is_empty() => Ok(name.clone()),
        Some(other) => Err(RelsearchError::MalformedRecord(format!(
            "users[{}]: field `username` must be a non-empty string, got {}",
            index, other
        ))),
        None => Err(RelsearchError::MalformedRecord(format!(
            "users[{}]: missing field `username`",
            index
        ))),
    }
}
