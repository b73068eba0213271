//! BFS shortest path over the adjacency index.

use std::collections::{HashMap, HashSet, VecDeque};

use super::UserId;

/// Find the shortest directed path from `source` to `target`.
///
/// The queue holds whole paths, so the winner is read straight off the queue.
/// A node is marked visited when it is dequeued, not when it is enqueued.
/// Among equal-length paths the one following earlier adjacency entries wins.
/// Returns an empty vector when `target` is unreachable.
pub fn shortest_path(
    adjacency: &HashMap<UserId, Vec<UserId>>,
    source: UserId,
    target: UserId,
) -> Vec<UserId> {
    let mut visited = HashSet::new();
    let mut queue = VecDeque::new();
    queue.push_back(vec![source]);

    while let Some(path) = queue.pop_front() {
        let node = match path.last() {
            Some(node) => *node,
            None => continue,
        };

        if node == target {
            return path;
        }

        if !visited.insert(node) {
            continue;
        }

        for &neighbor in adjacency.get(&node).map(Vec::as_slice).unwrap_or(&[]) {
            if visited.contains(&neighbor) {
                continue;
            }
            let mut next = Vec::with_capacity(path.len() + 1);
            next.extend_from_slice(&path);
            next.push(neighbor);
            queue.push_back(next);
        }
    }

    Vec::new()
}
