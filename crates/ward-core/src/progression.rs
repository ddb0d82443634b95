//! Pure progression engine: derives every node's visitation state from the
//! map topology, the visited flags, and the current node.
//!
//! The engine is a pure function over its inputs. It never mutates the map,
//! never emits events, and is safe to run after every mutation; computing
//! states twice in a row yields the identical assignment.
//!
//! Unlock rule: while no node is current, an edge from a completed node
//! unlocks its target when the target is unvisited and sits exactly one row
//! below the edge's source. While a node is current, nothing is available;
//! the player has to finish the encounter first.

use std::collections::BTreeMap;

use crate::map::{FloorMap, NodeId, NodeState};

/// The derived state of every node on a floor, keyed by id.
/// `BTreeMap` keeps iteration deterministic.
pub type StateAssignment = BTreeMap<NodeId, NodeState>;

/// Compute the state of every node on the map.
///
/// Seed pass: the start node and every visited node are `Completed`, the
/// current node (if any) is `Current`, everything else is `Locked`.
/// Completion is sticky: a visited node (and start) stays `Completed` even
/// when designated current. When no node is current, a second pass promotes
/// the unlock frontier to `Available`.
pub fn compute_states(map: &FloorMap, current: Option<&NodeId>) -> StateAssignment {
    let mut states = StateAssignment::new();

    for node in map.all_nodes() {
        let state = if node.visited || node.id.is_start() {
            NodeState::Completed
        } else if current == Some(&node.id) {
            NodeState::Current
        } else {
            NodeState::Locked
        };
        states.insert(node.id.clone(), state);
    }

    if current.is_none() {
        let completed: Vec<&NodeId> = states
            .iter()
            .filter(|(_, s)| **s == NodeState::Completed)
            .map(|(id, _)| id)
            .collect();

        let mut unlocked = Vec::new();
        for source_id in completed {
            let Some(source) = map.node(source_id) else {
                continue;
            };
            for target_id in &source.paths {
                let Some(target) = map.node(target_id) else {
                    continue;
                };
                if !target.visited && target.row() == source.row() + 1 {
                    unlocked.push(target.id.clone());
                }
            }
        }
        for id in unlocked {
            if states.get(&id) == Some(&NodeState::Locked) {
                states.insert(id, NodeState::Available);
            }
        }
    }

    states
}

/// Apply a computed assignment back onto the map's `state` fields.
pub fn apply_states(map: &mut FloorMap, states: &StateAssignment) {
    for node in map.all_nodes_mut() {
        if let Some(state) = states.get(&node.id) {
            node.state = *state;
        }
    }
}

/// Recompute and stamp node states in one step.
pub fn refresh(map: &mut FloorMap, current: Option<&NodeId>) {
    let states = compute_states(map, current);
    apply_states(map, &states);
}

/// The highest row containing a visited node. The start node keeps this at
/// 0 on a fresh floor.
pub fn highest_completed_row(map: &FloorMap) -> u32 {
    map.all_nodes()
        .filter(|n| n.visited || n.id.is_start())
        .map(|n| n.row())
        .max()
        .unwrap_or(0)
}

/// Whether every node in a row has been visited. Empty rows count as
/// completed.
pub fn is_row_completed(map: &FloorMap, row: u32) -> bool {
    map.nodes_in_row(row).all(|n| n.visited || n.id.is_start())
}

/// Whether the floor is finished: nothing available, nothing current, and at
/// least one non-start node completed. Pure query; announcing the result
/// (and deduplicating the announcement) is the caller's concern.
pub fn check_floor_completion(map: &FloorMap, current: Option<&NodeId>) -> bool {
    if current.is_some() {
        return false;
    }
    let states = compute_states(map, None);
    let any_available = states.values().any(|s| *s == NodeState::Available);
    let any_progress = map.all_nodes().any(|n| !n.id.is_start() && n.visited);
    !any_available && any_progress
}

// ===========================================================================
// Tests
// ===========================================================================
