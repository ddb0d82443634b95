//! Property-based tests for the progression engine.
//!
//! Uses proptest to generate random row-structured floor maps, then verify
//! the state-derivation invariants hold on all of them.

use proptest::prelude::*;
use ward_core::map::{FloorMap, NodeId, NodeKind, NodeState};
use ward_core::progression::{check_floor_completion, compute_states, highest_completed_row};
use ward_core::test_utils::{map_from_parts, test_node};

// ===========================================================================
// Generators
// ===========================================================================

/// A random floor plan: per-row node counts, random edges between adjacent
/// rows (plus a few row-skipping stray edges), and a random visited set.
#[derive(Debug, Clone)]
struct FloorPlan {
    /// Nodes per interior row (rows 1..=len).
    rows: Vec<usize>,
    /// Edge selector seeds, one per node, consumed in construction order.
    edge_seeds: Vec<u64>,
    /// Visited selector seeds, one per node.
    visit_seeds: Vec<u64>,
}

fn arb_floor_plan() -> impl Strategy<Value = FloorPlan> {
    (1..5usize)
        .prop_flat_map(|row_count| proptest::collection::vec(1..4usize, row_count))
        .prop_flat_map(|rows| {
            let total: usize = rows.iter().sum();
            (
                Just(rows),
                proptest::collection::vec(any::<u64>(), total + 1),
                proptest::collection::vec(any::<u64>(), total),
            )
        })
        .prop_map(|(rows, edge_seeds, visit_seeds)| FloorPlan {
            rows,
            edge_seeds,
            visit_seeds,
        })
}

fn node_name(row: usize, col: usize) -> String {
    format!("n{row}_{col}")
}

/// Materialize a plan into a map. Every node gets at least one edge to the
/// next row (when one exists), so generated maps are traversable; stray
/// row-skipping edges are thrown in to check they stay inert.
fn build_map(plan: &FloorPlan) -> FloorMap {
    let mut edge_seed = plan.edge_seeds.iter().copied().cycle();
    let mut visit_seed = plan.visit_seeds.iter().copied().cycle();
    let mut next_edge = move || edge_seed.next().unwrap_or(0);
    let mut next_visit = move || visit_seed.next().unwrap_or(0);

    let mut interior = Vec::new();
    let last_row = plan.rows.len();

    for (row_idx, &width) in plan.rows.iter().enumerate() {
        let row = row_idx + 1;
        for col in 0..width {
            let mut paths: Vec<String> = Vec::new();
            if row < last_row {
                let next_width = plan.rows[row];
                // Guaranteed edge into the next row.
                paths.push(node_name(row + 1, next_edge() as usize % next_width));
                // Occasional second edge.
                if next_edge() % 3 == 0 {
                    paths.push(node_name(row + 1, next_edge() as usize % next_width));
                }
                // Occasional stray edge skipping a row; must unlock nothing.
                if row + 2 <= last_row && next_edge() % 4 == 0 {
                    let skip_width = plan.rows[row + 1];
                    paths.push(node_name(row + 2, next_edge() as usize % skip_width));
                }
            }
            let path_refs: Vec<&str> = paths.iter().map(String::as_str).collect();
            let mut node = test_node(
                &node_name(row, col),
                NodeKind::Question,
                row as u32,
                col as u32,
                &path_refs,
            );
            node.visited = next_visit() % 3 == 0;
            interior.push(node);
        }
    }

    let first_width = plan.rows[0];
    let start_paths: Vec<String> = (0..first_width).map(|c| node_name(1, c)).collect();
    let start_refs: Vec<&str> = start_paths.iter().map(String::as_str).collect();
    let start = test_node("start", NodeKind::Start, 0, 0, &start_refs);

    map_from_parts(start, None, interior)
}

/// Pick any node at all to stand as the current designation, start and
/// visited nodes included.
fn pick_any(map: &FloorMap, seed: u64) -> NodeId {
    let all: Vec<NodeId> = map.all_nodes().map(|n| n.id.clone()).collect();
    all[seed as usize % all.len()].clone()
}

/// Pick an unvisited node to stand as the current node, when one exists.
fn pick_current(map: &FloorMap, seed: u64) -> Option<NodeId> {
    let candidates: Vec<NodeId> = map
        .all_nodes()
        .filter(|n| !n.visited && !n.id.is_start())
        .map(|n| n.id.clone())
        .collect();
    if candidates.is_empty() {
        None
    } else {
        Some(candidates[seed as usize % candidates.len()].clone())
    }
}

// ===========================================================================
// Properties
// ===========================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    /// Idempotence: recomputing from unchanged inputs yields the identical
    /// assignment.
    #[test]
    fn recompute_is_idempotent(plan in arb_floor_plan(), seed in any::<u64>()) {
        let map = build_map(&plan);
        let current = pick_current(&map, seed);

        let first = compute_states(&map, current.as_ref());
        let second = compute_states(&map, current.as_ref());
        prop_assert_eq!(first, second);
    }

    /// The start node is always Completed, never anything else.
    #[test]
    fn start_is_always_completed(plan in arb_floor_plan()) {
        let map = build_map(&plan);
        let states = compute_states(&map, None);
        prop_assert_eq!(states[&NodeId::start()], NodeState::Completed);
    }

    /// At most one node is Current, and only the designated one.
    #[test]
    fn at_most_one_current(plan in arb_floor_plan(), seed in any::<u64>()) {
        let map = build_map(&plan);
        let current = pick_current(&map, seed);

        let states = compute_states(&map, current.as_ref());
        let currents: Vec<&NodeId> = states
            .iter()
            .filter(|(_, s)| **s == NodeState::Current)
            .map(|(id, _)| id)
            .collect();

        match &current {
            Some(id) => prop_assert_eq!(currents, vec![id]),
            None => prop_assert!(currents.is_empty()),
        }
    }

    /// Every Available node has a Completed predecessor exactly one row
    /// above, and nothing is Available while a node is Current.
    #[test]
    fn available_needs_completed_predecessor(plan in arb_floor_plan(), seed in any::<u64>()) {
        let map = build_map(&plan);
        let current = pick_current(&map, seed);
        let states = compute_states(&map, current.as_ref());

        for (id, state) in &states {
            if *state != NodeState::Available {
                continue;
            }
            prop_assert!(current.is_none(), "nothing may be available while a node is current");

            let target = map.node(id).unwrap();
            let has_predecessor = map.all_nodes().any(|source| {
                states[&source.id] == NodeState::Completed
                    && source.row() + 1 == target.row()
                    && source.paths.contains(id)
            });
            prop_assert!(
                has_predecessor,
                "{} is available without a completed predecessor one row up", id
            );
        }
    }

    /// Visited nodes and start are always Completed, even when one of them
    /// is the current designation: completion is sticky.
    #[test]
    fn visited_is_completed(plan in arb_floor_plan(), seed in any::<u64>()) {
        let map = build_map(&plan);
        let current = pick_any(&map, seed);
        let states = compute_states(&map, Some(&current));

        for node in map.all_nodes() {
            if node.visited || node.id.is_start() {
                prop_assert_eq!(states[&node.id], NodeState::Completed);
            }
        }
    }

    /// A completed floor reports a highest completed row covering some
    /// visited node, and completion implies an empty frontier.
    #[test]
    fn completion_implies_empty_frontier(plan in arb_floor_plan()) {
        let map = build_map(&plan);

        if check_floor_completion(&map, None) {
            let states = compute_states(&map, None);
            prop_assert!(states.values().all(|s| *s != NodeState::Available));
            prop_assert!(highest_completed_row(&map) >= 1);
        }
    }
}
