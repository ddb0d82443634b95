//! Ward Core -- the progression engine for floor-by-floor node-graph games.
//!
//! This crate provides the floor map data model, the pure progression
//! engine that derives node visitation states, the priority-ordered event
//! bus, the inventory item model, and the error taxonomy shared by every
//! layer above.
//!
//! # Progression Model
//!
//! A run moves through numbered floors. Each floor is a directed node graph
//! laid out in rows: a start node in row 0, optional boss at the bottom,
//! interior nodes in between. [`progression::compute_states`] derives each
//! node's state from topology, visit flags, and the current node:
//!
//! - **Completed** -- visited, or the start node.
//! - **Current** -- the node being played; at most one, and while it exists
//!   nothing else is available.
//! - **Available** -- unvisited, with a completed predecessor exactly one
//!   row above.
//! - **Locked** -- everything else.
//!
//! The computation is pure and idempotent; the state layer reruns it after
//! every mutation.
//!
//! # Key Types
//!
//! - [`map::FloorMap`] -- One floor's node graph, validated from a
//!   collaborator payload or built from the deterministic fallback.
//! - [`progression`] -- Pure state derivation, row queries, and the
//!   floor-completion check.
//! - [`event::EventBus`] -- Priority-ordered pub/sub with per-kind
//!   re-entrancy depth limits and contained listener failures.
//! - [`error::ErrorReporter`] -- Injected sink for failures handled in
//!   place rather than propagated.

pub mod error;
pub mod event;
pub mod item;
pub mod map;
pub mod progression;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
