//! Ward State -- the state layer over the `ward-core` progression engine.
//!
//! This crate owns run state and its mutation surface. A [`store::StateStore`]
//! is the single writer: every mutation validates first, commits only on
//! success, recomputes node states through the progression engine, then
//! notifies its observers and emits events on the shared bus.
//!
//! External effects go through two collaborator seams
//! ([`collaborators::MapProvider`] and [`collaborators::PersistenceClient`]);
//! the store degrades on their failures (fallback map, optimistic local
//! commit) rather than panicking or blocking play.
//!
//! A [`context::GameContext`] wires the bus, the reporter, and the store
//! together as an explicit dependency-injection root.

pub mod character;
pub mod collaborators;
pub mod context;
pub mod store;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
