//! Collaborator seams: the traits the store talks through instead of owning
//! transport. Implementations live with the embedding application; tests use
//! the recording fakes in `test_utils`.
//!
//! Calls are synchronous and fallible. A [`TransportError`] from a
//! collaborator never panics the store; each operation defines its own
//! degradation (fallback map, optimistic local commit, or a reported
//! refusal).

use serde::Deserialize;

use ward_core::error::TransportError;
use ward_core::map::NodeId;

/// Produces floor map payloads in the collaborator wire shape. The store
/// validates every payload before use.
pub trait MapProvider {
    fn generate_floor_map(&mut self, floor: u32) -> Result<serde_json::Value, TransportError>;
}

/// What the backend hands back when a run advances to the next floor.
#[derive(Debug, Clone, Deserialize)]
pub struct FloorAdvance {
    /// The refreshed character payload, shape-checked by the store.
    pub character: serde_json::Value,
    pub current_floor: u32,
}

/// Durable-state backend. Node visits are written behind the local commit;
/// floor advances are authoritative.
pub trait PersistenceClient {
    fn mark_node_visited(&mut self, node: &NodeId) -> Result<(), TransportError>;
    fn go_to_next_floor(&mut self) -> Result<FloorAdvance, TransportError>;
    fn save_game(&mut self) -> Result<(), TransportError>;
}
