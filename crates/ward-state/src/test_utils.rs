//! Recording fakes for the collaborator traits. Shared with integration
//! tests through the `test-utils` feature; every fake hands out a cloneable
//! handle so tests keep visibility after boxing one into the store.

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::{Value, json};

use ward_core::error::TransportError;
use ward_core::map::NodeId;

use crate::collaborators::{FloorAdvance, MapProvider, PersistenceClient};

// ---------------------------------------------------------------------------
// Map provider fake
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct ProviderScript {
    /// Payload handed back for every request.
    pub payload: Value,
    /// When set, every request fails with a transport error instead.
    pub fail: bool,
    /// Floors requested, in order.
    pub requests: Vec<u32>,
}

/// Map provider that replays a scripted payload and records requests.
#[derive(Debug, Clone)]
pub struct StaticMapProvider {
    pub script: Rc<RefCell<ProviderScript>>,
}

impl StaticMapProvider {
    pub fn new(payload: Value) -> Self {
        Self {
            script: Rc::new(RefCell::new(ProviderScript {
                payload,
                fail: false,
                requests: Vec::new(),
            })),
        }
    }

    /// Provider whose every request fails at the transport level.
    pub fn failing() -> Self {
        let provider = Self::new(Value::Null);
        provider.script.borrow_mut().fail = true;
        provider
    }

    pub fn request_count(&self) -> usize {
        self.script.borrow().requests.len()
    }
}

impl MapProvider for StaticMapProvider {
    fn generate_floor_map(&mut self, floor: u32) -> Result<Value, TransportError> {
        let mut script = self.script.borrow_mut();
        script.requests.push(floor);
        if script.fail {
            Err(TransportError::new("map provider offline"))
        } else {
            Ok(script.payload.clone())
        }
    }
}

// ---------------------------------------------------------------------------
// Persistence fake
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct PersistenceLog {
    pub visited: Vec<NodeId>,
    pub saves: u32,
    pub fail_visits: bool,
    pub fail_advance: bool,
    pub fail_saves: bool,
    /// What the next floor advance hands back.
    pub next_floor: u32,
    pub next_character: Value,
}

/// Persistence client that records writes and replays scripted advances.
#[derive(Debug, Clone)]
pub struct RecordingPersistence {
    pub log: Rc<RefCell<PersistenceLog>>,
}

impl RecordingPersistence {
    pub fn new() -> Self {
        Self {
            log: Rc::new(RefCell::new(PersistenceLog {
                visited: Vec::new(),
                saves: 0,
                fail_visits: false,
                fail_advance: false,
                fail_saves: false,
                next_floor: 2,
                next_character: json!({"name": "Resident", "lives": 3, "insight": 20}),
            })),
        }
    }

    pub fn visited(&self) -> Vec<NodeId> {
        self.log.borrow().visited.clone()
    }
}

impl Default for RecordingPersistence {
    fn default() -> Self {
        Self::new()
    }
}

impl PersistenceClient for RecordingPersistence {
    fn mark_node_visited(&mut self, node: &NodeId) -> Result<(), TransportError> {
        let mut log = self.log.borrow_mut();
        if log.fail_visits {
            return Err(TransportError::new("visit write refused"));
        }
        log.visited.push(node.clone());
        Ok(())
    }

    fn go_to_next_floor(&mut self) -> Result<FloorAdvance, TransportError> {
        let log = self.log.borrow();
        if log.fail_advance {
            return Err(TransportError::new("floor advance refused"));
        }
        Ok(FloorAdvance {
            character: log.next_character.clone(),
            current_floor: log.next_floor,
        })
    }

    fn save_game(&mut self) -> Result<(), TransportError> {
        let mut log = self.log.borrow_mut();
        if log.fail_saves {
            return Err(TransportError::new("save refused"));
        }
        log.saves += 1;
        Ok(())
    }
}
