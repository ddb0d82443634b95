//! The state store: single owner of run state, validated mutation surface,
//! and change notification.
//!
//! Every mutation follows the same discipline: validate first, mutate only
//! on success, recompute node states, then notify observers and emit bus
//! events. Failed validation reports through the injected reporter and
//! leaves state untouched; a failed collaborator write-behind is reported
//! and never rolled back.
//!
//! The store carries its own observer registry, distinct from the bus:
//! observers watch state transitions ([`StateChange`]), bus listeners watch
//! game events ([`BusEvent`]). Kind-specific observers run before global
//! ones, and each invocation is individually contained.

use std::collections::HashMap;
use std::rc::Rc;

use serde_json::Value;

use ward_core::error::{EngineError, ErrorReporter, Severity};
use ward_core::event::{BusEvent, EventBus};
use ward_core::item::Item;
use ward_core::map::{FloorMap, Node, NodeId, NodeState};
use ward_core::progression;

use crate::character::{Character, validate_attribute};
use crate::collaborators::{MapProvider, PersistenceClient};

// ---------------------------------------------------------------------------
// Game data
// ---------------------------------------------------------------------------

/// Everything the store owns. `Clone` backs the defensive copy handed out
/// by [`StateStore::get_state`].
#[derive(Debug, Clone, PartialEq)]
pub struct GameData {
    pub character: Option<Character>,
    pub current_floor: u32,
    pub current_node: Option<NodeId>,
    pub map: Option<FloorMap>,
    pub inventory: Vec<Item>,
    pub status_effects: Vec<Value>,
}

impl Default for GameData {
    fn default() -> Self {
        Self {
            character: None,
            current_floor: 1,
            current_node: None,
            map: None,
            inventory: Vec::new(),
            status_effects: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// State changes and observers
// ---------------------------------------------------------------------------

/// A state transition the store announces to its observers.
#[derive(Debug, Clone, PartialEq)]
pub enum StateChange {
    StateInitialized,
    MapUpdated { floor: u32 },
    CurrentNodeChanged { node: Option<NodeId> },
    NodeCompleted { node: NodeId },
    FloorChanged { floor: u32 },
    FloorCompleted { floor: u32 },
    CharacterUpdated,
    ItemAdded { item: Item },
    ItemRemoved { item: Item },
}

/// Discriminant tag for subscribing to one kind of state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateChangeKind {
    StateInitialized,
    MapUpdated,
    CurrentNodeChanged,
    NodeCompleted,
    FloorChanged,
    FloorCompleted,
    CharacterUpdated,
    ItemAdded,
    ItemRemoved,
}

impl StateChange {
    pub fn kind(&self) -> StateChangeKind {
        match self {
            StateChange::StateInitialized => StateChangeKind::StateInitialized,
            StateChange::MapUpdated { .. } => StateChangeKind::MapUpdated,
            StateChange::CurrentNodeChanged { .. } => StateChangeKind::CurrentNodeChanged,
            StateChange::NodeCompleted { .. } => StateChangeKind::NodeCompleted,
            StateChange::FloorChanged { .. } => StateChangeKind::FloorChanged,
            StateChange::FloorCompleted { .. } => StateChangeKind::FloorCompleted,
            StateChange::CharacterUpdated => StateChangeKind::CharacterUpdated,
            StateChange::ItemAdded { .. } => StateChangeKind::ItemAdded,
            StateChange::ItemRemoved { .. } => StateChangeKind::ItemRemoved,
        }
    }
}

/// Opaque handle identifying a registered observer, used for removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

type ObserverFn = dyn FnMut(&StateChange) -> Result<(), EngineError>;

struct ObserverEntry {
    id: ObserverId,
    callback: Box<ObserverFn>,
}

// ---------------------------------------------------------------------------
// StateStore
// ---------------------------------------------------------------------------

pub struct StateStore {
    bus: Rc<EventBus>,
    reporter: Rc<dyn ErrorReporter>,
    map_provider: Box<dyn MapProvider>,
    persistence: Box<dyn PersistenceClient>,
    data: GameData,
    observers: HashMap<StateChangeKind, Vec<ObserverEntry>>,
    global_observers: Vec<ObserverEntry>,
    next_observer_id: u64,
    /// Per-floor latch so each floor announces its completion exactly once.
    floor_complete_announced: bool,
}

impl StateStore {
    pub fn new(
        bus: Rc<EventBus>,
        map_provider: Box<dyn MapProvider>,
        persistence: Box<dyn PersistenceClient>,
        reporter: Rc<dyn ErrorReporter>,
    ) -> Self {
        Self {
            bus,
            reporter,
            map_provider,
            persistence,
            data: GameData::default(),
            observers: HashMap::new(),
            global_observers: Vec::new(),
            next_observer_id: 0,
            floor_complete_announced: false,
        }
    }

    // -- Observer registry --

    /// Register an observer for one kind of state change, or for all of
    /// them when `kind` is `None`.
    pub fn add_observer(
        &mut self,
        kind: Option<StateChangeKind>,
        callback: impl FnMut(&StateChange) -> Result<(), EngineError> + 'static,
    ) -> ObserverId {
        let id = ObserverId(self.next_observer_id);
        self.next_observer_id += 1;
        let entry = ObserverEntry {
            id,
            callback: Box::new(callback),
        };
        match kind {
            Some(kind) => self.observers.entry(kind).or_default().push(entry),
            None => self.global_observers.push(entry),
        }
        id
    }

    /// Remove an observer. Safe no-op (returns false) for unknown ids.
    pub fn remove_observer(&mut self, id: ObserverId) -> bool {
        for bucket in self.observers.values_mut() {
            if let Some(pos) = bucket.iter().position(|e| e.id == id) {
                bucket.remove(pos);
                return true;
            }
        }
        if let Some(pos) = self.global_observers.iter().position(|e| e.id == id) {
            self.global_observers.remove(pos);
            return true;
        }
        false
    }

    /// Drop every observer. Part of context teardown.
    pub fn clear_observers(&mut self) {
        self.observers.clear();
        self.global_observers.clear();
    }

    /// Kind-specific observers first, then global. A failing observer is
    /// reported and never stops its siblings.
    fn notify(&mut self, change: &StateChange) {
        let kind = change.kind();
        if let Some(bucket) = self.observers.get_mut(&kind) {
            for entry in bucket.iter_mut() {
                if let Err(error) = (entry.callback)(change) {
                    self.reporter
                        .handle_error(&error, "state observer", Severity::Warning);
                }
            }
        }
        for entry in self.global_observers.iter_mut() {
            if let Err(error) = (entry.callback)(change) {
                self.reporter
                    .handle_error(&error, "state observer", Severity::Warning);
            }
        }
    }

    // -- Lifecycle --

    /// Load the current floor's map and announce that the store is live.
    pub fn initialize(&mut self) {
        let floor = self.data.current_floor;
        self.load_map(floor);
        self.notify(&StateChange::StateInitialized);
    }

    /// Ask the map provider for a floor and install the result. Provider or
    /// shape failure degrades to the deterministic fallback map; this
    /// operation never surfaces an error. Clears the current node and the
    /// floor-completion latch.
    pub fn load_map(&mut self, floor: u32) {
        let map = match self.map_provider.generate_floor_map(floor) {
            Ok(payload) => match FloorMap::from_payload(payload) {
                Ok(map) => map,
                Err(error) => {
                    self.reporter
                        .handle_error(&error, "map load", Severity::Warning);
                    FloorMap::fallback(floor)
                }
            },
            Err(error) => {
                self.reporter
                    .handle_error(&error.into(), "map load", Severity::Warning);
                FloorMap::fallback(floor)
            }
        };

        self.data.current_node = None;
        self.data.map = Some(map);
        self.floor_complete_announced = false;
        self.refresh_states();

        self.notify(&StateChange::MapUpdated { floor });
        self.bus.emit(BusEvent::FloorLoaded { floor });
    }

    fn refresh_states(&mut self) {
        if let Some(map) = &mut self.data.map {
            progression::refresh(map, self.data.current_node.as_ref());
        }
    }

    // -- Node operations --

    /// Enter a node. Entry is gated: the id must resolve on the current map
    /// and the node must be unvisited, not the start node, and currently
    /// available. A refused entry is reported with nothing mutated.
    pub fn set_current_node(&mut self, id: &NodeId) -> bool {
        let refusal = match self.data.map.as_ref().and_then(|map| map.node(id)) {
            None => Some(EngineError::NodeNotFound(id.clone())),
            Some(node)
                if node.id.is_start()
                    || node.visited
                    || node.state != NodeState::Available =>
            {
                Some(EngineError::NodeNotAvailable(id.clone()))
            }
            Some(_) => None,
        };
        if let Some(error) = refusal {
            self.reporter
                .handle_error(&error, "set current node", Severity::Warning);
            return false;
        }

        self.data.current_node = Some(id.clone());
        self.refresh_states();
        self.notify(&StateChange::CurrentNodeChanged {
            node: Some(id.clone()),
        });
        true
    }

    /// Leave the current node without completing it.
    pub fn clear_current_node(&mut self) {
        if self.data.current_node.take().is_none() {
            return;
        }
        self.refresh_states();
        self.notify(&StateChange::CurrentNodeChanged { node: None });
    }

    /// Complete a node: commit the visit locally, then write behind to the
    /// persistence collaborator. An unknown id is reported and returned
    /// with nothing mutated; a persistence failure is reported and the
    /// local commit stands.
    pub fn complete_node(&mut self, id: &NodeId) -> Result<(), EngineError> {
        let result = match &mut self.data.map {
            Some(map) => map.mark_visited(id),
            None => Err(EngineError::NodeNotFound(id.clone())),
        };
        if let Err(error) = result {
            self.reporter
                .handle_error(&error, "complete node", Severity::Warning);
            return Err(error);
        }

        self.data.current_node = None;
        self.refresh_states();

        if let Err(error) = self.persistence.mark_node_visited(id) {
            self.reporter
                .handle_error(&error.into(), "persist node visit", Severity::Warning);
        }

        self.notify(&StateChange::NodeCompleted { node: id.clone() });
        self.bus.emit(BusEvent::NodeCompleted { node: id.clone() });
        self.announce_floor_completion();
        Ok(())
    }

    /// Announce floor completion at most once per loaded map.
    fn announce_floor_completion(&mut self) {
        if self.floor_complete_announced || !self.check_floor_completion() {
            return;
        }
        self.floor_complete_announced = true;
        let floor = self.data.current_floor;
        self.notify(&StateChange::FloorCompleted { floor });
        self.bus.emit(BusEvent::FloorCompleted { floor });
    }

    // -- Floor operations --

    /// Advance the run to the next floor. The persistence collaborator is
    /// authoritative: its failure is reported and refused with state
    /// untouched. On success the old map is dropped wholesale and the new
    /// floor's map is loaded (degrading to the fallback on its own terms).
    pub fn go_to_next_floor(&mut self) -> bool {
        let advance = match self.persistence.go_to_next_floor() {
            Ok(advance) => advance,
            Err(error) => {
                self.reporter
                    .handle_error(&error.into(), "floor advance", Severity::Error);
                return false;
            }
        };

        match Character::from_payload(advance.character) {
            Ok(character) => self.data.character = Some(character),
            // A malformed character payload does not block the advance;
            // the previous character is kept.
            Err(error) => {
                self.reporter
                    .handle_error(&error, "floor advance", Severity::Warning);
            }
        }

        let floor = advance.current_floor;
        self.data.map = None;
        self.data.current_node = None;
        self.data.current_floor = floor;

        self.notify(&StateChange::FloorChanged { floor });
        self.bus.emit(BusEvent::FloorChanged { floor });
        self.load_map(floor);
        true
    }

    // -- Inventory --

    /// Validate and add an item. A malformed payload is reported and
    /// refused.
    pub fn add_inventory_item(&mut self, payload: Value) -> bool {
        let item = match Item::from_payload(payload) {
            Ok(item) => item,
            Err(error) => {
                self.reporter
                    .handle_error(&error, "add inventory item", Severity::Warning);
                return false;
            }
        };

        self.data.inventory.push(item.clone());
        self.notify(&StateChange::ItemAdded { item: item.clone() });
        self.bus.emit(BusEvent::ItemAdded { item });
        true
    }

    /// Remove the item at an index. An out-of-range index is reported and
    /// refused.
    pub fn remove_inventory_item(&mut self, index: usize) -> Option<Item> {
        if index >= self.data.inventory.len() {
            self.reporter.handle_error(
                &EngineError::ItemNotFound(index),
                "remove inventory item",
                Severity::Warning,
            );
            return None;
        }

        let item = self.data.inventory.remove(index);
        self.notify(&StateChange::ItemRemoved { item: item.clone() });
        self.bus.emit(BusEvent::ItemRemoved { item: item.clone() });
        Some(item)
    }

    // -- Character --

    /// Update one character attribute, gated by the per-attribute rules.
    /// Failure (no character loaded, or a type/range violation) is reported
    /// and refused with nothing mutated.
    pub fn update_character_attribute(&mut self, attr: &str, value: Value) -> bool {
        if let Err(error) = validate_attribute(attr, &value) {
            self.reporter
                .handle_error(&error, "update character attribute", Severity::Warning);
            return false;
        }
        let Some(character) = &mut self.data.character else {
            self.reporter.handle_error(
                &EngineError::InvalidCharacter("no character loaded".to_string()),
                "update character attribute",
                Severity::Warning,
            );
            return false;
        };

        character.set_attribute(attr, value.clone());
        self.notify(&StateChange::CharacterUpdated);

        if let Some(value) = value.as_i64() {
            match attr {
                "lives" => {
                    self.bus.emit(BusEvent::LivesChanged { value });
                }
                "insight" => {
                    self.bus.emit(BusEvent::InsightChanged { value });
                }
                _ => {}
            }
        }
        true
    }

    /// Install a character directly, shape-checked. Used at session setup.
    pub fn set_character(&mut self, payload: Value) -> bool {
        match Character::from_payload(payload) {
            Ok(character) => {
                self.data.character = Some(character);
                self.notify(&StateChange::CharacterUpdated);
                true
            }
            Err(error) => {
                self.reporter
                    .handle_error(&error, "set character", Severity::Warning);
                false
            }
        }
    }

    // -- Persistence --

    /// Ask the persistence collaborator to save the run. Failure is
    /// reported and surfaced as false; local state is unaffected either
    /// way.
    pub fn save_game(&mut self) -> bool {
        match self.persistence.save_game() {
            Ok(()) => true,
            Err(error) => {
                self.reporter
                    .handle_error(&error.into(), "save game", Severity::Error);
                false
            }
        }
    }

    // -- Queries --

    /// Defensive deep copy of the full state.
    pub fn get_state(&self) -> GameData {
        self.data.clone()
    }

    pub fn current_floor(&self) -> u32 {
        self.data.current_floor
    }

    pub fn current_node(&self) -> Option<&NodeId> {
        self.data.current_node.as_ref()
    }

    pub fn character(&self) -> Option<&Character> {
        self.data.character.as_ref()
    }

    pub fn inventory(&self) -> &[Item] {
        &self.data.inventory
    }

    /// Read-only view of a node on the current map.
    pub fn node_by_id(&self, id: &NodeId) -> Option<&Node> {
        self.data.map.as_ref().and_then(|map| map.node(id))
    }

    pub fn all_nodes(&self) -> impl Iterator<Item = &Node> {
        self.data.map.iter().flat_map(|map| map.all_nodes())
    }

    pub fn nodes_in_row(&self, row: u32) -> impl Iterator<Item = &Node> {
        self.data.map.iter().flat_map(move |map| map.nodes_in_row(row))
    }

    pub fn is_row_completed(&self, row: u32) -> bool {
        self.data
            .map
            .as_ref()
            .is_some_and(|map| progression::is_row_completed(map, row))
    }

    pub fn highest_completed_row(&self) -> u32 {
        self.data
            .map
            .as_ref()
            .map_or(0, progression::highest_completed_row)
    }

    /// Pure floor-completion query; never announces anything.
    pub fn check_floor_completion(&self) -> bool {
        self.data.map.as_ref().is_some_and(|map| {
            progression::check_floor_completion(map, self.data.current_node.as_ref())
        })
    }
}
