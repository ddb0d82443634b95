//! Floor map data model: nodes, positions, visitation states, and the
//! keyed node collection replaced wholesale on every floor change.
//!
//! Maps arrive as JSON payloads from a map-provider collaborator and are
//! accepted only through [`FloorMap::from_payload`], which shape-checks
//! them. A deterministic [`FloorMap::fallback`] map stands in when the
//! provider fails, so a session always has something playable.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Identifies a node within a single floor map. Node identity is the
/// collaborator's wire-level string id; it does not survive a floor change.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The reserved id of the start node.
    pub fn start() -> Self {
        Self("start".to_string())
    }

    /// The reserved id of the boss node.
    pub fn boss() -> Self {
        Self("boss".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_start(&self) -> bool {
        self.0 == "start"
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

// ---------------------------------------------------------------------------
// Node model
// ---------------------------------------------------------------------------

/// What kind of encounter a node hosts. The progression core only branches
/// on `Start` and `Boss`; the rest are carried through for presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Start,
    Question,
    Treasure,
    Rest,
    Event,
    Shop,
    Elite,
    PatientCase,
    Boss,
    /// Unrecognized wire value. Treated as a regular node.
    #[serde(other)]
    Unknown,
}

/// Grid position of a node. Progression unlocks proceed row by row;
/// `col` exists only for layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub row: u32,
    pub col: u32,
}

/// Visitation state of a node, derived by the progression engine.
/// `Completed` is sticky once a node is visited; `Locked`/`Available` are
/// recomputed from scratch on every pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeState {
    #[default]
    Locked,
    Available,
    Current,
    Completed,
}

/// A single map location with directed outgoing paths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    #[serde(default)]
    pub title: Option<String>,
    pub position: Position,
    #[serde(default)]
    pub paths: Vec<NodeId>,
    #[serde(default)]
    pub visited: bool,
    /// Derived on every progression pass; never trusted from the wire.
    #[serde(default, skip_deserializing)]
    pub state: NodeState,
}

impl Node {
    pub fn row(&self) -> u32 {
        self.position.row
    }
}

// ---------------------------------------------------------------------------
// FloorMap
// ---------------------------------------------------------------------------

/// Raw wire shape of a map payload. Converted into a [`FloorMap`] only
/// after validation.
#[derive(Debug, Deserialize)]
struct MapPayload {
    start: Node,
    #[serde(default)]
    boss: Option<Node>,
    nodes: BTreeMap<NodeId, Node>,
}

/// One complete floor: a start node, an optional boss, and the interior
/// nodes keyed by id. Interior nodes use a `BTreeMap` so every iteration
/// over the map is deterministic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloorMap {
    start: Node,
    boss: Option<Node>,
    nodes: BTreeMap<NodeId, Node>,
}

impl FloorMap {
    /// Validate and accept a map payload from a collaborator.
    ///
    /// Shape requirements: a `start` entry, a non-empty interior node
    /// collection, and every keyed entry's `id` matching its key. The start
    /// node is stamped visited/completed on acceptance.
    pub fn from_payload(payload: serde_json::Value) -> Result<Self, EngineError> {
        let payload: MapPayload = serde_json::from_value(payload)
            .map_err(|e| EngineError::InvalidMap(e.to_string()))?;

        if payload.nodes.is_empty() {
            return Err(EngineError::InvalidMap(
                "node collection is empty".to_string(),
            ));
        }
        for (key, node) in &payload.nodes {
            if &node.id != key {
                return Err(EngineError::InvalidMap(format!(
                    "node keyed {key} carries id {}",
                    node.id
                )));
            }
        }

        let mut map = Self {
            start: payload.start,
            boss: payload.boss,
            nodes: payload.nodes,
        };
        map.start.visited = true;
        map.start.state = NodeState::Completed;
        Ok(map)
    }

    /// The deterministic hardcoded map substituted when map loading fails.
    /// Floors below 3 have no boss; from floor 3 on, the final interior node
    /// connects to one.
    pub fn fallback(floor: u32) -> Self {
        let has_boss = floor >= 3;

        let node = |id: &str, kind: NodeKind, row: u32, col: u32, paths: &[&str]| Node {
            id: NodeId::new(id),
            kind,
            title: None,
            position: Position { row, col },
            paths: paths.iter().map(|p| NodeId::new(*p)).collect(),
            visited: false,
            state: NodeState::Locked,
        };

        let mut start = node("start", NodeKind::Start, 0, 1, &["node_1", "node_2"]);
        start.visited = true;
        start.state = NodeState::Completed;

        let mut nodes = BTreeMap::new();
        nodes.insert(
            NodeId::new("node_1"),
            node("node_1", NodeKind::Question, 1, 0, &["node_3"]),
        );
        nodes.insert(
            NodeId::new("node_2"),
            node("node_2", NodeKind::Treasure, 1, 2, &["node_3"]),
        );
        let tail_paths: &[&str] = if has_boss { &["boss"] } else { &[] };
        nodes.insert(
            NodeId::new("node_3"),
            node("node_3", NodeKind::Rest, 2, 1, tail_paths),
        );

        let boss = has_boss.then(|| node("boss", NodeKind::Boss, 3, 1, &[]));

        Self { start, boss, nodes }
    }

    pub(crate) fn from_parts(
        start: Node,
        boss: Option<Node>,
        nodes: BTreeMap<NodeId, Node>,
    ) -> Self {
        Self { start, boss, nodes }
    }

    // -- Queries --

    pub fn start(&self) -> &Node {
        &self.start
    }

    pub fn boss(&self) -> Option<&Node> {
        self.boss.as_ref()
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.node(id).is_some()
    }

    /// Look up a node by id, including the start and boss entries.
    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        if id == &self.start.id {
            return Some(&self.start);
        }
        if let Some(boss) = &self.boss
            && id == &boss.id
        {
            return Some(boss);
        }
        self.nodes.get(id)
    }

    pub(crate) fn node_mut(&mut self, id: &NodeId) -> Option<&mut Node> {
        if id == &self.start.id {
            return Some(&mut self.start);
        }
        if let Some(boss) = &mut self.boss
            && id == &boss.id
        {
            return Some(boss);
        }
        self.nodes.get_mut(id)
    }

    /// All nodes in deterministic order: start, boss (if any), then the
    /// interior nodes in key order.
    pub fn all_nodes(&self) -> impl Iterator<Item = &Node> {
        std::iter::once(&self.start)
            .chain(self.boss.iter())
            .chain(self.nodes.values())
    }

    pub(crate) fn all_nodes_mut(&mut self) -> impl Iterator<Item = &mut Node> {
        std::iter::once(&mut self.start)
            .chain(self.boss.iter_mut())
            .chain(self.nodes.values_mut())
    }

    pub fn nodes_in_row(&self, row: u32) -> impl Iterator<Item = &Node> {
        self.all_nodes().filter(move |n| n.row() == row)
    }

    /// Number of nodes on the floor, start and boss included.
    pub fn node_count(&self) -> usize {
        self.all_nodes().count()
    }

    /// Mark a node visited. Nothing is mutated unless the id resolves.
    pub fn mark_visited(&mut self, id: &NodeId) -> Result<(), EngineError> {
        let node = self
            .node_mut(id)
            .ok_or_else(|| EngineError::NodeNotFound(id.clone()))?;
        node.visited = true;
        node.state = NodeState::Completed;
        Ok(())
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_payload() -> serde_json::Value {
        json!({
            "start": {
                "id": "start", "type": "start",
                "position": {"row": 0, "col": 1},
                "paths": ["a", "b"], "visited": false
            },
            "boss": null,
            "nodes": {
                "a": {
                    "id": "a", "type": "question",
                    "position": {"row": 1, "col": 0},
                    "paths": [], "visited": false
                },
                "b": {
                    "id": "b", "type": "treasure", "title": "Supply Closet",
                    "position": {"row": 1, "col": 2},
                    "paths": [], "visited": false
                }
            }
        })
    }

    // -----------------------------------------------------------------------
    // Test 1: Valid payload is accepted and start is stamped completed
    // -----------------------------------------------------------------------
    #[test]
    fn payload_accepted_and_start_completed() {
        let map = FloorMap::from_payload(sample_payload()).unwrap();

        assert_eq!(map.node_count(), 3);
        assert!(map.start().visited);
        assert_eq!(map.start().state, NodeState::Completed);
        assert!(map.boss().is_none());

        let b = map.node(&NodeId::new("b")).unwrap();
        assert_eq!(b.kind, NodeKind::Treasure);
        assert_eq!(b.title.as_deref(), Some("Supply Closet"));
        assert_eq!(b.state, NodeState::Locked);
    }

    // -----------------------------------------------------------------------
    // Test 2: Missing start entry is rejected
    // -----------------------------------------------------------------------
    #[test]
    fn missing_start_rejected() {
        let mut payload = sample_payload();
        payload.as_object_mut().unwrap().remove("start");

        let err = FloorMap::from_payload(payload).unwrap_err();
        assert!(matches!(err, EngineError::InvalidMap(_)));
    }

    // -----------------------------------------------------------------------
    // Test 3: Empty node collection is rejected
    // -----------------------------------------------------------------------
    #[test]
    fn empty_nodes_rejected() {
        let mut payload = sample_payload();
        payload["nodes"] = json!({});

        let err = FloorMap::from_payload(payload).unwrap_err();
        assert!(matches!(err, EngineError::InvalidMap(_)));
    }

    // -----------------------------------------------------------------------
    // Test 4: Key/id mismatch is rejected
    // -----------------------------------------------------------------------
    #[test]
    fn key_id_mismatch_rejected() {
        let mut payload = sample_payload();
        payload["nodes"]["a"]["id"] = json!("somewhere_else");

        let err = FloorMap::from_payload(payload).unwrap_err();
        assert!(matches!(err, EngineError::InvalidMap(_)));
    }

    // -----------------------------------------------------------------------
    // Test 5: Unknown node type falls back to Unknown
    // -----------------------------------------------------------------------
    #[test]
    fn unknown_node_type_tolerated() {
        let mut payload = sample_payload();
        payload["nodes"]["a"]["type"] = json!("karaoke");

        let map = FloorMap::from_payload(payload).unwrap();
        assert_eq!(map.node(&NodeId::new("a")).unwrap().kind, NodeKind::Unknown);
    }

    // -----------------------------------------------------------------------
    // Test 6: Wire state field is ignored; state is always derived
    // -----------------------------------------------------------------------
    #[test]
    fn wire_state_ignored() {
        let mut payload = sample_payload();
        payload["nodes"]["a"]["state"] = json!("completed");

        let map = FloorMap::from_payload(payload).unwrap();
        assert_eq!(map.node(&NodeId::new("a")).unwrap().state, NodeState::Locked);
    }

    // -----------------------------------------------------------------------
    // Test 7: Fallback map shape, with and without boss
    // -----------------------------------------------------------------------
    #[test]
    fn fallback_map_shape() {
        let early = FloorMap::fallback(1);
        assert_eq!(early.node_count(), 4);
        assert!(early.boss().is_none());
        assert!(early.start().visited);
        assert!(
            early
                .node(&NodeId::new("node_3"))
                .unwrap()
                .paths
                .is_empty()
        );

        let late = FloorMap::fallback(3);
        assert_eq!(late.node_count(), 5);
        let boss = late.boss().unwrap();
        assert_eq!(boss.kind, NodeKind::Boss);
        assert_eq!(boss.row(), 3);
        assert_eq!(
            late.node(&NodeId::new("node_3")).unwrap().paths,
            vec![NodeId::boss()]
        );
    }

    // -----------------------------------------------------------------------
    // Test 8: Fallback map is deterministic
    // -----------------------------------------------------------------------
    #[test]
    fn fallback_map_deterministic() {
        assert_eq!(FloorMap::fallback(2), FloorMap::fallback(2));
        assert_eq!(FloorMap::fallback(4), FloorMap::fallback(4));
    }

    // -----------------------------------------------------------------------
    // Test 9: Lookup resolves start, boss, and interior nodes
    // -----------------------------------------------------------------------
    #[test]
    fn lookup_covers_all_sections() {
        let map = FloorMap::fallback(3);

        assert!(map.node(&NodeId::start()).is_some());
        assert!(map.node(&NodeId::boss()).is_some());
        assert!(map.node(&NodeId::new("node_2")).is_some());
        assert!(map.node(&NodeId::new("nope")).is_none());
    }

    // -----------------------------------------------------------------------
    // Test 10: nodes_in_row filters by row
    // -----------------------------------------------------------------------
    #[test]
    fn nodes_in_row_filters() {
        let map = FloorMap::fallback(1);

        let row1: Vec<&str> = map.nodes_in_row(1).map(|n| n.id.as_str()).collect();
        assert_eq!(row1, vec!["node_1", "node_2"]);
        assert_eq!(map.nodes_in_row(7).count(), 0);
    }

    // -----------------------------------------------------------------------
    // Test 11: mark_visited mutates only on a resolving id
    // -----------------------------------------------------------------------
    #[test]
    fn mark_visited_not_found_untouched() {
        let mut map = FloorMap::fallback(1);
        let before = map.clone();

        let err = map.mark_visited(&NodeId::new("ghost")).unwrap_err();
        assert_eq!(err, EngineError::NodeNotFound(NodeId::new("ghost")));
        assert_eq!(map, before);

        map.mark_visited(&NodeId::new("node_1")).unwrap();
        let node = map.node(&NodeId::new("node_1")).unwrap();
        assert!(node.visited);
        assert_eq!(node.state, NodeState::Completed);
    }
}
