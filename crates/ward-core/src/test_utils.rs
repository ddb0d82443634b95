//! Shared helpers for tests: canned maps and a recording error reporter.
//! Available to downstream crates through the `test-utils` feature.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::error::{EngineError, ErrorReporter, Severity};
use crate::map::{FloorMap, Node, NodeId, NodeKind, NodeState, Position};

/// Build a node with the given topology. Unvisited, locked.
pub fn test_node(id: &str, kind: NodeKind, row: u32, col: u32, paths: &[&str]) -> Node {
    Node {
        id: NodeId::new(id),
        kind,
        title: None,
        position: Position { row, col },
        paths: paths.iter().map(|p| NodeId::new(*p)).collect(),
        visited: false,
        state: NodeState::Locked,
    }
}

/// The two-branch diamond: start feeds `a` and `b` in row 1, both of which
/// feed `c` in row 2. No boss.
pub fn diamond_map() -> FloorMap {
    let payload = serde_json::json!({
        "start": {
            "id": "start", "type": "start",
            "position": {"row": 0, "col": 1},
            "paths": ["a", "b"]
        },
        "nodes": {
            "a": {
                "id": "a", "type": "question",
                "position": {"row": 1, "col": 0},
                "paths": ["c"]
            },
            "b": {
                "id": "b", "type": "treasure",
                "position": {"row": 1, "col": 2},
                "paths": ["c"]
            },
            "c": {
                "id": "c", "type": "rest",
                "position": {"row": 2, "col": 1},
                "paths": []
            }
        }
    });
    match FloorMap::from_payload(payload) {
        Ok(map) => map,
        Err(e) => panic!("diamond map payload must validate: {e}"),
    }
}

/// A map payload in the collaborator wire shape, usable as a provider
/// response. Same topology as [`diamond_map`].
pub fn diamond_payload() -> serde_json::Value {
    serde_json::json!({
        "start": {
            "id": "start", "type": "start",
            "position": {"row": 0, "col": 1},
            "paths": ["a", "b"]
        },
        "nodes": {
            "a": {
                "id": "a", "type": "question",
                "position": {"row": 1, "col": 0},
                "paths": ["c"]
            },
            "b": {
                "id": "b", "type": "treasure",
                "position": {"row": 1, "col": 2},
                "paths": ["c"]
            },
            "c": {
                "id": "c", "type": "rest",
                "position": {"row": 2, "col": 1},
                "paths": []
            }
        }
    })
}

/// Build a map straight from parts, bypassing payload validation.
pub fn map_from_parts(start: Node, boss: Option<Node>, interior: Vec<Node>) -> FloorMap {
    let mut start = start;
    start.visited = true;
    start.state = NodeState::Completed;
    let nodes: BTreeMap<NodeId, Node> = interior.into_iter().map(|n| (n.id.clone(), n)).collect();
    FloorMap::from_parts(start, boss, nodes)
}

/// Reporter that records every report for later assertions.
#[derive(Debug, Default, Clone)]
pub struct CollectingReporter {
    pub reports: Rc<RefCell<Vec<(EngineError, String, Severity)>>>,
}

impl CollectingReporter {
    pub fn report_count(&self) -> usize {
        self.reports.borrow().len()
    }

    /// Whether any report carried the given context string.
    pub fn saw_context(&self, context: &str) -> bool {
        self.reports.borrow().iter().any(|(_, c, _)| c == context)
    }
}

impl ErrorReporter for CollectingReporter {
    fn handle_error(&self, error: &EngineError, context: &str, severity: Severity) {
        self.reports
            .borrow_mut()
            .push((error.clone(), context.to_string(), severity));
    }
}
