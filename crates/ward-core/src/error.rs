//! Error taxonomy, severity levels, and the injected error reporter.
//!
//! Nothing in the core throws past its caller: validation and not-found
//! conditions come back as values, collaborator failures degrade, and
//! listener/observer failures are contained at the point of invocation.
//! Everything that must be *seen* without being *raised* goes through the
//! [`ErrorReporter`] trait, which is injected at construction time with a
//! [`NoopReporter`] default.

use crate::event::EventKind;
use crate::map::NodeId;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// A collaborator-side network or I/O failure. The core never inspects the
/// message; it only reports it and degrades.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("transport failure: {message}")]
pub struct TransportError {
    pub message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Errors that can occur in the progression core.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// A map payload failed shape validation.
    #[error("invalid map payload: {0}")]
    InvalidMap(String),

    /// An operation referenced a node id not present in the current map.
    #[error("node not found: {0}")]
    NodeNotFound(NodeId),

    /// A node was entered out of order: the start node, an already visited
    /// node, or one the progression has not made available.
    #[error("node not available: {0}")]
    NodeNotAvailable(NodeId),

    /// An inventory operation referenced an index with no item.
    #[error("no inventory item at index {0}")]
    ItemNotFound(usize),

    /// An item payload failed shape validation (missing id or name).
    #[error("invalid item payload: {0}")]
    InvalidItem(String),

    /// A character payload failed shape validation.
    #[error("invalid character payload: {0}")]
    InvalidCharacter(String),

    /// A character attribute update failed its type or range check.
    #[error("invalid value for attribute {attr}: {reason}")]
    InvalidAttribute { attr: String, reason: String },

    /// A collaborator call failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// An emission was skipped because the per-kind nesting depth limit was
    /// reached. Internal and non-fatal.
    #[error("event recursion limit reached for {0:?}")]
    RecursionLimit(EventKind),

    /// A bus listener failed. The failure was contained at the call site.
    #[error("event listener failed: {0}")]
    Listener(String),

    /// A state observer failed. The failure was contained at the call site.
    #[error("state observer failed: {0}")]
    Observer(String),
}

// ---------------------------------------------------------------------------
// Reporter
// ---------------------------------------------------------------------------

/// How serious a reported condition is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Info,
    Warning,
    Error,
    Critical,
}

/// Sink for errors that are handled in place rather than propagated.
/// The `context` string names the operation that was underway.
pub trait ErrorReporter {
    fn handle_error(&self, error: &EngineError, context: &str, severity: Severity);
}

/// Reporter that discards everything. The default when no sink is wired in.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReporter;

impl ErrorReporter for NoopReporter {
    fn handle_error(&self, _error: &EngineError, _context: &str, _severity: Severity) {}
}
