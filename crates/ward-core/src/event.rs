//! Priority-ordered publish/subscribe bus with re-entrancy protection.
//!
//! Listeners for an event kind live in two places: a primary bucket for the
//! default priority 0 (the hot path) and per-priority secondary buckets for
//! everything else. [`EventBus::emit`] drains the secondary buckets highest
//! priority first, then the primary bucket; registration order is preserved
//! within a bucket.
//!
//! # Re-entrancy
//!
//! Every bus method takes `&self`, so a listener holding an `Rc<EventBus>`
//! may register, unregister, or emit from inside its own invocation. Two
//! mechanisms keep that safe without locks:
//!
//! - the listener list is snapshotted before delivery, so mid-emission
//!   registry changes never affect the emission in flight;
//! - a per-kind depth counter skips (and reports) any emission nested at or
//!   beyond the configured maximum, which bounds self-triggering loops.
//!
//! # Failure containment
//!
//! A listener returning `Err` is reported through the injected
//! [`ErrorReporter`] and never prevents the remaining listeners from
//! running or surfaces to the caller of `emit`.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::error::{EngineError, ErrorReporter, NoopReporter, Severity};
use crate::item::Item;
use crate::map::NodeId;

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

/// A game event published on the bus.
#[derive(Debug, Clone, PartialEq)]
pub enum BusEvent {
    // -- Node events --
    NodeCompleted { node: NodeId },

    // -- Floor events --
    FloorCompleted { floor: u32 },
    FloorChanged { floor: u32 },
    FloorLoaded { floor: u32 },

    // -- Character events --
    LivesChanged { value: i64 },
    InsightChanged { value: i64 },

    // -- Inventory events --
    ItemAdded { item: Item },
    ItemRemoved { item: Item },
}

/// Discriminant tag for event types, used for subscription, depth tracking,
/// and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    NodeCompleted,
    FloorCompleted,
    FloorChanged,
    FloorLoaded,
    LivesChanged,
    InsightChanged,
    ItemAdded,
    ItemRemoved,
}

/// Total number of event kinds.
const EVENT_KIND_COUNT: usize = 8;

impl BusEvent {
    /// Get the discriminant kind for this event.
    pub fn kind(&self) -> EventKind {
        match self {
            BusEvent::NodeCompleted { .. } => EventKind::NodeCompleted,
            BusEvent::FloorCompleted { .. } => EventKind::FloorCompleted,
            BusEvent::FloorChanged { .. } => EventKind::FloorChanged,
            BusEvent::FloorLoaded { .. } => EventKind::FloorLoaded,
            BusEvent::LivesChanged { .. } => EventKind::LivesChanged,
            BusEvent::InsightChanged { .. } => EventKind::InsightChanged,
            BusEvent::ItemAdded { .. } => EventKind::ItemAdded,
            BusEvent::ItemRemoved { .. } => EventKind::ItemRemoved,
        }
    }
}

impl EventKind {
    /// Convert to usize index for array lookups.
    fn index(self) -> usize {
        self as usize
    }
}

// ---------------------------------------------------------------------------
// Listeners
// ---------------------------------------------------------------------------

/// What a listener may hand back: an optional value collected by
/// [`EventBus::emit_collect`], or an error that is reported and contained.
pub type ListenerResult = Result<Option<serde_json::Value>, EngineError>;

type ListenerFn = dyn Fn(&BusEvent) -> ListenerResult;

/// Opaque handle identifying a registered listener, used for removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct ListenerEntry {
    id: ListenerId,
    callback: Rc<ListenerFn>,
    /// Self-unregisters before its first invocation runs.
    once: bool,
}

/// Listener buckets for one event kind.
#[derive(Default)]
struct KindSlot {
    /// Priority-0 listeners, in registration order.
    primary: Vec<ListenerEntry>,
    /// Nonzero-priority listeners keyed by priority.
    prioritized: BTreeMap<i32, Vec<ListenerEntry>>,
}

impl KindSlot {
    fn len(&self) -> usize {
        self.primary.len() + self.prioritized.values().map(Vec::len).sum::<usize>()
    }

    fn push(&mut self, priority: i32, entry: ListenerEntry) {
        if priority == 0 {
            self.primary.push(entry);
        } else {
            self.prioritized.entry(priority).or_default().push(entry);
        }
    }

    fn remove(&mut self, id: ListenerId) -> bool {
        if let Some(pos) = self.primary.iter().position(|e| e.id == id) {
            self.primary.remove(pos);
            return true;
        }
        let mut removed = false;
        let mut emptied = None;
        for (&priority, bucket) in &mut self.prioritized {
            if let Some(pos) = bucket.iter().position(|e| e.id == id) {
                bucket.remove(pos);
                removed = true;
                if bucket.is_empty() {
                    emptied = Some(priority);
                }
                break;
            }
        }
        if let Some(priority) = emptied {
            self.prioritized.remove(&priority);
        }
        removed
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default maximum nesting depth per event kind.
pub const DEFAULT_MAX_DEPTH: u32 = 2;

/// The central event bus. Holds per-kind listener buckets and per-kind
/// emission depth counters.
pub struct EventBus {
    slots: RefCell<[KindSlot; EVENT_KIND_COUNT]>,
    depth: [Cell<u32>; EVENT_KIND_COUNT],
    reporter: Rc<dyn ErrorReporter>,
    max_depth: u32,
    next_id: Cell<u64>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("max_depth", &self.max_depth)
            .field("depth", &self.depth)
            .finish_non_exhaustive()
    }
}

impl EventBus {
    /// Create a bus reporting contained failures to the given sink.
    pub fn new(reporter: Rc<dyn ErrorReporter>) -> Self {
        Self::with_max_depth(reporter, DEFAULT_MAX_DEPTH)
    }

    /// Create a bus with an explicit re-entrancy depth limit.
    pub fn with_max_depth(reporter: Rc<dyn ErrorReporter>, max_depth: u32) -> Self {
        Self {
            slots: RefCell::new(std::array::from_fn(|_| KindSlot::default())),
            depth: std::array::from_fn(|_| Cell::new(0)),
            reporter,
            max_depth,
            next_id: Cell::new(0),
        }
    }

    fn allocate_id(&self) -> ListenerId {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        ListenerId(id)
    }

    // -- Registration --

    /// Register a listener at the default priority 0 (primary bucket).
    pub fn on(
        &self,
        kind: EventKind,
        callback: impl Fn(&BusEvent) -> ListenerResult + 'static,
    ) -> ListenerId {
        self.register(kind, 0, Rc::new(callback), false)
    }

    /// Register a listener with an explicit priority. Nonzero priorities go
    /// to secondary buckets that run before the primary bucket, highest
    /// first.
    pub fn on_with_priority(
        &self,
        kind: EventKind,
        priority: i32,
        callback: impl Fn(&BusEvent) -> ListenerResult + 'static,
    ) -> ListenerId {
        self.register(kind, priority, Rc::new(callback), false)
    }

    /// Register a listener that unregisters itself before its first
    /// invocation runs. The returned id can cancel it while still pending.
    pub fn once(
        &self,
        kind: EventKind,
        callback: impl Fn(&BusEvent) -> ListenerResult + 'static,
    ) -> ListenerId {
        self.register(kind, 0, Rc::new(callback), true)
    }

    /// Register one shared listener for several event kinds. Returns one id
    /// per kind, in argument order.
    pub fn on_multiple(
        &self,
        kinds: &[EventKind],
        callback: impl Fn(&BusEvent) -> ListenerResult + 'static,
    ) -> Vec<ListenerId> {
        let shared: Rc<ListenerFn> = Rc::new(callback);
        kinds
            .iter()
            .map(|&kind| self.register(kind, 0, shared.clone(), false))
            .collect()
    }

    fn register(
        &self,
        kind: EventKind,
        priority: i32,
        callback: Rc<ListenerFn>,
        once: bool,
    ) -> ListenerId {
        let id = self.allocate_id();
        self.slots.borrow_mut()[kind.index()].push(
            priority,
            ListenerEntry {
                id,
                callback,
                once,
            },
        );
        id
    }

    // -- Removal --

    /// Remove a listener. Safe no-op (returns false) when the id is not
    /// registered for the kind, including a `once` that has already fired.
    pub fn off(&self, kind: EventKind, id: ListenerId) -> bool {
        self.slots.borrow_mut()[kind.index()].remove(id)
    }

    /// Remove listeners registered via [`EventBus::on_multiple`]. Kinds and
    /// ids are paired positionally.
    pub fn off_multiple(&self, kinds: &[EventKind], ids: &[ListenerId]) {
        for (&kind, &id) in kinds.iter().zip(ids.iter()) {
            self.off(kind, id);
        }
    }

    /// Remove every listener for a kind, or every listener on the bus.
    /// Safe no-op when nothing is registered.
    pub fn clear_listeners(&self, kind: Option<EventKind>) {
        let mut slots = self.slots.borrow_mut();
        match kind {
            Some(kind) => slots[kind.index()] = KindSlot::default(),
            None => *slots = std::array::from_fn(|_| KindSlot::default()),
        }
    }

    // -- Queries --

    /// Number of listeners currently registered for a kind.
    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.slots.borrow()[kind.index()].len()
    }

    /// Whether an emission of this kind is currently in flight.
    pub fn is_emitting(&self, kind: EventKind) -> bool {
        self.depth[kind.index()].get() > 0
    }

    // -- Emission --

    /// Deliver an event to every listener. Returns false when the emission
    /// was skipped by the re-entrancy guard; listener failures are reported
    /// and contained, never surfaced here.
    pub fn emit(&self, event: BusEvent) -> bool {
        self.dispatch(&event, None)
    }

    /// Deliver an event and collect each listener's returned value, in
    /// delivery order. Same ordering and recursion contract as
    /// [`EventBus::emit`]; a failing listener is reported and contributes
    /// nothing.
    pub fn emit_collect(&self, event: BusEvent) -> Vec<serde_json::Value> {
        let mut collected = Vec::new();
        self.dispatch(&event, Some(&mut collected));
        collected
    }

    fn dispatch(&self, event: &BusEvent, mut collect: Option<&mut Vec<serde_json::Value>>) -> bool {
        let kind = event.kind();
        let idx = kind.index();

        if self.depth[idx].get() >= self.max_depth {
            self.reporter.handle_error(
                &EngineError::RecursionLimit(kind),
                "event emission",
                Severity::Warning,
            );
            return false;
        }
        self.depth[idx].set(self.depth[idx].get() + 1);

        // Snapshot the delivery order so listeners may mutate the registry
        // (or re-emit) without affecting this emission.
        let snapshot: Vec<(ListenerId, Rc<ListenerFn>, bool)> = {
            let slots = self.slots.borrow();
            let slot = &slots[idx];
            let mut order = Vec::with_capacity(slot.len());
            for bucket in slot.prioritized.values().rev() {
                for entry in bucket {
                    order.push((entry.id, entry.callback.clone(), entry.once));
                }
            }
            for entry in &slot.primary {
                order.push((entry.id, entry.callback.clone(), entry.once));
            }
            order
        };

        for (id, callback, once) in snapshot {
            // A once entry unregisters before it runs; if something already
            // removed it (off, or a re-entrant emission), skip it entirely.
            if once && !self.off(kind, id) {
                continue;
            }
            match callback(event) {
                Ok(value) => {
                    if let (Some(collected), Some(value)) = (collect.as_deref_mut(), value) {
                        collected.push(value);
                    }
                }
                Err(error) => {
                    self.reporter
                        .handle_error(&error, "event listener", Severity::Warning);
                }
            }
        }

        self.depth[idx].set(self.depth[idx].get() - 1);
        true
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(Rc::new(NoopReporter))
    }
}

// ===========================================================================
// Tests
// ===========================================================================
