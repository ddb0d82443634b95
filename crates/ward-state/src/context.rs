//! The dependency-injection root. One [`GameContext`] owns the bus, the
//! reporter, and the store; everything that needs them gets them from here
//! instead of reaching for globals.

use std::rc::Rc;

use ward_core::error::{ErrorReporter, NoopReporter};
use ward_core::event::EventBus;

use crate::collaborators::{MapProvider, PersistenceClient};
use crate::store::StateStore;

pub struct GameContext {
    pub bus: Rc<EventBus>,
    pub reporter: Rc<dyn ErrorReporter>,
    pub store: StateStore,
}

impl GameContext {
    /// Wire a context from its collaborators. The bus and store share the
    /// reporter.
    pub fn new(
        map_provider: Box<dyn MapProvider>,
        persistence: Box<dyn PersistenceClient>,
        reporter: Rc<dyn ErrorReporter>,
    ) -> Self {
        let bus = Rc::new(EventBus::new(reporter.clone()));
        let store = StateStore::new(bus.clone(), map_provider, persistence, reporter.clone());
        Self {
            bus,
            reporter,
            store,
        }
    }

    /// Context with a discard-everything reporter.
    pub fn with_noop_reporter(
        map_provider: Box<dyn MapProvider>,
        persistence: Box<dyn PersistenceClient>,
    ) -> Self {
        Self::new(map_provider, persistence, Rc::new(NoopReporter))
    }

    /// Explicit teardown: drop every bus listener and store observer so
    /// nothing fires past the end of a session.
    pub fn shutdown(&mut self) {
        self.bus.clear_listeners(None);
        self.store.clear_observers();
    }
}
