//! Lifecycle events emitted while units run.
//!
//! Listeners are invoked synchronously, in registration order, before the
//! migrator moves on. A listener error is not swallowed: it stops the
//! fan-out and aborts the running operation.

use thiserror::Error;

/// Error returned by a listener.
#[derive(Error, Debug)]
#[error("{0}")]
pub struct ListenerError(pub String);

impl ListenerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Migrating,
    Migrated,
    Reverting,
    Reverted,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Migrating => "migrating",
            EventKind::Migrated => "migrated",
            EventKind::Reverting => "reverting",
            EventKind::Reverted => "reverted",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationEvent {
    Migrating { id: String },
    Migrated { id: String },
    Reverting { id: String },
    Reverted { id: String },
}

impl MigrationEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            MigrationEvent::Migrating { .. } => EventKind::Migrating,
            MigrationEvent::Migrated { .. } => EventKind::Migrated,
            MigrationEvent::Reverting { .. } => EventKind::Reverting,
            MigrationEvent::Reverted { .. } => EventKind::Reverted,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            MigrationEvent::Migrating { id }
            | MigrationEvent::Migrated { id }
            | MigrationEvent::Reverting { id }
            | MigrationEvent::Reverted { id } => id,
        }
    }
}

type Listener = Box<dyn Fn(&MigrationEvent) -> Result<(), ListenerError> + Send + Sync>;

/// Ordered listener list with synchronous fan-out.
#[derive(Default)]
pub struct EventNotifier {
    // None = listens to every kind
    listeners: Vec<(Option<EventKind>, Listener)>,
}

impl EventNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener for one event kind.
    pub fn on<F>(&mut self, kind: EventKind, listener: F) -> &mut Self
    where
        F: Fn(&MigrationEvent) -> Result<(), ListenerError> + Send + Sync + 'static,
    {
        self.listeners.push((Some(kind), Box::new(listener)));
        self
    }

    /// Register a listener for every event kind.
    pub fn on_any<F>(&mut self, listener: F) -> &mut Self
    where
        F: Fn(&MigrationEvent) -> Result<(), ListenerError> + Send + Sync + 'static,
    {
        self.listeners.push((None, Box::new(listener)));
        self
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Deliver an event to matching listeners. Stops at the first error.
    pub fn emit(&self, event: &MigrationEvent) -> Result<(), ListenerError> {
        let kind = event.kind();
        for (filter, listener) in &self.listeners {
            if filter.map_or(true, |k| k == kind) {
                listener(event)?;
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for EventNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventNotifier")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
