//! Application event bus.
//!
//! Named publish/subscribe used to drive cache invalidation and surface
//! updates. Listeners are identified by a [`ListenerRef`] handle returned from
//! [`Dispatcher::add_listener`].

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use tracing::{debug, trace};

use crate::cache::lock::{rw_read, rw_write};

const SOURCE: &str = "events";

/// Names of the events carried by the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventName {
    LayoutChange,
    MetadataCacheChanged,
    FileRename,
    ResolverClear,
    ResolverUnresolved,
}

impl EventName {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LayoutChange => "layout:change",
            Self::MetadataCacheChanged => "metadata:cache:changed",
            Self::FileRename => "file:rename",
            Self::ResolverClear => "resolver:clear",
            Self::ResolverUnresolved => "resolver:unresolved",
        }
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// The host workspace layout changed (tabs opened, closed or moved).
    LayoutChange,
    /// Metadata for a file changed.
    MetadataCacheChanged { path: String },
    /// A file moved from `old` to `actual`.
    FileRename { old: String, actual: String },
    /// Drop every cached title.
    ResolverClear,
    /// The cached title for `path` changed.
    ResolverUnresolved { path: String },
}

impl AppEvent {
    pub fn name(&self) -> EventName {
        match self {
            Self::LayoutChange => EventName::LayoutChange,
            Self::MetadataCacheChanged { .. } => EventName::MetadataCacheChanged,
            Self::FileRename { .. } => EventName::FileRename,
            Self::ResolverClear => EventName::ResolverClear,
            Self::ResolverUnresolved { .. } => EventName::ResolverUnresolved,
        }
    }
}

pub type Listener = Arc<dyn Fn(&AppEvent) + Send + Sync>;

/// Handle for a registered listener.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListenerRef {
    id: u64,
    name: EventName,
}

impl ListenerRef {
    pub fn name(&self) -> EventName {
        self.name
    }
}

/// In-process event dispatcher.
///
/// Callbacks run synchronously on the dispatching task, after the listener
/// table lock is released, so a listener may dispatch or (un)subscribe.
pub struct Dispatcher {
    listeners: RwLock<HashMap<EventName, Vec<(u64, Listener)>>>,
    next_id: AtomicU64,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            listeners: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Register `callback` for events named `name`.
    pub fn add_listener<F>(&self, name: EventName, callback: F) -> ListenerRef
    where
        F: Fn(&AppEvent) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        rw_write(&self.listeners, SOURCE, "add_listener")
            .entry(name)
            .or_default()
            .push((id, Arc::new(callback)));

        debug!(event = %name, listener_id = id, "Listener added");
        ListenerRef { id, name }
    }

    /// Remove a listener. Returns false when the handle was already removed.
    pub fn remove_listener(&self, listener: &ListenerRef) -> bool {
        let mut listeners = rw_write(&self.listeners, SOURCE, "remove_listener");
        let Some(entries) = listeners.get_mut(&listener.name) else {
            return false;
        };

        let before = entries.len();
        entries.retain(|(id, _)| *id != listener.id);
        let removed = entries.len() != before;
        if entries.is_empty() {
            listeners.remove(&listener.name);
        }

        debug!(
            event = %listener.name,
            listener_id = listener.id,
            removed,
            "Listener removed"
        );
        removed
    }

    /// Deliver `event` to every listener registered for its name.
    pub fn dispatch(&self, event: AppEvent) {
        let name = event.name();
        let callbacks: Vec<Listener> = rw_read(&self.listeners, SOURCE, "dispatch")
            .get(&name)
            .map(|entries| entries.iter().map(|(_, cb)| Arc::clone(cb)).collect())
            .unwrap_or_default();

        trace!(event = %name, listeners = callbacks.len(), "Dispatching event");

        for callback in callbacks {
            callback(&event);
        }
    }

    pub fn listener_count(&self, name: EventName) -> usize {
        rw_read(&self.listeners, SOURCE, "listener_count")
            .get(&name)
            .map_or(0, Vec::len)
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;

    use super::*;

    #[test]
    fn event_names_match_wire_names() {
        assert_eq!(EventName::LayoutChange.to_string(), "layout:change");
        assert_eq!(
            AppEvent::MetadataCacheChanged {
                path: "/a.md".into()
            }
            .name()
            .as_str(),
            "metadata:cache:changed"
        );
        assert_eq!(EventName::ResolverUnresolved.as_str(), "resolver:unresolved");
    }

    #[test]
    fn dispatch_reaches_only_matching_listeners() {
        let dispatcher = Dispatcher::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&seen);
        dispatcher.add_listener(EventName::ResolverUnresolved, move |event| {
            sink.lock().expect("sink lock").push(event.clone());
        });

        dispatcher.dispatch(AppEvent::LayoutChange);
        dispatcher.dispatch(AppEvent::ResolverUnresolved {
            path: "/a.md".into(),
        });

        let seen = seen.lock().expect("sink lock");
        assert_eq!(
            *seen,
            vec![AppEvent::ResolverUnresolved {
                path: "/a.md".into()
            }]
        );
    }

    #[test]
    fn removed_listener_is_not_called() {
        let dispatcher = Dispatcher::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&calls);
        let handle = dispatcher.add_listener(EventName::LayoutChange, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        dispatcher.dispatch(AppEvent::LayoutChange);
        assert!(dispatcher.remove_listener(&handle));
        assert!(!dispatcher.remove_listener(&handle));
        dispatcher.dispatch(AppEvent::LayoutChange);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(dispatcher.listener_count(EventName::LayoutChange), 0);
    }

    #[test]
    fn listener_may_dispatch_reentrantly() {
        let dispatcher = Arc::new(Dispatcher::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let inner = Arc::clone(&dispatcher);
        dispatcher.add_listener(EventName::MetadataCacheChanged, move |event| {
            if let AppEvent::MetadataCacheChanged { path } = event {
                inner.dispatch(AppEvent::ResolverUnresolved { path: path.clone() });
            }
        });
        let counter = Arc::clone(&calls);
        dispatcher.add_listener(EventName::ResolverUnresolved, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        dispatcher.dispatch(AppEvent::MetadataCacheChanged {
            path: "/a.md".into(),
        });

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn handles_are_unique() {
        let dispatcher = Dispatcher::new();

        let first = dispatcher.add_listener(EventName::LayoutChange, |_| {});
        let second = dispatcher.add_listener(EventName::LayoutChange, |_| {});

        assert_ne!(first, second);
        assert_eq!(dispatcher.listener_count(EventName::LayoutChange), 2);
    }
}
