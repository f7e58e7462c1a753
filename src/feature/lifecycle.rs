use std::sync::Mutex;

use tracing::{debug, info};

use crate::cache::lock::mutex_lock;
use crate::events::{Dispatcher, ListenerRef};

use super::{FeatureId, ManagerState};

const SOURCE: &str = "feature::lifecycle";

/// Enabled/disabled state of a manager, derived from its listener handle:
/// the handle is present iff the manager is enabled.
pub(crate) struct Lifecycle {
    feature: FeatureId,
    handle: Mutex<Option<ListenerRef>>,
}

impl Lifecycle {
    pub(crate) fn new(feature: FeatureId) -> Self {
        Self {
            feature,
            handle: Mutex::new(None),
        }
    }

    pub(crate) fn state(&self) -> ManagerState {
        if mutex_lock(&self.handle, SOURCE, "state").is_some() {
            ManagerState::Enabled
        } else {
            ManagerState::Disabled
        }
    }

    /// Store the handle returned by `subscribe`. Returns false, without
    /// calling `subscribe`, when already enabled.
    pub(crate) fn enable_with(&self, subscribe: impl FnOnce() -> ListenerRef) -> bool {
        let mut handle = mutex_lock(&self.handle, SOURCE, "enable");
        if handle.is_some() {
            debug!(feature = %self.feature, "Feature already enabled");
            return false;
        }

        let listener = subscribe();
        info!(feature = %self.feature, event = %listener.name(), "Feature enabled");
        *handle = Some(listener);
        true
    }

    /// Drop the handle and unsubscribe it. Returns false when already disabled.
    pub(crate) fn disable(&self, dispatcher: &Dispatcher) -> bool {
        let listener = mutex_lock(&self.handle, SOURCE, "disable").take();
        let Some(listener) = listener else {
            debug!(feature = %self.feature, "Feature already disabled");
            return false;
        };

        dispatcher.remove_listener(&listener);
        info!(feature = %self.feature, "Feature disabled");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventName;

    #[test]
    fn enable_disable_cycles() {
        let dispatcher = Dispatcher::new();
        let lifecycle = Lifecycle::new(FeatureId::Tab);
        assert_eq!(lifecycle.state(), ManagerState::Disabled);

        assert!(lifecycle.enable_with(|| dispatcher.add_listener(EventName::LayoutChange, |_| {})));
        assert_eq!(lifecycle.state(), ManagerState::Enabled);
        assert!(!lifecycle.enable_with(|| dispatcher.add_listener(EventName::LayoutChange, |_| {})));
        assert_eq!(dispatcher.listener_count(EventName::LayoutChange), 1);

        assert!(lifecycle.disable(&dispatcher));
        assert!(!lifecycle.disable(&dispatcher));
        assert_eq!(lifecycle.state(), ManagerState::Disabled);
        assert_eq!(dispatcher.listener_count(EventName::LayoutChange), 0);
    }
}
