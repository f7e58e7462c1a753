use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, RwLock, Weak};

use futures::future::join_all;
use tracing::{debug, info};

use crate::cache::lock::{mutex_lock, rw_read, rw_write};
use crate::events::{AppEvent, Dispatcher, EventName, ListenerRef};

use super::{FeatureError, FeatureId, FeatureManager, spawn_detached};

const SOURCE: &str = "feature::registry";

/// Feature managers keyed by id.
///
/// While attached, a `resolver:unresolved` event is routed to
/// [`update`](FeatureManager::update) on every enabled manager.
pub struct FeatureRegistry {
    managers: RwLock<BTreeMap<FeatureId, Arc<dyn FeatureManager>>>,
    dispatcher: Arc<Dispatcher>,
    listener: Mutex<Option<ListenerRef>>,
    this: Weak<Self>,
}

impl FeatureRegistry {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            managers: RwLock::new(BTreeMap::new()),
            dispatcher,
            listener: Mutex::new(None),
            this: this.clone(),
        })
    }

    pub fn register(&self, manager: Arc<dyn FeatureManager>) -> Result<(), FeatureError> {
        let id = manager.id();
        let mut managers = rw_write(&self.managers, SOURCE, "register");
        if managers.contains_key(&id) {
            return Err(FeatureError::Duplicate(id));
        }
        managers.insert(id, manager);
        debug!(feature = %id, "Feature registered");
        Ok(())
    }

    pub fn get(&self, id: FeatureId) -> Option<Arc<dyn FeatureManager>> {
        rw_read(&self.managers, SOURCE, "get").get(&id).cloned()
    }

    pub fn ids(&self) -> Vec<FeatureId> {
        rw_read(&self.managers, SOURCE, "ids").keys().copied().collect()
    }

    pub fn enable(&self, id: FeatureId) -> Result<(), FeatureError> {
        self.get(id).ok_or(FeatureError::Unknown(id))?.enable();
        Ok(())
    }

    pub fn disable(&self, id: FeatureId) -> Result<(), FeatureError> {
        self.get(id).ok_or(FeatureError::Unknown(id))?.disable();
        Ok(())
    }

    /// Enable the listed features. Unknown ids fail before anything changes.
    pub fn enable_all(&self, ids: &[FeatureId]) -> Result<(), FeatureError> {
        let managers = ids
            .iter()
            .map(|id| self.get(*id).ok_or(FeatureError::Unknown(*id)))
            .collect::<Result<Vec<_>, _>>()?;
        for manager in managers {
            manager.enable();
        }
        Ok(())
    }

    pub fn disable_all(&self) {
        for manager in self.snapshot() {
            manager.disable();
        }
    }

    /// Refresh every enabled manager.
    pub async fn refresh_all(&self) -> HashMap<FeatureId, HashMap<String, bool>> {
        let enabled = self.enabled();
        let results = join_all(enabled.iter().map(|manager| manager.refresh())).await;
        enabled
            .iter()
            .map(|manager| manager.id())
            .zip(results)
            .collect()
    }

    /// Route a title change for `path` to every enabled manager. Returns true
    /// when any of them changed something.
    pub async fn update_all(&self, path: &str) -> bool {
        let enabled = self.enabled();
        join_all(enabled.iter().map(|manager| manager.update(path)))
            .await
            .into_iter()
            .any(|changed| changed)
    }

    /// Subscribe to `resolver:unresolved`. No-op when already attached.
    pub fn attach(&self) {
        let mut listener = mutex_lock(&self.listener, SOURCE, "attach");
        if listener.is_some() {
            return;
        }

        let this = self.this.clone();
        *listener = Some(
            self.dispatcher
                .add_listener(EventName::ResolverUnresolved, move |event| {
                    let AppEvent::ResolverUnresolved { path } = event else {
                        return;
                    };
                    let Some(registry) = this.upgrade() else {
                        return;
                    };
                    let path = path.clone();
                    spawn_detached(SOURCE, "route_unresolved", async move {
                        registry.update_all(&path).await;
                    });
                }),
        );
        info!("Feature registry attached");
    }

    pub fn detach(&self) {
        if let Some(listener) = mutex_lock(&self.listener, SOURCE, "detach").take() {
            self.dispatcher.remove_listener(&listener);
            info!("Feature registry detached");
        }
    }

    fn snapshot(&self) -> Vec<Arc<dyn FeatureManager>> {
        rw_read(&self.managers, SOURCE, "snapshot")
            .values()
            .cloned()
            .collect()
    }

    fn enabled(&self) -> Vec<Arc<dyn FeatureManager>> {
        self.snapshot()
            .into_iter()
            .filter(|manager| manager.is_enabled())
            .collect()
    }
}

impl Drop for FeatureRegistry {
    fn drop(&mut self) {
        self.detach();
    }
}
