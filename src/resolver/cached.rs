//! Cache-aside resolver with event-driven invalidation.

use std::sync::{Arc, Mutex, Weak};

use metrics::counter;
use tracing::{debug, info, warn};

use crate::cache::lock::mutex_lock;
use crate::cache::{Cache, CacheItem};
use crate::events::{AppEvent, Dispatcher, EventName, ListenerRef};

use super::{Resolution, ResolverError, TitleResolver};

const SOURCE: &str = "resolver::cached";
const METRIC_RESOLVER_UNRESOLVED_TOTAL: &str = "titlekeeper_resolver_unresolved_total";

/// Fronts a [`TitleResolver`] with a cache.
///
/// Reads are cache-aside. Once [`attach`](Self::attach)ed, the resolver
/// recomputes titles eagerly on `metadata:cache:changed` and `file:rename`,
/// drops everything on `resolver:clear`, and announces every changed title
/// with `resolver:unresolved`.
///
/// The cache is owned exclusively by this type. A read-modify-write on one
/// key is not atomic across threads; callers drive it from one task.
pub struct CachedResolver {
    resolver: Arc<dyn TitleResolver>,
    cache: Box<dyn Cache>,
    dispatcher: Arc<Dispatcher>,
    listeners: Mutex<Vec<ListenerRef>>,
    this: Weak<Self>,
}

impl CachedResolver {
    pub fn new(
        resolver: Arc<dyn TitleResolver>,
        cache: impl Cache + 'static,
        dispatcher: Arc<Dispatcher>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            resolver,
            cache: Box::new(cache),
            dispatcher,
            listeners: Mutex::new(Vec::new()),
            this: this.clone(),
        })
    }

    /// Subscribe to the invalidation events. Calling twice is a no-op.
    pub fn attach(&self) {
        let mut listeners = mutex_lock(&self.listeners, SOURCE, "attach");
        if !listeners.is_empty() {
            return;
        }

        let this = self.this.clone();
        listeners.push(
            self.dispatcher
                .add_listener(EventName::ResolverClear, move |_| {
                    if let Some(resolver) = this.upgrade() {
                        resolver.clear();
                    }
                }),
        );

        let this = self.this.clone();
        listeners.push(self.dispatcher.add_listener(
            EventName::MetadataCacheChanged,
            move |event| {
                let (Some(resolver), AppEvent::MetadataCacheChanged { path }) =
                    (this.upgrade(), event)
                else {
                    return;
                };
                if let Err(error) = resolver.invalidate(path) {
                    warn!(path = %path, error = %error, "Title invalidation failed");
                }
            },
        ));

        let this = self.this.clone();
        listeners.push(
            self.dispatcher
                .add_listener(EventName::FileRename, move |event| {
                    let (Some(resolver), AppEvent::FileRename { old, actual }) =
                        (this.upgrade(), event)
                    else {
                        return;
                    };
                    if let Err(error) = resolver.on_rename(old, actual) {
                        warn!(old = %old, actual = %actual, error = %error, "Title invalidation after rename failed");
                    }
                }),
        );

        info!(listeners = listeners.len(), "Cached resolver attached");
    }

    /// Remove every listener installed by [`attach`](Self::attach).
    pub fn detach(&self) {
        let listeners: Vec<ListenerRef> =
            mutex_lock(&self.listeners, SOURCE, "detach").drain(..).collect();
        for listener in &listeners {
            self.dispatcher.remove_listener(listener);
        }
        if !listeners.is_empty() {
            info!("Cached resolver detached");
        }
    }

    pub fn is_attached(&self) -> bool {
        !mutex_lock(&self.listeners, SOURCE, "is_attached").is_empty()
    }

    /// Return the cached title for `path`, computing and storing it on a miss.
    pub fn resolve(&self, path: &str) -> Result<Resolution, ResolverError> {
        let item = self.cache.get_item(path);
        if item.is_hit() {
            return Ok(item.into_value());
        }

        debug!(path, "Title cache miss");
        Ok(self.actualize(item)?.into_value())
    }

    /// The cached value for `path` without computing anything.
    pub fn peek(&self, path: &str) -> Resolution {
        let item = self.cache.get_item(path);
        if item.is_hit() {
            item.into_value()
        } else {
            Resolution::Unresolved
        }
    }

    /// Recompute the title for `path` and store it.
    ///
    /// Dispatches `resolver:unresolved` when a previously cached title
    /// changed and returns whether it did.
    pub fn invalidate(&self, path: &str) -> Result<bool, ResolverError> {
        let item = self.cache.get_item(path);
        let previous = item.is_hit().then(|| item.get().clone());
        let item = self.actualize(item)?;

        match previous {
            Some(previous) if &previous != item.get() => {
                debug!(path, ?previous, current = ?item.get(), "Cached title changed");
                counter!(METRIC_RESOLVER_UNRESOLVED_TOTAL).increment(1);
                self.dispatcher.dispatch(AppEvent::ResolverUnresolved {
                    path: path.to_string(),
                });
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Forget `old` and recompute `new`.
    pub fn on_rename(&self, old: &str, new: &str) -> Result<bool, ResolverError> {
        self.cache.delete(old);
        self.invalidate(new)
    }

    pub fn clear(&self) {
        self.cache.clear();
        info!("Title cache cleared");
    }

    fn actualize(&self, item: CacheItem) -> Result<CacheItem, ResolverError> {
        let title = self.resolver.resolve(item.key())?;
        let item = item.set(Resolution::from_title(title));
        self.cache.save(item.clone());
        Ok(item)
    }
}

impl Drop for CachedResolver {
    fn drop(&mut self) {
        self.detach();
    }
}
