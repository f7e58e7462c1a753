//! Wiring of resolver, managers and registry from [`Settings`].

use std::sync::Arc;

use tracing::info;

use crate::cache::{CacheConfig, MemoryCache};
use crate::config::Settings;
use crate::events::Dispatcher;
use crate::feature::{BatchConfig, CanvasManager, FeatureError, FeatureRegistry, TabManager};
use crate::resolver::{CachedResolver, TitleResolver};
use crate::surface::{OverlayService, Workspace};

/// A running titlekeeper instance bound to one host workspace.
pub struct TitleKeeper {
    dispatcher: Arc<Dispatcher>,
    resolver: Arc<CachedResolver>,
    registry: Arc<FeatureRegistry>,
}

impl TitleKeeper {
    /// Build every component, attach it to a fresh bus and enable the
    /// configured features.
    pub fn start(
        settings: &Settings,
        source: Arc<dyn TitleResolver>,
        workspace: Arc<dyn Workspace>,
        overlays: Arc<dyn OverlayService>,
    ) -> Result<Self, FeatureError> {
        let dispatcher = Arc::new(Dispatcher::new());
        let resolver = CachedResolver::new(
            source,
            MemoryCache::new(&CacheConfig::from(&settings.cache)),
            Arc::clone(&dispatcher),
        );

        let registry = FeatureRegistry::new(Arc::clone(&dispatcher));
        registry.register(TabManager::new(
            Arc::clone(&workspace),
            Arc::clone(&resolver),
            Arc::clone(&dispatcher),
            settings.tabs.clone(),
        ))?;
        registry.register(CanvasManager::new(
            workspace,
            Arc::clone(&resolver),
            Arc::clone(&dispatcher),
            overlays,
            settings.canvas.clone(),
            BatchConfig::from(&settings.batch),
        ))?;

        resolver.attach();
        registry.attach();
        registry.enable_all(&settings.features.enabled)?;

        info!(features = ?settings.features.enabled, "Title keeper started");
        Ok(Self {
            dispatcher,
            resolver,
            registry,
        })
    }

    /// The bus the host publishes its events on.
    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    pub fn resolver(&self) -> &Arc<CachedResolver> {
        &self.resolver
    }

    pub fn registry(&self) -> &Arc<FeatureRegistry> {
        &self.registry
    }

    /// Disable every feature and drop all subscriptions.
    pub fn shutdown(&self) {
        self.registry.disable_all();
        self.registry.detach();
        self.resolver.detach();
        info!("Title keeper stopped");
    }
}
