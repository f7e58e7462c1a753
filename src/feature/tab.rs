//! Tab header titles.

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Instant;

use async_trait::async_trait;
use futures::future::join_all;
use metrics::histogram;
use tracing::{debug, instrument, warn};

use crate::config::TabSettings;
use crate::events::{Dispatcher, EventName};
use crate::resolver::CachedResolver;
use crate::surface::{FileRef, TabLeaf, Workspace};

use super::lifecycle::Lifecycle;
use super::{FeatureId, FeatureManager, ManagerState, spawn_detached};

const METRIC_REFRESH_MS: &str = "titlekeeper_refresh_ms";

/// Shows resolved titles in markdown tab headers.
///
/// While enabled, a `layout:change` re-applies the active file's title, or
/// every tab when tabs are numbered since positions may have moved.
/// Disabling restores each header to its file's basename.
pub struct TabManager {
    workspace: Arc<dyn Workspace>,
    resolver: Arc<CachedResolver>,
    dispatcher: Arc<Dispatcher>,
    settings: TabSettings,
    lifecycle: Lifecycle,
    this: Weak<Self>,
}

impl TabManager {
    pub fn new(
        workspace: Arc<dyn Workspace>,
        resolver: Arc<CachedResolver>,
        dispatcher: Arc<Dispatcher>,
        settings: TabSettings,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            workspace,
            resolver,
            dispatcher,
            settings,
            lifecycle: Lifecycle::new(FeatureId::Tab),
            this: this.clone(),
        })
    }

    fn on_layout_change(self: Arc<Self>) {
        if self.settings.numbered {
            spawn_detached(FeatureId::Tab.as_str(), "refresh", async move {
                self.refresh().await;
            });
            return;
        }

        let Some(file) = self.workspace.active_file() else {
            return;
        };
        spawn_detached(FeatureId::Tab.as_str(), "update", async move {
            self.update(&file.path).await;
        });
    }

    /// Put every tab header back to its basename.
    fn reset(&self) {
        for leaf in self.workspace.markdown_leaves() {
            let Some(file) = leaf.file() else {
                continue;
            };
            if let Err(error) = leaf.set_title(&file.basename) {
                warn!(path = %file.path, error = %error, "Failed to reset tab title");
            }
        }
    }

    #[instrument(skip(self), fields(feature = %FeatureId::Tab))]
    async fn inner_update(&self, path: Option<&str>) -> HashMap<String, bool> {
        let leaves = self.workspace.markdown_leaves();
        let tasks = leaves
            .into_iter()
            .enumerate()
            .filter_map(|(index, leaf)| {
                let file = leaf.file()?;
                if path.is_some_and(|path| path != file.path) {
                    return None;
                }
                Some(self.apply(index, leaf, file))
            });

        let mut result = HashMap::new();
        for (path, changed) in join_all(tasks).await.into_iter().flatten() {
            *result.entry(path).or_insert(false) |= changed;
        }
        result
    }

    async fn apply(
        &self,
        index: usize,
        leaf: Arc<dyn TabLeaf>,
        file: FileRef,
    ) -> Option<(String, bool)> {
        let resolution = match self.resolver.resolve(&file.path) {
            Ok(resolution) => resolution,
            Err(error) => {
                warn!(path = %file.path, error = %error, "Tab title resolution failed");
                return None;
            }
        };

        let title = resolution.display_or(&file.basename);
        let text = if self.settings.numbered {
            format!("{}. {title}", index + 1)
        } else {
            title.to_string()
        };

        if !self.is_enabled() {
            debug!(path = %file.path, "Discarding tab title for disabled feature");
            return None;
        }

        let changed = leaf.title() != text;
        if changed && let Err(error) = leaf.set_title(&text) {
            warn!(path = %file.path, error = %error, "Failed to apply tab title");
            return None;
        }

        Some((file.path, changed))
    }
}

#[async_trait]
impl FeatureManager for TabManager {
    fn id(&self) -> FeatureId {
        FeatureId::Tab
    }

    fn state(&self) -> ManagerState {
        self.lifecycle.state()
    }

    fn enable(&self) {
        self.lifecycle.enable_with(|| {
            let this = self.this.clone();
            self.dispatcher
                .add_listener(EventName::LayoutChange, move |_| {
                    if let Some(manager) = this.upgrade() {
                        manager.on_layout_change();
                    }
                })
        });
    }

    fn disable(&self) {
        if self.lifecycle.disable(&self.dispatcher) {
            self.reset();
        }
    }

    async fn refresh(&self) -> HashMap<String, bool> {
        let started_at = Instant::now();
        let result = self.inner_update(None).await;
        histogram!(METRIC_REFRESH_MS, "feature" => FeatureId::Tab.as_str())
            .record(started_at.elapsed().as_secs_f64() * 1000.0);
        result
    }

    async fn update(&self, path: &str) -> bool {
        self.inner_update(Some(path))
            .await
            .values()
            .any(|changed| *changed)
    }
}
