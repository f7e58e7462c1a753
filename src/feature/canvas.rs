//! Canvas node titles.
//!
//! Titles are drawn through synthetic overlay elements over each node that
//! embeds a file. Canvas render frames feed a [`BatchQueue`] so a busy canvas
//! is re-checked at most once per window.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};
use std::time::Instant;

use async_trait::async_trait;
use futures::future::join_all;
use metrics::histogram;
use tracing::{debug, info, instrument, warn};

use crate::cache::lock::mutex_lock;
use crate::config::CanvasSettings;
use crate::events::{Dispatcher, EventName};
use crate::resolver::{CachedResolver, Resolution};
use crate::surface::{
    CanvasNode, CanvasView, FrameHookId, OverlayChange, OverlayRole, OverlayService, SurfaceError,
    Workspace,
};

use super::batch::{BatchConfig, BatchQueue};
use super::lifecycle::Lifecycle;
use super::{FeatureId, FeatureManager, ManagerState, spawn_detached};

const SOURCE: &str = "feature::canvas";
const METRIC_REFRESH_MS: &str = "titlekeeper_refresh_ms";

struct RegisteredHook {
    view: Weak<dyn CanvasView>,
    id: FrameHookId,
}

/// Shows resolved titles on canvas nodes.
///
/// A canvas is associated with a path when the canvas file itself or any node
/// it embeds has that path. While enabled, `layout:change` triggers a full
/// refresh. Disabling removes all overlays and frame hooks.
pub struct CanvasManager {
    workspace: Arc<dyn Workspace>,
    resolver: Arc<CachedResolver>,
    dispatcher: Arc<Dispatcher>,
    overlays: Arc<dyn OverlayService>,
    settings: CanvasSettings,
    queue: BatchQueue,
    hooks: Mutex<HashMap<String, RegisteredHook>>,
    lifecycle: Lifecycle,
    this: Weak<Self>,
}

impl CanvasManager {
    pub fn new(
        workspace: Arc<dyn Workspace>,
        resolver: Arc<CachedResolver>,
        dispatcher: Arc<Dispatcher>,
        overlays: Arc<dyn OverlayService>,
        settings: CanvasSettings,
        batch: BatchConfig,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            workspace,
            resolver,
            dispatcher,
            overlays,
            settings,
            queue: BatchQueue::new(batch),
            hooks: Mutex::new(HashMap::new()),
            lifecycle: Lifecycle::new(FeatureId::Canvas),
            this: this.clone(),
        })
    }

    /// Canvas paths waiting for a batched update.
    pub fn queue(&self) -> &BatchQueue {
        &self.queue
    }

    /// Number of canvas views currently carrying a frame hook.
    pub fn hooked_views(&self) -> usize {
        mutex_lock(&self.hooks, SOURCE, "hooked_views").len()
    }

    #[instrument(skip(self), fields(feature = %FeatureId::Canvas))]
    async fn inner_update(&self, path: Option<&str>) -> HashMap<String, bool> {
        let mut tasks = Vec::new();

        for view in self.workspace.canvas_views() {
            let Some(canvas) = view.file() else {
                continue;
            };
            for node in view.nodes() {
                let Some(node_path) = node.file_path() else {
                    continue;
                };
                if path.is_some_and(|path| path != node_path && path != canvas.path) {
                    continue;
                }
                tasks.push(self.apply(canvas.path.clone(), node, node_path));
            }

            if self.is_enabled() {
                self.ensure_frame_hook(&view, &canvas.path);
            }
        }

        let mut result = HashMap::new();
        for (path, changed) in join_all(tasks).await.into_iter().flatten() {
            *result.entry(path).or_insert(false) |= changed;
        }
        result
    }

    async fn apply(
        &self,
        canvas_path: String,
        node: Arc<dyn CanvasNode>,
        node_path: String,
    ) -> Option<(String, bool)> {
        let title = match self.resolver.resolve(&node_path) {
            Ok(Resolution::Resolved(title)) => Some(title),
            Ok(_) => None,
            Err(error) => {
                warn!(path = %node_path, error = %error, "Canvas title resolution failed");
                return None;
            }
        };

        let Some(title) = title else {
            if !self.is_enabled() {
                return None;
            }
            let removed = self.clear_canvas_title(&node_path, &canvas_path);
            return Some((node_path, removed));
        };

        if let Err(error) = self.wait_ready(node.as_ref(), &node_path).await {
            warn!(path = %node_path, canvas = %canvas_path, error = %error, "Canvas node unavailable");
            return None;
        }

        if !self.is_enabled() {
            debug!(path = %node_path, "Discarding canvas title for disabled feature");
            return None;
        }

        match self.set_canvas_title(node.as_ref(), &node_path, &canvas_path, &title) {
            Ok(changed) => Some((node_path, changed)),
            Err(error) => {
                warn!(path = %node_path, canvas = %canvas_path, error = %error, "Failed to apply canvas title");
                None
            }
        }
    }

    async fn wait_ready(&self, node: &dyn CanvasNode, node_path: &str) -> Result<(), SurfaceError> {
        let attempts = self.settings.ready_max_attempts.get();
        for attempt in 0..=attempts {
            if node.file_path().as_deref() != Some(node_path) {
                return Err(SurfaceError::detached(node_path));
            }
            if node.is_initialized() {
                return Ok(());
            }
            if attempt < attempts {
                tokio::time::sleep(self.settings.ready_poll_interval).await;
            }
        }

        Err(SurfaceError::NotReady {
            target: node_path.to_string(),
            attempts,
        })
    }

    fn set_canvas_title(
        &self,
        node: &dyn CanvasNode,
        node_path: &str,
        canvas_path: &str,
        title: &str,
    ) -> Result<bool, SurfaceError> {
        debug!(title, canvas = canvas_path, node = node_path, "Setting canvas title");

        let prefix = format!("{node_path}-{canvas_path}");
        let mut changed = false;
        for (role, suffix) in [(OverlayRole::Label, "label"), (OverlayRole::Inline, "inline")] {
            let id = format!("{prefix}-{suffix}");
            let change = self.overlays.upsert(node, &id, role, title)?;
            if change == OverlayChange::Created {
                self.overlays.set_visible(&id, true);
            }
            changed |= change.is_change();
        }
        Ok(changed)
    }

    fn clear_canvas_title(&self, node_path: &str, canvas_path: &str) -> bool {
        let prefix = format!("{node_path}-{canvas_path}");
        let mut removed = false;
        for suffix in ["label", "inline"] {
            removed |= self.overlays.remove(&format!("{prefix}-{suffix}"));
        }
        if removed {
            debug!(canvas = canvas_path, node = node_path, "Canvas title removed");
        }
        removed
    }

    fn ensure_frame_hook(&self, view: &Arc<dyn CanvasView>, canvas_path: &str) {
        let view_id = view.id();
        let mut hooks = mutex_lock(&self.hooks, SOURCE, "ensure_frame_hook");
        if hooks
            .get(&view_id)
            .is_some_and(|hook| hook.view.strong_count() > 0)
        {
            return;
        }

        let this = self.this.clone();
        let hook_view_id = view_id.clone();
        let path = canvas_path.to_string();
        let id = view.add_frame_hook(Arc::new(move || {
            if let Some(manager) = this.upgrade() {
                manager.on_frame(&hook_view_id, &path);
            }
        }));

        debug!(view = %view_id, canvas = canvas_path, "Frame hook registered");
        hooks.insert(
            view_id,
            RegisteredHook {
                view: Arc::downgrade(view),
                id,
            },
        );
    }

    fn on_frame(self: Arc<Self>, view_id: &str, canvas_path: &str) {
        if !self.is_enabled() {
            self.release_hook(view_id);
            return;
        }

        self.queue.enqueue(canvas_path);
        let Some(batch) = self.queue.poll_fire() else {
            return;
        };

        debug!(keys = batch.len(), "Processing canvas batch");
        spawn_detached(FeatureId::Canvas.as_str(), "batch", async move {
            let manager = Arc::clone(&self);
            self.queue
                .process(batch, move |key| {
                    let manager = Arc::clone(&manager);
                    async move { manager.update(&key).await }
                })
                .await;
        });
    }

    fn release_hook(&self, view_id: &str) {
        let hook = mutex_lock(&self.hooks, SOURCE, "release_hook").remove(view_id);
        if let Some(hook) = hook
            && let Some(view) = hook.view.upgrade()
        {
            view.remove_frame_hook(hook.id);
        }
    }

    fn release_all_hooks(&self) {
        let hooks: Vec<RegisteredHook> = mutex_lock(&self.hooks, SOURCE, "release_all_hooks")
            .drain()
            .map(|(_, hook)| hook)
            .collect();
        for hook in hooks {
            if let Some(view) = hook.view.upgrade() {
                view.remove_frame_hook(hook.id);
            }
        }
    }
}

#[async_trait]
impl FeatureManager for CanvasManager {
    fn id(&self) -> FeatureId {
        FeatureId::Canvas
    }

    fn state(&self) -> ManagerState {
        self.lifecycle.state()
    }

    fn enable(&self) {
        self.lifecycle.enable_with(|| {
            let this = self.this.clone();
            self.dispatcher
                .add_listener(EventName::LayoutChange, move |_| {
                    let Some(manager) = this.upgrade() else {
                        return;
                    };
                    spawn_detached(FeatureId::Canvas.as_str(), "refresh", async move {
                        manager.refresh().await;
                    });
                })
        });
    }

    fn disable(&self) {
        if !self.lifecycle.disable(&self.dispatcher) {
            return;
        }
        self.release_all_hooks();
        self.overlays.remove_all();
        self.queue.clear();
        info!("Canvas overlays removed");
    }

    async fn refresh(&self) -> HashMap<String, bool> {
        let started_at = Instant::now();
        let result = self.inner_update(None).await;
        histogram!(METRIC_REFRESH_MS, "feature" => FeatureId::Canvas.as_str())
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
