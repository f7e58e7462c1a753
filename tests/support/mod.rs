#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use titlekeeper::cache::{CacheConfig, MemoryCache};
use titlekeeper::events::Dispatcher;
use titlekeeper::resolver::{CachedResolver, ResolverError, TitleResolver};
use titlekeeper::surface::{
    CanvasNode, CanvasView, FileRef, FrameHook, FrameHookId, OverlayChange, OverlayRole,
    OverlayService, SurfaceError, TabLeaf, Workspace,
};

/// Titles keyed by path; unknown paths fail like a missing file.
#[derive(Default)]
pub struct StubTitles {
    titles: Mutex<HashMap<String, Option<String>>>,
    calls: AtomicUsize,
}

impl StubTitles {
    pub fn with(entries: &[(&str, Option<&str>)]) -> Arc<Self> {
        let stub = Self::default();
        for (path, title) in entries {
            stub.set(path, *title);
        }
        Arc::new(stub)
    }

    pub fn set(&self, path: &str, title: Option<&str>) {
        self.titles
            .lock()
            .expect("titles lock")
            .insert(path.to_string(), title.map(str::to_string));
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TitleResolver for StubTitles {
    fn resolve(&self, path: &str) -> Result<Option<String>, ResolverError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.titles
            .lock()
            .expect("titles lock")
            .get(path)
            .cloned()
            .ok_or_else(|| ResolverError::failed(path, "no such file"))
    }
}

pub struct Fixture {
    pub dispatcher: Arc<Dispatcher>,
    pub titles: Arc<StubTitles>,
    pub resolver: Arc<CachedResolver>,
    pub workspace: Arc<FakeWorkspace>,
}

impl Fixture {
    pub fn new(entries: &[(&str, Option<&str>)]) -> Self {
        let dispatcher = Arc::new(Dispatcher::new());
        let titles = StubTitles::with(entries);
        let resolver = CachedResolver::new(
            titles.clone(),
            MemoryCache::new(&CacheConfig::default()),
            Arc::clone(&dispatcher),
        );
        resolver.attach();

        Self {
            dispatcher,
            titles,
            resolver,
            workspace: Arc::new(FakeWorkspace::default()),
        }
    }
}

pub struct FakeLeaf {
    file: Option<FileRef>,
    title: Mutex<String>,
    writes: AtomicUsize,
    closed: AtomicBool,
}

impl FakeLeaf {
    pub fn new(path: &str) -> Arc<Self> {
        let file = FileRef::new(path);
        Arc::new(Self {
            title: Mutex::new(file.basename.clone()),
            file: Some(file),
            writes: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
        })
    }

    pub fn empty() -> Arc<Self> {
        Arc::new(Self {
            file: None,
            title: Mutex::new("New tab".to_string()),
            writes: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
        })
    }

    pub fn shown(&self) -> String {
        self.title.lock().expect("title lock").clone()
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Tear the header down; later writes fail as detached.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

impl TabLeaf for FakeLeaf {
    fn file(&self) -> Option<FileRef> {
        self.file.clone()
    }

    fn title(&self) -> String {
        self.shown()
    }

    fn set_title(&self, title: &str) -> Result<(), SurfaceError> {
        if self.closed.load(Ordering::SeqCst) {
            let target = self.file.as_ref().map_or("leaf", |file| file.path.as_str());
            return Err(SurfaceError::detached(target));
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        *self.title.lock().expect("title lock") = title.to_string();
        Ok(())
    }
}

pub struct FakeNode {
    path: Mutex<Option<String>>,
    ready: AtomicBool,
}

impl FakeNode {
    pub fn file(path: &str) -> Arc<Self> {
        Arc::new(Self {
            path: Mutex::new(Some(path.to_string())),
            ready: AtomicBool::new(true),
        })
    }

    pub fn text() -> Arc<Self> {
        Arc::new(Self {
            path: Mutex::new(None),
            ready: AtomicBool::new(true),
        })
    }

    pub fn pending(path: &str) -> Arc<Self> {
        Arc::new(Self {
            path: Mutex::new(Some(path.to_string())),
            ready: AtomicBool::new(false),
        })
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    /// Unlink the embedded file, as when the node is deleted from the board.
    pub fn detach(&self) {
        *self.path.lock().expect("node lock") = None;
    }
}

impl CanvasNode for FakeNode {
    fn file_path(&self) -> Option<String> {
        self.path.lock().expect("node lock").clone()
    }

    fn is_initialized(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }
}

pub struct FakeCanvas {
    id: String,
    file: Option<FileRef>,
    nodes: Vec<Arc<FakeNode>>,
    hooks: Mutex<Vec<(FrameHookId, FrameHook)>>,
    next_hook: AtomicU64,
}

impl FakeCanvas {
    pub fn new(id: &str, path: &str, nodes: Vec<Arc<FakeNode>>) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            file: Some(FileRef::new(path)),
            nodes,
            hooks: Mutex::new(Vec::new()),
            next_hook: AtomicU64::new(1),
        })
    }

    /// Simulate one render frame.
    pub fn tick(&self) {
        let hooks: Vec<FrameHook> = self
            .hooks
            .lock()
            .expect("hooks lock")
            .iter()
            .map(|(_, hook)| Arc::clone(hook))
            .collect();
        for hook in hooks {
            hook();
        }
    }

    pub fn hook_count(&self) -> usize {
        self.hooks.lock().expect("hooks lock").len()
    }
}

impl CanvasView for FakeCanvas {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn file(&self) -> Option<FileRef> {
        self.file.clone()
    }

    fn nodes(&self) -> Vec<Arc<dyn CanvasNode>> {
        self.nodes
            .iter()
            .map(|node| Arc::clone(node) as Arc<dyn CanvasNode>)
            .collect()
    }

    fn add_frame_hook(&self, hook: FrameHook) -> FrameHookId {
        let id = FrameHookId(self.next_hook.fetch_add(1, Ordering::SeqCst));
        self.hooks.lock().expect("hooks lock").push((id, hook));
        id
    }

    fn remove_frame_hook(&self, id: FrameHookId) -> bool {
        let mut hooks = self.hooks.lock().expect("hooks lock");
        let before = hooks.len();
        hooks.retain(|(hook_id, _)| *hook_id != id);
        hooks.len() != before
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Overlay {
    pub role: OverlayRole,
    pub title: String,
    pub visible: bool,
}

#[derive(Default)]
pub struct FakeOverlays {
    overlays: Mutex<HashMap<String, Overlay>>,
    removals: AtomicUsize,
    failing: Mutex<Option<String>>,
}

impl FakeOverlays {
    pub fn get(&self, id: &str) -> Option<Overlay> {
        self.overlays.lock().expect("overlays lock").get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.overlays.lock().expect("overlays lock").len()
    }

    pub fn removals(&self) -> usize {
        self.removals.load(Ordering::SeqCst)
    }

    /// Make every upsert of `id` fail.
    pub fn fail_on(&self, id: &str) {
        *self.failing.lock().expect("failing lock") = Some(id.to_string());
    }
}

impl OverlayService for FakeOverlays {
    fn upsert(
        &self,
        _node: &dyn CanvasNode,
        id: &str,
        role: OverlayRole,
        title: &str,
    ) -> Result<OverlayChange, SurfaceError> {
        if self.failing.lock().expect("failing lock").as_deref() == Some(id) {
            return Err(SurfaceError::apply(id, "element missing"));
        }
        let mut overlays = self.overlays.lock().expect("overlays lock");
        match overlays.get_mut(id) {
            Some(overlay) if overlay.title == title => Ok(OverlayChange::Unchanged),
            Some(overlay) => {
                overlay.title = title.to_string();
                Ok(OverlayChange::Updated)
            }
            None => {
                overlays.insert(
                    id.to_string(),
                    Overlay {
                        role,
                        title: title.to_string(),
                        visible: false,
                    },
                );
                Ok(OverlayChange::Created)
            }
        }
    }

    fn set_visible(&self, id: &str, visible: bool) {
        if let Some(overlay) = self.overlays.lock().expect("overlays lock").get_mut(id) {
            overlay.visible = visible;
        }
    }

    fn remove(&self, id: &str) -> bool {
        self.overlays
            .lock()
            .expect("overlays lock")
            .remove(id)
            .is_some()
    }

    fn remove_all(&self) {
        self.removals.fetch_add(1, Ordering::SeqCst);
        self.overlays.lock().expect("overlays lock").clear();
    }
}

#[derive(Default)]
pub struct FakeWorkspace {
    leaves: Mutex<Vec<Arc<FakeLeaf>>>,
    canvases: Mutex<Vec<Arc<FakeCanvas>>>,
    active: Mutex<Option<FileRef>>,
}

impl FakeWorkspace {
    pub fn open_leaf(&self, leaf: Arc<FakeLeaf>) {
        self.leaves.lock().expect("leaves lock").push(leaf);
    }

    pub fn open_canvas(&self, canvas: Arc<FakeCanvas>) {
        self.canvases.lock().expect("canvases lock").push(canvas);
    }

    pub fn close_canvases(&self) {
        self.canvases.lock().expect("canvases lock").clear();
    }

    pub fn set_active(&self, path: &str) {
        *self.active.lock().expect("active lock") = Some(FileRef::new(path));
    }
}

impl Workspace for FakeWorkspace {
    fn markdown_leaves(&self) -> Vec<Arc<dyn TabLeaf>> {
        self.leaves
            .lock()
            .expect("leaves lock")
            .iter()
            .map(|leaf| Arc::clone(leaf) as Arc<dyn TabLeaf>)
            .collect()
    }

    fn canvas_views(&self) -> Vec<Arc<dyn CanvasView>> {
        self.canvases
            .lock()
            .expect("canvases lock")
            .iter()
            .map(|canvas| Arc::clone(canvas) as Arc<dyn CanvasView>)
            .collect()
    }

    fn active_file(&self) -> Option<FileRef> {
        self.active.lock().expect("active lock").clone()
    }
}

/// Let detached tasks spawned by event listeners run to completion.
pub async fn settle() {
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
}

pub fn millis(ms: u64) -> Duration {
    Duration::from_millis(ms)
}
