//! Renderer surface boundary.
//!
//! Traits the host implements so feature managers can enumerate live views
//! and apply titles to them. Every enumeration returns a snapshot; instances
//! added or removed afterwards are picked up by the next pass.

use std::path::Path;
use std::sync::Arc;

use thiserror::Error;

/// A file as seen by a surface.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileRef {
    pub path: String,
    /// File name without extension, the default display text.
    pub basename: String,
}

impl FileRef {
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        let basename = Path::new(&path)
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.clone());
        Self { path, basename }
    }
}

#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("failed to apply title to `{target}`: {message}")]
    Apply { target: String, message: String },
    #[error("`{target}` was not ready after {attempts} attempts")]
    NotReady { target: String, attempts: u32 },
    #[error("`{target}` is no longer attached")]
    Detached { target: String },
}

impl SurfaceError {
    pub fn apply(target: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Apply {
            target: target.into(),
            message: message.into(),
        }
    }

    pub fn detached(target: impl Into<String>) -> Self {
        Self::Detached {
            target: target.into(),
        }
    }
}

/// A tab showing one markdown file.
pub trait TabLeaf: Send + Sync {
    fn file(&self) -> Option<FileRef>;

    /// Text currently shown in the tab header.
    fn title(&self) -> String;

    fn set_title(&self, title: &str) -> Result<(), SurfaceError>;
}

pub type FrameHook = Arc<dyn Fn() + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHookId(pub u64);

/// A canvas holding nodes that reference files.
pub trait CanvasView: Send + Sync {
    /// Stable identity of this view.
    fn id(&self) -> String;

    fn file(&self) -> Option<FileRef>;

    fn nodes(&self) -> Vec<Arc<dyn CanvasNode>>;

    /// Call `hook` after every render frame. A hook may remove itself (or any
    /// other hook) while it runs.
    fn add_frame_hook(&self, hook: FrameHook) -> FrameHookId;

    fn remove_frame_hook(&self, id: FrameHookId) -> bool;
}

pub trait CanvasNode: Send + Sync {
    /// Path of the file this node embeds, if any.
    fn file_path(&self) -> Option<String>;

    /// Whether the node's elements exist and can be decorated.
    fn is_initialized(&self) -> bool;
}

/// Which element of a canvas node an overlay replaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverlayRole {
    /// The node label; the host label shows on hover.
    Label,
    /// The inline title inside the node; the host title shows on click.
    Inline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayChange {
    Created,
    Updated,
    Unchanged,
}

impl OverlayChange {
    pub fn is_change(self) -> bool {
        !matches!(self, Self::Unchanged)
    }
}

/// Synthetic title elements drawn over canvas nodes.
pub trait OverlayService: Send + Sync {
    /// Create the overlay `id` over `node`, or retitle it if it exists.
    fn upsert(
        &self,
        node: &dyn CanvasNode,
        id: &str,
        role: OverlayRole,
        title: &str,
    ) -> Result<OverlayChange, SurfaceError>;

    fn set_visible(&self, id: &str, visible: bool);

    /// Remove the overlay `id` and restore its host element. Returns whether
    /// the overlay existed.
    fn remove(&self, id: &str) -> bool;

    /// Remove every overlay and restore the host elements.
    fn remove_all(&self);
}

/// The host workspace.
pub trait Workspace: Send + Sync {
    fn markdown_leaves(&self) -> Vec<Arc<dyn TabLeaf>>;

    fn canvas_views(&self) -> Vec<Arc<dyn CanvasView>>;

    fn active_file(&self) -> Option<FileRef>;
}
