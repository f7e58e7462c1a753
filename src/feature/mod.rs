//! Feature managers.
//!
//! A feature manager owns one cross-cutting title behaviour across a kind of
//! surface: it subscribes to bus events while enabled and re-applies titles on
//! [`refresh`](FeatureManager::refresh) or
//! [`update`](FeatureManager::update).

mod batch;
mod canvas;
mod lifecycle;
mod registry;
mod tab;

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::str::FromStr;

use async_trait::async_trait;
use thiserror::Error;
use tokio::runtime::Handle;
use tracing::warn;

pub use batch::{BatchConfig, BatchQueue};
pub use canvas::CanvasManager;
pub use registry::FeatureRegistry;
pub use tab::TabManager;

/// Stable identifier of a feature manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FeatureId {
    Tab,
    Canvas,
}

impl FeatureId {
    pub const ALL: [FeatureId; 2] = [FeatureId::Tab, FeatureId::Canvas];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Tab => "tab",
            Self::Canvas => "canvas",
        }
    }
}

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeatureId {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|id| id.as_str().eq_ignore_ascii_case(value))
            .ok_or_else(|| format!("unknown feature `{value}`"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagerState {
    Disabled,
    Enabled,
}

#[derive(Debug, Error)]
pub enum FeatureError {
    #[error("feature `{0}` is already registered")]
    Duplicate(FeatureId),
    #[error("feature `{0}` is not registered")]
    Unknown(FeatureId),
}

/// Lifecycle and update dispatch shared by every surface.
///
/// `update` and `refresh` never fail: per-instance failures are logged and
/// left out of the result.
#[async_trait]
pub trait FeatureManager: Send + Sync {
    fn id(&self) -> FeatureId;

    fn state(&self) -> ManagerState;

    fn is_enabled(&self) -> bool {
        self.state() == ManagerState::Enabled
    }

    /// Subscribe to the events this manager reacts to. No-op when enabled.
    fn enable(&self);

    /// Unsubscribe and release surface resources. No-op when disabled.
    fn disable(&self);

    /// Re-apply titles to every live instance; per path, whether the
    /// displayed title changed.
    async fn refresh(&self) -> HashMap<String, bool>;

    /// Re-apply titles to the instances associated with `path`.
    async fn update(&self, path: &str) -> bool;
}

/// Run `future` on the current runtime, detached. Event callbacks are
/// synchronous, so async work they trigger starts here.
pub(crate) fn spawn_detached<F>(scope: &'static str, operation: &'static str, future: F)
where
    F: Future<Output = ()> + Send + 'static,
{
    match Handle::try_current() {
        Ok(handle) => {
            handle.spawn(future);
        }
        Err(error) => {
            warn!(
                scope,
                operation,
                error = %error,
                "No async runtime available; update skipped"
            );
        }
    }
}
