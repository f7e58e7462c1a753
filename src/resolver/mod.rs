//! Title resolution.
//!
//! A [`TitleResolver`] derives a display title from a file path. The
//! [`CachedResolver`] fronts one with a [`Cache`](crate::cache::Cache) and
//! keeps it coherent with bus events.

mod cached;
mod frontmatter;

use thiserror::Error;

pub use cached::CachedResolver;
pub use frontmatter::FrontmatterResolver;

/// Outcome of resolving a path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Resolution {
    /// Never computed.
    #[default]
    Unresolved,
    Resolved(String),
    /// Computed; the file has no title.
    NoTitle,
}

impl Resolution {
    /// Normalize a resolver result. Blank titles count as no title.
    pub fn from_title(title: Option<String>) -> Self {
        match title {
            Some(title) if !title.trim().is_empty() => Self::Resolved(title),
            _ => Self::NoTitle,
        }
    }

    pub fn title(&self) -> Option<&str> {
        match self {
            Self::Resolved(title) => Some(title),
            Self::Unresolved | Self::NoTitle => None,
        }
    }

    pub fn is_unresolved(&self) -> bool {
        matches!(self, Self::Unresolved)
    }

    /// The title, or `fallback` when there is none.
    pub fn display_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.title().unwrap_or(fallback)
    }
}

#[derive(Debug, Error)]
pub enum ResolverError {
    #[error("failed to read `{path}`: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("title resolution failed for `{path}`: {message}")]
    Failed { path: String, message: String },
}

impl ResolverError {
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn failed(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Failed {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Derives a title for a path. Expected to be cheap and side-effect free.
pub trait TitleResolver: Send + Sync {
    fn resolve(&self, path: &str) -> Result<Option<String>, ResolverError>;
}

impl<F> TitleResolver for F
where
    F: Fn(&str) -> Result<Option<String>, ResolverError> + Send + Sync,
{
    fn resolve(&self, path: &str) -> Result<Option<String>, ResolverError> {
        self(path)
    }
}
