//! Resolver reading a title key from YAML front matter.

use std::fs;
use std::path::PathBuf;

use super::{ResolverError, TitleResolver};

const DEFAULT_KEY: &str = "title";

/// Reads `title:` (or another key) from a markdown file's front matter.
///
/// Only flat `key: value` lines are understood; quoted values are unquoted.
#[derive(Debug, Clone)]
pub struct FrontmatterResolver {
    root: Option<PathBuf>,
    key: String,
}

impl FrontmatterResolver {
    pub fn new() -> Self {
        Self {
            root: None,
            key: DEFAULT_KEY.to_string(),
        }
    }

    /// Resolve paths relative to `root`.
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }
}

impl Default for FrontmatterResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl TitleResolver for FrontmatterResolver {
    fn resolve(&self, path: &str) -> Result<Option<String>, ResolverError> {
        let full = match &self.root {
            Some(root) => root.join(path.trim_start_matches('/')),
            None => PathBuf::from(path),
        };
        let content = fs::read_to_string(&full).map_err(|source| ResolverError::io(path, source))?;
        Ok(front_matter_value(&content, &self.key))
    }
}

fn front_matter_value(content: &str, key: &str) -> Option<String> {
    let mut lines = content.lines();
    if lines.next()?.trim_end() != "---" {
        return None;
    }

    for line in lines {
        let line = line.trim_end();
        if line == "---" || line == "..." {
            break;
        }
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        if name.trim() != key {
            continue;
        }
        let value = value
            .trim()
            .trim_matches(|c: char| c == '"' || c == '\'')
            .trim();
        return (!value.is_empty()).then(|| value.to_string());
    }

    None
}
