use thiserror::Error;

use crate::config::LoadError;
use crate::feature::FeatureError;
use crate::infra::error::InfraError;
use crate::resolver::ResolverError;

/// Top-level error reported by the binary.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to load configuration: {0}")]
    Config(#[from] LoadError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Resolver(#[from] ResolverError),
    #[error(transparent)]
    Feature(#[from] FeatureError),
    #[error("validation failed: {0}")]
    Validation(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}
