use thiserror::Error;

use crate::scene::AssetKey;

/// Errors surfaced by scene construction and its collaborators.
#[derive(Debug, Error)]
pub enum SceneError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
    #[error("asset {key:?} could not be resolved: {reason}")]
    Asset { key: AssetKey, reason: String },
    #[error("physics engine failed to initialize: {0}")]
    Physics(String),
    #[error("gpu resource allocation failed: {0}")]
    Gpu(String),
}

pub type Result<T> = std::result::Result<T, SceneError>;
