//! Scene lifecycle
//!
//! A [`SceneController`] owns at most one [`SceneSession`] per viewport. Start
//! allocates everything the selected demo needs from the [`RenderHost`],
//! registers a resize observer and schedules a frame task on its
//! [`FrameClock`](crate::clock::FrameClock); stop undoes all of it.

mod assets;
pub mod content;
mod controller;
mod graph;
mod host;
mod mode;
mod session;

#[cfg(test)]
pub(crate) mod testing;

pub use assets::{AnimationClip, AssetKey, AssetResolver, AssetSource, DirectoryAssets};
pub use content::{SceneContent, SetupContext};
pub use controller::{SceneController, SceneEnv, StartOutcome};
pub use graph::{rgb, Blend, Drawable, Fog, Light, Material, ProxyId, RenderableProxy, SceneGraph};
pub use host::{GpuHandle, ObserverId, RenderHost, ResourceKind, ResourceRequest};
pub use mode::{ModeSwitcher, SceneMode};
pub use session::{SceneSession, Stage};
