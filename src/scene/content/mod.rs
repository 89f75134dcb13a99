//! The demos a session can run.
//!
//! Each content allocates its meshes and textures through a [`SetupContext`]
//! while the session is being built and afterwards only mutates the
//! [`Stage`] from its frame callback.

mod model;
mod physics;
mod planet;
mod primitive;
mod wormhole;

pub use model::{ClipPlayer, ModelScene};
pub use physics::PhysicsScene;
pub use planet::PlanetScene;
pub use primitive::PrimitiveScene;
pub use wormhole::{wormhole_path, WormholeScene};

use glam::Vec3;

use super::assets::{AssetKey, AssetResolver, AssetSource};
use super::host::{GpuHandle, RenderHost, ResourceRequest};
use super::mode::SceneMode;
use super::session::{ResourceLedger, Stage};
use crate::clock::FrameTime;
use crate::config::SceneConfig;
use crate::error::Result;
use crate::physics::{PhysicsBackend, PhysicsWorld};
use crate::render::MeshData;

pub trait SceneContent {
    /// Advances the content by one frame.
    fn update(&mut self, time: &FrameTime, stage: &mut Stage);

    fn pointer_button(&mut self, _pressed: bool) {}
}

/// Allocation front-end used while a session is being built. Every handle it
/// hands out is recorded in the session's ledger.
pub struct SetupContext<'a> {
    host: &'a mut dyn RenderHost,
    assets: &'a dyn AssetResolver,
    physics: &'a mut dyn PhysicsBackend,
    ledger: &'a mut ResourceLedger,
    unresolved: &'a mut Vec<AssetKey>,
}

impl<'a> SetupContext<'a> {
    pub(crate) fn new(
        host: &'a mut dyn RenderHost,
        assets: &'a dyn AssetResolver,
        physics: &'a mut dyn PhysicsBackend,
        ledger: &'a mut ResourceLedger,
        unresolved: &'a mut Vec<AssetKey>,
    ) -> Self {
        Self {
            host,
            assets,
            physics,
            ledger,
            unresolved,
        }
    }

    pub fn upload_mesh(&mut self, mesh: &MeshData) -> Result<GpuHandle> {
        let handle = self.host.allocate(ResourceRequest::Mesh(mesh))?;
        self.ledger.record(handle);
        Ok(handle)
    }

    /// Resolves `key`, recording it as unresolved on failure.
    pub fn resolve(&mut self, key: AssetKey) -> Option<AssetSource> {
        match self.assets.resolve(key) {
            Ok(source) => Some(source),
            Err(err) => {
                log::warn!("{}", err);
                self.unresolved.push(key);
                None
            }
        }
    }

    /// Resolves and uploads a texture. A failure degrades to `None`; the
    /// material then renders without the map.
    pub fn load_texture(&mut self, key: AssetKey) -> Option<GpuHandle> {
        let source = self.resolve(key)?;
        match self.host.allocate(ResourceRequest::Texture(&source)) {
            Ok(handle) => {
                self.ledger.record(handle);
                Some(handle)
            }
            Err(err) => {
                log::warn!("texture {:?} unavailable: {}", key, err);
                self.unresolved.push(key);
                None
            }
        }
    }

    pub fn create_physics_world(&mut self, gravity: Vec3) -> Result<Box<dyn PhysicsWorld>> {
        self.physics.create_world(gravity)
    }
}

/// Builds the content for `config.mode`, populating `stage`.
pub(crate) fn build(
    config: &SceneConfig,
    ctx: &mut SetupContext<'_>,
    stage: &mut Stage,
) -> Result<Box<dyn SceneContent>> {
    Ok(match config.mode {
        SceneMode::Model => Box::new(ModelScene::new(config, ctx, stage)?),
        SceneMode::Primitive => Box::new(PrimitiveScene::new(config, ctx, stage)?),
        SceneMode::Planet => Box::new(PlanetScene::new(config, ctx, stage)?),
        SceneMode::Wormhole => Box::new(WormholeScene::new(config, ctx, stage)?),
        SceneMode::Physics => Box::new(PhysicsScene::new(config, ctx, stage)?),
    })
}
