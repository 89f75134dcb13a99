use glam::Vec3;

use super::{SceneContent, SetupContext};
use crate::clock::FrameTime;
use crate::config::SceneConfig;
use crate::error::Result;
use crate::math::Transform;
use crate::render::{MeshData, OrbitController};
use crate::scene::graph::{rgb, Light, Material, ProxyId, RenderableProxy};
use crate::scene::session::Stage;

/// Radians per second about x and y.
const SPIN: (f32, f32) = (0.06, 0.12);

/// A flat-shaded icosahedron with a wireframe overlay, slowly tumbling.
#[derive(Debug)]
pub struct PrimitiveScene {
    solid: ProxyId,
}

impl PrimitiveScene {
    pub fn new(config: &SceneConfig, ctx: &mut SetupContext<'_>, stage: &mut Stage) -> Result<Self> {
        let mesh = MeshData::icosahedron(1.0, 2).flat_shaded();
        let solid_mesh = ctx.upload_mesh(&mesh)?;
        let wire_mesh = ctx.upload_mesh(&mesh.wireframe())?;

        let solid = stage
            .graph
            .add(RenderableProxy::new(solid_mesh, Material::lit(Vec3::ONE)));
        stage.graph.add(
            RenderableProxy::new(wire_mesh, Material::unlit(Vec3::ONE))
                .with_transform(Transform::from_scale(1.001))
                .with_parent(solid),
        );

        stage.graph.add_light(Light::Hemisphere {
            sky: rgb(0xD17AFF),
            ground: rgb(0x4F9AFF),
            intensity: 1.0,
        });
        stage.orbit = Some(OrbitController::from_camera(&stage.camera, config.orbit_damping));

        Ok(Self { solid })
    }
}

impl SceneContent for PrimitiveScene {
    fn update(&mut self, time: &FrameTime, stage: &mut Stage) {
        let t = time.elapsed as f32;
        if let Some(proxy) = stage.graph.get_mut(self.solid) {
            proxy.transform.set_euler(t * SPIN.0, t * SPIN.1, 0.0);
        }
    }
}
