use glam::{Quat, Vec3};

use super::{SceneContent, SetupContext};
use crate::clock::FrameTime;
use crate::config::SceneConfig;
use crate::dynamics::{pointer_target, BodySimulation};
use crate::error::Result;
use crate::math::Transform;
use crate::render::MeshData;
use crate::scene::graph::{rgb, Light, Material, RenderableProxy};
use crate::scene::session::Stage;

const WIRE_SCALE: f32 = 1.01;

/// Bodies drawn back toward the center while a pointer-driven ball shoves
/// them around.
#[derive(Debug)]
pub struct PhysicsScene {
    simulation: BodySimulation,
}

impl PhysicsScene {
    pub fn new(config: &SceneConfig, ctx: &mut SetupContext<'_>, stage: &mut Stage) -> Result<Self> {
        let world = ctx.create_physics_world(config.simulation.gravity)?;
        let mut simulation = BodySimulation::new(world, config.simulation, &mut rand::thread_rng())?;

        // Unit meshes, scaled per body.
        let body_shape = MeshData::icosahedron(1.0, 1).flat_shaded();
        let body_mesh = ctx.upload_mesh(&body_shape)?;
        let wire_mesh = ctx.upload_mesh(&body_shape.wireframe())?;
        let repulsor_mesh = ctx.upload_mesh(&MeshData::icosahedron(1.0, 8))?;

        for body in simulation.bodies_mut() {
            let transform = Transform::new(body.position(), Quat::IDENTITY, Vec3::splat(body.size()));
            let proxy = stage.graph.add(
                RenderableProxy::new(body_mesh, Material::lit(Vec3::ONE)).with_transform(transform),
            );
            stage.graph.add(
                RenderableProxy::new(wire_mesh, Material::unlit(Vec3::ZERO))
                    .with_transform(Transform::from_scale(WIRE_SCALE))
                    .with_parent(proxy),
            );
            body.attach_proxy(proxy);
        }

        let repulsor = simulation.repulsor_mut();
        let transform = Transform::new(repulsor.position(), Quat::IDENTITY, Vec3::splat(repulsor.size()));
        let repulsor_proxy = stage.graph.add(
            RenderableProxy::new(repulsor_mesh, Material::unlit(Vec3::ONE)).with_transform(transform),
        );
        repulsor.attach_proxy(repulsor_proxy);

        stage.graph.add_light(Light::Hemisphere {
            sky: rgb(0xD17AFF),
            ground: rgb(0x4F9AFF),
            intensity: 0.5,
        });
        stage.graph.add_light(Light::Point {
            attached_to: repulsor_proxy,
            color: Vec3::ONE,
            intensity: 1.0,
        });

        log::debug!("physics scene with {} bodies", simulation.bodies().len());
        Ok(Self { simulation })
    }

    pub fn simulation(&self) -> &BodySimulation {
        &self.simulation
    }
}

impl SceneContent for PhysicsScene {
    fn update(&mut self, _time: &FrameTime, stage: &mut Stage) {
        let target = pointer_target(stage.pointer, self.simulation.config());
        self.simulation.step(target, &mut stage.graph);
    }
}
