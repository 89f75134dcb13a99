use glam::{Vec2, Vec3};
use rand::Rng;

use super::body::{Body, Repulsor, SpawnRegion};
use crate::config::SimulationConfig;
use crate::error::Result;
use crate::physics::PhysicsWorld;
use crate::scene::SceneGraph;

/// Maps normalized pointer coordinates into world space at a fixed depth.
pub fn pointer_target(pointer: Vec2, config: &SimulationConfig) -> Vec3 {
    Vec3::new(
        pointer.x * config.pointer_scale,
        pointer.y * config.pointer_scale,
        config.pointer_depth,
    )
}

/// Owns the physics world, its dynamic bodies and the repulsor.
pub struct BodySimulation {
    world: Box<dyn PhysicsWorld>,
    bodies: Vec<Body>,
    repulsor: Repulsor,
    config: SimulationConfig,
}

impl BodySimulation {
    /// Builds a simulation with `config.body_count` randomly spawned bodies.
    pub fn new<R: Rng + ?Sized>(
        mut world: Box<dyn PhysicsWorld>,
        config: SimulationConfig,
        rng: &mut R,
    ) -> Result<Self> {
        let region = SpawnRegion::from_config(&config)?;
        let bodies = (0..config.body_count)
            .map(|_| Body::spawn(world.as_mut(), &region, rng))
            .collect();
        let repulsor = Repulsor::new(
            world.as_mut(),
            config.repulsor_size,
            config.repulsor_collider_scale,
        );

        Ok(Self {
            world,
            bodies,
            repulsor,
            config,
        })
    }

    /// Builds a simulation around bodies the caller already created in
    /// `world`.
    pub fn from_parts(
        world: Box<dyn PhysicsWorld>,
        bodies: Vec<Body>,
        repulsor: Repulsor,
        config: SimulationConfig,
    ) -> Self {
        Self {
            world,
            bodies,
            repulsor,
            config,
        }
    }

    pub fn bodies(&self) -> &[Body] {
        &self.bodies
    }

    pub fn bodies_mut(&mut self) -> &mut [Body] {
        &mut self.bodies
    }

    pub fn repulsor(&self) -> &Repulsor {
        &self.repulsor
    }

    pub fn repulsor_mut(&mut self) -> &mut Repulsor {
        &mut self.repulsor
    }

    pub fn world(&self) -> &dyn PhysicsWorld {
        self.world.as_ref()
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Advances one simulation tick.
    ///
    /// The repulsor is placed at `repulsor_target` before integration; every
    /// body gets a fresh force of fixed magnitude toward the scene center,
    /// the world advances one step and the new positions are copied into the
    /// bodies and their proxies.
    pub fn step(&mut self, repulsor_target: Vec3, graph: &mut SceneGraph) {
        let world = self.world.as_mut();

        self.repulsor.place(world, repulsor_target);

        let center = self.config.scene_center;
        let magnitude = self.config.force_magnitude;
        for body in &mut self.bodies {
            body.apply_central_force(world, center, magnitude);
        }

        world.step();

        for body in &mut self.bodies {
            body.sync_from(world);
            if let Some(proxy) = body.proxy() {
                graph.set_position(proxy, body.position());
            }
        }

        if let Some(proxy) = self.repulsor.proxy() {
            graph.set_position(proxy, self.repulsor.position());
        }
    }
}

impl std::fmt::Debug for BodySimulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BodySimulation")
            .field("bodies", &self.bodies.len())
            .field("repulsor", &self.repulsor.position())
            .finish()
    }
}
