use glam::Vec3;
use rapier3d::prelude as rapier;

use super::{BodyKind, PhysicsBackend, PhysicsWorld, RigidBodyHandle};
use crate::error::Result;

fn to_vector(v: Vec3) -> rapier::Vector<rapier::Real> {
    rapier::Vector::new(v.x, v.y, v.z)
}

fn to_vec3(v: &rapier::Vector<rapier::Real>) -> Vec3 {
    Vec3::new(v.x, v.y, v.z)
}

/// A Rapier world: body and collider sets plus the pipeline state that
/// advances them.
///
/// Kinematic bodies are position based. [`PhysicsWorld::set_translation`]
/// sets their next position, so the step derives a velocity from the move and
/// pushes overlapping dynamic bodies away with it.
pub struct RapierWorld {
    gravity: rapier::Vector<rapier::Real>,
    params: rapier::IntegrationParameters,
    pipeline: rapier::PhysicsPipeline,
    islands: rapier::IslandManager,
    broad_phase: rapier::DefaultBroadPhase,
    narrow_phase: rapier::NarrowPhase,
    bodies: rapier::RigidBodySet,
    colliders: rapier::ColliderSet,
    impulse_joints: rapier::ImpulseJointSet,
    multibody_joints: rapier::MultibodyJointSet,
    ccd_solver: rapier::CCDSolver,
    query_pipeline: rapier::QueryPipeline,
}

impl RapierWorld {
    pub fn new(gravity: Vec3) -> Self {
        Self {
            gravity: to_vector(gravity),
            params: rapier::IntegrationParameters::default(),
            pipeline: rapier::PhysicsPipeline::new(),
            islands: rapier::IslandManager::new(),
            broad_phase: rapier::DefaultBroadPhase::new(),
            narrow_phase: rapier::NarrowPhase::new(),
            bodies: rapier::RigidBodySet::new(),
            colliders: rapier::ColliderSet::new(),
            impulse_joints: rapier::ImpulseJointSet::new(),
            multibody_joints: rapier::MultibodyJointSet::new(),
            ccd_solver: rapier::CCDSolver::new(),
            query_pipeline: rapier::QueryPipeline::new(),
        }
    }

    pub fn with_timestep(mut self, timestep: f32) -> Self {
        self.params.dt = timestep;
        self
    }

    pub fn timestep(&self) -> f32 {
        self.params.dt
    }

    pub fn velocity(&self, body: RigidBodyHandle) -> Option<Vec3> {
        self.bodies.get(body.0).map(|b| to_vec3(b.linvel()))
    }

    /// Force accumulated through [`PhysicsWorld::add_force`].
    pub fn force(&self, body: RigidBodyHandle) -> Option<Vec3> {
        self.bodies.get(body.0).map(|b| to_vec3(&b.user_force()))
    }

    /// Mass derived from the attached colliders. Updated by the next step.
    pub fn mass(&self, body: RigidBodyHandle) -> Option<f32> {
        self.bodies.get(body.0).map(|b| b.mass())
    }
}

impl Default for RapierWorld {
    fn default() -> Self {
        Self::new(Vec3::ZERO)
    }
}

impl PhysicsWorld for RapierWorld {
    fn create_body(&mut self, kind: BodyKind, translation: Vec3) -> RigidBodyHandle {
        let builder = match kind {
            BodyKind::Dynamic => rapier::RigidBodyBuilder::dynamic(),
            BodyKind::Kinematic => rapier::RigidBodyBuilder::kinematic_position_based(),
        };
        RigidBodyHandle(self.bodies.insert(builder.translation(to_vector(translation)).build()))
    }

    fn attach_ball(&mut self, body: RigidBodyHandle, radius: f32, density: f32) {
        if !self.bodies.contains(body.0) {
            log::warn!("ball collider for unknown body {:?}", body);
            return;
        }
        let collider = rapier::ColliderBuilder::ball(radius).density(density).build();
        self.colliders
            .insert_with_parent(collider, body.0, &mut self.bodies);
    }

    fn remove_body(&mut self, body: RigidBodyHandle) {
        self.bodies.remove(
            body.0,
            &mut self.islands,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            true,
        );
    }

    fn reset_forces(&mut self, body: RigidBodyHandle) {
        if let Some(b) = self.bodies.get_mut(body.0) {
            b.reset_forces(true);
        }
    }

    fn add_force(&mut self, body: RigidBodyHandle, force: Vec3) {
        if let Some(b) = self.bodies.get_mut(body.0) {
            b.add_force(to_vector(force), true);
        }
    }

    fn set_translation(&mut self, body: RigidBodyHandle, translation: Vec3) {
        let Some(b) = self.bodies.get_mut(body.0) else {
            return;
        };
        if b.is_kinematic() {
            b.set_next_kinematic_translation(to_vector(translation));
        } else {
            b.set_translation(to_vector(translation), true);
        }
    }

    fn translation(&self, body: RigidBodyHandle) -> Option<Vec3> {
        self.bodies.get(body.0).map(|b| to_vec3(b.translation()))
    }

    fn step(&mut self) {
        self.pipeline.step(
            &self.gravity,
            &self.params,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &(),
        );
    }

    fn body_count(&self) -> usize {
        self.bodies.len()
    }
}

impl std::fmt::Debug for RapierWorld {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RapierWorld")
            .field("body_count", &self.bodies.len())
            .field("gravity", &to_vec3(&self.gravity))
            .field("timestep", &self.params.dt)
            .finish()
    }
}

/// Backend handing out [`RapierWorld`]s.
#[derive(Debug, Default, Clone, Copy)]
pub struct RapierBackend {
    pub timestep: Option<f32>,
}

impl PhysicsBackend for RapierBackend {
    fn create_world(&mut self, gravity: Vec3) -> Result<Box<dyn PhysicsWorld>> {
        let mut world = RapierWorld::new(gravity);
        if let Some(timestep) = self.timestep {
            world = world.with_timestep(timestep);
        }
        log::debug!("created {:?}", world);
        Ok(Box::new(world))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ball(world: &mut RapierWorld, kind: BodyKind, at: Vec3, radius: f32, density: f32) -> RigidBodyHandle {
        let body = world.create_body(kind, at);
        world.attach_ball(body, radius, density);
        body
    }

    #[test]
    fn force_accelerates_dynamic_body() {
        let mut world = RapierWorld::default();
        let body = ball(&mut world, BodyKind::Dynamic, Vec3::ZERO, 0.5, 1.0);
        world.add_force(body, Vec3::X);
        world.step();

        assert!(world.velocity(body).unwrap().x > 0.0);
        assert!(world.translation(body).unwrap().x > 0.0);
    }

    #[test]
    fn forces_persist_until_reset() {
        let mut world = RapierWorld::default();
        let body = ball(&mut world, BodyKind::Dynamic, Vec3::ZERO, 0.5, 1.0);
        world.add_force(body, Vec3::Y);
        world.add_force(body, Vec3::Y);
        world.step();
        assert_eq!(world.force(body), Some(Vec3::Y * 2.0));

        world.reset_forces(body);
        assert_eq!(world.force(body), Some(Vec3::ZERO));
    }

    #[test]
    fn density_sets_mass() {
        let mut world = RapierWorld::default();
        let body = ball(&mut world, BodyKind::Dynamic, Vec3::ZERO, 0.5, 2.0);
        world.step();

        let volume = 4.0 / 3.0 * std::f32::consts::PI * 0.5_f32.powi(3);
        assert!((world.mass(body).unwrap() - 2.0 * volume).abs() < 1e-3);
    }

    #[test]
    fn kinematic_body_ignores_forces_and_gravity() {
        let mut world = RapierWorld::new(Vec3::new(0.0, -9.81, 0.0));
        let body = ball(&mut world, BodyKind::Kinematic, Vec3::ONE, 0.5, 0.0);
        world.add_force(body, Vec3::X * 100.0);
        world.step();
        assert_eq!(world.translation(body), Some(Vec3::ONE));
    }

    #[test]
    fn kinematic_translation_lands_after_step() {
        let mut world = RapierWorld::default();
        let body = ball(&mut world, BodyKind::Kinematic, Vec3::ZERO, 0.75, 0.0);
        let target = Vec3::new(1.0, -2.0, 0.2);

        world.set_translation(body, target);
        world.step();
        assert_eq!(world.translation(body), Some(target));
    }

    #[test]
    fn moving_kinematic_ball_pushes_body_along() {
        let mut world = RapierWorld::default();
        let pusher = ball(&mut world, BodyKind::Kinematic, Vec3::ZERO, 0.75, 0.0);
        let start = Vec3::new(1.0, 0.0, 0.0);
        let body = ball(&mut world, BodyKind::Dynamic, start, 0.2, 0.2);

        for i in 1..=10 {
            world.set_translation(pusher, Vec3::X * (i as f32 * 0.05));
            world.step();
        }

        let position = world.translation(body).unwrap();
        let velocity = world.velocity(body).unwrap();
        assert!(position.x > start.x, "body was not pushed: {position}");
        assert!(velocity.x > 0.0, "body gained no momentum: {velocity}");
        assert!(position.distance(world.translation(pusher).unwrap()) > 0.9);
    }

    #[test]
    fn overlapping_dynamic_balls_separate() {
        let mut world = RapierWorld::default();
        let a = ball(&mut world, BodyKind::Dynamic, Vec3::new(-0.1, 0.0, 0.0), 0.2, 1.0);
        let b = ball(&mut world, BodyKind::Dynamic, Vec3::new(0.1, 0.0, 0.0), 0.2, 1.0);

        for _ in 0..30 {
            world.step();
        }

        let pa = world.translation(a).unwrap();
        let pb = world.translation(b).unwrap();
        assert!(pa.distance(pb) > 0.3);
        assert!(pa.x < -0.1 && pb.x > 0.1);
    }

    #[test]
    fn removed_body_is_gone() {
        let mut world = RapierWorld::default();
        let body = ball(&mut world, BodyKind::Dynamic, Vec3::ZERO, 0.2, 1.0);
        world.remove_body(body);
        assert_eq!(world.translation(body), None);
        assert_eq!(world.body_count(), 0);
    }
}
