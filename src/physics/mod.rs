//! Rigid-body physics collaborator.
//!
//! The body simulation only talks to [`PhysicsWorld`]. [`RapierWorld`] backs
//! it with the Rapier engine.

mod world;

pub use world::{RapierBackend, RapierWorld};

use glam::Vec3;

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RigidBodyHandle(pub(crate) rapier3d::dynamics::RigidBodyHandle);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    /// Moved by accumulated forces during [`PhysicsWorld::step`].
    Dynamic,
    /// Moved only by [`PhysicsWorld::set_translation`], which takes effect
    /// on the next step.
    Kinematic,
}

pub trait PhysicsWorld {
    fn create_body(&mut self, kind: BodyKind, translation: Vec3) -> RigidBodyHandle;
    /// Attaches a ball collider; the body's mass becomes `density * volume`.
    fn attach_ball(&mut self, body: RigidBodyHandle, radius: f32, density: f32);
    fn remove_body(&mut self, body: RigidBodyHandle);
    fn reset_forces(&mut self, body: RigidBodyHandle);
    /// Adds to the force applied during the next step.
    fn add_force(&mut self, body: RigidBodyHandle, force: Vec3);
    fn set_translation(&mut self, body: RigidBodyHandle, translation: Vec3);
    fn translation(&self, body: RigidBodyHandle) -> Option<Vec3>;
    fn step(&mut self);
    fn body_count(&self) -> usize;
}

/// Creates physics worlds for scene sessions.
pub trait PhysicsBackend {
    fn create_world(&mut self, gravity: Vec3) -> Result<Box<dyn PhysicsWorld>>;
}
