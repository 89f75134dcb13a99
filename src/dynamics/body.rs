use glam::Vec3;
use rand::Rng;

use crate::config::SimulationConfig;
use crate::error::{Result, SceneError};
use crate::physics::{BodyKind, PhysicsWorld, RigidBodyHandle};
use crate::scene::ProxyId;

/// Cubic region and size range bodies are spawned in.
///
/// Constructors reject empty ranges, so sampling never fails.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnRegion {
    center: Vec3,
    range: f32,
    size_min: f32,
    size_max: f32,
}

impl SpawnRegion {
    pub fn new(center: Vec3, range: f32) -> Result<Self> {
        Self {
            center,
            range,
            size_min: 0.1,
            size_max: 0.35,
        }
        .validated()
    }

    pub fn with_sizes(mut self, size_min: f32, size_max: f32) -> Result<Self> {
        self.size_min = size_min;
        self.size_max = size_max;
        self.validated()
    }

    pub fn from_config(config: &SimulationConfig) -> Result<Self> {
        Self::new(config.spawn_center, config.spawn_range)?.with_sizes(config.size_min, config.size_max)
    }

    fn validated(self) -> Result<Self> {
        if !(self.range > 0.0) {
            return Err(SceneError::InvalidConfig("spawn range must be positive"));
        }
        if !(self.size_min > 0.0) {
            return Err(SceneError::InvalidConfig("body size must be positive"));
        }
        if !(self.size_max > self.size_min) {
            return Err(SceneError::InvalidConfig("body size range is empty"));
        }
        Ok(self)
    }

    pub fn center(&self) -> Vec3 {
        self.center
    }

    pub fn range(&self) -> f32 {
        self.range
    }

    pub fn min(&self) -> Vec3 {
        self.center - Vec3::splat(self.range * 0.5)
    }

    pub fn max(&self) -> Vec3 {
        self.center + Vec3::splat(self.range * 0.5)
    }

    pub fn contains(&self, point: Vec3) -> bool {
        let (min, max) = (self.min(), self.max());
        point.cmpge(min).all() && point.cmple(max).all()
    }

    fn sample_position<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec3 {
        let half = self.range * 0.5;
        self.center
            + Vec3::new(
                rng.gen_range(-half..=half),
                rng.gen_range(-half..=half),
                rng.gen_range(-half..=half),
            )
    }

    fn sample_size<R: Rng + ?Sized>(&self, rng: &mut R) -> f32 {
        rng.gen_range(self.size_min..self.size_max)
    }
}

/// A dynamic simulated agent.
#[derive(Debug, Clone)]
pub struct Body {
    rigid: RigidBodyHandle,
    position: Vec3,
    size: f32,
    force: Vec3,
    proxy: Option<ProxyId>,
}

impl Body {
    /// Creates a dynamic body at a random point of `region` with a random
    /// size. The collider density equals the size, so larger bodies are
    /// disproportionately heavier.
    pub fn spawn<R: Rng + ?Sized>(
        world: &mut dyn PhysicsWorld,
        region: &SpawnRegion,
        rng: &mut R,
    ) -> Self {
        let size = region.sample_size(rng);
        let position = region.sample_position(rng);
        Self::new(world, position, size)
    }

    /// Creates a resting dynamic body at `origin`.
    pub fn new(world: &mut dyn PhysicsWorld, origin: Vec3, size: f32) -> Self {
        let rigid = world.create_body(BodyKind::Dynamic, origin);
        world.attach_ball(rigid, size, size);

        Self {
            rigid,
            position: origin,
            size,
            force: Vec3::ZERO,
            proxy: None,
        }
    }

    pub fn attach_proxy(&mut self, proxy: ProxyId) {
        self.proxy = Some(proxy);
    }

    pub fn proxy(&self) -> Option<ProxyId> {
        self.proxy
    }

    pub fn rigid_body(&self) -> RigidBodyHandle {
        self.rigid
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn size(&self) -> f32 {
        self.size
    }

    /// Force applied during the most recent simulation step.
    pub fn force(&self) -> Vec3 {
        self.force
    }

    /// Clears accumulated force and pulls the body toward `center`.
    pub(crate) fn apply_central_force(
        &mut self,
        world: &mut dyn PhysicsWorld,
        center: Vec3,
        magnitude: f32,
    ) {
        world.reset_forces(self.rigid);
        let direction = (self.position - center).normalize_or_zero();
        self.force = -direction * magnitude;
        world.add_force(self.rigid, self.force);
    }

    pub(crate) fn sync_from(&mut self, world: &dyn PhysicsWorld) {
        if let Some(position) = world.translation(self.rigid) {
            self.position = position;
        }
    }
}

/// Kinematic body whose position is assigned from external input.
#[derive(Debug, Clone)]
pub struct Repulsor {
    rigid: RigidBodyHandle,
    position: Vec3,
    size: f32,
    proxy: Option<ProxyId>,
}

impl Repulsor {
    /// The collider is `collider_scale` times larger than the visual size so
    /// bodies keep their distance from it.
    pub fn new(world: &mut dyn PhysicsWorld, size: f32, collider_scale: f32) -> Self {
        let rigid = world.create_body(BodyKind::Kinematic, Vec3::ZERO);
        world.attach_ball(rigid, size * collider_scale, 0.0);
        Self {
            rigid,
            position: Vec3::ZERO,
            size,
            proxy: None,
        }
    }

    pub fn attach_proxy(&mut self, proxy: ProxyId) {
        self.proxy = Some(proxy);
    }

    pub fn proxy(&self) -> Option<ProxyId> {
        self.proxy
    }

    pub fn rigid_body(&self) -> RigidBodyHandle {
        self.rigid
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn size(&self) -> f32 {
        self.size
    }

    pub(crate) fn place(&mut self, world: &mut dyn PhysicsWorld, target: Vec3) {
        world.set_translation(self.rigid, target);
        self.position = target;
    }
}
