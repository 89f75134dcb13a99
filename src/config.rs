//! Scene configuration.
//!
//! Every demo is driven by plain structs whose defaults reproduce the stock
//! scenes; builders tweak individual fields.

use glam::Vec3;

use crate::error::{Result, SceneError};
use crate::scene::SceneMode;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraConfig {
    /// Vertical field of view in degrees.
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    pub position: Vec3,
    pub target: Vec3,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_degrees: 75.0,
            near: 0.1,
            far: 1000.0,
            position: Vec3::new(0.0, 0.0, 5.0),
            target: Vec3::ZERO,
        }
    }
}

impl CameraConfig {
    pub fn with_fov(mut self, fov_degrees: f32) -> Self {
        self.fov_degrees = fov_degrees;
        self
    }

    pub fn with_clip_planes(mut self, near: f32, far: f32) -> Self {
        self.near = near;
        self.far = far;
        self
    }

    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    fn validate(&self) -> Result<()> {
        if !(self.fov_degrees > 0.0 && self.fov_degrees < 180.0) {
            return Err(SceneError::InvalidConfig("camera fov must be in (0, 180) degrees"));
        }
        if !(self.near > 0.0 && self.far > self.near) {
            return Err(SceneError::InvalidConfig("camera clip planes must satisfy 0 < near < far"));
        }
        Ok(())
    }
}

/// Parameters of the body simulation used by the physics demo.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationConfig {
    pub body_count: usize,
    pub spawn_center: Vec3,
    /// Edge length of the cubic spawn region.
    pub spawn_range: f32,
    pub size_min: f32,
    pub size_max: f32,
    /// Magnitude of the pull toward the scene center.
    pub force_magnitude: f32,
    pub scene_center: Vec3,
    pub repulsor_size: f32,
    /// Repulsor collider radius relative to its visual size.
    pub repulsor_collider_scale: f32,
    pub pointer_scale: f32,
    pub pointer_depth: f32,
    pub gravity: Vec3,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            body_count: 100,
            spawn_center: Vec3::new(0.0, 3.0, 0.0),
            spawn_range: 6.0,
            size_min: 0.1,
            size_max: 0.35,
            force_magnitude: 0.5,
            scene_center: Vec3::ZERO,
            repulsor_size: 0.25,
            repulsor_collider_scale: 3.0,
            pointer_scale: 5.0,
            pointer_depth: 0.2,
            gravity: Vec3::ZERO,
        }
    }
}

impl SimulationConfig {
    pub fn with_body_count(mut self, body_count: usize) -> Self {
        self.body_count = body_count;
        self
    }

    pub fn with_spawn_region(mut self, center: Vec3, range: f32) -> Self {
        self.spawn_center = center;
        self.spawn_range = range;
        self
    }

    pub fn with_force_magnitude(mut self, force_magnitude: f32) -> Self {
        self.force_magnitude = force_magnitude;
        self
    }

    pub fn with_gravity(mut self, gravity: Vec3) -> Self {
        self.gravity = gravity;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.size_min > 0.0) {
            return Err(SceneError::InvalidConfig("body size must be positive"));
        }
        if !(self.size_max > self.size_min) {
            return Err(SceneError::InvalidConfig("body size range is empty"));
        }
        if !(self.spawn_range > 0.0) {
            return Err(SceneError::InvalidConfig("spawn range must be positive"));
        }
        if !(self.repulsor_size > 0.0 && self.repulsor_collider_scale > 0.0) {
            return Err(SceneError::InvalidConfig("repulsor size must be positive"));
        }
        if !(self.force_magnitude > 0.0) {
            return Err(SceneError::InvalidConfig("force magnitude must be positive"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WormholeConfig {
    /// Duration of one flythrough loop in seconds.
    pub loop_seconds: f64,
    /// Path parameter offset of the look-at point.
    pub look_ahead: f32,
    pub box_count: usize,
    pub box_size: f32,
    pub fog_density: f32,
}

impl Default for WormholeConfig {
    fn default() -> Self {
        Self {
            loop_seconds: 100.0,
            look_ahead: 0.01,
            box_count: 50,
            box_size: 0.075,
            fog_density: 0.3,
        }
    }
}

impl WormholeConfig {
    pub fn with_loop_seconds(mut self, loop_seconds: f64) -> Self {
        self.loop_seconds = loop_seconds;
        self
    }

    fn validate(&self) -> Result<()> {
        if !(self.loop_seconds > 0.0) {
            return Err(SceneError::InvalidConfig("wormhole loop period must be positive"));
        }
        if !(self.box_size > 0.0) {
            return Err(SceneError::InvalidConfig("wormhole box size must be positive"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanetConfig {
    pub axial_tilt_degrees: f32,
    /// Planet spin in radians per second.
    pub rotation_speed: f32,
    pub detail: u32,
    pub star_count: usize,
}

impl Default for PlanetConfig {
    fn default() -> Self {
        Self {
            axial_tilt_degrees: 23.4,
            rotation_speed: 0.06,
            detail: 12,
            star_count: 2000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneConfig {
    pub mode: SceneMode,
    pub camera: CameraConfig,
    pub simulation: SimulationConfig,
    pub wormhole: WormholeConfig,
    pub planet: PlanetConfig,
    /// Per-frame velocity retention of the orbit controls.
    pub orbit_damping: f32,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            mode: SceneMode::default(),
            camera: CameraConfig::default(),
            simulation: SimulationConfig::default(),
            wormhole: WormholeConfig::default(),
            planet: PlanetConfig::default(),
            orbit_damping: 0.97,
        }
    }
}

impl SceneConfig {
    pub fn new(mode: SceneMode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }

    pub fn with_camera(mut self, camera: CameraConfig) -> Self {
        self.camera = camera;
        self
    }

    pub fn with_simulation(mut self, simulation: SimulationConfig) -> Self {
        self.simulation = simulation;
        self
    }

    pub fn with_wormhole(mut self, wormhole: WormholeConfig) -> Self {
        self.wormhole = wormhole;
        self
    }

    pub fn with_planet(mut self, planet: PlanetConfig) -> Self {
        self.planet = planet;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.camera.validate()?;
        self.simulation.validate()?;
        self.wormhole.validate()?;
        if !(0.0..1.0).contains(&self.orbit_damping) {
            return Err(SceneError::InvalidConfig("orbit damping must be in [0, 1)"));
        }
        Ok(())
    }
}
