use glam::{Mat4, Vec3};

use crate::config::CameraConfig;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    /// Vertical field of view in radians.
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self::from_config(&CameraConfig::default(), 1.0)
    }
}

impl Camera {
    pub fn from_config(config: &CameraConfig, aspect: f32) -> Self {
        Self {
            position: config.position,
            target: config.target,
            up: Vec3::Y,
            fov: config.fov_degrees.to_radians(),
            aspect,
            near: config.near,
            far: config.far,
        }
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov, self.aspect, self.near, self.far)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    pub fn set_aspect(&mut self, aspect: f32) {
        self.aspect = aspect;
    }

    pub fn look_at(&mut self, target: Vec3) {
        self.target = target;
    }

    pub fn forward(&self) -> Vec3 {
        (self.target - self.position).normalize_or_zero()
    }
}

/// Damped orbit around a center point, driven by pointer drags and wheel
/// steps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitController {
    pub center: Vec3,
    pub radius: f32,
    pub theta: f32,
    pub phi: f32,
    pub min_radius: f32,
    pub max_radius: f32,
    pub min_phi: f32,
    pub max_phi: f32,
    pub rotate_speed: f32,
    pub pan_speed: f32,
    pub zoom_speed: f32,
    /// Fraction of velocity kept after each update.
    pub damping: f32,
    velocity_theta: f32,
    velocity_phi: f32,
    velocity_radius: f32,
    velocity_pan: Vec3,
}

impl Default for OrbitController {
    fn default() -> Self {
        Self {
            center: Vec3::ZERO,
            radius: 5.0,
            theta: std::f32::consts::FRAC_PI_2,
            phi: std::f32::consts::FRAC_PI_2,
            min_radius: 0.5,
            max_radius: 100.0,
            min_phi: 0.05,
            max_phi: std::f32::consts::PI - 0.05,
            rotate_speed: 0.0005,
            pan_speed: 0.0005,
            zoom_speed: 0.01,
            damping: 0.97,
            velocity_theta: 0.0,
            velocity_phi: 0.0,
            velocity_radius: 0.0,
            velocity_pan: Vec3::ZERO,
        }
    }
}

impl OrbitController {
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self {
            center,
            radius,
            ..Default::default()
        }
    }

    /// Starts orbiting from wherever `camera` currently is.
    pub fn from_camera(camera: &Camera, damping: f32) -> Self {
        let offset = camera.position - camera.target;
        let radius = offset.length().max(f32::EPSILON);
        let defaults = Self::default();

        Self {
            center: camera.target,
            radius,
            theta: offset.z.atan2(offset.x),
            phi: (offset.y / radius).clamp(-1.0, 1.0).acos().clamp(defaults.min_phi, defaults.max_phi),
            damping,
            ..defaults
        }
    }

    pub fn rotate(&mut self, delta_x: f32, delta_y: f32) {
        self.velocity_theta += delta_x * self.rotate_speed;
        self.velocity_phi -= delta_y * self.rotate_speed;
    }

    pub fn zoom(&mut self, delta: f32) {
        self.velocity_radius -= delta * self.zoom_speed * self.radius;
    }

    pub fn pan(&mut self, delta_x: f32, delta_y: f32) {
        let right = Vec3::new(-self.theta.sin(), 0.0, self.theta.cos());
        let up_dir = Vec3::new(
            -self.phi.cos() * self.theta.cos(),
            self.phi.sin(),
            -self.phi.cos() * self.theta.sin(),
        )
        .normalize();

        let pan_factor = self.pan_speed * self.radius;
        self.velocity_pan += right * delta_x * pan_factor + up_dir * delta_y * pan_factor;
    }

    pub fn update(&mut self) {
        self.theta += self.velocity_theta;
        self.phi = (self.phi + self.velocity_phi).clamp(self.min_phi, self.max_phi);
        self.radius = (self.radius + self.velocity_radius).clamp(self.min_radius, self.max_radius);
        self.center += self.velocity_pan;

        self.velocity_theta *= self.damping;
        self.velocity_phi *= self.damping;
        self.velocity_radius *= self.damping;
        self.velocity_pan *= self.damping;

        if self.velocity_theta.abs() < 0.00001 {
            self.velocity_theta = 0.0;
        }
        if self.velocity_phi.abs() < 0.00001 {
            self.velocity_phi = 0.0;
        }
        if self.velocity_radius.abs() < 0.00001 {
            self.velocity_radius = 0.0;
        }
        if self.velocity_pan.length_squared() < 0.0000001 {
            self.velocity_pan = Vec3::ZERO;
        }
    }

    pub fn is_moving(&self) -> bool {
        self.velocity_theta != 0.0
            || self.velocity_phi != 0.0
            || self.velocity_radius != 0.0
            || self.velocity_pan != Vec3::ZERO
    }

    pub fn camera_position(&self) -> Vec3 {
        let x = self.radius * self.phi.sin() * self.theta.cos();
        let y = self.radius * self.phi.cos();
        let z = self.radius * self.phi.sin() * self.theta.sin();
        self.center + Vec3::new(x, y, z)
    }

    pub fn update_camera(&self, camera: &mut Camera) {
        camera.position = self.camera_position();
        camera.target = self.center;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camera_uses_config_in_radians() {
        let camera = Camera::from_config(&CameraConfig::default(), 2.0);
        assert!((camera.fov - 75.0_f32.to_radians()).abs() < 1e-6);
        assert_eq!(camera.position, Vec3::new(0.0, 0.0, 5.0));
        assert_eq!(camera.aspect, 2.0);
    }

    #[test]
    fn orbit_from_camera_keeps_position() {
        let camera = Camera::default();
        let orbit = OrbitController::from_camera(&camera, 0.97);
        assert!((orbit.camera_position() - camera.position).length() < 1e-4);
    }

    #[test]
    fn orbit_velocity_decays() {
        let mut orbit = OrbitController::from_camera(&Camera::default(), 0.5);
        orbit.rotate(100.0, 0.0);
        let start = orbit.theta;

        orbit.update();
        let first_step = orbit.theta - start;
        orbit.update();
        let second_step = orbit.theta - start - first_step;

        assert!(first_step > 0.0);
        assert!((second_step - first_step * 0.5).abs() < 1e-6);

        for _ in 0..100 {
            orbit.update();
        }
        assert!(!orbit.is_moving());
    }

    #[test]
    fn zoom_is_clamped() {
        let mut orbit = OrbitController::from_camera(&Camera::default(), 0.0);
        orbit.zoom(1.0e6);
        orbit.update();
        assert_eq!(orbit.radius, orbit.min_radius);
    }
}
