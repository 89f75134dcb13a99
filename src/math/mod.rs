//! Math utilities module
//!
//! Provides convenient re-exports from glam plus the transform and curve types
//! used by scene proxies.

mod spline;
mod transform;

pub use spline::CatmullRomCurve;
pub use transform::Transform;

// Re-export commonly used glam types
pub use glam::{EulerRot, Mat4, Quat, Vec2, Vec3, Vec4};
