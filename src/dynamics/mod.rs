//! Body simulation
//!
//! Point-mass bodies pulled back toward the scene center, plus one kinematic
//! repulsor that follows the pointer and pushes bodies aside through the
//! physics engine's contact response.

mod body;
mod simulation;

pub use body::{Body, Repulsor, SpawnRegion};
pub use simulation::{pointer_target, BodySimulation};
