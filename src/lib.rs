//! # scene-demos
//!
//! A small collection of real-time 3D demos sharing one scene lifecycle core,
//! rendered with WebGPU.
//!
//! ## Features
//! - Scene sessions that allocate, run and release everything a demo needs
//! - Frame clock driving per-frame callbacks from host refresh notifications
//! - Procedural body simulation on Rapier with a pointer-driven repulsor
//! - Five demos: a posed model, a spinning primitive, a planet, a wormhole
//!   flythrough and the physics playground
//! - Cross-platform: Native + WASM support
//!
//! ## Example
//! ```rust,ignore
//! use scene_demos::{ModeSwitcher, SceneConfig, SceneEnv, SceneMode};
//!
//! let mut switcher = ModeSwitcher::new(SceneConfig::default());
//! let mut env = SceneEnv::new(&mut host, &assets, &mut physics);
//! switcher.select(SceneMode::Physics, &mut env)?;
//!
//! // every host refresh
//! switcher.controller_mut().frame(now_ms);
//! ```

pub mod clock;
pub mod config;
pub mod dynamics;
pub mod error;
pub mod math;
pub mod physics;
pub mod render;
pub mod scene;

#[cfg(target_arch = "wasm32")]
pub mod web;

pub use clock::{FrameClock, FrameHandle, FrameTime};
pub use config::{CameraConfig, PlanetConfig, SceneConfig, SimulationConfig, WormholeConfig};
pub use dynamics::{Body, BodySimulation, Repulsor};
pub use error::{Result, SceneError};
pub use math::{CatmullRomCurve, Transform};
pub use physics::{PhysicsBackend, PhysicsWorld, RapierBackend, RapierWorld};
pub use scene::{
    AnimationClip, AssetKey, AssetResolver, AssetSource, DirectoryAssets, ModeSwitcher, RenderHost, SceneController,
    SceneEnv, SceneMode, SceneSession, StartOutcome,
};
