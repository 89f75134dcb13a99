//! WebGPU rendering
//!
//! The GPU context and [`WgpuHost`] own device resources; [`SceneRenderer`]
//! draws the stage of a running scene session. Camera, mesh generation and the
//! viewport adapter are plain math and run without a device.

pub mod camera;
pub mod context;
pub mod gpu_host;
pub mod mesh;
pub mod renderer;
pub mod viewport;

pub use camera::{Camera, OrbitController};
pub use context::GpuContext;
pub use gpu_host::WgpuHost;
pub use mesh::{bone_transform, MeshData, Topology, Vertex};
pub use renderer::SceneRenderer;
pub use viewport::Viewport;
