//! In-memory collaborators for exercising the scene lifecycle without a GPU.

use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;

use glam::Vec3;

use super::assets::{AnimationClip, AssetKey, AssetResolver, AssetSource};
use super::host::{GpuHandle, ObserverId, RenderHost, ResourceKind, ResourceRequest};
use crate::error::{Result, SceneError};
use crate::physics::{BodyKind, PhysicsBackend, PhysicsWorld, RapierWorld, RigidBodyHandle};

/// Render host that hands out numbered handles and counts every call.
#[derive(Debug, Default)]
pub struct CountingHost {
    surface: Option<(u32, u32)>,
    next_id: u64,
    live: HashMap<GpuHandle, Option<(u32, u32)>>,
    pub allocations: usize,
    pub releases: usize,
    /// Releases of handles that were not live.
    pub stray_releases: usize,
    next_observer: u64,
    observers: Vec<(ObserverId, Option<(u32, u32)>)>,
    fail_textures: bool,
}

impl CountingHost {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            surface: Some((width, height)),
            ..Default::default()
        }
    }

    pub fn without_surface() -> Self {
        Self::default()
    }

    pub fn with_failing_textures(mut self) -> Self {
        self.fail_textures = true;
        self
    }

    pub fn attach_surface(&mut self, width: u32, height: u32) {
        self.surface = Some((width, height));
    }

    /// Window resize, queued for every registered observer.
    pub fn notify_resize(&mut self, width: u32, height: u32) {
        self.surface = Some((width, height));
        for (_, pending) in &mut self.observers {
            *pending = Some((width, height));
        }
    }

    pub fn outstanding(&self) -> usize {
        self.live.len()
    }

    pub fn outstanding_of(&self, kind: ResourceKind) -> usize {
        self.live.keys().filter(|h| h.kind() == kind).count()
    }

    pub fn is_live(&self, handle: GpuHandle) -> bool {
        self.live.contains_key(&handle)
    }

    pub fn target_size(&self, handle: GpuHandle) -> Option<(u32, u32)> {
        self.live.get(&handle).copied().flatten()
    }

    pub fn observers(&self) -> usize {
        self.observers.len()
    }
}

impl RenderHost for CountingHost {
    fn surface_size(&self) -> Option<(u32, u32)> {
        self.surface
    }

    fn allocate(&mut self, request: ResourceRequest<'_>) -> Result<GpuHandle> {
        let size = match request {
            ResourceRequest::Texture(source) if self.fail_textures => {
                return Err(SceneError::Asset {
                    key: source.key,
                    reason: "decode failed".to_string(),
                });
            }
            ResourceRequest::RenderTarget { width, height } => Some((width, height)),
            _ => None,
        };

        self.next_id += 1;
        let handle = GpuHandle::new(self.next_id, request.kind());
        self.live.insert(handle, size);
        self.allocations += 1;
        Ok(handle)
    }

    fn resize_render_target(&mut self, target: GpuHandle, width: u32, height: u32) {
        if let Some(size) = self.live.get_mut(&target) {
            *size = Some((width, height));
        }
    }

    fn release(&mut self, handle: GpuHandle) {
        if self.live.remove(&handle).is_some() {
            self.releases += 1;
        } else {
            self.stray_releases += 1;
        }
    }

    fn observe_resize(&mut self) -> ObserverId {
        self.next_observer += 1;
        let id = ObserverId(self.next_observer);
        self.observers.push((id, None));
        id
    }

    fn unobserve_resize(&mut self, observer: ObserverId) {
        self.observers.retain(|&(o, _)| o != observer);
    }

    fn take_resize(&mut self, observer: ObserverId) -> Option<(u32, u32)> {
        self.observers
            .iter_mut()
            .find(|(o, _)| *o == observer)
            .and_then(|(_, pending)| pending.take())
    }
}

/// Physics backend that tracks how many of its worlds are still alive.
#[derive(Debug, Default)]
pub struct TrackingBackend {
    live: Rc<Cell<usize>>,
    pub created: usize,
}

impl TrackingBackend {
    pub fn live_worlds(&self) -> usize {
        self.live.get()
    }
}

impl PhysicsBackend for TrackingBackend {
    fn create_world(&mut self, gravity: Vec3) -> Result<Box<dyn PhysicsWorld>> {
        self.created += 1;
        self.live.set(self.live.get() + 1);
        Ok(Box::new(TrackedWorld {
            inner: RapierWorld::new(gravity),
            live: self.live.clone(),
        }))
    }
}

struct TrackedWorld {
    inner: RapierWorld,
    live: Rc<Cell<usize>>,
}

impl Drop for TrackedWorld {
    fn drop(&mut self) {
        self.live.set(self.live.get() - 1);
    }
}

impl PhysicsWorld for TrackedWorld {
    fn create_body(&mut self, kind: BodyKind, translation: Vec3) -> RigidBodyHandle {
        self.inner.create_body(kind, translation)
    }

    fn attach_ball(&mut self, body: RigidBodyHandle, radius: f32, density: f32) {
        self.inner.attach_ball(body, radius, density)
    }

    fn remove_body(&mut self, body: RigidBodyHandle) {
        self.inner.remove_body(body)
    }

    fn reset_forces(&mut self, body: RigidBodyHandle) {
        self.inner.reset_forces(body)
    }

    fn add_force(&mut self, body: RigidBodyHandle, force: Vec3) {
        self.inner.add_force(body, force)
    }

    fn set_translation(&mut self, body: RigidBodyHandle, translation: Vec3) {
        self.inner.set_translation(body, translation)
    }

    fn translation(&self, body: RigidBodyHandle) -> Option<Vec3> {
        self.inner.translation(body)
    }

    fn step(&mut self) {
        self.inner.step()
    }

    fn body_count(&self) -> usize {
        self.inner.body_count()
    }
}

/// Physics backend whose engine never initializes.
#[derive(Debug, Default)]
pub struct FailingBackend;

impl PhysicsBackend for FailingBackend {
    fn create_world(&mut self, _gravity: Vec3) -> Result<Box<dyn PhysicsWorld>> {
        Err(SceneError::Physics("engine module failed to load".to_string()))
    }
}

/// Asset resolver backed by a map; unknown keys fail.
#[derive(Debug, Default)]
pub struct MapAssets {
    sources: HashMap<AssetKey, AssetSource>,
}

impl MapAssets {
    /// Every key resolves.
    pub fn complete() -> Self {
        let sources = AssetKey::ALL
            .iter()
            .map(|&key| {
                let source = AssetSource::new(key, key.relative_path());
                let source = if key == AssetKey::RiggedModel {
                    source.with_clips([AnimationClip::new("Animation", 2.0)])
                } else {
                    source
                };
                (key, source)
            })
            .collect();
        Self { sources }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_source(mut self, source: AssetSource) -> Self {
        self.sources.insert(source.key, source);
        self
    }

    pub fn without(mut self, key: AssetKey) -> Self {
        self.sources.remove(&key);
        self
    }
}

impl AssetResolver for MapAssets {
    fn resolve(&self, key: AssetKey) -> Result<AssetSource> {
        self.sources.get(&key).cloned().ok_or_else(|| SceneError::Asset {
            key,
            reason: "not registered".to_string(),
        })
    }
}
