use super::assets::AssetSource;
use crate::error::Result;
use crate::render::MeshData;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    RenderTarget,
    Mesh,
    Texture,
}

/// Opaque handle to a resource owned by the render host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GpuHandle {
    id: u64,
    kind: ResourceKind,
}

impl GpuHandle {
    pub fn new(id: u64, kind: ResourceKind) -> Self {
        Self { id, kind }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }
}

#[derive(Debug, Clone, Copy)]
pub enum ResourceRequest<'a> {
    /// Depth/color target matching the surface size.
    RenderTarget { width: u32, height: u32 },
    Mesh(&'a MeshData),
    Texture(&'a AssetSource),
}

impl ResourceRequest<'_> {
    pub fn kind(&self) -> ResourceKind {
        match self {
            ResourceRequest::RenderTarget { .. } => ResourceKind::RenderTarget,
            ResourceRequest::Mesh(_) => ResourceKind::Mesh,
            ResourceRequest::Texture(_) => ResourceKind::Texture,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(pub u64);

/// The graphics runtime a scene session allocates from.
///
/// Every handle returned by [`RenderHost::allocate`] is released exactly once
/// by the session that requested it.
pub trait RenderHost {
    /// Size of the attached render surface, `None` while there is none.
    fn surface_size(&self) -> Option<(u32, u32)>;
    fn allocate(&mut self, request: ResourceRequest<'_>) -> Result<GpuHandle>;
    fn resize_render_target(&mut self, target: GpuHandle, width: u32, height: u32);
    fn release(&mut self, handle: GpuHandle);
    /// Subscribes to window resize notifications.
    fn observe_resize(&mut self) -> ObserverId;
    fn unobserve_resize(&mut self, observer: ObserverId);
    /// Latest size delivered to `observer` since the previous call. `None`
    /// when the window did not change or the observer is not registered.
    fn take_resize(&mut self, observer: ObserverId) -> Option<(u32, u32)>;
}
