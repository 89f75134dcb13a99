use std::collections::HashMap;

use wgpu::util::DeviceExt;

use super::context::GpuContext;
use super::mesh::{MeshData, Topology};
use crate::error::{Result, SceneError};
use crate::scene::{AssetSource, GpuHandle, ObserverId, RenderHost, ResourceKind, ResourceRequest};

pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

pub struct GpuMesh {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
    pub topology: Topology,
}

pub struct GpuTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

/// [`RenderHost`] backed by a wgpu device.
///
/// The context is attached once the window and device exist; until then the
/// host reports no surface and scene sessions decline to start.
#[derive(Default)]
pub struct WgpuHost {
    context: Option<GpuContext>,
    next_id: u64,
    meshes: HashMap<u64, GpuMesh>,
    textures: HashMap<u64, GpuTexture>,
    depth_targets: HashMap<u64, GpuTexture>,
    next_observer: u64,
    observers: Vec<(ObserverId, Option<(u32, u32)>)>,
}

impl WgpuHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&mut self, context: GpuContext) {
        self.context = Some(context);
    }

    pub fn context(&self) -> Option<&GpuContext> {
        self.context.as_ref()
    }

    pub fn mesh(&self, handle: GpuHandle) -> Option<&GpuMesh> {
        self.meshes.get(&handle.id())
    }

    pub fn texture(&self, handle: GpuHandle) -> Option<&GpuTexture> {
        self.textures.get(&handle.id())
    }

    pub fn depth_target(&self, handle: GpuHandle) -> Option<&GpuTexture> {
        self.depth_targets.get(&handle.id())
    }

    pub fn is_live(&self, handle: GpuHandle) -> bool {
        match handle.kind() {
            ResourceKind::Mesh => self.meshes.contains_key(&handle.id()),
            ResourceKind::Texture => self.textures.contains_key(&handle.id()),
            ResourceKind::RenderTarget => self.depth_targets.contains_key(&handle.id()),
        }
    }

    /// Handles currently allocated, for leak checks.
    pub fn live_resources(&self) -> usize {
        self.meshes.len() + self.textures.len() + self.depth_targets.len()
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Window resize: reconfigures the surface and queues the new size for
    /// every registered observer.
    pub fn notify_resize(&mut self, width: u32, height: u32) {
        if let Some(context) = self.context.as_mut() {
            context.resize(winit::dpi::PhysicalSize::new(width, height));
        }
        for (_, pending) in &mut self.observers {
            *pending = Some((width, height));
        }
    }

    fn device(&self) -> Result<&GpuContext> {
        self.context
            .as_ref()
            .ok_or_else(|| SceneError::Gpu("no device attached".to_string()))
    }

    fn next_handle(&mut self, kind: ResourceKind) -> GpuHandle {
        self.next_id += 1;
        GpuHandle::new(self.next_id, kind)
    }

    fn create_mesh(context: &GpuContext, mesh: &MeshData) -> GpuMesh {
        let vertex_buffer = context
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("mesh vertices"),
                contents: bytemuck::cast_slice(&mesh.vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
        let index_buffer = context
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("mesh indices"),
                contents: bytemuck::cast_slice(&mesh.indices),
                usage: wgpu::BufferUsages::INDEX,
            });

        GpuMesh {
            vertex_buffer,
            index_buffer,
            index_count: mesh.index_count(),
            topology: mesh.topology,
        }
    }

    fn create_depth_target(context: &GpuContext, width: u32, height: u32) -> GpuTexture {
        let texture = context.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("depth target"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        GpuTexture { texture, view }
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn create_texture(context: &GpuContext, source: &AssetSource) -> Result<GpuTexture> {
        let image = image::open(&source.path)
            .map_err(|e| SceneError::Asset {
                key: source.key,
                reason: e.to_string(),
            })?
            .to_rgba8();
        let (width, height) = image.dimensions();

        Ok(upload_rgba(context, "asset texture", width, height, image.as_raw()))
    }

    #[cfg(target_arch = "wasm32")]
    fn create_texture(_context: &GpuContext, source: &AssetSource) -> Result<GpuTexture> {
        Err(SceneError::Asset {
            key: source.key,
            reason: "texture decoding is not available in the browser build".to_string(),
        })
    }
}

/// Uploads tightly packed RGBA8 pixels as a sampled texture.
pub fn upload_rgba(context: &GpuContext, label: &str, width: u32, height: u32, pixels: &[u8]) -> GpuTexture {
    let texture = context.device.create_texture_with_data(
        &context.queue,
        &wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        },
        wgpu::util::TextureDataOrder::LayerMajor,
        pixels,
    );
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    GpuTexture { texture, view }
}

impl RenderHost for WgpuHost {
    fn surface_size(&self) -> Option<(u32, u32)> {
        self.context
            .as_ref()
            .map(|context| (context.config.width, context.config.height))
    }

    fn allocate(&mut self, request: ResourceRequest<'_>) -> Result<GpuHandle> {
        let context = self.device()?;
        match request {
            ResourceRequest::RenderTarget { width, height } => {
                let target = Self::create_depth_target(context, width, height);
                let handle = self.next_handle(ResourceKind::RenderTarget);
                self.depth_targets.insert(handle.id(), target);
                Ok(handle)
            }
            ResourceRequest::Mesh(mesh) => {
                let mesh = Self::create_mesh(context, mesh);
                let handle = self.next_handle(ResourceKind::Mesh);
                self.meshes.insert(handle.id(), mesh);
                Ok(handle)
            }
            ResourceRequest::Texture(source) => {
                let texture = Self::create_texture(context, source)?;
                let handle = self.next_handle(ResourceKind::Texture);
                self.textures.insert(handle.id(), texture);
                Ok(handle)
            }
        }
    }

    fn resize_render_target(&mut self, target: GpuHandle, width: u32, height: u32) {
        let Some(context) = self.context.as_ref() else {
            return;
        };
        if let Some(slot) = self.depth_targets.get_mut(&target.id()) {
            slot.texture.destroy();
            *slot = Self::create_depth_target(context, width, height);
        }
    }

    fn release(&mut self, handle: GpuHandle) {
        let id = handle.id();
        let released = match handle.kind() {
            ResourceKind::Mesh => self.meshes.remove(&id).map(|mesh| {
                mesh.vertex_buffer.destroy();
                mesh.index_buffer.destroy();
            }),
            ResourceKind::Texture => self.textures.remove(&id).map(|t| t.texture.destroy()),
            ResourceKind::RenderTarget => self.depth_targets.remove(&id).map(|t| t.texture.destroy()),
        };
        if released.is_none() {
            log::warn!("release of unknown handle {:?}", handle);
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
