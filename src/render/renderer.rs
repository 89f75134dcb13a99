use std::collections::HashMap;

use glam::{Mat4, Vec3};

use super::context::GpuContext;
use super::gpu_host::{upload_rgba, GpuTexture, WgpuHost, DEPTH_FORMAT};
use super::mesh::{Topology, Vertex};
use crate::scene::{Blend, Drawable, GpuHandle, Light, Material, SceneGraph, SceneSession, Stage};

const MAX_LIGHTS: usize = 4;
const INITIAL_INSTANCES: usize = 256;

#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct Globals {
    view_proj: [[f32; 4]; 4],
    camera_pos: [f32; 4],
    hemi_sky: [f32; 4],
    hemi_ground: [f32; 4],
    ambient: [f32; 4],
    fog: [f32; 4],
    light_count: [u32; 4],
    light_position: [[f32; 4]; MAX_LIGHTS],
    light_color: [[f32; 4]; MAX_LIGHTS],
    light_direction: [[f32; 4]; MAX_LIGHTS],
}

impl Globals {
    fn from_stage(stage: &Stage) -> Self {
        let camera = &stage.camera;
        let mut globals = Self {
            view_proj: camera.view_projection().to_cols_array_2d(),
            camera_pos: camera.position.extend(1.0).to_array(),
            ..bytemuck::Zeroable::zeroed()
        };

        if let Some(fog) = stage.graph.fog() {
            globals.fog = fog.color.extend(fog.density).to_array();
        }

        let mut count = 0;
        for light in stage.graph.lights() {
            match *light {
                Light::Hemisphere { sky, ground, intensity } => {
                    globals.hemi_sky = add(globals.hemi_sky, sky * intensity);
                    globals.hemi_ground = add(globals.hemi_ground, ground * intensity);
                }
                Light::Ambient { color, intensity } => {
                    globals.ambient = add(globals.ambient, color * intensity);
                }
                _ if count >= MAX_LIGHTS => {
                    log::trace!("light limit reached, skipping {:?}", light);
                }
                Light::Directional { position, color, intensity } => {
                    globals.light_position[count] = position.extend(0.0).to_array();
                    globals.light_color[count] = (color * intensity).extend(0.0).to_array();
                    count += 1;
                }
                Light::Point { attached_to, color, intensity } => {
                    let Some(position) = stage.graph.world_position(attached_to) else {
                        continue;
                    };
                    globals.light_position[count] = position.extend(1.0).to_array();
                    globals.light_color[count] = (color * intensity).extend(0.0).to_array();
                    count += 1;
                }
                Light::Spot { position, target, color, intensity, angle } => {
                    globals.light_position[count] = position.extend(2.0).to_array();
                    globals.light_color[count] = (color * intensity).extend(angle.cos()).to_array();
                    globals.light_direction[count] = (target - position).extend(0.0).to_array();
                    count += 1;
                }
            }
        }
        globals.light_count[0] = count as u32;
        globals
    }
}

/// A missing or released map samples the white texel.
fn texture_view<'a>(host: &'a WgpuHost, white: &'a GpuTexture, slot: Option<GpuHandle>) -> &'a wgpu::TextureView {
    slot.and_then(|handle| host.texture(handle))
        .map_or(&white.view, |texture| &texture.view)
}

fn add(acc: [f32; 4], color: Vec3) -> [f32; 4] {
    [acc[0] + color.x, acc[1] + color.y, acc[2] + color.z, acc[3]]
}

#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct Instance {
    model: [[f32; 4]; 4],
    color: [f32; 4],
    flags: [f32; 4],
    extra: [f32; 4],
}

impl Instance {
    const ATTRIBUTES: [wgpu::VertexAttribute; 7] = wgpu::vertex_attr_array![
        2 => Float32x4,
        3 => Float32x4,
        4 => Float32x4,
        5 => Float32x4,
        6 => Float32x4,
        7 => Float32x4,
        8 => Float32x4,
    ];

    const LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<Instance>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Instance,
        attributes: &Self::ATTRIBUTES,
    };

    fn new(world: Mat4, material: &Material) -> Self {
        let flag = |on: bool| if on { 1.0 } else { 0.0 };
        Self {
            model: world.to_cols_array_2d(),
            color: material.color.extend(material.opacity).to_array(),
            flags: [
                flag(material.lit),
                flag(material.color_map.is_some()),
                flag(material.alpha_map.is_some()),
                flag(material.specular_map.is_some()),
            ],
            extra: [flag(material.bump_map.is_some()), 0.0, 0.0, 0.0],
        }
    }
}

/// Draw passes in submission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Pass {
    Opaque,
    Translucent,
    Additive,
}

impl Pass {
    fn of(material: &Material) -> Self {
        match material.blend {
            Blend::Additive => Pass::Additive,
            Blend::Opaque if material.opacity < 1.0 => Pass::Translucent,
            Blend::Opaque => Pass::Opaque,
        }
    }
}

type TextureKey = [Option<GpuHandle>; 4];

struct DrawCall {
    pass: Pass,
    mesh: GpuHandle,
    textures: TextureKey,
}

/// Draws the stage of a scene session.
pub struct SceneRenderer {
    globals_buffer: wgpu::Buffer,
    globals_bind_group: wgpu::BindGroup,
    texture_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    white: GpuTexture,
    texture_groups: HashMap<TextureKey, wgpu::BindGroup>,
    instance_buffer: wgpu::Buffer,
    instance_capacity: usize,
    triangles: wgpu::RenderPipeline,
    blended: wgpu::RenderPipeline,
    additive: wgpu::RenderPipeline,
    lines: wgpu::RenderPipeline,
    points: wgpu::RenderPipeline,
}

impl SceneRenderer {
    pub fn new(context: &GpuContext) -> Self {
        let device = &context.device;
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("scene shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shader.wgsl").into()),
        });

        let globals_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("globals layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let texture_entry = |binding: u32| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        };
        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("material textures layout"),
            entries: &[
                texture_entry(0),
                texture_entry(1),
                texture_entry(2),
                texture_entry(3),
                wgpu::BindGroupLayoutEntry {
                    binding: 4,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let globals_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("globals buffer"),
            size: std::mem::size_of::<Globals>() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let globals_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("globals bind group"),
            layout: &globals_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: globals_buffer.as_entire_binding(),
            }],
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("material sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        let white = upload_rgba(context, "white texel", 1, 1, &[255, 255, 255, 255]);

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("scene pipeline layout"),
            bind_group_layouts: &[&globals_layout, &texture_layout],
            push_constant_ranges: &[],
        });

        let build = |label: &str, topology: wgpu::PrimitiveTopology, blend: wgpu::BlendState, depth_write: bool| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(&layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_main"),
                    buffers: &[Vertex::LAYOUT, Instance::LAYOUT],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some("fs_main"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: context.config.format,
                        blend: Some(blend),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: DEPTH_FORMAT,
                    depth_write_enabled: depth_write,
                    depth_compare: wgpu::CompareFunction::LessEqual,
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        };

        let additive_blend = wgpu::BlendState {
            color: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::SrcAlpha,
                dst_factor: wgpu::BlendFactor::One,
                operation: wgpu::BlendOperation::Add,
            },
            alpha: wgpu::BlendComponent::OVER,
        };

        let triangles = build(
            "triangles pipeline",
            wgpu::PrimitiveTopology::TriangleList,
            wgpu::BlendState::REPLACE,
            true,
        );
        let blended = build(
            "translucent pipeline",
            wgpu::PrimitiveTopology::TriangleList,
            wgpu::BlendState::ALPHA_BLENDING,
            false,
        );
        let additive = build(
            "additive pipeline",
            wgpu::PrimitiveTopology::TriangleList,
            additive_blend,
            false,
        );
        let lines = build(
            "lines pipeline",
            wgpu::PrimitiveTopology::LineList,
            wgpu::BlendState::ALPHA_BLENDING,
            true,
        );
        let points = build(
            "points pipeline",
            wgpu::PrimitiveTopology::PointList,
            wgpu::BlendState::ALPHA_BLENDING,
            true,
        );

        let instance_buffer = Self::create_instance_buffer(device, INITIAL_INSTANCES);

        Self {
            globals_buffer,
            globals_bind_group,
            texture_layout,
            sampler,
            white,
            texture_groups: HashMap::new(),
            instance_buffer,
            instance_capacity: INITIAL_INSTANCES,
            triangles,
            blended,
            additive,
            lines,
            points,
        }
    }

    fn create_instance_buffer(device: &wgpu::Device, capacity: usize) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("instance buffer"),
            size: (capacity * std::mem::size_of::<Instance>()) as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    fn texture_group(&mut self, device: &wgpu::Device, host: &WgpuHost, key: TextureKey) {
        let Self {
            texture_groups,
            texture_layout,
            sampler,
            white,
            ..
        } = self;

        texture_groups.entry(key).or_insert_with(|| {
            let view = |slot: usize| {
                wgpu::BindingResource::TextureView(texture_view(host, white, key[slot]))
            };
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("material textures"),
                layout: texture_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: view(0),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: view(1),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: view(2),
                    },
                    wgpu::BindGroupEntry {
                        binding: 3,
                        resource: view(3),
                    },
                    wgpu::BindGroupEntry {
                        binding: 4,
                        resource: wgpu::BindingResource::Sampler(sampler),
                    },
                ],
            })
        });
    }

    /// Drops bind groups that reference released textures.
    fn prune_texture_groups(&mut self, host: &WgpuHost) {
        self.texture_groups
            .retain(|key, _| key.iter().flatten().all(|&handle| host.is_live(handle)));
    }

    fn collect(graph: &SceneGraph) -> (Vec<Instance>, Vec<DrawCall>) {
        let mut drawables: Vec<Drawable<'_>> = graph.drawables();
        drawables.sort_by_key(|d| Pass::of(&d.proxy.material));

        let mut instances = Vec::with_capacity(drawables.len());
        let mut calls = Vec::with_capacity(drawables.len());
        for drawable in drawables {
            let Some(mesh) = drawable.proxy.mesh else {
                continue;
            };
            let material = &drawable.proxy.material;
            instances.push(Instance::new(drawable.world, material));
            calls.push(DrawCall {
                pass: Pass::of(material),
                mesh,
                textures: material.textures(),
            });
        }
        (instances, calls)
    }

    /// Records and submits one frame of `session` into `view`.
    pub fn render(&mut self, host: &WgpuHost, session: &SceneSession, view: &wgpu::TextureView) {
        let Some(context) = host.context() else {
            return;
        };
        let Some(depth) = host.depth_target(session.render_target()) else {
            log::warn!("session render target {:?} is not live", session.render_target());
            return;
        };

        let (globals, instances, calls) = {
            let stage = session.stage();
            let (instances, calls) = Self::collect(&stage.graph);
            (Globals::from_stage(&stage), instances, calls)
        };

        self.prune_texture_groups(host);
        for call in &calls {
            self.texture_group(&context.device, host, call.textures);
        }

        if instances.len() > self.instance_capacity {
            self.instance_capacity = instances.len().next_power_of_two();
            self.instance_buffer = Self::create_instance_buffer(&context.device, self.instance_capacity);
        }
        context
            .queue
            .write_buffer(&self.globals_buffer, 0, bytemuck::bytes_of(&globals));
        context
            .queue
            .write_buffer(&self.instance_buffer, 0, bytemuck::cast_slice(&instances));

        let mut encoder = context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("scene encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("scene pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &depth.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            render_pass.set_bind_group(0, &self.globals_bind_group, &[]);
            render_pass.set_vertex_buffer(1, self.instance_buffer.slice(..));

            for (i, call) in calls.iter().enumerate() {
                let Some(mesh) = host.mesh(call.mesh) else {
                    continue;
                };
                let Some(group) = self.texture_groups.get(&call.textures) else {
                    continue;
                };
                let pipeline = match (mesh.topology, call.pass) {
                    (Topology::Lines, _) => &self.lines,
                    (Topology::Points, _) => &self.points,
                    (Topology::Triangles, Pass::Opaque) => &self.triangles,
                    (Topology::Triangles, Pass::Translucent) => &self.blended,
                    (Topology::Triangles, Pass::Additive) => &self.additive,
                };

                let instance = i as u32;
                render_pass.set_pipeline(pipeline);
                render_pass.set_bind_group(1, group, &[]);
                render_pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                render_pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                render_pass.draw_indexed(0..mesh.index_count, 0, instance..instance + 1);
            }
        }

        context.queue.submit(std::iter::once(encoder.finish()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CameraConfig;
    use crate::render::Camera;
    use crate::scene::{rgb, Fog, RenderableProxy, ResourceKind};

    fn stage() -> Stage {
        Stage::new(Camera::from_config(&CameraConfig::default(), 1.5))
    }

    #[test]
    fn globals_layout_matches_shader() {
        assert_eq!(std::mem::size_of::<Globals>(), 352);
        assert_eq!(std::mem::size_of::<Instance>(), 112);
    }

    #[test]
    fn hemisphere_and_ambient_accumulate() {
        let mut stage = stage();
        stage.graph.add_light(Light::Hemisphere {
            sky: Vec3::ONE,
            ground: Vec3::ZERO,
            intensity: 0.5,
        });
        stage.graph.add_light(Light::Ambient {
            color: Vec3::ONE,
            intensity: 0.25,
        });

        let globals = Globals::from_stage(&stage);
        assert_eq!(globals.hemi_sky[..3], [0.5, 0.5, 0.5]);
        assert_eq!(globals.ambient[..3], [0.25, 0.25, 0.25]);
        assert_eq!(globals.light_count[0], 0);
    }

    #[test]
    fn point_light_tracks_proxy() {
        let mut stage = stage();
        let mesh = GpuHandle::new(1, ResourceKind::Mesh);
        let id = stage.graph.add(RenderableProxy::new(mesh, Material::unlit(Vec3::ONE)));
        stage.graph.set_position(id, Vec3::new(1.0, 2.0, 3.0));
        stage.graph.add_light(Light::Point {
            attached_to: id,
            color: Vec3::ONE,
            intensity: 2.0,
        });

        let globals = Globals::from_stage(&stage);
        assert_eq!(globals.light_count[0], 1);
        assert_eq!(globals.light_position[0], [1.0, 2.0, 3.0, 1.0]);
        assert_eq!(globals.light_color[0][..3], [2.0, 2.0, 2.0]);
    }

    #[test]
    fn lights_beyond_limit_are_dropped() {
        let mut stage = stage();
        for _ in 0..MAX_LIGHTS + 2 {
            stage.graph.add_light(Light::Directional {
                position: Vec3::Y,
                color: Vec3::ONE,
                intensity: 1.0,
            });
        }
        let globals = Globals::from_stage(&stage);
        assert_eq!(globals.light_count[0], MAX_LIGHTS as u32);
    }

    #[test]
    fn fog_is_packed_with_density() {
        let mut stage = stage();
        stage.graph.set_fog(Fog {
            color: rgb(0x000000),
            density: 0.3,
        });
        assert_eq!(Globals::from_stage(&stage).fog, [0.0, 0.0, 0.0, 0.3]);
    }

    #[test]
    fn draw_calls_sorted_by_pass() {
        let mut graph = SceneGraph::new();
        let mesh = GpuHandle::new(1, ResourceKind::Mesh);
        graph.add(RenderableProxy::new(mesh, Material::unlit(Vec3::ONE).additive()));
        graph.add(RenderableProxy::new(mesh, Material::lit(Vec3::ONE).with_opacity(0.5)));
        graph.add(RenderableProxy::new(mesh, Material::lit(Vec3::ONE)));
        graph.add(RenderableProxy::group());

        let (instances, calls) = SceneRenderer::collect(&graph);
        assert_eq!(instances.len(), 3);
        let passes: Vec<Pass> = calls.iter().map(|c| c.pass).collect();
        assert_eq!(passes, vec![Pass::Opaque, Pass::Translucent, Pass::Additive]);
        assert_eq!(instances[1].color[3], 0.5);
    }
}
