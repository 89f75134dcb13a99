use glam::{Mat4, Vec3};

use super::host::GpuHandle;
use crate::math::Transform;

/// Converts a `0xRRGGBB` color to linear-ish float components.
pub fn rgb(hex: u32) -> Vec3 {
    Vec3::new(
        ((hex >> 16) & 0xff) as f32 / 255.0,
        ((hex >> 8) & 0xff) as f32 / 255.0,
        (hex & 0xff) as f32 / 255.0,
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProxyId(u32);

impl ProxyId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Blend {
    #[default]
    Opaque,
    Additive,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    pub color: Vec3,
    pub opacity: f32,
    /// Lit materials respond to scene lights; unlit ones show their color as is.
    pub lit: bool,
    pub blend: Blend,
    pub color_map: Option<GpuHandle>,
    pub alpha_map: Option<GpuHandle>,
    pub specular_map: Option<GpuHandle>,
    pub bump_map: Option<GpuHandle>,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            color: Vec3::ONE,
            opacity: 1.0,
            lit: true,
            blend: Blend::Opaque,
            color_map: None,
            alpha_map: None,
            specular_map: None,
            bump_map: None,
        }
    }
}

impl Material {
    pub fn lit(color: Vec3) -> Self {
        Self {
            color,
            ..Default::default()
        }
    }

    pub fn unlit(color: Vec3) -> Self {
        Self {
            color,
            lit: false,
            ..Default::default()
        }
    }

    pub fn additive(mut self) -> Self {
        self.blend = Blend::Additive;
        self
    }

    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity;
        self
    }

    pub fn with_color_map(mut self, map: Option<GpuHandle>) -> Self {
        self.color_map = map;
        self
    }

    pub fn with_alpha_map(mut self, map: Option<GpuHandle>) -> Self {
        self.alpha_map = map;
        self
    }

    pub fn with_specular_map(mut self, map: Option<GpuHandle>) -> Self {
        self.specular_map = map;
        self
    }

    pub fn with_bump_map(mut self, map: Option<GpuHandle>) -> Self {
        self.bump_map = map;
        self
    }

    pub fn textures(&self) -> [Option<GpuHandle>; 4] {
        [self.color_map, self.alpha_map, self.specular_map, self.bump_map]
    }
}

/// A drawable (or grouping) node of the scene.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderableProxy {
    pub mesh: Option<GpuHandle>,
    pub material: Material,
    pub transform: Transform,
    pub parent: Option<ProxyId>,
    pub visible: bool,
}

impl RenderableProxy {
    pub fn new(mesh: GpuHandle, material: Material) -> Self {
        Self {
            mesh: Some(mesh),
            material,
            transform: Transform::IDENTITY,
            parent: None,
            visible: true,
        }
    }

    /// A node without geometry whose transform applies to its children.
    pub fn group() -> Self {
        Self {
            mesh: None,
            material: Material::default(),
            transform: Transform::IDENTITY,
            parent: None,
            visible: true,
        }
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_parent(mut self, parent: ProxyId) -> Self {
        self.parent = Some(parent);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Light {
    Hemisphere {
        sky: Vec3,
        ground: Vec3,
        intensity: f32,
    },
    /// Shines from `position` toward the origin.
    Directional {
        position: Vec3,
        color: Vec3,
        intensity: f32,
    },
    Ambient {
        color: Vec3,
        intensity: f32,
    },
    /// Follows the world position of `attached_to`.
    Point {
        attached_to: ProxyId,
        color: Vec3,
        intensity: f32,
    },
    Spot {
        position: Vec3,
        target: Vec3,
        color: Vec3,
        intensity: f32,
        angle: f32,
    },
}

/// Exponential squared fog.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fog {
    pub color: Vec3,
    pub density: f32,
}

/// A proxy ready to draw: its resolved world matrix and the proxy itself.
#[derive(Debug, Clone, Copy)]
pub struct Drawable<'a> {
    pub id: ProxyId,
    pub world: Mat4,
    pub proxy: &'a RenderableProxy,
}

/// Proxies and lights owned by one scene session.
///
/// Parents are always added before their children, so a single forward pass
/// resolves every world transform.
#[derive(Debug, Default)]
pub struct SceneGraph {
    proxies: Vec<RenderableProxy>,
    lights: Vec<Light>,
    fog: Option<Fog>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, mut proxy: RenderableProxy) -> ProxyId {
        let id = ProxyId(self.proxies.len() as u32);
        if proxy.parent.is_some_and(|parent| parent.index() >= id.index()) {
            log::warn!("proxy {:?} has an unknown parent, attaching to root", id);
            proxy.parent = None;
        }
        self.proxies.push(proxy);
        id
    }

    pub fn get(&self, id: ProxyId) -> Option<&RenderableProxy> {
        self.proxies.get(id.index())
    }

    pub fn get_mut(&mut self, id: ProxyId) -> Option<&mut RenderableProxy> {
        self.proxies.get_mut(id.index())
    }

    pub fn set_position(&mut self, id: ProxyId, position: Vec3) {
        if let Some(proxy) = self.get_mut(id) {
            proxy.transform.position = position;
        }
    }

    pub fn len(&self) -> usize {
        self.proxies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proxies.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ProxyId, &RenderableProxy)> {
        self.proxies
            .iter()
            .enumerate()
            .map(|(i, proxy)| (ProxyId(i as u32), proxy))
    }

    /// World matrix of `id`: the parent chain applied to its local transform.
    pub fn world_matrix(&self, id: ProxyId) -> Option<Mat4> {
        let mut proxy = self.get(id)?;
        let mut matrix = proxy.transform.to_matrix();
        while let Some(parent) = proxy.parent {
            proxy = self.get(parent)?;
            matrix = proxy.transform.to_matrix() * matrix;
        }
        Some(matrix)
    }

    pub fn world_position(&self, id: ProxyId) -> Option<Vec3> {
        self.world_matrix(id).map(|m| m.w_axis.truncate())
    }

    /// Visible meshes with their world matrices. A hidden group hides its
    /// children.
    pub fn drawables(&self) -> Vec<Drawable<'_>> {
        let mut resolved: Vec<(Mat4, bool)> = Vec::with_capacity(self.proxies.len());
        let mut out = Vec::new();

        for (i, proxy) in self.proxies.iter().enumerate() {
            let local = proxy.transform.to_matrix();
            let (world, visible) = match proxy.parent.and_then(|p| resolved.get(p.index())) {
                Some(&(parent_world, parent_visible)) => {
                    (parent_world * local, parent_visible && proxy.visible)
                }
                None => (local, proxy.visible),
            };
            resolved.push((world, visible));

            if visible && proxy.mesh.is_some() {
                out.push(Drawable {
                    id: ProxyId(i as u32),
                    world,
                    proxy,
                });
            }
        }
        out
    }

    pub fn add_light(&mut self, light: Light) {
        self.lights.push(light);
    }

    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    pub fn set_fog(&mut self, fog: Fog) {
        self.fog = Some(fog);
    }

    pub fn fog(&self) -> Option<Fog> {
        self.fog
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::ResourceKind;

    fn mesh(id: u64) -> GpuHandle {
        GpuHandle::new(id, ResourceKind::Mesh)
    }

    #[test]
    fn child_inherits_parent_transform() {
        let mut graph = SceneGraph::new();
        let parent = graph.add(RenderableProxy::group().with_transform(Transform::from_position(Vec3::X)));
        let child = graph.add(
            RenderableProxy::new(mesh(1), Material::default())
                .with_transform(Transform::from_position(Vec3::Y))
                .with_parent(parent),
        );

        assert_eq!(graph.world_position(child), Some(Vec3::new(1.0, 1.0, 0.0)));
    }

    #[test]
    fn drawables_skip_groups_and_hidden_subtrees() {
        let mut graph = SceneGraph::new();
        let group = graph.add(RenderableProxy::group());
        graph.add(RenderableProxy::new(mesh(1), Material::default()).with_parent(group));
        let loose = graph.add(RenderableProxy::new(mesh(2), Material::default()));
        assert_eq!(graph.drawables().len(), 2);

        graph.get_mut(group).unwrap().visible = false;
        let drawables = graph.drawables();
        assert_eq!(drawables.len(), 1);
        assert_eq!(drawables[0].id, loose);
    }

    #[test]
    fn drawables_match_world_matrix() {
        let mut graph = SceneGraph::new();
        let group = graph.add(RenderableProxy::group().with_transform(Transform::from_scale(2.0)));
        let child = graph.add(
            RenderableProxy::new(mesh(1), Material::default())
                .with_transform(Transform::from_position(Vec3::Z))
                .with_parent(group),
        );

        let drawable = graph.drawables()[0];
        assert_eq!(Some(drawable.world), graph.world_matrix(child));
        assert_eq!(drawable.world.w_axis.truncate(), Vec3::new(0.0, 0.0, 2.0));
    }

    #[test]
    fn forward_parent_is_dropped() {
        let mut graph = SceneGraph::new();
        let id = graph.add(RenderableProxy::group().with_parent(ProxyId(5)));
        assert_eq!(graph.get(id).unwrap().parent, None);
    }

    #[test]
    fn hex_colors() {
        assert_eq!(rgb(0xffffff), Vec3::ONE);
        assert_eq!(rgb(0x000000), Vec3::ZERO);
        assert!((rgb(0x75c0ff).z - 1.0).abs() < 1e-6);
    }
}
