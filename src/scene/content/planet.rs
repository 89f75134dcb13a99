use glam::{Quat, Vec3};

use super::{SceneContent, SetupContext};
use crate::clock::FrameTime;
use crate::config::{PlanetConfig, SceneConfig};
use crate::error::Result;
use crate::math::Transform;
use crate::render::{MeshData, OrbitController};
use crate::scene::assets::AssetKey;
use crate::scene::graph::{rgb, Light, Material, ProxyId, RenderableProxy};
use crate::scene::session::Stage;

const CLOUD_SCALE: f32 = 1.003;
const GLOW_SCALE: f32 = 1.01;
const STAR_SHELL: (f32, f32) = (25.0, 50.0);

/// Textured planet with night lights, a cloud layer, a glow shell and a
/// starfield.
#[derive(Debug)]
pub struct PlanetScene {
    group: ProxyId,
    clouds: ProxyId,
    stars: ProxyId,
    config: PlanetConfig,
}

impl PlanetScene {
    pub fn new(config: &SceneConfig, ctx: &mut SetupContext<'_>, stage: &mut Stage) -> Result<Self> {
        let planet = config.planet;

        let sphere = ctx.upload_mesh(&MeshData::icosahedron(1.0, planet.detail))?;
        let stars_mesh = ctx.upload_mesh(&MeshData::star_shell(
            planet.star_count,
            STAR_SHELL.0,
            STAR_SHELL.1,
            &mut rand::thread_rng(),
        ))?;

        let color = ctx.load_texture(AssetKey::PlanetColor);
        let specular = ctx.load_texture(AssetKey::PlanetSpecular);
        let bump = ctx.load_texture(AssetKey::PlanetBump);
        let night = ctx.load_texture(AssetKey::PlanetNightLights);
        let clouds = ctx.load_texture(AssetKey::PlanetClouds);
        let cloud_alpha = ctx.load_texture(AssetKey::PlanetCloudAlpha);

        let tilt = Quat::from_rotation_z(-planet.axial_tilt_degrees.to_radians());
        let group = stage
            .graph
            .add(RenderableProxy::group().with_transform(Transform::IDENTITY.with_rotation(tilt)));

        stage.graph.add(
            RenderableProxy::new(
                sphere,
                Material::lit(Vec3::ONE)
                    .with_color_map(color)
                    .with_specular_map(specular)
                    .with_bump_map(bump),
            )
            .with_parent(group),
        );

        // Without the texture the layer would wash the planet out.
        if night.is_some() {
            stage.graph.add(
                RenderableProxy::new(sphere, Material::unlit(Vec3::ONE).additive().with_color_map(night))
                    .with_parent(group),
            );
        }

        let cloud_layer = RenderableProxy::new(
            sphere,
            Material::unlit(Vec3::ONE)
                .additive()
                .with_opacity(0.8)
                .with_color_map(clouds)
                .with_alpha_map(cloud_alpha),
        )
        .with_transform(Transform::from_scale(CLOUD_SCALE))
        .with_parent(group);
        let clouds = stage.graph.add(cloud_layer);
        if let Some(proxy) = stage.graph.get_mut(clouds) {
            proxy.visible = proxy.material.color_map.is_some();
        }

        stage.graph.add(
            RenderableProxy::new(sphere, Material::unlit(rgb(0x0088ff)).additive().with_opacity(0.15))
                .with_transform(Transform::from_scale(GLOW_SCALE))
                .with_parent(group),
        );

        let stars = stage
            .graph
            .add(RenderableProxy::new(stars_mesh, Material::unlit(Vec3::ONE)));

        stage.graph.add_light(Light::Directional {
            position: Vec3::new(-2.0, 0.5, 1.5),
            color: Vec3::ONE,
            intensity: 2.0,
        });
        stage.orbit = Some(OrbitController::from_camera(&stage.camera, config.orbit_damping));

        Ok(Self {
            group,
            clouds,
            stars,
            config: planet,
        })
    }
}

impl SceneContent for PlanetScene {
    fn update(&mut self, time: &FrameTime, stage: &mut Stage) {
        let angle = time.elapsed as f32 * self.config.rotation_speed;
        let tilt = Quat::from_rotation_z(-self.config.axial_tilt_degrees.to_radians());

        if let Some(group) = stage.graph.get_mut(self.group) {
            group.transform.rotation = tilt * Quat::from_rotation_y(angle);
        }
        // Clouds drift a little faster than the surface; stars turn the other way.
        if let Some(clouds) = stage.graph.get_mut(self.clouds) {
            clouds.transform.rotation = Quat::from_rotation_y(angle * 0.1);
        }
        if let Some(stars) = stage.graph.get_mut(self.stars) {
            stars.transform.rotation = Quat::from_rotation_y(-angle * 0.1);
        }
    }
}
