use std::f32::consts::TAU;

use glam::{Quat, Vec3};
use rand::Rng;

use super::{SceneContent, SetupContext};
use crate::clock::FrameTime;
use crate::config::{SceneConfig, WormholeConfig};
use crate::error::Result;
use crate::math::{CatmullRomCurve, EulerRot, Transform};
use crate::render::MeshData;
use crate::scene::graph::{rgb, Fog, Material, RenderableProxy};
use crate::scene::session::Stage;

const TUBE_SEGMENTS: u32 = 222;
const TUBE_RADIUS: f32 = 0.65;
const TUBE_RADIAL_SEGMENTS: u32 = 16;
const BOX_SCATTER: f32 = 5.0;
const PATH_POINTS: usize = 16;

/// The closed path the camera flies along: a wobbling loop around the origin.
pub fn wormhole_path() -> CatmullRomCurve {
    let points = (0..PATH_POINTS)
        .map(|i| {
            let a = i as f32 / PATH_POINTS as f32 * TAU;
            let r = 8.0 + 2.0 * (3.0 * a).sin();
            Vec3::new(r * a.cos(), 1.5 * (2.0 * a).sin(), r * a.sin())
        })
        .collect();
    CatmullRomCurve::closed(points)
}

/// Position along the loop in `[0, 1)` after `elapsed` seconds.
pub(crate) fn flythrough_parameter(elapsed: f64, loop_seconds: f64) -> f32 {
    let loop_ms = loop_seconds * 1000.0;
    ((elapsed * 1000.0).rem_euclid(loop_ms) / loop_ms) as f32
}

/// Camera flythrough of a line-drawn tube scattered with wireframe boxes.
#[derive(Debug)]
pub struct WormholeScene {
    path: CatmullRomCurve,
    config: WormholeConfig,
}

impl WormholeScene {
    pub fn new(config: &SceneConfig, ctx: &mut SetupContext<'_>, stage: &mut Stage) -> Result<Self> {
        let wormhole = config.wormhole;
        let path = wormhole_path();

        let tube = ctx.upload_mesh(&MeshData::tube_edges(
            &path,
            TUBE_SEGMENTS,
            TUBE_RADIUS,
            TUBE_RADIAL_SEGMENTS,
        ))?;
        stage
            .graph
            .add(RenderableProxy::new(tube, Material::unlit(rgb(0x75c0ff))));

        let box_mesh = ctx.upload_mesh(&MeshData::box_edges(Vec3::splat(wormhole.box_size / 2.0)))?;
        let box_material = Material::unlit(rgb(0xe884ff));
        let mut rng = rand::thread_rng();
        for _ in 0..wormhole.box_count {
            let anchor = path.point_at(rng.gen());
            let offset = Vec3::new(rng.gen(), rng.gen(), rng.gen()) - Vec3::splat(0.5);
            let rotation = Quat::from_euler(
                EulerRot::XYZ,
                rng.gen_range(0.0..TAU),
                rng.gen_range(0.0..TAU),
                rng.gen_range(0.0..TAU),
            );
            let transform = Transform::from_position(anchor + offset * BOX_SCATTER * wormhole.box_size)
                .with_rotation(rotation);
            stage
                .graph
                .add(RenderableProxy::new(box_mesh, box_material).with_transform(transform));
        }

        stage.graph.set_fog(Fog {
            color: Vec3::ZERO,
            density: wormhole.fog_density,
        });

        let scene = Self {
            path,
            config: wormhole,
        };
        scene.place_camera(0.0, stage);
        Ok(scene)
    }

    pub fn path(&self) -> &CatmullRomCurve {
        &self.path
    }

    fn place_camera(&self, elapsed: f64, stage: &mut Stage) {
        let t = flythrough_parameter(elapsed, self.config.loop_seconds);
        stage.camera.position = self.path.point_at(t);
        stage.camera.look_at(self.path.point_at((t + self.config.look_ahead) % 1.0));
    }
}

impl SceneContent for WormholeScene {
    fn update(&mut self, time: &FrameTime, stage: &mut Stage) {
        self.place_camera(time.elapsed, stage);
    }
}
