use std::f32::consts::TAU;

use glam::{Quat, Vec3};

use super::{SceneContent, SetupContext};
use crate::clock::FrameTime;
use crate::config::SceneConfig;
use crate::error::Result;
use crate::math::Transform;
use crate::render::{bone_transform, MeshData, OrbitController};
use crate::scene::assets::AssetKey;
use crate::scene::graph::{rgb, Light, Material, ProxyId, RenderableProxy};
use crate::scene::session::Stage;

const CLIP_NAME: &str = "Animation";
const BONE_THICKNESS: f32 = 0.06;
const HEAD_RADIUS: f32 = 0.18;

/// Playback state of one looping animation clip.
#[derive(Debug, Clone, PartialEq)]
pub struct ClipPlayer {
    name: String,
    duration: f32,
    time: f32,
    paused: bool,
}

impl ClipPlayer {
    pub fn new(name: impl Into<String>, duration: f32) -> Self {
        Self {
            name: name.into(),
            duration,
            time: 0.0,
            paused: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn duration(&self) -> f32 {
        self.duration
    }

    /// Position within the loop in `[0, 1)`.
    pub fn phase(&self) -> f32 {
        if self.duration > 0.0 {
            self.time / self.duration
        } else {
            0.0
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    pub fn advance(&mut self, delta: f32) {
        if self.paused || self.duration <= 0.0 {
            return;
        }
        self.time = (self.time + delta).rem_euclid(self.duration);
    }
}

struct Bone {
    proxy: ProxyId,
    from: usize,
    to: usize,
}

const HIPS: usize = 0;
const CHEST: usize = 1;
const HEAD: usize = 2;
const JOINT_COUNT: usize = 15;

/// Pairs of joints joined by a bone.
const SKELETON: [(usize, usize); 14] = [
    (HIPS, CHEST),
    (CHEST, HEAD),
    (CHEST, 3),
    (3, 4),
    (4, 5),
    (CHEST, 6),
    (6, 7),
    (7, 8),
    (HIPS, 9),
    (9, 10),
    (10, 11),
    (HIPS, 12),
    (12, 13),
    (13, 14),
];

/// Joint positions of the stand-in figure at `phase`.
fn pose(phase: f32) -> [Vec3; JOINT_COUNT] {
    let swing = (phase * TAU).sin() * 0.6;
    let bob = (phase * 2.0 * TAU).cos() * 0.03;

    let limb = |origin: Vec3, angle: f32, upper: f32, lower: f32, bend: f32| {
        let middle = origin + Quat::from_rotation_x(angle) * Vec3::new(0.0, -upper, 0.0);
        let end = middle + Quat::from_rotation_x(angle + bend) * Vec3::new(0.0, -lower, 0.0);
        [origin, middle, end]
    };

    let hips = Vec3::new(0.0, -0.2 + bob, 0.0);
    let chest = Vec3::new(0.0, 0.55 + bob, 0.0);
    let head = Vec3::new(0.0, 0.9 + bob, 0.0);

    let arm_l = limb(chest + Vec3::new(-0.3, -0.05, 0.0), swing, 0.35, 0.3, -0.4);
    let arm_r = limb(chest + Vec3::new(0.3, -0.05, 0.0), -swing, 0.35, 0.3, -0.4);
    let leg_l = limb(hips + Vec3::new(-0.15, 0.0, 0.0), -swing, 0.45, 0.45, swing.max(0.0) * 0.8);
    let leg_r = limb(hips + Vec3::new(0.15, 0.0, 0.0), swing, 0.45, 0.45, (-swing).max(0.0) * 0.8);

    let mut joints = [Vec3::ZERO; JOINT_COUNT];
    joints[HIPS] = hips;
    joints[CHEST] = chest;
    joints[HEAD] = head;
    for (i, limb) in [arm_l, arm_r, leg_l, leg_r].into_iter().enumerate() {
        joints[3 + i * 3..6 + i * 3].copy_from_slice(&limb);
    }
    joints
}

/// The rigged model demo. The model itself is drawn as a stand-in figure
/// posed by the clip time.
pub struct ModelScene {
    root: ProxyId,
    head: ProxyId,
    bones: Vec<Bone>,
    player: Option<ClipPlayer>,
}

impl ModelScene {
    pub fn new(config: &SceneConfig, ctx: &mut SetupContext<'_>, stage: &mut Stage) -> Result<Self> {
        let player = match ctx.resolve(AssetKey::RiggedModel) {
            Some(source) => match source.clip(CLIP_NAME) {
                Some(clip) => Some(ClipPlayer::new(clip.name.clone(), clip.duration)),
                None => {
                    log::warn!("{} has no {:?} clip", source.path.display(), CLIP_NAME);
                    None
                }
            },
            None => None,
        };

        let bone_mesh = ctx.upload_mesh(&MeshData::cylinder(1.0, 1.0, 12))?;
        let head_mesh = ctx.upload_mesh(&MeshData::sphere(HEAD_RADIUS, 16, 12))?;

        let root = stage.graph.add(RenderableProxy::group());
        let material = Material::lit(rgb(0xf2e6ff));
        let bones = SKELETON
            .iter()
            .map(|&(from, to)| Bone {
                proxy: stage
                    .graph
                    .add(RenderableProxy::new(bone_mesh, material).with_parent(root)),
                from,
                to,
            })
            .collect();
        let head = stage
            .graph
            .add(RenderableProxy::new(head_mesh, material).with_parent(root));

        stage.graph.add_light(Light::Directional {
            position: Vec3::new(-5.0, -5.0, -5.0),
            color: Vec3::ONE,
            intensity: 4.0,
        });
        stage.graph.add_light(Light::Ambient {
            color: Vec3::ONE,
            intensity: 0.5,
        });
        stage.graph.add_light(Light::Spot {
            position: Vec3::new(10.0, 10.0, 10.0),
            target: Vec3::ZERO,
            color: Vec3::ONE,
            intensity: 1.0,
            angle: 0.15,
        });
        stage.orbit = Some(OrbitController::from_camera(&stage.camera, config.orbit_damping));

        let scene = Self {
            root,
            head,
            bones,
            player,
        };
        scene.apply_pose(stage);
        Ok(scene)
    }

    pub fn player(&self) -> Option<&ClipPlayer> {
        self.player.as_ref()
    }

    pub fn root(&self) -> ProxyId {
        self.root
    }

    fn apply_pose(&self, stage: &mut Stage) {
        let joints = pose(self.player.as_ref().map_or(0.0, ClipPlayer::phase));

        for bone in &self.bones {
            let matrix = bone_transform(joints[bone.from], joints[bone.to], BONE_THICKNESS);
            let (scale, rotation, position) = matrix.to_scale_rotation_translation();
            if let Some(proxy) = stage.graph.get_mut(bone.proxy) {
                proxy.transform = Transform::new(position, rotation, scale);
            }
        }
        stage.graph.set_position(self.head, joints[HEAD] + Vec3::Y * HEAD_RADIUS);
    }
}

impl SceneContent for ModelScene {
    fn update(&mut self, time: &FrameTime, stage: &mut Stage) {
        if let Some(player) = self.player.as_mut() {
            player.advance(time.delta);
        }
        self.apply_pose(stage);
    }

    fn pointer_button(&mut self, pressed: bool) {
        if let Some(player) = self.player.as_mut() {
            player.set_paused(pressed);
        }
    }
}

impl std::fmt::Debug for ModelScene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelScene")
            .field("bones", &self.bones.len())
            .field("player", &self.player)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CameraConfig;
    use crate::render::Camera;
    use crate::scene::assets::{AnimationClip, AssetSource};
    use crate::scene::session::ResourceLedger;
    use crate::scene::testing::{CountingHost, MapAssets, TrackingBackend};

    fn build(assets: &MapAssets) -> (ModelScene, Vec<AssetKey>) {
        let mut host = CountingHost::new(800, 600);
        let mut physics = TrackingBackend::default();
        let mut ledger = ResourceLedger::default();
        let mut unresolved = Vec::new();
        let mut stage = Stage::new(Camera::from_config(&CameraConfig::default(), 4.0 / 3.0));

        let mut ctx = SetupContext::new(&mut host, assets, &mut physics, &mut ledger, &mut unresolved);
        let scene = ModelScene::new(&SceneConfig::default(), &mut ctx, &mut stage).unwrap();
        (scene, unresolved)
    }

    fn model_with_clips(clips: Vec<AnimationClip>) -> MapAssets {
        let source = AssetSource::new(AssetKey::RiggedModel, AssetKey::RiggedModel.relative_path()).with_clips(clips);
        MapAssets::empty().with_source(source)
    }

    #[test]
    fn player_uses_the_clip_duration_from_the_model() {
        let assets = model_with_clips(vec![AnimationClip::new("Idle", 4.0), AnimationClip::new(CLIP_NAME, 3.25)]);
        let (scene, unresolved) = build(&assets);

        let player = scene.player().unwrap();
        assert_eq!(player.name(), CLIP_NAME);
        assert_eq!(player.duration(), 3.25);
        assert!(unresolved.is_empty());
    }

    #[test]
    fn model_without_animation_clip_has_no_player() {
        let assets = model_with_clips(vec![AnimationClip::new("Idle", 4.0)]);
        let (scene, unresolved) = build(&assets);

        assert_eq!(scene.player(), None);
        assert!(unresolved.is_empty());
    }

    #[test]
    fn paused_clip_holds_its_time() {
        let mut player = ClipPlayer::new(CLIP_NAME, 2.0);
        player.advance(0.5);
        player.set_paused(true);
        player.advance(0.5);
        assert_eq!(player.time(), 0.5);

        player.set_paused(false);
        player.advance(0.25);
        assert_eq!(player.time(), 0.75);
    }

    #[test]
    fn clip_loops() {
        let mut player = ClipPlayer::new(CLIP_NAME, 2.0);
        player.advance(2.5);
        assert!((player.time() - 0.5).abs() < 1e-6);
        assert!((player.phase() - 0.25).abs() < 1e-6);
    }

    #[test]
    fn bones_keep_their_length_through_the_clip() {
        let rest = pose(0.0);
        for step in 1..20 {
            let posed = pose(step as f32 / 20.0);
            for &(from, to) in &SKELETON {
                let expected = rest[from].distance(rest[to]);
                assert!((posed[from].distance(posed[to]) - expected).abs() < 1e-4);
            }
        }
    }
}
