use std::path::{Path, PathBuf};

use crate::error::{Result, SceneError};

/// Logical names of the assets the demos load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKey {
    PlanetColor,
    PlanetBump,
    PlanetSpecular,
    PlanetClouds,
    PlanetCloudAlpha,
    PlanetNightLights,
    RiggedModel,
}

impl AssetKey {
    pub const ALL: [AssetKey; 7] = [
        AssetKey::PlanetColor,
        AssetKey::PlanetBump,
        AssetKey::PlanetSpecular,
        AssetKey::PlanetClouds,
        AssetKey::PlanetCloudAlpha,
        AssetKey::PlanetNightLights,
        AssetKey::RiggedModel,
    ];

    /// Location relative to the asset root.
    pub fn relative_path(self) -> &'static str {
        match self {
            AssetKey::PlanetColor => "textures/earth/color.jpg",
            AssetKey::PlanetBump => "textures/earth/bump.jpg",
            AssetKey::PlanetSpecular => "textures/earth/specular.jpg",
            AssetKey::PlanetClouds => "textures/earth/cloud.jpg",
            AssetKey::PlanetCloudAlpha => "textures/earth/cloud_transparency.jpg",
            AssetKey::PlanetNightLights => "textures/earth/city_lights.jpg",
            AssetKey::RiggedModel => "models/smol_ame.glb",
        }
    }

    pub fn is_texture(self) -> bool {
        self != AssetKey::RiggedModel
    }
}

/// A named animation clip of a model.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationClip {
    pub name: String,
    /// Seconds, the latest keyframe time of any channel.
    pub duration: f32,
}

impl AnimationClip {
    pub fn new(name: impl Into<String>, duration: f32) -> Self {
        Self {
            name: name.into(),
            duration,
        }
    }
}

/// A resolved, loadable asset.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetSource {
    pub key: AssetKey,
    pub path: PathBuf,
    /// Animation clips, empty for textures.
    pub clips: Vec<AnimationClip>,
}

impl AssetSource {
    pub fn new(key: AssetKey, path: impl Into<PathBuf>) -> Self {
        Self {
            key,
            path: path.into(),
            clips: Vec::new(),
        }
    }

    pub fn with_clips(mut self, clips: impl IntoIterator<Item = AnimationClip>) -> Self {
        self.clips = clips.into_iter().collect();
        self
    }

    pub fn clip(&self, name: &str) -> Option<&AnimationClip> {
        self.clips.iter().find(|clip| clip.name == name)
    }
}

pub trait AssetResolver {
    fn resolve(&self, key: AssetKey) -> Result<AssetSource>;
}

/// Resolves assets under a root directory using a fixed layout. Models are
/// read as binary glTF to list their animation clips.
#[derive(Debug, Clone)]
pub struct DirectoryAssets {
    root: PathBuf,
}

impl DirectoryAssets {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl AssetResolver for DirectoryAssets {
    fn resolve(&self, key: AssetKey) -> Result<AssetSource> {
        let path = self.root.join(key.relative_path());
        if !path.is_file() {
            return Err(SceneError::Asset {
                key,
                reason: format!("{} not found", path.display()),
            });
        }

        let source = AssetSource::new(key, &path);
        Ok(match key {
            AssetKey::RiggedModel => source.with_clips(read_clips(key, &path)?),
            _ => source,
        })
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn read_clips(key: AssetKey, path: &Path) -> Result<Vec<AnimationClip>> {
    let asset_error = |reason: String| SceneError::Asset { key, reason };
    let bytes = std::fs::read(path).map_err(|e| asset_error(e.to_string()))?;
    let gltf = gltf::Gltf::from_slice(&bytes).map_err(|e| asset_error(e.to_string()))?;
    let blob = gltf.blob.as_deref();

    let clips = gltf
        .animations()
        .map(|animation| {
            let duration = animation
                .channels()
                .filter_map(|channel| {
                    let reader = channel.reader(move |buffer| match buffer.source() {
                        gltf::buffer::Source::Bin => blob,
                        gltf::buffer::Source::Uri(_) => None,
                    });
                    reader.read_inputs().map(|times| times.fold(0.0_f32, f32::max))
                })
                .fold(0.0_f32, f32::max);
            let name = match animation.name() {
                Some(name) => name.to_string(),
                None => format!("animation{}", animation.index()),
            };
            AnimationClip::new(name, duration)
        })
        .collect();
    Ok(clips)
}

#[cfg(target_arch = "wasm32")]
fn read_clips(key: AssetKey, _path: &Path) -> Result<Vec<AnimationClip>> {
    Err(SceneError::Asset {
        key,
        reason: "model decoding is not available in the browser build".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_an_asset_error() {
        let assets = DirectoryAssets::new("/nonexistent/scene-demos-assets");
        let err = assets.resolve(AssetKey::PlanetColor).unwrap_err();
        assert!(matches!(err, SceneError::Asset { key: AssetKey::PlanetColor, .. }));
    }

    /// Binary glTF with one node and one translation clip per
    /// `(name, keyframe times)` entry.
    fn glb(clips: &[(&str, [f32; 2])]) -> Vec<u8> {
        let mut bin = Vec::new();
        let mut buffer_views = Vec::new();
        let mut accessors = Vec::new();
        let mut animations = Vec::new();

        for (i, (name, times)) in clips.iter().enumerate() {
            let input_offset = bin.len();
            bin.extend(times.iter().flat_map(|t| t.to_le_bytes()));
            let output_offset = bin.len();
            bin.extend([0.0_f32; 6].iter().flat_map(|v| v.to_le_bytes()));

            buffer_views.push(format!(r#"{{"buffer":0,"byteOffset":{input_offset},"byteLength":8}}"#));
            buffer_views.push(format!(r#"{{"buffer":0,"byteOffset":{output_offset},"byteLength":24}}"#));
            accessors.push(format!(
                r#"{{"bufferView":{},"componentType":5126,"count":2,"type":"SCALAR","min":[{:?}],"max":[{:?}]}}"#,
                i * 2,
                times[0],
                times[1]
            ));
            accessors.push(format!(r#"{{"bufferView":{},"componentType":5126,"count":2,"type":"VEC3"}}"#, i * 2 + 1));
            animations.push(format!(
                r#"{{"name":"{name}","channels":[{{"sampler":0,"target":{{"node":0,"path":"translation"}}}}],"samplers":[{{"input":{},"output":{}}}]}}"#,
                i * 2,
                i * 2 + 1
            ));
        }

        let mut json = format!(
            r#"{{"asset":{{"version":"2.0"}},"nodes":[{{"name":"root"}}],"buffers":[{{"byteLength":{}}}],"bufferViews":[{}],"accessors":[{}],"animations":[{}]}}"#,
            bin.len(),
            buffer_views.join(","),
            accessors.join(","),
            animations.join(",")
        )
        .into_bytes();
        while json.len() % 4 != 0 {
            json.push(b' ');
        }

        let total = 12 + 8 + json.len() + 8 + bin.len();
        let mut out = Vec::with_capacity(total);
        out.extend(b"glTF");
        out.extend(2_u32.to_le_bytes());
        out.extend((total as u32).to_le_bytes());
        out.extend((json.len() as u32).to_le_bytes());
        out.extend(b"JSON");
        out.extend(&json);
        out.extend((bin.len() as u32).to_le_bytes());
        out.extend(b"BIN\0");
        out.extend(&bin);
        out
    }

    fn asset_root(tag: &str, model: Option<&[u8]>) -> PathBuf {
        let root = std::env::temp_dir().join(format!("scene-demos-{tag}-{}", std::process::id()));
        if let Some(bytes) = model {
            let path = root.join(AssetKey::RiggedModel.relative_path());
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(&path, bytes).unwrap();
        }
        root
    }

    #[test]
    fn model_clips_come_from_the_file() {
        let root = asset_root("clips", Some(&glb(&[("Animation", [0.0, 1.5]), ("Wave", [0.25, 0.75])])[..]));

        let source = DirectoryAssets::new(&root).resolve(AssetKey::RiggedModel).unwrap();
        assert_eq!(source.path, root.join(AssetKey::RiggedModel.relative_path()));
        assert_eq!(
            source.clips,
            vec![AnimationClip::new("Animation", 1.5), AnimationClip::new("Wave", 0.75)]
        );
        assert_eq!(source.clip("Wave").map(|c| c.duration), Some(0.75));
        assert_eq!(source.clip("Idle"), None);

        std::fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn corrupt_model_is_an_asset_error() {
        let root = asset_root("corrupt", Some(&b"glTF"[..]));

        let err = DirectoryAssets::new(&root).resolve(AssetKey::RiggedModel).unwrap_err();
        assert!(matches!(err, SceneError::Asset { key: AssetKey::RiggedModel, .. }));

        std::fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn texture_keys_have_distinct_paths() {
        let mut paths: Vec<_> = AssetKey::ALL.iter().map(|k| k.relative_path()).collect();
        paths.sort();
        paths.dedup();
        assert_eq!(paths.len(), AssetKey::ALL.len());
    }
}
