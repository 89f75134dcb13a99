use std::fmt;

use super::controller::{SceneController, SceneEnv, StartOutcome};
use super::host::RenderHost;
use crate::config::SceneConfig;
use crate::error::Result;

/// The demos the host UI can switch between.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SceneMode {
    #[default]
    Model,
    Primitive,
    Planet,
    Wormhole,
    Physics,
}

impl SceneMode {
    pub const ALL: [SceneMode; 5] = [
        SceneMode::Model,
        SceneMode::Primitive,
        SceneMode::Planet,
        SceneMode::Wormhole,
        SceneMode::Physics,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SceneMode::Model => "Model",
            SceneMode::Primitive => "Primitive",
            SceneMode::Planet => "Planet",
            SceneMode::Wormhole => "Wormhole",
            SceneMode::Physics => "Physics",
        }
    }

    /// Case-insensitive lookup; also accepts the labels `fiber` and `earth`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "model" | "fiber" => Some(SceneMode::Model),
            "primitive" => Some(SceneMode::Primitive),
            "planet" | "earth" => Some(SceneMode::Planet),
            "wormhole" => Some(SceneMode::Wormhole),
            "physics" => Some(SceneMode::Physics),
            _ => None,
        }
    }

    pub fn uses_physics(self) -> bool {
        self == SceneMode::Physics
    }

    pub fn has_orbit_controls(self) -> bool {
        matches!(self, SceneMode::Model | SceneMode::Primitive | SceneMode::Planet)
    }
}

impl fmt::Display for SceneMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Keeps exactly one mode's session alive on a controller.
pub struct ModeSwitcher {
    controller: SceneController,
    config: SceneConfig,
}

impl ModeSwitcher {
    pub fn new(config: SceneConfig) -> Self {
        Self {
            controller: SceneController::new(),
            config,
        }
    }

    pub fn mode(&self) -> SceneMode {
        self.config.mode
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    pub fn controller(&self) -> &SceneController {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut SceneController {
        &mut self.controller
    }

    /// Starts the current mode if it is not running yet, e.g. once the
    /// surface appears.
    pub fn ensure_started(&mut self, env: &mut SceneEnv<'_>) -> Result<StartOutcome> {
        self.controller.start(env, &self.config)
    }

    /// Switches to `mode`. Selecting the running mode is a no-op; otherwise
    /// the previous session is torn down before the new one starts.
    pub fn select(&mut self, mode: SceneMode, env: &mut SceneEnv<'_>) -> Result<StartOutcome> {
        if mode == self.config.mode && self.controller.is_active() {
            return Ok(StartOutcome::AlreadyActive);
        }

        if mode != self.config.mode {
            log::info!("switching from {} to {}", self.config.mode, mode);
        }
        self.controller.stop(env.host);
        self.config.mode = mode;
        self.controller.start(env, &self.config)
    }

    pub fn stop(&mut self, host: &mut dyn RenderHost) -> bool {
        self.controller.stop(host)
    }
}

impl fmt::Debug for ModeSwitcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModeSwitcher")
            .field("mode", &self.config.mode)
            .field("active", &self.controller.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::testing::{CountingHost, MapAssets, TrackingBackend};

    #[test]
    fn names_round_trip() {
        for mode in SceneMode::ALL {
            assert_eq!(SceneMode::from_name(mode.name()), Some(mode));
        }
        assert_eq!(SceneMode::from_name("Earth"), Some(SceneMode::Planet));
        assert_eq!(SceneMode::from_name("bloom"), None);
    }

    #[test]
    fn default_mode_is_model() {
        assert_eq!(SceneMode::default(), SceneMode::Model);
        assert_eq!(ModeSwitcher::new(SceneConfig::default()).mode(), SceneMode::Model);
    }

    #[test]
    fn switching_leaves_only_new_session_handles() {
        let mut host = CountingHost::new(640, 480);
        let assets = MapAssets::complete();
        let mut physics = TrackingBackend::default();
        let mut switcher = ModeSwitcher::new(SceneConfig::new(SceneMode::Primitive));

        {
            let mut env = SceneEnv::new(&mut host, &assets, &mut physics);
            switcher.ensure_started(&mut env).unwrap();
        }
        let primitive_handles = host.outstanding();
        assert!(primitive_handles > 0);

        {
            let mut env = SceneEnv::new(&mut host, &assets, &mut physics);
            assert_eq!(switcher.select(SceneMode::Physics, &mut env).unwrap(), StartOutcome::Started);
        }
        let session = switcher.controller().session().unwrap();
        assert_eq!(session.mode(), SceneMode::Physics);
        assert_eq!(host.outstanding(), session.handles().len());
        for &handle in session.handles() {
            assert!(host.is_live(handle));
        }
        assert_eq!(host.observers(), 1);
        assert_eq!(physics.live_worlds(), 1);
        assert_eq!(host.stray_releases, 0);
    }

    #[test]
    fn reselecting_current_mode_is_noop() {
        let mut host = CountingHost::new(640, 480);
        let assets = MapAssets::complete();
        let mut physics = TrackingBackend::default();
        let mut switcher = ModeSwitcher::new(SceneConfig::new(SceneMode::Wormhole));

        let mut env = SceneEnv::new(&mut host, &assets, &mut physics);
        switcher.ensure_started(&mut env).unwrap();
        assert_eq!(
            switcher.select(SceneMode::Wormhole, &mut env).unwrap(),
            StartOutcome::AlreadyActive
        );
        drop(env);

        assert_eq!(host.releases, 0);
    }

    #[test]
    fn selecting_after_physics_drops_the_world() {
        let mut host = CountingHost::new(640, 480);
        let assets = MapAssets::complete();
        let mut physics = TrackingBackend::default();
        let mut switcher = ModeSwitcher::new(SceneConfig::new(SceneMode::Physics));

        let mut env = SceneEnv::new(&mut host, &assets, &mut physics);
        switcher.ensure_started(&mut env).unwrap();
        switcher.select(SceneMode::Planet, &mut env).unwrap();
        drop(env);

        assert_eq!(physics.created, 1);
        assert_eq!(physics.live_worlds(), 0);
    }
}
