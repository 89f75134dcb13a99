use std::cell::RefCell;
use std::rc::Rc;

use glam::Vec2;

use super::assets::AssetResolver;
use super::content::{self, SetupContext};
use super::host::{GpuHandle, RenderHost, ResourceRequest};
use super::session::{ResourceLedger, SceneSession, SceneState, Stage};
use crate::clock::FrameClock;
use crate::config::SceneConfig;
use crate::error::Result;
use crate::physics::PhysicsBackend;
use crate::render::{Camera, Viewport};

/// The collaborators a session is built from.
pub struct SceneEnv<'a> {
    pub host: &'a mut dyn RenderHost,
    pub assets: &'a dyn AssetResolver,
    pub physics: &'a mut dyn PhysicsBackend,
}

impl<'a> SceneEnv<'a> {
    pub fn new(
        host: &'a mut dyn RenderHost,
        assets: &'a dyn AssetResolver,
        physics: &'a mut dyn PhysicsBackend,
    ) -> Self {
        Self {
            host,
            assets,
            physics,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    /// A session is already running; nothing was allocated.
    AlreadyActive,
    /// The host has no render surface yet; try again once it does.
    SurfaceUnavailable,
}

/// Creates, runs and disposes the scene session of one viewport.
#[derive(Default)]
pub struct SceneController {
    clock: FrameClock,
    session: Option<SceneSession>,
}

impl SceneController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.session.as_ref().is_some_and(SceneSession::is_active)
    }

    pub fn session(&self) -> Option<&SceneSession> {
        self.session.as_ref()
    }

    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }

    pub fn start(&mut self, env: &mut SceneEnv<'_>, config: &SceneConfig) -> Result<StartOutcome> {
        if self.is_active() {
            log::debug!("session already active, ignoring start");
            return Ok(StartOutcome::AlreadyActive);
        }

        config.validate()?;

        let Some((width, height)) = env.host.surface_size() else {
            log::debug!("no render surface, deferring {} start", config.mode);
            return Ok(StartOutcome::SurfaceUnavailable);
        };
        let viewport = Viewport::new(width.max(1), height.max(1));

        let mut ledger = ResourceLedger::default();
        let mut unresolved = Vec::new();
        let built = Self::build(env, config, viewport, &mut ledger, &mut unresolved);
        let (render_target, state) = match built {
            Ok(built) => built,
            Err(err) => {
                let released = ledger.release_all(env.host);
                log::error!("{} scene failed to start ({} handles released): {}", config.mode, released, err);
                return Err(err);
            }
        };

        let observer = env.host.observe_resize();
        let task_state = Rc::clone(&state);
        let frame = self.clock.run(move |time| task_state.borrow_mut().advance(&time));

        log::info!(
            "{} scene started at {}x{} with {} handles",
            config.mode,
            viewport.width,
            viewport.height,
            ledger.handles().len()
        );
        self.session = Some(SceneSession {
            mode: config.mode,
            viewport,
            render_target,
            ledger,
            observer: Some(observer),
            frame,
            active: true,
            unresolved,
            state,
        });
        Ok(StartOutcome::Started)
    }

    fn build(
        env: &mut SceneEnv<'_>,
        config: &SceneConfig,
        viewport: Viewport,
        ledger: &mut ResourceLedger,
        unresolved: &mut Vec<super::assets::AssetKey>,
    ) -> Result<(GpuHandle, Rc<RefCell<SceneState>>)> {
        let render_target = env.host.allocate(ResourceRequest::RenderTarget {
            width: viewport.width,
            height: viewport.height,
        })?;
        ledger.record(render_target);

        let mut stage = Stage::new(Camera::from_config(&config.camera, viewport.aspect_ratio()));
        let mut ctx = SetupContext::new(env.host, env.assets, env.physics, ledger, unresolved);
        let content = content::build(config, &mut ctx, &mut stage)?;

        let state = SceneState {
            stage,
            content,
            render_requested: true,
        };
        Ok((render_target, Rc::new(RefCell::new(state))))
    }

    /// Tears down the running session. Returns `false` when there was none.
    pub fn stop(&mut self, host: &mut dyn RenderHost) -> bool {
        match self.session.take() {
            Some(mut session) => {
                session.dispose(&mut self.clock, host);
                true
            }
            None => false,
        }
    }

    /// Host refresh notification, `now_ms` in milliseconds.
    pub fn frame(&mut self, now_ms: f64) {
        self.clock.tick(now_ms);
    }

    /// Host resize notification.
    pub fn resize(&mut self, host: &mut dyn RenderHost, width: u32, height: u32) -> bool {
        match self.session.as_mut() {
            Some(session) if session.is_active() => session.resize(host, width, height),
            _ => false,
        }
    }

    /// Pulls the resize the host queued for the session's observer, if any,
    /// and applies it.
    pub fn deliver_resizes(&mut self, host: &mut dyn RenderHost) -> bool {
        match self.session.as_mut() {
            Some(session) if session.is_active() => session.deliver_resize(host),
            _ => false,
        }
    }

    pub fn pointer_moved(&mut self, pointer: Vec2) {
        if let Some(session) = &self.session {
            let pointer = pointer.clamp(Vec2::NEG_ONE, Vec2::ONE);
            session.with_stage(|stage| stage.pointer = pointer);
        }
    }

    pub fn pointer_button(&mut self, pressed: bool) {
        if let Some(session) = &self.session {
            let mut state = session.state.borrow_mut();
            state.stage.pointer_down = pressed;
            state.content.pointer_button(pressed);
        }
    }

    /// Orbit drag in pixels. Ignored by modes without orbit controls.
    pub fn orbit(&mut self, delta_x: f32, delta_y: f32) {
        if let Some(session) = &self.session {
            session.with_stage(|stage| {
                if let Some(orbit) = stage.orbit.as_mut() {
                    orbit.rotate(delta_x, delta_y);
                }
            });
        }
    }

    pub fn pan(&mut self, delta_x: f32, delta_y: f32) {
        if let Some(session) = &self.session {
            session.with_stage(|stage| {
                if let Some(orbit) = stage.orbit.as_mut() {
                    orbit.pan(delta_x, delta_y);
                }
            });
        }
    }

    pub fn zoom(&mut self, delta: f32) {
        if let Some(session) = &self.session {
            session.with_stage(|stage| {
                if let Some(orbit) = stage.orbit.as_mut() {
                    orbit.zoom(delta);
                }
            });
        }
    }

    /// Returns whether a frame ran since the last call.
    pub fn take_render_request(&mut self) -> bool {
        match &self.session {
            Some(session) => std::mem::take(&mut session.state.borrow_mut().render_requested),
            None => false,
        }
    }
}

impl std::fmt::Debug for SceneController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneController")
            .field("session", &self.session)
            .field("frame_tasks", &self.clock.active_tasks())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::config::SimulationConfig;
    use crate::error::SceneError;
    use crate::scene::testing::{CountingHost, FailingBackend, MapAssets, TrackingBackend};
    use crate::scene::{AssetKey, ResourceKind, SceneMode};

    fn start(
        controller: &mut SceneController,
        host: &mut CountingHost,
        assets: &MapAssets,
        physics: &mut dyn PhysicsBackend,
        mode: SceneMode,
    ) -> Result<StartOutcome> {
        let mut env = SceneEnv::new(host, assets, physics);
        controller.start(&mut env, &SceneConfig::new(mode))
    }

    #[test]
    fn start_is_idempotent() {
        let mut host = CountingHost::new(800, 600);
        let assets = MapAssets::complete();
        let mut physics = TrackingBackend::default();
        let mut controller = SceneController::new();

        let first = start(&mut controller, &mut host, &assets, &mut physics, SceneMode::Physics).unwrap();
        let allocated = host.allocations;
        let second = start(&mut controller, &mut host, &assets, &mut physics, SceneMode::Physics).unwrap();

        assert_eq!(first, StartOutcome::Started);
        assert_eq!(second, StartOutcome::AlreadyActive);
        assert_eq!(host.allocations, allocated);
        assert_eq!(host.observers(), 1);
        assert_eq!(controller.clock().active_tasks(), 1);
        assert_eq!(physics.created, 1);
    }

    #[test]
    fn stop_balances_every_allocation() {
        for mode in SceneMode::ALL {
            let mut host = CountingHost::new(800, 600);
            let assets = MapAssets::complete();
            let mut physics = TrackingBackend::default();
            let mut controller = SceneController::new();

            start(&mut controller, &mut host, &assets, &mut physics, mode).unwrap();
            controller.frame(0.0);
            controller.frame(16.0);
            assert!(controller.stop(&mut host));

            assert_eq!(host.allocations, host.releases, "{mode}");
            assert_eq!(host.outstanding(), 0, "{mode}");
            assert_eq!(host.stray_releases, 0, "{mode}");
            assert_eq!(host.observers(), 0, "{mode}");
            assert_eq!(controller.clock().active_tasks(), 0, "{mode}");
            assert_eq!(physics.live_worlds(), 0, "{mode}");
            assert!(!controller.is_active());
        }
    }

    #[test]
    fn stop_without_session_reports_false() {
        let mut host = CountingHost::new(800, 600);
        let mut controller = SceneController::new();
        assert!(!controller.stop(&mut host));
        assert_eq!(host.releases, 0);
    }

    #[test]
    fn missing_surface_is_a_silent_noop() {
        let mut host = CountingHost::without_surface();
        let assets = MapAssets::complete();
        let mut physics = TrackingBackend::default();
        let mut controller = SceneController::new();

        let outcome = start(&mut controller, &mut host, &assets, &mut physics, SceneMode::Primitive).unwrap();
        assert_eq!(outcome, StartOutcome::SurfaceUnavailable);
        assert_eq!(host.allocations, 0);
        assert!(!controller.is_active());

        host.attach_surface(1024, 768);
        let outcome = start(&mut controller, &mut host, &assets, &mut physics, SceneMode::Primitive).unwrap();
        assert_eq!(outcome, StartOutcome::Started);
        assert_eq!(controller.session().unwrap().viewport(), Viewport::new(1024, 768));
    }

    #[test]
    fn failed_physics_init_releases_everything() {
        let mut host = CountingHost::new(800, 600);
        let assets = MapAssets::complete();
        let mut physics = FailingBackend;
        let mut controller = SceneController::new();

        let err = start(&mut controller, &mut host, &assets, &mut physics, SceneMode::Physics).unwrap_err();
        assert!(matches!(err, SceneError::Physics(_)));
        assert!(host.allocations > 0);
        assert_eq!(host.outstanding(), 0);
        assert_eq!(host.observers(), 0);
        assert_eq!(controller.clock().active_tasks(), 0);
        assert!(controller.session().is_none());

        // Other modes still start on the same controller.
        let outcome = start(&mut controller, &mut host, &assets, &mut physics, SceneMode::Primitive).unwrap();
        assert_eq!(outcome, StartOutcome::Started);
    }

    #[test]
    fn invalid_config_allocates_nothing() {
        let mut host = CountingHost::new(800, 600);
        let assets = MapAssets::complete();
        let mut physics = TrackingBackend::default();
        let mut controller = SceneController::new();

        let mut simulation = SimulationConfig::default();
        simulation.size_min = 0.0;
        let config = SceneConfig::new(SceneMode::Physics).with_simulation(simulation);
        let mut env = SceneEnv::new(&mut host, &assets, &mut physics);
        let err = controller.start(&mut env, &config).unwrap_err();
        drop(env);

        assert!(matches!(err, SceneError::InvalidConfig(_)));
        assert_eq!(host.allocations, 0);
    }

    #[test]
    fn zero_bodies_is_allowed() {
        let mut host = CountingHost::new(800, 600);
        let assets = MapAssets::complete();
        let mut physics = TrackingBackend::default();
        let mut controller = SceneController::new();

        let config = SceneConfig::new(SceneMode::Physics)
            .with_simulation(SimulationConfig::default().with_body_count(0));
        let mut env = SceneEnv::new(&mut host, &assets, &mut physics);
        assert_eq!(controller.start(&mut env, &config).unwrap(), StartOutcome::Started);
        drop(env);
        controller.frame(0.0);
    }

    #[test]
    fn unresolved_textures_degrade() {
        let mut host = CountingHost::new(800, 600);
        let assets = MapAssets::complete().without(AssetKey::PlanetClouds);
        let mut physics = TrackingBackend::default();
        let mut controller = SceneController::new();

        let outcome = start(&mut controller, &mut host, &assets, &mut physics, SceneMode::Planet).unwrap();
        assert_eq!(outcome, StartOutcome::Started);

        let session = controller.session().unwrap();
        assert_eq!(session.unresolved(), &[AssetKey::PlanetClouds]);
        assert_eq!(host.outstanding_of(ResourceKind::Texture), 5);
    }

    #[test]
    fn texture_upload_failure_degrades() {
        let mut host = CountingHost::new(800, 600).with_failing_textures();
        let assets = MapAssets::complete();
        let mut physics = TrackingBackend::default();
        let mut controller = SceneController::new();

        start(&mut controller, &mut host, &assets, &mut physics, SceneMode::Planet).unwrap();
        assert_eq!(controller.session().unwrap().unresolved().len(), 6);
        assert_eq!(host.outstanding_of(ResourceKind::Texture), 0);
    }

    #[test]
    fn missing_model_still_starts() {
        let mut host = CountingHost::new(800, 600);
        let assets = MapAssets::empty();
        let mut physics = TrackingBackend::default();
        let mut controller = SceneController::new();

        let outcome = start(&mut controller, &mut host, &assets, &mut physics, SceneMode::Model).unwrap();
        assert_eq!(outcome, StartOutcome::Started);
        assert_eq!(controller.session().unwrap().unresolved(), &[AssetKey::RiggedModel]);
    }

    #[test]
    fn resize_updates_camera_and_target() {
        let mut host = CountingHost::new(800, 600);
        let assets = MapAssets::complete();
        let mut physics = TrackingBackend::default();
        let mut controller = SceneController::new();
        start(&mut controller, &mut host, &assets, &mut physics, SceneMode::Primitive).unwrap();

        assert!(controller.resize(&mut host, 1000, 500));

        let session = controller.session().unwrap();
        assert_eq!(session.stage().camera.aspect, 2.0);
        assert_eq!(host.target_size(session.render_target()), Some((1000, 500)));
    }

    #[test]
    fn resizes_reach_the_session_through_its_observer() {
        let mut host = CountingHost::new(800, 600);
        let assets = MapAssets::complete();
        let mut physics = TrackingBackend::default();
        let mut controller = SceneController::new();
        start(&mut controller, &mut host, &assets, &mut physics, SceneMode::Primitive).unwrap();

        assert!(!controller.deliver_resizes(&mut host));

        host.notify_resize(1200, 400);
        assert!(controller.deliver_resizes(&mut host));
        {
            let session = controller.session().unwrap();
            assert_eq!(session.stage().camera.aspect, 3.0);
            assert_eq!(host.target_size(session.render_target()), Some((1200, 400)));
        }

        // Delivered once.
        assert!(!controller.deliver_resizes(&mut host));

        controller.stop(&mut host);
        host.notify_resize(640, 480);
        assert!(!controller.deliver_resizes(&mut host));
    }

    #[test]
    fn removed_observer_receives_no_resizes() {
        let mut host = CountingHost::new(800, 600);
        let observer = host.observe_resize();
        host.unobserve_resize(observer);

        host.notify_resize(1024, 768);
        assert_eq!(host.take_resize(observer), None);
    }

    #[test]
    fn frames_request_renders() {
        let mut host = CountingHost::new(800, 600);
        let assets = MapAssets::complete();
        let mut physics = TrackingBackend::default();
        let mut controller = SceneController::new();
        start(&mut controller, &mut host, &assets, &mut physics, SceneMode::Primitive).unwrap();

        assert!(controller.take_render_request());
        assert!(!controller.take_render_request());
        controller.frame(0.0);
        assert!(controller.take_render_request());
    }

    #[test]
    fn no_ticks_reach_a_stopped_session() {
        let mut host = CountingHost::new(800, 600);
        let assets = MapAssets::complete();
        let mut physics = TrackingBackend::default();
        let mut controller = SceneController::new();
        start(&mut controller, &mut host, &assets, &mut physics, SceneMode::Physics).unwrap();

        controller.frame(0.0);
        controller.stop(&mut host);
        controller.frame(16.0);
        assert!(!controller.take_render_request());
    }

    #[test]
    fn physics_frame_moves_repulsor_to_pointer() {
        let mut host = CountingHost::new(800, 600);
        let assets = MapAssets::complete();
        let mut physics = TrackingBackend::default();
        let mut controller = SceneController::new();
        start(&mut controller, &mut host, &assets, &mut physics, SceneMode::Physics).unwrap();

        controller.pointer_moved(Vec2::new(0.5, -1.0));
        controller.frame(0.0);

        let session = controller.session().unwrap();
        let stage = session.stage();
        let repulsor = stage
            .graph
            .iter()
            .map(|(_, proxy)| proxy.transform.position)
            .find(|&p| p == Vec3::new(2.5, -5.0, 0.2));
        assert!(repulsor.is_some());
    }

    #[test]
    fn wormhole_camera_follows_elapsed_time_only() {
        let run = |timestamps: &[f64]| {
            let mut host = CountingHost::new(800, 600);
            let assets = MapAssets::complete();
            let mut physics = TrackingBackend::default();
            let mut controller = SceneController::new();
            start(&mut controller, &mut host, &assets, &mut physics, SceneMode::Wormhole).unwrap();
            for &t in timestamps {
                controller.frame(t);
            }
            let camera = controller.session().unwrap().stage().camera;
            camera
        };

        // Same elapsed time reached through different frame rates.
        let coarse = run(&[1000.0, 11_000.0]);
        let fine: Vec<f64> = (0..=600).map(|i| 1000.0 + i as f64 * (10_000.0 / 600.0)).collect();
        let fine = run(&fine);

        assert!((coarse.position - fine.position).length() < 1e-4);
        assert!((coarse.target - fine.target).length() < 1e-4);
    }

    #[test]
    fn model_pauses_while_pointer_is_down() {
        let mut host = CountingHost::new(800, 600);
        let assets = MapAssets::complete();
        let mut physics = TrackingBackend::default();
        let mut controller = SceneController::new();
        start(&mut controller, &mut host, &assets, &mut physics, SceneMode::Model).unwrap();

        controller.frame(0.0);
        controller.frame(100.0);
        controller.pointer_button(true);
        let paused_at = controller.session().unwrap().stage().graph.drawables()[0].world;
        controller.frame(500.0);
        let still = controller.session().unwrap().stage().graph.drawables()[0].world;
        assert_eq!(paused_at, still);

        controller.pointer_button(false);
        controller.frame(900.0);
        let moved = controller.session().unwrap().stage().graph.drawables()[0].world;
        assert_ne!(paused_at, moved);
    }
}
