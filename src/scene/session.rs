use std::cell::{Ref, RefCell};
use std::rc::Rc;

use glam::Vec2;

use super::assets::AssetKey;
use super::content::SceneContent;
use super::graph::SceneGraph;
use super::host::{GpuHandle, ObserverId, RenderHost};
use super::mode::SceneMode;
use crate::clock::{FrameClock, FrameHandle, FrameTime};
use crate::render::{Camera, OrbitController, Viewport};

/// Everything a scene content mutates each frame.
#[derive(Debug)]
pub struct Stage {
    pub camera: Camera,
    pub graph: SceneGraph,
    /// Normalized pointer position, `[-1, 1]` on both axes with y up.
    pub pointer: Vec2,
    pub pointer_down: bool,
    pub orbit: Option<OrbitController>,
}

impl Stage {
    pub fn new(camera: Camera) -> Self {
        Self {
            camera,
            graph: SceneGraph::new(),
            pointer: Vec2::ZERO,
            pointer_down: false,
            orbit: None,
        }
    }
}

/// State shared between a session and its frame task.
pub(crate) struct SceneState {
    pub stage: Stage,
    pub content: Box<dyn SceneContent>,
    pub render_requested: bool,
}

impl SceneState {
    pub fn advance(&mut self, time: &FrameTime) {
        if let Some(orbit) = self.stage.orbit.as_mut() {
            orbit.update();
            orbit.update_camera(&mut self.stage.camera);
        }
        self.content.update(time, &mut self.stage);
        self.render_requested = true;
    }
}

/// Every host handle a session allocated, in allocation order.
#[derive(Debug, Default)]
pub(crate) struct ResourceLedger {
    handles: Vec<GpuHandle>,
}

impl ResourceLedger {
    pub fn record(&mut self, handle: GpuHandle) {
        self.handles.push(handle);
    }

    pub fn handles(&self) -> &[GpuHandle] {
        &self.handles
    }

    /// Releases everything in reverse allocation order and empties the ledger.
    pub fn release_all(&mut self, host: &mut dyn RenderHost) -> usize {
        let count = self.handles.len();
        for handle in self.handles.drain(..).rev() {
            host.release(handle);
        }
        count
    }
}

/// One live scene instance bound to a viewport.
pub struct SceneSession {
    pub(crate) mode: SceneMode,
    pub(crate) viewport: Viewport,
    pub(crate) render_target: GpuHandle,
    pub(crate) ledger: ResourceLedger,
    pub(crate) observer: Option<ObserverId>,
    pub(crate) frame: FrameHandle,
    pub(crate) active: bool,
    pub(crate) unresolved: Vec<AssetKey>,
    pub(crate) state: Rc<RefCell<SceneState>>,
}

impl SceneSession {
    pub fn mode(&self) -> SceneMode {
        self.mode
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn render_target(&self) -> GpuHandle {
        self.render_target
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn frame_handle(&self) -> &FrameHandle {
        &self.frame
    }

    /// Assets that could not be resolved or uploaded; the scene runs without
    /// them.
    pub fn unresolved(&self) -> &[AssetKey] {
        &self.unresolved
    }

    pub fn handles(&self) -> &[GpuHandle] {
        self.ledger.handles()
    }

    pub fn stage(&self) -> Ref<'_, Stage> {
        Ref::map(self.state.borrow(), |state| &state.stage)
    }

    pub(crate) fn with_stage<R>(&self, f: impl FnOnce(&mut Stage) -> R) -> R {
        f(&mut self.state.borrow_mut().stage)
    }

    pub(crate) fn resize(&mut self, host: &mut dyn RenderHost, width: u32, height: u32) -> bool {
        let mut state = self.state.borrow_mut();
        self.viewport
            .on_resize(&mut state.stage.camera, host, self.render_target, width, height)
    }

    /// Applies the size queued for this session's resize observer.
    pub(crate) fn deliver_resize(&mut self, host: &mut dyn RenderHost) -> bool {
        let Some(observer) = self.observer else {
            return false;
        };
        match host.take_resize(observer) {
            Some((width, height)) => self.resize(host, width, height),
            None => false,
        }
    }

    /// Cancels the frame task, removes the resize observer and releases every
    /// handle. Safe to call more than once.
    pub(crate) fn dispose(&mut self, clock: &mut FrameClock, host: &mut dyn RenderHost) {
        clock.cancel(&self.frame);
        if let Some(observer) = self.observer.take() {
            host.unobserve_resize(observer);
        }
        let released = self.ledger.release_all(host);
        self.active = false;
        log::debug!("{} session disposed, {} handles released", self.mode, released);
    }
}

impl std::fmt::Debug for SceneSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneSession")
            .field("mode", &self.mode)
            .field("viewport", &self.viewport)
            .field("handles", &self.ledger.handles().len())
            .field("active", &self.active)
            .field("unresolved", &self.unresolved)
            .finish()
    }
}
