//! WASM entry point: the scene demos on a page canvas with id `canvas`.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::Arc;

use glam::Vec2;
use wasm_bindgen::prelude::*;
use web_sys::HtmlCanvasElement;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::platform::web::EventLoopExtWebSys;
use winit::platform::web::WindowAttributesExtWebSys;
use winit::window::{Window, WindowId};

use crate::config::SceneConfig;
use crate::physics::RapierBackend;
use crate::render::{GpuContext, SceneRenderer, WgpuHost};
use crate::scene::{DirectoryAssets, ModeSwitcher, SceneEnv, SceneMode};

thread_local! {
    static PENDING_MODE: Cell<Option<SceneMode>> = const { Cell::new(None) };
}

/// Queues a mode switch from the page, e.g. `select_mode("Planet")`.
/// Returns `false` for an unknown name.
#[wasm_bindgen]
pub fn select_mode(name: &str) -> bool {
    match SceneMode::from_name(name) {
        Some(mode) => {
            PENDING_MODE.with(|pending| pending.set(Some(mode)));
            true
        }
        None => {
            log::warn!("unknown scene mode '{}'", name);
            false
        }
    }
}

struct AppState {
    host: WgpuHost,
    renderer: Option<SceneRenderer>,
    switcher: ModeSwitcher,
    assets: DirectoryAssets,
    physics: RapierBackend,
}

impl AppState {
    fn select(&mut self, mode: SceneMode) {
        let mut env = SceneEnv::new(&mut self.host, &self.assets, &mut self.physics);
        if let Err(e) = self.switcher.select(mode, &mut env) {
            log::error!("Failed to start {}: {}", mode, e);
        }
    }

    fn start_current(&mut self) {
        let mut env = SceneEnv::new(&mut self.host, &self.assets, &mut self.physics);
        if let Err(e) = self.switcher.ensure_started(&mut env) {
            log::error!("Failed to start {}: {}", self.switcher.mode(), e);
        }
    }

    fn render(&mut self) {
        let Some(context) = self.host.context() else {
            return;
        };
        let output = match context.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                context.reconfigure();
                return;
            }
            Err(e) => {
                log::error!("Surface error: {:?}", e);
                return;
            }
        };

        let view = output.texture.create_view(&wgpu::TextureViewDescriptor::default());
        let controller = self.switcher.controller_mut();
        if let (true, Some(session), Some(renderer)) =
            (controller.take_render_request(), controller.session(), self.renderer.as_mut())
        {
            renderer.render(&self.host, session, &view);
        }
        output.present();
    }
}

struct App {
    window: Option<Arc<Window>>,
    state: Rc<RefCell<AppState>>,
    window_size: (u32, u32),
    cursor: (f32, f32),
    left_pressed: bool,
    right_pressed: bool,
    init_pending: bool,
}

impl App {
    fn new(config: SceneConfig) -> Self {
        Self {
            window: None,
            state: Rc::new(RefCell::new(AppState {
                host: WgpuHost::new(),
                renderer: None,
                switcher: ModeSwitcher::new(config),
                assets: DirectoryAssets::new("assets"),
                physics: RapierBackend::default(),
            })),
            window_size: (1280, 720),
            cursor: (640.0, 360.0),
            left_pressed: false,
            right_pressed: false,
            init_pending: false,
        }
    }

    fn screen_to_ndc(&self, x: f32, y: f32) -> Vec2 {
        let (w, h) = self.window_size;
        Vec2::new(2.0 * x / w.max(1) as f32 - 1.0, 1.0 - 2.0 * y / h.max(1) as f32)
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() || self.init_pending {
            return;
        }
        self.init_pending = true;

        let Some(canvas) = web_sys::window()
            .and_then(|w| w.document())
            .and_then(|d| d.get_element_by_id("canvas"))
            .and_then(|e| e.dyn_into::<HtmlCanvasElement>().ok())
        else {
            log::error!("Could not find canvas element with id 'canvas'");
            return;
        };

        let width = canvas.width().max(1);
        let height = canvas.height().max(1);

        let window_attrs = Window::default_attributes()
            .with_canvas(Some(canvas))
            .with_inner_size(PhysicalSize::new(width, height));

        let window = match event_loop.create_window(window_attrs) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("Failed to create window: {}", e);
                return;
            }
        };
        self.window = Some(window.clone());
        self.window_size = (width, height);

        let state = self.state.clone();

        wasm_bindgen_futures::spawn_local(async move {
            let context = match GpuContext::new(window.clone()).await {
                Ok(context) => context,
                Err(e) => {
                    log::error!("{}", e);
                    return;
                }
            };
            let renderer = SceneRenderer::new(&context);

            let mut state = state.borrow_mut();
            state.renderer = Some(renderer);
            state.host.attach(context);
            state.start_current();

            window.request_redraw();
        });
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                let mut state = self.state.borrow_mut();
                let AppState { host, switcher, .. } = &mut *state;
                switcher.stop(host);
                event_loop.exit();
            }

            WindowEvent::Resized(size) => {
                self.window_size = (size.width, size.height);
                let mut state = self.state.borrow_mut();
                let AppState { host, switcher, .. } = &mut *state;
                host.notify_resize(size.width, size.height);
                switcher.controller_mut().deliver_resizes(host);
            }

            WindowEvent::MouseInput { state, button, .. } => {
                let pressed = state == ElementState::Pressed;
                match button {
                    MouseButton::Left => {
                        self.left_pressed = pressed;
                        self.state
                            .borrow_mut()
                            .switcher
                            .controller_mut()
                            .pointer_button(pressed);
                    }
                    MouseButton::Right => self.right_pressed = pressed,
                    _ => {}
                }
            }

            WindowEvent::CursorMoved { position, .. } => {
                let (x, y) = (position.x as f32, position.y as f32);
                let (delta_x, delta_y) = (x - self.cursor.0, y - self.cursor.1);
                self.cursor = (x, y);

                let pointer = self.screen_to_ndc(x, y);
                let mut state = self.state.borrow_mut();
                let controller = state.switcher.controller_mut();
                controller.pointer_moved(pointer);
                if self.left_pressed {
                    controller.orbit(delta_x, delta_y);
                } else if self.right_pressed {
                    controller.pan(-delta_x, delta_y);
                }
            }

            WindowEvent::MouseWheel { delta, .. } => {
                let scroll = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 50.0,
                };
                self.state.borrow_mut().switcher.controller_mut().zoom(scroll);
            }

            WindowEvent::RedrawRequested => {
                let now = web_sys::window()
                    .and_then(|w| w.performance())
                    .map(|p| p.now())
                    .unwrap_or(0.0);

                {
                    let mut state = self.state.borrow_mut();
                    if let Some(mode) = PENDING_MODE.with(Cell::take) {
                        state.select(mode);
                    }
                    state.switcher.controller_mut().frame(now);
                    state.render();
                }

                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }

            _ => {}
        }
    }
}

#[wasm_bindgen(start)]
pub fn main() -> Result<(), JsValue> {
    console_error_panic_hook::set_once();
    if let Err(e) = console_log::init_with_level(log::Level::Warn) {
        web_sys::console::warn_1(&format!("logger already initialized: {e}").into());
    }

    let event_loop = EventLoop::new().map_err(|e| JsValue::from_str(&e.to_string()))?;
    let app = App::new(SceneConfig::default());

    event_loop.spawn_app(app);
    Ok(())
}
