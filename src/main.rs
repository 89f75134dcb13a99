use std::sync::Arc;
use std::time::Instant;

use glam::Vec2;
use scene_demos::render::{GpuContext, SceneRenderer, WgpuHost};
use scene_demos::{DirectoryAssets, ModeSwitcher, RapierBackend, SceneConfig, SceneEnv, SceneMode};
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalPosition;
use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

struct Gui {
    state: egui_winit::State,
    renderer: egui_wgpu::Renderer,
}

struct App {
    window: Option<Arc<Window>>,
    host: WgpuHost,
    renderer: Option<SceneRenderer>,
    gui: Option<Gui>,
    switcher: ModeSwitcher,
    assets: DirectoryAssets,
    physics: RapierBackend,
    started_at: Instant,
    cursor: PhysicalPosition<f64>,
    left_pressed: bool,
    right_pressed: bool,
    gui_hovered: bool,
}

impl App {
    fn new(config: SceneConfig) -> Self {
        Self {
            window: None,
            host: WgpuHost::new(),
            renderer: None,
            gui: None,
            switcher: ModeSwitcher::new(config),
            assets: DirectoryAssets::new("assets"),
            physics: RapierBackend::default(),
            started_at: Instant::now(),
            cursor: PhysicalPosition::new(0.0, 0.0),
            left_pressed: false,
            right_pressed: false,
            gui_hovered: false,
        }
    }

    fn start_current(&mut self) {
        let mut env = SceneEnv::new(&mut self.host, &self.assets, &mut self.physics);
        if let Err(e) = self.switcher.ensure_started(&mut env) {
            log::error!("Failed to start {}: {}", self.switcher.mode(), e);
        }
    }

    fn select(&mut self, mode: SceneMode) {
        let mut env = SceneEnv::new(&mut self.host, &self.assets, &mut self.physics);
        match self.switcher.select(mode, &mut env) {
            Ok(outcome) => log::debug!("select {}: {:?}", mode, outcome),
            Err(e) => log::error!("Failed to start {}: {}", mode, e),
        }
    }

    fn pointer_ndc(&self, position: PhysicalPosition<f64>) -> Vec2 {
        let Some(context) = self.host.context() else {
            return Vec2::ZERO;
        };
        let (w, h) = (context.size.width.max(1) as f64, context.size.height.max(1) as f64);
        Vec2::new((2.0 * position.x / w - 1.0) as f32, (1.0 - 2.0 * position.y / h) as f32)
    }

    /// Builds the mode bar and returns the mode clicked this frame, if any.
    fn run_gui(&mut self, window: &Window) -> Option<(egui::FullOutput, Option<SceneMode>)> {
        let gui = self.gui.as_mut()?;
        let raw_input = gui.state.take_egui_input(window);
        let egui_ctx = gui.state.egui_ctx().clone();

        let current = self.switcher.mode();
        let unresolved = self
            .switcher
            .controller()
            .session()
            .map(|s| s.unresolved().len())
            .unwrap_or(0);
        let mut selected = None;

        let full_output = egui_ctx.run(raw_input, |ctx| {
            egui::TopBottomPanel::bottom("modes").show(ctx, |ui| {
                ui.horizontal(|ui| {
                    for mode in SceneMode::ALL {
                        if ui.selectable_label(current == mode, mode.name()).clicked() {
                            selected = Some(mode);
                        }
                    }
                    if unresolved > 0 {
                        ui.separator();
                        ui.small(format!("{unresolved} asset(s) missing"));
                    }
                });
            });
        });

        self.gui_hovered = egui_ctx.is_pointer_over_area();
        Some((full_output, selected))
    }

    fn render(&mut self) {
        let Some(window) = self.window.clone() else {
            return;
        };

        let gui_output = self.run_gui(&window);
        let (full_output, selected) = match gui_output {
            Some((output, selected)) => (Some(output), selected),
            None => (None, None),
        };
        if let Some(mode) = selected {
            self.select(mode);
        }

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
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let controller = self.switcher.controller_mut();
        let drew_scene = match (controller.take_render_request(), controller.session(), self.renderer.as_mut()) {
            (true, Some(session), Some(renderer)) => {
                renderer.render(&self.host, session, &view);
                true
            }
            _ => false,
        };

        if let Some(full_output) = full_output {
            self.render_gui(window.as_ref(), &view, full_output, drew_scene);
        }

        output.present();
    }

    fn render_gui(&mut self, window: &Window, view: &wgpu::TextureView, full_output: egui::FullOutput, drew_scene: bool) {
        let (Some(gui), Some(context)) = (self.gui.as_mut(), self.host.context()) else {
            return;
        };

        gui.state
            .handle_platform_output(window, full_output.platform_output);
        let egui_ctx = gui.state.egui_ctx().clone();
        let clipped_primitives = egui_ctx.tessellate(full_output.shapes, full_output.pixels_per_point);

        for (id, delta) in &full_output.textures_delta.set {
            gui.renderer
                .update_texture(&context.device, &context.queue, *id, delta);
        }

        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [context.size.width, context.size.height],
            pixels_per_point: full_output.pixels_per_point,
        };

        let mut encoder = context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Egui Encoder"),
            });

        gui.renderer.update_buffers(
            &context.device,
            &context.queue,
            &mut encoder,
            &clipped_primitives,
            &screen_descriptor,
        );

        let load = if drew_scene {
            wgpu::LoadOp::Load
        } else {
            wgpu::LoadOp::Clear(wgpu::Color::BLACK)
        };

        {
            let render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Egui Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            let mut render_pass = render_pass.forget_lifetime();
            gui.renderer
                .render(&mut render_pass, &clipped_primitives, &screen_descriptor);
        }

        context.queue.submit(std::iter::once(encoder.finish()));

        for id in &full_output.textures_delta.free {
            gui.renderer.free_texture(id);
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window_attrs = Window::default_attributes()
            .with_title("Scene Demos")
            .with_inner_size(winit::dpi::LogicalSize::new(1280, 720));

        let window = match event_loop.create_window(window_attrs) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("Failed to create window: {}", e);
                event_loop.exit();
                return;
            }
        };
        self.window = Some(window.clone());

        let context = match pollster::block_on(GpuContext::new(window.clone())) {
            Ok(context) => context,
            Err(e) => {
                log::error!("{}", e);
                event_loop.exit();
                return;
            }
        };

        let egui_state = egui_winit::State::new(
            egui::Context::default(),
            egui::ViewportId::ROOT,
            &window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );
        let egui_renderer = egui_wgpu::Renderer::new(&context.device, context.config.format, None, 1, false);

        self.renderer = Some(SceneRenderer::new(&context));
        self.gui = Some(Gui {
            state: egui_state,
            renderer: egui_renderer,
        });
        self.host.attach(context);

        self.start_current();
        window.request_redraw();
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        if let (Some(gui), Some(window)) = (self.gui.as_mut(), self.window.as_ref()) {
            let response = gui.state.on_window_event(window, &event);
            if response.consumed {
                return;
            }
        }

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),

            WindowEvent::Resized(size) => {
                self.host.notify_resize(size.width, size.height);
                self.switcher.controller_mut().deliver_resizes(&mut self.host);
            }

            WindowEvent::KeyboardInput { event, .. } => {
                if event.state != ElementState::Pressed {
                    return;
                }
                let PhysicalKey::Code(code) = event.physical_key else {
                    return;
                };
                let mode = match code {
                    KeyCode::Escape => {
                        event_loop.exit();
                        return;
                    }
                    KeyCode::Digit1 => SceneMode::Model,
                    KeyCode::Digit2 => SceneMode::Primitive,
                    KeyCode::Digit3 => SceneMode::Planet,
                    KeyCode::Digit4 => SceneMode::Wormhole,
                    KeyCode::Digit5 => SceneMode::Physics,
                    _ => return,
                };
                self.select(mode);
            }

            WindowEvent::MouseInput { state, button, .. } => {
                let pressed = state == ElementState::Pressed && !self.gui_hovered;
                match button {
                    MouseButton::Left => {
                        self.left_pressed = pressed;
                        self.switcher.controller_mut().pointer_button(pressed);
                    }
                    MouseButton::Right => self.right_pressed = pressed,
                    _ => {}
                }
            }

            WindowEvent::CursorMoved { position, .. } => {
                let delta_x = (position.x - self.cursor.x) as f32;
                let delta_y = (position.y - self.cursor.y) as f32;
                self.cursor = position;

                let pointer = self.pointer_ndc(position);
                let controller = self.switcher.controller_mut();
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
                self.switcher.controller_mut().zoom(scroll);
            }

            WindowEvent::RedrawRequested => {
                let now_ms = self.started_at.elapsed().as_secs_f64() * 1000.0;
                self.switcher.controller_mut().frame(now_ms);
                self.render();

                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }

            _ => {}
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.switcher.stop(&mut self.host);
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let mode = match std::env::args().nth(1) {
        Some(name) => SceneMode::from_name(&name)
            .ok_or_else(|| anyhow::anyhow!("unknown mode '{name}', expected one of {:?}", SceneMode::ALL))?,
        None => SceneMode::default(),
    };

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(SceneConfig::new(mode));
    event_loop.run_app(&mut app)?;
    Ok(())
}
