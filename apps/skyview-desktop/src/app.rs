use crate::frame::FrameLimiter;
use anyhow::{Context, Result, anyhow};
use skyview_assets::GeometryLoader;
use skyview_input::{Action, InputState};
use skyview_render::{FlyCamera, GraphicsContext, Scene, ShaderLibrary, ViewerConfig};
use skyview_render_wgpu::WgpuBackend;
use std::sync::Arc;
use std::time::Instant;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{DeviceEvent, ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{CursorGrabMode, Window, WindowId};

/// Everything that exists only once the window is up.
struct Graphics {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    surface_config: wgpu::SurfaceConfiguration,
    ctx: GraphicsContext<WgpuBackend>,
    scene: Scene,
}

pub struct ViewerApp {
    config: ViewerConfig,
    camera: FlyCamera,
    input: InputState,
    limiter: FrameLimiter,
    graphics: Option<Graphics>,
    error: Option<anyhow::Error>,
}

fn action_for(key: KeyCode) -> Option<Action> {
    Some(match key {
        KeyCode::KeyW => Action::MoveForward,
        KeyCode::KeyS => Action::MoveBackward,
        KeyCode::KeyA => Action::MoveLeft,
        KeyCode::KeyD => Action::MoveRight,
        KeyCode::KeyQ => Action::MoveUp,
        KeyCode::KeyE => Action::MoveDown,
        KeyCode::ShiftLeft | KeyCode::ShiftRight => Action::Boost,
        KeyCode::Escape => Action::Quit,
        _ => return None,
    })
}

impl ViewerApp {
    pub fn new(config: ViewerConfig) -> Self {
        let aspect = config.window.width as f32 / config.window.height.max(1) as f32;
        Self {
            camera: FlyCamera::from_config(&config.camera, aspect),
            input: InputState::new(),
            limiter: FrameLimiter::new(config.target_fps),
            graphics: None,
            error: None,
            config,
        }
    }

    /// The error that stopped the event loop, if any.
    pub fn take_error(&mut self) -> Option<anyhow::Error> {
        self.error.take()
    }

    fn init_graphics(&self, event_loop: &ActiveEventLoop) -> Result<Graphics> {
        let attrs = Window::default_attributes()
            .with_title(self.config.window.title.clone())
            .with_inner_size(PhysicalSize::new(
                self.config.window.width,
                self.config.window.height,
            ));
        let window = Arc::new(event_loop.create_window(attrs).context("creating window")?);

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance
            .create_surface(window.clone())
            .context("creating surface")?;
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .ok_or_else(|| anyhow!("no compatible GPU adapter"))?;
        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("skyview_device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
            },
            None,
        ))
        .context("creating device")?;

        let size = window.inner_size();
        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or(caps.formats.first())
            .copied()
            .ok_or_else(|| anyhow!("surface reports no formats"))?;
        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);
        tracing::info!(
            "GPU initialized with {} backend",
            adapter.get_info().backend.to_str()
        );

        let backend = WgpuBackend::new(
            device,
            queue,
            format,
            surface_config.width,
            surface_config.height,
        );
        let mut ctx = GraphicsContext::init(
            backend,
            GeometryLoader::new(&self.config.asset_root, self.config.models.clone()),
            self.config.textures.clone(),
            ShaderLibrary::builtin(),
        );
        let scene = Scene::build(
            &mut ctx,
            &self.config.scene_description(),
            self.config.asset_policy,
        )
        .context("building scene")?;
        for name in scene.skipped() {
            tracing::warn!("object {name} is not shown");
        }

        if window
            .set_cursor_grab(CursorGrabMode::Confined)
            .or_else(|_| window.set_cursor_grab(CursorGrabMode::Locked))
            .is_err()
        {
            tracing::warn!("cursor grab unavailable");
        }
        window.set_cursor_visible(false);

        Ok(Graphics {
            window,
            surface,
            surface_config,
            ctx,
            scene,
        })
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        tracing::error!("{err:#}");
        self.error = Some(err);
        self.shutdown(event_loop);
    }

    /// Quit latched by Escape or a close request.
    fn exit_pending(&self) -> bool {
        self.input.quit_requested()
    }

    fn shutdown(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(mut graphics) = self.graphics.take() {
            graphics.ctx.teardown();
        }
        event_loop.exit();
    }

    fn resize(&mut self, size: PhysicalSize<u32>) {
        let Some(graphics) = &mut self.graphics else {
            return;
        };
        if size.width == 0 || size.height == 0 {
            return;
        }
        graphics.surface_config.width = size.width;
        graphics.surface_config.height = size.height;
        graphics
            .surface
            .configure(graphics.ctx.backend().device(), &graphics.surface_config);
        graphics.ctx.backend_mut().resize(size.width, size.height);
        self.camera.set_aspect(size.width, size.height);
    }

    fn redraw(&mut self) -> Result<()> {
        let dt = self.limiter.tick();
        let look = self.input.take_mouse_delta();
        self.camera.rotate(look.x, look.y);
        self.camera
            .apply_movement(self.input.movement(), self.input.speed_factor(), dt);

        let Some(graphics) = &mut self.graphics else {
            return Ok(());
        };
        let output = match graphics.surface.get_current_texture() {
            Ok(t) => t,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                graphics
                    .surface
                    .configure(graphics.ctx.backend().device(), &graphics.surface_config);
                return Ok(());
            }
            Err(e) => {
                tracing::error!("surface error: {e}");
                return Ok(());
            }
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        graphics.ctx.backend_mut().attach_target(view);

        let frame = self.camera.frame_uniforms(&self.config.light);
        let stats = graphics
            .scene
            .render(&mut graphics.ctx, &frame, self.config.clear_color)
            .context("rendering frame")?;
        output.present();

        if self.limiter.frame_index() % 600 == 1 {
            tracing::debug!(
                "frame {}: {} draws, {} vertices",
                self.limiter.frame_index(),
                stats.draws,
                stats.vertices
            );
        }
        Ok(())
    }
}

impl ApplicationHandler for ViewerApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.graphics.is_some() {
            return;
        }
        match self.init_graphics(event_loop) {
            Ok(graphics) => {
                self.camera.set_aspect(
                    graphics.surface_config.width,
                    graphics.surface_config.height,
                );
                graphics.window.request_redraw();
                self.graphics = Some(graphics);
            }
            Err(err) => self.fail(event_loop, err.context("startup failed")),
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                self.input.press(Action::Quit);
            }
            WindowEvent::Resized(size) => self.resize(size),
            WindowEvent::Focused(false) => self.input.clear_held(),
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key),
                        state,
                        ..
                    },
                ..
            } => {
                if let Some(action) = action_for(key) {
                    match state {
                        ElementState::Pressed => self.input.press(action),
                        ElementState::Released => self.input.release(action),
                    }
                }
            }
            WindowEvent::RedrawRequested => {
                if let Err(err) = self.redraw() {
                    self.fail(event_loop, err);
                    return;
                }
                if self.exit_pending() {
                    self.shutdown(event_loop);
                }
            }
            _ => {}
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: winit::event::DeviceId,
        event: DeviceEvent,
    ) {
        if let DeviceEvent::MouseMotion { delta } = event {
            self.input.mouse_motion(delta.0 as f32, delta.1 as f32);
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.exit_pending() {
            self.shutdown(event_loop);
            return;
        }
        let Some(graphics) = &self.graphics else {
            return;
        };
        if self.limiter.is_due(Instant::now()) {
            graphics.window.request_redraw();
        }
        match self.limiter.deadline() {
            Some(deadline) => event_loop.set_control_flow(ControlFlow::WaitUntil(deadline)),
            None => event_loop.set_control_flow(ControlFlow::Poll),
        }
    }
}
