//! Application event loop.
//!
//! [`App`] owns the window and the [`Aquarium`] driving a [`WgpuBackend`]. It is
//! a winit [`ApplicationHandler`]: the aquarium is created once the event loop
//! resumes, rendered on every redraw and dropped, which releases all GPU
//! resources, before the loop exits.
//!
//! # Lifecycle
//!
//! 1. `resumed` creates the window, loads the scene and creates the backend
//! 2. `RedrawRequested` renders one frame and requests the next
//! 3. Escape or closing the window requests a quit, honoured on the next frame
//! 4. `exiting` shuts the aquarium down

use std::sync::Arc;

use instant::Instant;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{Key, NamedKey},
    window::{Fullscreen, Window},
};

use crate::{
    aquarium::{Aquarium, FrameOutcome},
    backend::Toggles,
    config::{Config, resolve_toggles},
    context::WgpuBackend,
    resources::load_scene,
};

pub struct App {
    async_runtime: tokio::runtime::Runtime,
    config: Option<Config>,
    toggles: Toggles,
    window: Option<Arc<Window>>,
    aquarium: Option<Aquarium<WgpuBackend>>,
    last_time: Instant,
    frames: u64,
    frame_limit: Option<u64>,
    failure: Option<anyhow::Error>,
}

impl App {
    fn new(config: Config, toggles: Toggles, frame_limit: Option<u64>) -> anyhow::Result<Self> {
        Ok(Self {
            async_runtime: tokio::runtime::Runtime::new()?,
            config: Some(config),
            toggles,
            window: None,
            aquarium: None,
            last_time: Instant::now(),
            frames: 0,
            frame_limit,
            failure: None,
        })
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        log::error!("{:#}", error);
        self.failure = Some(error);
        event_loop.exit();
    }

    /// Frames rendered so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        // Only the first resume creates the aquarium
        let Some(config) = self.config.take() else {
            return;
        };

        let (width, height) = config.window_size;
        let mut window_attributes = Window::default_attributes()
            .with_title(format!("Aquarium ({})", config.backend))
            .with_inner_size(PhysicalSize::new(width, height));
        if config.enable_full_screen_mode {
            window_attributes =
                window_attributes.with_fullscreen(Some(Fullscreen::Borderless(None)));
        }
        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => return self.fail(event_loop, e.into()),
        };

        let runtime = &self.async_runtime;
        let surface_window = window.clone();
        let aquarium = Aquarium::init(
            config,
            self.toggles,
            |config| runtime.block_on(load_scene(&config.assets)),
            |config, toggles| {
                runtime.block_on(WgpuBackend::new(surface_window, config.backend, toggles))
            },
        );
        match aquarium {
            Ok(aquarium) => {
                self.aquarium = Some(aquarium);
                self.last_time = Instant::now();
                window.request_redraw();
                self.window = Some(window);
            }
            Err(e) => self.fail(event_loop, e.into()),
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let Some(aquarium) = self.aquarium.as_mut() else {
            return;
        };

        match event {
            WindowEvent::CloseRequested
            | WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        logical_key: Key::Named(NamedKey::Escape),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => {
                aquarium.request_quit();
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            WindowEvent::Resized(size) => aquarium.resize(size.width, size.height),
            WindowEvent::RedrawRequested => {
                let dt = self.last_time.elapsed();
                self.last_time = Instant::now();

                match aquarium.render(dt) {
                    Ok(FrameOutcome::Rendered) => {
                        self.frames += 1;
                        if self.frame_limit.is_some_and(|limit| self.frames >= limit) {
                            aquarium.request_quit();
                        }
                        if let Some(window) = &self.window {
                            window.request_redraw();
                        }
                    }
                    Ok(FrameOutcome::Quit) => event_loop.exit(),
                    Err(e) => self.fail(event_loop, e.into()),
                }
            }
            _ => {}
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        // Release GPU resources while the window is still alive
        self.aquarium = None;
        self.window = None;
    }
}

fn event_loop() -> anyhow::Result<EventLoop<()>> {
    #[cfg(all(feature = "integration-tests", target_os = "linux"))]
    let event_loop = {
        use winit::platform::wayland::EventLoopBuilderExtWayland;

        EventLoop::builder().with_any_thread(true).build()?
    };

    #[cfg(all(feature = "integration-tests", target_os = "windows"))]
    let event_loop = {
        use winit::platform::windows::EventLoopBuilderExtWindows;

        EventLoop::builder().with_any_thread(true).build()?
    };

    #[cfg(not(all(
        feature = "integration-tests",
        any(target_os = "linux", target_os = "windows")
    )))]
    let event_loop = EventLoop::new()?;

    Ok(event_loop)
}

fn run_app(config: Config, frame_limit: Option<u64>) -> anyhow::Result<u64> {
    if let Err(e) = env_logger::try_init() {
        println!("Warning: Could not initialize logger: {}", e);
    };

    // Fail before a window opens
    let toggles = resolve_toggles(&config)?;

    let event_loop = event_loop()?;
    let mut app = App::new(config, toggles, frame_limit)?;
    event_loop.run_app(&mut app)?;

    match app.failure.take() {
        Some(error) => Err(error),
        None => Ok(app.frames()),
    }
}

/// Run the benchmark until it is closed or its test time elapses.
pub fn run(config: Config) -> anyhow::Result<()> {
    run_app(config, None).map(|_| ())
}

/// Render `frames` frames, then quit. Returns the number of frames rendered.
pub fn run_frames(config: Config, frames: u64) -> anyhow::Result<u64> {
    run_app(config, Some(frames))
}
