use std::sync::Arc;
use std::time::Duration;

use glam::Vec2;
use instant::Instant;
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowAttributes, WindowId, WindowLevel};

use crate::assets::{self, AssetError, FrameLoader, SpriteCatalog};
use crate::click::{ClickState, SpriteRect};
use crate::pet::behavior::Effect;
use crate::pet::mode::Mode;
use crate::pet::Pet;
use crate::platform::{self, DesktopWindows, SystemIdle};
use crate::render::pipeline::SpriteUniform;
use crate::render::present::{sprite_origin, Presenter};
use crate::render::{GpuError, GpuState};
use crate::surface::SurfaceTracker;
use crate::tray::{TrayCommand, TrayError, TrayIcon};
use crate::tuning::Tuning;

/// Seconds per simulation tick.
const TICK_RATE: f64 = 1.0 / 60.0;
/// Backlog cap after a stall, in seconds.
const MAX_ACCUMULATOR: f64 = 0.25;
/// Seconds between frame-time log lines.
const FPS_LOG_INTERVAL: f64 = 5.0;
/// Tray poll cadence while the overlay is hidden.
const HIDDEN_POLL: Duration = Duration::from_millis(100);

/// Anything that stops the pet from appearing at all.
#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    #[error(transparent)]
    Assets(#[from] AssetError),
    #[error(transparent)]
    Gpu(#[from] GpuError),
    #[error(transparent)]
    Tray(#[from] TrayError),
    #[error("failed to create overlay window: {0}")]
    Window(#[from] winit::error::OsError),
    #[error("event loop failed: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
    #[error("no monitor found")]
    NoMonitor,
}

/// Frame-time summary logged every [`FPS_LOG_INTERVAL`] seconds.
struct FrameStats {
    total: u64,
    window_start: Instant,
    frames: u32,
    sum: f64,
    worst: f64,
}

impl FrameStats {
    fn new() -> Self {
        Self {
            total: 0,
            window_start: Instant::now(),
            frames: 0,
            sum: 0.0,
            worst: 0.0,
        }
    }

    fn record_frame(&mut self, dt: f64) {
        self.total += 1;
        self.frames += 1;
        self.sum += dt;
        self.worst = self.worst.max(dt);

        let elapsed = self.window_start.elapsed().as_secs_f64();
        if elapsed < FPS_LOG_INTERVAL {
            return;
        }
        log::info!(
            "FPS: {:.0} | avg: {:.2}ms | worst: {:.2}ms | frames: {}",
            f64::from(self.frames) / elapsed,
            self.sum / f64::from(self.frames) * 1000.0,
            self.worst * 1000.0,
            self.total,
        );
        *self = Self {
            total: self.total,
            ..Self::new()
        };
    }
}

/// Everything that exists once the overlay is up.
struct Running {
    window: Arc<Window>,
    gpu: GpuState,
    tray: TrayIcon,
    catalog: SpriteCatalog,
    tracker: SurfaceTracker<DesktopWindows>,
    pet: Pet,
}

struct App {
    tuning: Tuning,
    running: Option<Running>,
    launch_error: Option<LaunchError>,

    presenter: Presenter,
    clicks: ClickState,
    idle: SystemIdle,
    rng: fastrand::Rng,

    last_frame_time: Option<Instant>,
    accumulator: f64,
    frame_stats: FrameStats,

    screen_w: f32,
    screen_h: f32,
    visible: bool,
}

impl App {
    fn new() -> Self {
        Self {
            tuning: Tuning::default(),
            running: None,
            launch_error: None,
            presenter: Presenter::new(),
            clicks: ClickState::new(),
            idle: SystemIdle,
            rng: fastrand::Rng::new(),
            last_frame_time: None,
            accumulator: 0.0,
            frame_stats: FrameStats::new(),
            screen_w: 0.0,
            screen_h: 0.0,
            visible: false,
        }
    }

    fn launch(&mut self, event_loop: &ActiveEventLoop) -> Result<(), LaunchError> {
        // Load frames before any window exists so a missing install fails cleanly.
        let loader = FrameLoader::from_environment();
        let mut catalog = assets::load_catalog(&loader)?;

        let monitor = event_loop
            .primary_monitor()
            .or_else(|| event_loop.available_monitors().next())
            .ok_or(LaunchError::NoMonitor)?;
        let screen_size = monitor.size();

        // No with_transparent(true): WS_EX_LAYERED would fight DirectComposition.
        // Start hidden so DWM doesn't cache a frame from before the overlay styles.
        let attrs = WindowAttributes::default()
            .with_title("Perch Cat")
            .with_decorations(false)
            .with_visible(false)
            .with_window_level(WindowLevel::AlwaysOnTop)
            .with_inner_size(screen_size)
            .with_position(winit::dpi::PhysicalPosition::new(0, 0));

        let window = Arc::new(event_loop.create_window(attrs)?);
        platform::setup_overlay(&window);

        let size = window.inner_size();
        self.screen_w = size.width as f32;
        self.screen_h = size.height as f32;
        log::info!(
            "Overlay window created: {}x{} on {:?}",
            size.width,
            size.height,
            monitor.name().unwrap_or_default()
        );

        let gpu = GpuState::new(window.clone(), &catalog)?;
        catalog.drop_pixels();
        log::info!("wgpu + sprite pipeline initialized");

        let tray = TrayIcon::new()?;

        let tracker = SurfaceTracker::new(
            DesktopWindows::new(Some(&window)),
            own_executable_name(),
            self.tuning.fallback_screen,
        );

        let mut pet = Pet::spawn(
            self.tuning.clone(),
            catalog.sizes().clone(),
            self.screen_w,
            &mut self.rng,
        );
        let effects = pet.start(&mut self.rng);

        self.running = Some(Running {
            window: window.clone(),
            gpu,
            tray,
            catalog,
            tracker,
            pet,
        });
        self.apply(effects);

        event_loop.set_control_flow(ControlFlow::Poll);

        // Show only once styles and GPU resources are ready (avoids the white box).
        window.set_visible(true);
        self.visible = true;
        Ok(())
    }

    /// Push the pet's effects into the presenter.
    fn apply(&mut self, effects: Vec<Effect>) {
        let Some(running) = &self.running else {
            return;
        };
        for effect in effects {
            match effect {
                Effect::Show(shown) => match running.catalog.layer(shown.frame, shown.facing) {
                    Some(layer) => {
                        self.presenter
                            .show(layer, shown.fade, shown.scale, shown.breathe)
                    }
                    None => log::debug!("No layer for {:?}", shown.frame),
                },
                Effect::ModeChanged(mode) => log::trace!("Presenting {mode:?}"),
            }
        }
    }

    /// Step the pet in fixed ticks until the accumulator drains.
    fn run_fixed_update(&mut self, dt: f64) {
        self.accumulator = (self.accumulator + dt).min(MAX_ACCUMULATOR);

        while self.accumulator >= TICK_RATE {
            let step = TICK_RATE as f32;
            let Some(running) = &mut self.running else {
                return;
            };
            let surfaces = running.tracker.walkable_surfaces(Instant::now());
            let mut effects = running
                .pet
                .tick(step, &surfaces, self.screen_w, &mut self.rng);
            effects.extend(running.pet.poll_idle(step, &self.idle, &mut self.rng));
            self.apply(effects);
            self.presenter.advance(step);

            self.accumulator -= TICK_RATE;
        }
    }

    /// Where the sprite sits on screen, in window pixels.
    fn sprite_rect(&self) -> Option<SpriteRect> {
        let running = self.running.as_ref()?;
        self.presenter.blend()?;
        let size = self.tuning.sprite_size;
        Some(SpriteRect {
            origin: sprite_origin(running.pet.position(), self.screen_h, size),
            size: Vec2::new(size.0, size.1),
        })
    }

    fn sprite_uniform(&self) -> Option<SpriteUniform> {
        let blend = self.presenter.blend()?;
        let rect = self.sprite_rect()?;
        Some(SpriteUniform {
            screen: [self.screen_w, self.screen_h],
            origin: rect.origin.to_array(),
            size: rect.size.to_array(),
            mix: blend.mix,
            scale_y: blend.scale_y,
            layer_from: blend.from,
            layer_to: blend.to,
            _pad: [0; 2],
        })
    }

    fn toggle(&mut self) {
        let Some(running) = &mut self.running else {
            return;
        };
        if self.visible {
            let effects = running.pet.suspend(&mut self.rng);
            running.window.set_visible(false);
            self.visible = false;
            log::info!("Hidden from tray");
            self.apply(effects);
        } else {
            running.window.set_visible(true);
            self.visible = true;
            self.last_frame_time = None;
            self.accumulator = 0.0;
            let effects = running.pet.start(&mut self.rng);
            log::info!("Shown from tray");
            self.apply(effects);
        }
    }

    fn quit(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(running) = &mut self.running {
            let _ = running.pet.suspend(&mut self.rng);
            running.tray.remove();
        }
        log::info!("Quit from tray, exiting");
        event_loop.exit();
    }

    /// Right click on the sprite opens the interaction menu.
    fn poll_sprite_click(&mut self) {
        let (x, y) = platform::cursor_pos();
        let rect = self.sprite_rect().filter(|_| self.visible);
        if !self
            .clicks
            .right_clicked_on(platform::right_button_down(), Vec2::new(x, y), rect)
        {
            return;
        }
        let Some(running) = &mut self.running else {
            return;
        };
        if running.pet.mode() == Mode::Jumping {
            return;
        }
        let effects = running.pet.open_menu(&mut self.rng);
        self.apply(effects);
        // The popup blocks the loop, so the seated pose goes out now.
        self.draw();

        let Some(running) = &mut self.running else {
            return;
        };
        let choice = running.tray.popup_interaction();
        if let Some(kind) = choice {
            log::info!("{} from context menu", kind.label());
        }
        let effects = running.pet.close_menu(choice, &mut self.rng);
        self.apply(effects);
    }

    fn draw(&mut self) {
        let uniform = self.sprite_uniform();
        if let Some(running) = &mut self.running {
            if let Some(uniform) = uniform {
                running.gpu.update_sprite(&uniform);
            }
            running.gpu.render_frame();
        }
    }
}

/// File name of our own executable, so its windows are never surfaces.
fn own_executable_name() -> String {
    std::env::current_exe()
        .ok()
        .and_then(|path| path.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_default()
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.running.is_some() || self.launch_error.is_some() {
            return;
        }
        if let Err(e) = self.launch(event_loop) {
            log::error!("Launch aborted: {e}");
            self.launch_error = Some(e);
            event_loop.exit();
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let command = match &mut self.running {
            Some(running) => running.tray.poll(),
            None => return,
        };
        match command {
            TrayCommand::Quit => {
                self.quit(event_loop);
                return;
            }
            TrayCommand::Toggle => self.toggle(),
            TrayCommand::None => {}
        }

        if !self.visible {
            event_loop.set_control_flow(ControlFlow::WaitUntil(
                std::time::Instant::now() + HIDDEN_POLL,
            ));
            return;
        }
        event_loop.set_control_flow(ControlFlow::Poll);

        self.poll_sprite_click();

        if let Some(running) = &self.running {
            running.window.request_redraw();
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
                log::info!("Close requested, exiting");
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                if let Some(running) = &mut self.running {
                    running.gpu.resize(new_size.width, new_size.height);
                    self.screen_w = new_size.width as f32;
                    self.screen_h = new_size.height as f32;
                }
            }
            WindowEvent::RedrawRequested => {
                if !self.visible {
                    return;
                }

                let now = Instant::now();
                if let Some(last) = self.last_frame_time {
                    let dt = now.duration_since(last).as_secs_f64();
                    self.frame_stats.record_frame(dt);
                    self.run_fixed_update(dt);
                }
                self.last_frame_time = Some(now);

                self.draw();
            }
            _ => {}
        }
    }
}

/// Entry point: create the event loop and run until quit.
pub fn run() -> Result<(), LaunchError> {
    let event_loop = EventLoop::new()?;
    let mut app = App::new();
    event_loop.run_app(&mut app)?;
    app.launch_error.take().map_or(Ok(()), Err)
}
