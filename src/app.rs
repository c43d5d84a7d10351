use std::sync::Arc;

use glam::IVec2;
use instant::Instant;
use winit::application::ApplicationHandler;
use winit::event::{ElementState, MouseButton, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowAttributes, WindowId, WindowLevel};

use crate::anim::{AnimKind, AnimationEngine};
use crate::bubble::{Bubble, BUBBLE_DURATION};
use crate::config::ConfigStore;
use crate::events::{EventHub, PetEvent, SubscriberId};
use crate::follow::{FollowController, ScreenRect};
use crate::interact::{ClickAction, InteractionState};
use crate::pet::{self, Pet, WINDOW_SIZE};
use crate::render::GpuState;
use crate::sched::{Scheduler, Ticker, TimerToken};
use crate::tray::{TrayCommand, TrayIcon};
use crate::ui::PetUi;

/// Seconds per animation frame (~30 fps).
const ANIM_TICK: f64 = 0.033;
/// Seconds per cursor-follow tick (~60 fps).
const MOTION_TICK: f64 = 0.016;
/// How often to log FPS (seconds).
const FPS_LOG_INTERVAL: f64 = 5.0;

// ---------------------------------------------------------------------------
// Frame timing
// ---------------------------------------------------------------------------

struct FrameStats {
    frame_count: u64,
    last_log_time: Instant,
    frame_time_sum: f64,
    frame_time_min: f64,
    frame_time_max: f64,
    frames_since_log: u32,
}

impl FrameStats {
    fn new() -> Self {
        Self {
            frame_count: 0,
            last_log_time: Instant::now(),
            frame_time_sum: 0.0,
            frame_time_min: f64::MAX,
            frame_time_max: 0.0,
            frames_since_log: 0,
        }
    }

    fn record_frame(&mut self, dt: f64) {
        self.frame_count += 1;
        self.frames_since_log += 1;
        self.frame_time_sum += dt;
        self.frame_time_min = self.frame_time_min.min(dt);
        self.frame_time_max = self.frame_time_max.max(dt);

        let elapsed = self.last_log_time.elapsed().as_secs_f64();
        if elapsed >= FPS_LOG_INTERVAL {
            let avg_ms = (self.frame_time_sum / self.frames_since_log as f64) * 1000.0;
            let fps = self.frames_since_log as f64 / elapsed;
            log::debug!(
                "FPS: {:.0} | avg: {:.2}ms | min: {:.2}ms | max: {:.2}ms | total frames: {}",
                fps,
                avg_ms,
                self.frame_time_min * 1000.0,
                self.frame_time_max * 1000.0,
                self.frame_count,
            );
            self.last_log_time = Instant::now();
            self.frame_time_sum = 0.0;
            self.frame_time_min = f64::MAX;
            self.frame_time_max = 0.0;
            self.frames_since_log = 0;
        }
    }
}

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

/// Top-level application state.
struct App {
    window: Option<Arc<Window>>,
    gpu: Option<GpuState>,
    ui: Option<PetUi>,
    tray: Option<TrayIcon>,

    config: ConfigStore,
    events: EventHub,
    log_sub: SubscriberId,
    sched: Scheduler,
    anim: AnimationEngine,
    follow: FollowController,
    interact: InteractionState,
    bubble: Bubble,
    pet: Pet,
    rng: fastrand::Rng,

    // Animation and follow run on their own cadences off the render loop.
    anim_ticker: Ticker,
    motion_ticker: Ticker,
    last_frame_time: Option<Instant>,
    frame_stats: FrameStats,

    screen: ScreenRect,
    /// Window position last pushed to the OS. `pet.window_pos()` is only
    /// applied when it differs, so a settled pet costs no window moves.
    applied_window_pos: IVec2,

    // Primary-button state for click vs drag classification.
    pressed: bool,
    grab_local: IVec2,
    local_cursor: IVec2,

    quit_requested: bool,
}

impl App {
    fn new() -> Self {
        let config = ConfigStore::load();

        let mut events = EventHub::new();
        let log_sub = events.subscribe(|event| log::debug!("pet event: {event:?}"));

        let pet = Pet::new(IVec2::new(config.state.x, config.state.y), config.state.state);
        let follow = FollowController::new(config.user.follow_enabled);

        Self {
            window: None,
            gpu: None,
            ui: None,
            tray: None,
            config,
            events,
            log_sub,
            sched: Scheduler::new(),
            anim: AnimationEngine::new(),
            follow,
            interact: InteractionState::new(),
            bubble: Bubble::new(),
            pet,
            rng: fastrand::Rng::new(),
            anim_ticker: Ticker::new(ANIM_TICK),
            motion_ticker: Ticker::new(MOTION_TICK),
            last_frame_time: None,
            frame_stats: FrameStats::new(),
            screen: ScreenRect::new(0, 0, 0, 0),
            applied_window_pos: IVec2::ZERO,
            pressed: false,
            grab_local: IVec2::ZERO,
            local_cursor: IVec2::ZERO,
            quit_requested: false,
        }
    }

    /// Advance timers, animation, and cursor follow by one frame.
    fn advance(&mut self, dt: f64, now: Instant) {
        let cmd = self
            .tray
            .as_mut()
            .map(|t| t.poll())
            .unwrap_or(TrayCommand::None);
        match cmd {
            TrayCommand::None => {}
            TrayCommand::Quit => {
                log::info!("Quit from tray menu");
                self.quit_requested = true;
            }
            TrayCommand::ToggleFollow => self.apply_follow(!self.follow.enabled()),
            TrayCommand::Greet => self.greet(now),
            TrayCommand::OpenSettings => {
                let name = self.config.user.user_name.clone();
                let enabled = self.config.user.follow_enabled;
                if let Some(ui) = &mut self.ui {
                    ui.open_settings(&name, enabled);
                }
            }
            TrayCommand::About => self.about(now),
        }

        // One-shot timers.
        let due: Vec<TimerToken> = self.sched.tick(now).to_vec();
        for token in due {
            match token {
                TimerToken::TurnBack => {
                    if self.anim.turn_back(&mut self.sched) {
                        self.events.publish(&PetEvent::AnimationStarted {
                            kind: AnimKind::TurnAround,
                        });
                    }
                }
                TimerToken::HideBubble => {
                    if self.bubble.on_hide_timer() {
                        self.events.publish(&PetEvent::BubbleHidden);
                    }
                }
                TimerToken::ResetClicks => self.interact.on_reset_timer(),
            }
        }

        // Animation frames.
        for _ in 0..self.anim_ticker.advance(dt) {
            let before = self.pet.state;
            if let Some(kind) = self.anim.step(&mut self.pet.state, &mut self.sched, now) {
                self.events.publish(&PetEvent::AnimationEnded { kind });
                if self.pet.state != before {
                    self.events.publish(&PetEvent::StateChanged {
                        from: before,
                        to: self.pet.state,
                    });
                    self.config.set_pet_state(self.pet.state);
                }
            }
        }
        self.pet.offset = self.anim.offset();

        // Cursor follow. The cursor is sampled once per frame, not per tick.
        #[cfg(windows)]
        let (cx, cy) = crate::platform::win32::cursor_pos();
        #[cfg(not(windows))]
        let (cx, cy) = {
            let p = self.applied_window_pos + self.local_cursor;
            (p.x, p.y)
        };
        let cursor = IVec2::new(cx, cy);

        let mut moved = false;
        for _ in 0..self.motion_ticker.advance(dt) {
            if let Some(base) = self.follow.update(
                cursor,
                self.pet.base,
                self.screen,
                self.interact.dragging,
                self.anim.is_animating(),
            ) {
                self.pet.base = base;
                moved = true;
            }
        }
        if moved {
            self.events.publish(&PetEvent::Moved {
                x: self.pet.base.x,
                y: self.pet.base.y,
            });
        }

        // Push the composed position to the OS only when it changed.
        let desired = self.pet.window_pos();
        if desired != self.applied_window_pos {
            if let Some(window) = &self.window {
                window.set_outer_position(winit::dpi::PhysicalPosition::new(desired.x, desired.y));
            }
            self.applied_window_pos = desired;
        }
    }

    /// Classify one primary-button press and kick off what it asks for.
    /// The burst action dispatches before any double-click sway, so a third
    /// click that is also a double-click turns, and the sway is dropped by
    /// animation exclusivity.
    fn on_primary_press(&mut self) {
        let now = Instant::now();
        let outcome = self.interact.on_press(now, &mut self.sched);

        match outcome.action {
            ClickAction::Greet => self.greet(now),
            ClickAction::TurnAround => {
                if self.anim.start_turn(&mut self.sched) {
                    self.events.publish(&PetEvent::AnimationStarted {
                        kind: AnimKind::TurnAround,
                    });
                }
            }
        }
        if outcome.sway && self.anim.start_sway() {
            self.events.publish(&PetEvent::AnimationStarted {
                kind: AnimKind::Sway,
            });
        }
    }

    fn greet(&mut self, now: Instant) {
        let message = pet::pick_greeting(&mut self.rng, &self.config.user.user_name);
        self.bubble
            .show(message.clone(), BUBBLE_DURATION, &mut self.sched, now);
        self.events.publish(&PetEvent::Greeted { message });
        self.events.publish(&PetEvent::BubbleShown);
    }

    fn about(&mut self, now: Instant) {
        let message =
            concat!("Deskpet v", env!("CARGO_PKG_VERSION"), " - your desktop companion").to_string();
        self.bubble.show(message, BUBBLE_DURATION, &mut self.sched, now);
        self.events.publish(&PetEvent::BubbleShown);
    }

    fn apply_follow(&mut self, enabled: bool) {
        if self.follow.enabled() == enabled {
            return;
        }
        self.follow.set_enabled(enabled);
        self.config.set_follow_enabled(enabled);
        if let Some(tray) = &mut self.tray {
            tray.set_follow_state(enabled);
        }
        self.events.publish(&PetEvent::FollowChanged { enabled });
        log::info!("Cursor follow {}", if enabled { "on" } else { "off" });
    }

    /// Run egui and draw the frame.
    fn render(&mut self) {
        let Some(window) = self.window.clone() else {
            return;
        };
        let (Some(gpu), Some(ui)) = (self.gpu.as_mut(), self.ui.as_mut()) else {
            return;
        };

        ui.pet_state = self.pet.state;
        ui.bubble_text = self.bubble.text().map(str::to_string);

        let (primitives, textures_delta, screen_descriptor) =
            ui.run_frame(&window, gpu.surface_config.width, gpu.surface_config.height);

        if ui.settings_saved {
            ui.settings_saved = false;
            let name = ui.name_buffer.trim();
            if !name.is_empty() && name != self.config.user.user_name {
                self.config.set_user_name(name);
            }
            let enabled = ui.follow_checkbox;
            if enabled != self.follow.enabled() {
                self.follow.set_enabled(enabled);
                self.config.set_follow_enabled(enabled);
                if let Some(tray) = &mut self.tray {
                    tray.set_follow_state(enabled);
                }
                self.events.publish(&PetEvent::FollowChanged { enabled });
            }
            log::info!("Settings saved");
        }

        let Some(mut frame) = gpu.begin_frame() else {
            return;
        };

        let egui_cmd_bufs = ui.prepare_egui(
            &gpu.device,
            &gpu.queue,
            &mut frame.encoder,
            &primitives,
            &textures_delta,
            &screen_descriptor,
        );

        {
            let mut pass = GpuState::begin_egui_pass(&mut frame.encoder, &frame.view);
            ui.render_egui(&mut pass, &primitives, &screen_descriptor);
        }

        gpu.finish_frame(frame.encoder, frame.output, egui_cmd_bufs);
        ui.free_textures(&textures_delta);
    }

    /// Cancel component timers, persist position and facing, drop the tray.
    fn shutdown(&mut self) {
        log::info!("Shutting down");
        self.anim.shutdown(&mut self.sched);
        self.bubble.shutdown(&mut self.sched);
        self.interact.shutdown(&mut self.sched);
        // Each component cancels exactly the timers it created.
        debug_assert_eq!(self.sched.pending_count(), 0);
        self.events.unsubscribe(self.log_sub);
        self.config.set_position(self.pet.base.x, self.pet.base.y);
        self.config.set_pet_state(self.pet.state);
        self.tray = None;
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let monitor = event_loop
            .primary_monitor()
            .or_else(|| event_loop.available_monitors().next())
            .expect("no monitor found");
        let size = monitor.size();
        let pos = monitor.position();
        self.screen = ScreenRect::new(pos.x, pos.y, size.width as i32, size.height as i32);

        // A monitor change since last run could strand the saved position.
        let max_x = (self.screen.x + self.screen.w - WINDOW_SIZE).max(self.screen.x);
        let max_y = (self.screen.y + self.screen.h - WINDOW_SIZE).max(self.screen.y);
        self.pet.base.x = self.pet.base.x.clamp(self.screen.x, max_x);
        self.pet.base.y = self.pet.base.y.clamp(self.screen.y, max_y);

        // No with_transparent(true) — that sets WS_EX_LAYERED which creates
        // a GDI backing surface that conflicts with DirectComposition.
        // Transparency comes from wgpu's DxgiFromVisual + PreMultiplied alpha.
        // Start hidden so DWM doesn't cache stale frame state before our
        // overlay style changes take effect.
        let attrs = WindowAttributes::default()
            .with_title("Deskpet")
            .with_decorations(false)
            .with_resizable(false)
            .with_visible(false)
            .with_window_level(WindowLevel::AlwaysOnTop)
            .with_inner_size(winit::dpi::PhysicalSize::new(
                WINDOW_SIZE as u32,
                WINDOW_SIZE as u32,
            ))
            .with_position(winit::dpi::PhysicalPosition::new(
                self.pet.base.x,
                self.pet.base.y,
            ));

        let window = Arc::new(
            event_loop
                .create_window(attrs)
                .expect("failed to create window"),
        );

        #[cfg(windows)]
        crate::platform::win32::setup_overlay(&window);

        self.applied_window_pos = self.pet.base;

        log::info!(
            "Pet window created at {},{} on {:?}",
            self.pet.base.x,
            self.pet.base.y,
            monitor.name().unwrap_or_default()
        );

        let gpu = GpuState::new(window.clone());
        let ui = PetUi::new(&window, &gpu);
        self.gpu = Some(gpu);
        self.ui = Some(ui);

        let mut tray = TrayIcon::new();
        tray.set_follow_state(self.config.user.follow_enabled);
        self.tray = Some(tray);

        // Continuous loop: animation and follow cadences tick off frame time.
        event_loop.set_control_flow(ControlFlow::Poll);

        // Show window now that all styles and GPU resources are ready.
        // This prevents DWM from caching stale frame state (the "white box").
        window.set_visible(true);

        self.window = Some(window);
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(w) = &self.window {
            w.request_redraw();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        // egui sees every event first; it owns the ones aimed at its windows.
        let consumed = if let (Some(window), Some(ui)) = (&self.window, &mut self.ui) {
            ui.on_window_event(window, &event)
        } else {
            false
        };

        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested, exiting");
                self.shutdown();
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                if let Some(gpu) = &mut self.gpu {
                    gpu.resize(new_size.width, new_size.height);
                }
            }
            WindowEvent::CursorEntered { .. } => {
                self.follow.cursor_entered_window();
            }
            WindowEvent::CursorMoved { position, .. } => {
                let local = IVec2::new(position.x as i32, position.y as i32);
                self.local_cursor = local;
                if consumed {
                    return;
                }
                if self.pressed {
                    if !self.interact.dragging && local != self.grab_local {
                        self.interact.dragging = true;
                        log::debug!("Drag started");
                    }
                    if self.interact.dragging {
                        // Reposition so the grab point stays under the cursor.
                        // Derived from the applied position, not the base, so
                        // queued cursor events before the window catches up
                        // don't compound.
                        self.pet.base =
                            self.applied_window_pos + (local - self.grab_local) - self.pet.offset;
                    }
                }
            }
            WindowEvent::MouseInput {
                state: ElementState::Pressed,
                button: MouseButton::Left,
                ..
            } => {
                if consumed {
                    return;
                }
                self.pressed = true;
                self.grab_local = self.local_cursor;
                self.on_primary_press();
            }
            WindowEvent::MouseInput {
                state: ElementState::Released,
                button: MouseButton::Left,
                ..
            } => {
                // A drag must end even if the release lands on an egui window.
                if self.interact.dragging {
                    self.interact.dragging = false;
                    self.config.set_position(self.pet.base.x, self.pet.base.y);
                    self.events.publish(&PetEvent::Moved {
                        x: self.pet.base.x,
                        y: self.pet.base.y,
                    });
                    log::debug!("Drag ended at {},{}", self.pet.base.x, self.pet.base.y);
                }
                self.pressed = false;
            }
            WindowEvent::RedrawRequested => {
                let now = Instant::now();
                if let Some(last) = self.last_frame_time {
                    let dt = now.duration_since(last).as_secs_f64();
                    self.frame_stats.record_frame(dt);
                    self.advance(dt, now);
                }
                self.last_frame_time = Some(now);

                if self.quit_requested {
                    self.shutdown();
                    event_loop.exit();
                    return;
                }

                self.render();
            }
            _ => {}
        }
    }
}

/// Entry point — create event loop and run.
pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    #[cfg(windows)]
    let _instance = match crate::platform::win32::acquire_single_instance() {
        Some(guard) => guard,
        None => {
            log::warn!("Another instance is already running, exiting");
            return Ok(());
        }
    };

    let event_loop = EventLoop::new()?;
    let mut app = App::new();
    event_loop.run_app(&mut app)?;
    Ok(())
}
