use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use crossbeam_channel::{bounded, Sender};
use tracing::{debug, info, warn};
use winit::dpi::{PhysicalPosition, PhysicalSize};
use winit::event::{Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoopBuilder, EventLoopProxy};
use winit::window::{Window, WindowBuilder};

use hostproto::PropertyUpdate;

use crate::clock::SceneClock;
use crate::gpu::GpuState;
use crate::types::{RendererConfig, Settings};

const MIN_FRAME_RATE: f32 = 1.0;

/// Control messages delivered into the render thread's event loop.
#[derive(Debug, Clone)]
pub enum ControlEvent {
    Property(PropertyUpdate),
    Playback { is_paused: bool },
    Shutdown,
}

/// Paces redraws to the configured frame rate.
struct FrameScheduler {
    interval: Duration,
    next_frame: Option<Instant>,
}

impl FrameScheduler {
    fn new(frame_rate: f32) -> Self {
        Self {
            interval: frame_interval(frame_rate),
            next_frame: None,
        }
    }

    fn set_frame_rate(&mut self, frame_rate: f32) {
        self.interval = frame_interval(frame_rate);
        // Render at the new cadence immediately rather than waiting out a
        // deadline computed from the old one.
        self.next_frame = None;
    }

    fn ready_for_frame(&self, now: Instant) -> bool {
        match self.next_frame {
            Some(deadline) => now >= deadline,
            None => true,
        }
    }

    fn next_deadline(&self) -> Option<Instant> {
        self.next_frame
    }

    fn mark_rendered(&mut self, now: Instant) {
        self.next_frame = Some(now + self.interval);
    }
}

fn frame_interval(frame_rate: f32) -> Duration {
    Duration::from_secs_f32(1.0 / frame_rate.max(MIN_FRAME_RATE))
}

fn describe_init_failure(err: &anyhow::Error) -> String {
    format!("failed to initialise renderer: {err:#}")
}

/// Pointer parallax offset in logical pixels. Inactive when the strength is
/// zero or the pointer has never entered the surface.
fn parallax_offset(
    logical_size: (f32, f32),
    cursor: Option<(f32, f32)>,
    strength: f32,
) -> (f32, f32) {
    if strength == 0.0 {
        return (0.0, 0.0);
    }
    let Some((x, y)) = cursor else {
        return (0.0, 0.0);
    };
    (
        (logical_size.0 - x * strength) / 90.0,
        (logical_size.1 - y * strength) / 90.0,
    )
}

/// Aggregates everything the render thread owns: the window, GPU state, the
/// scene clock, and the mutable settings host properties steer.
struct WindowState {
    window: Arc<Window>,
    gpu: GpuState,
    clock: SceneClock,
    settings: Settings,
    scale_factor: f32,
    cursor: Option<PhysicalPosition<f64>>,
    debug_overlay: bool,
}

impl WindowState {
    fn new(window: Arc<Window>, config: &RendererConfig) -> Result<Self> {
        let size = window.inner_size();
        let scale_factor = window.scale_factor() as f32;
        let gpu = GpuState::new(window.as_ref(), size, scale_factor, config)?;

        Ok(Self {
            window,
            gpu,
            clock: SceneClock::new(Instant::now()),
            settings: config.settings,
            scale_factor,
            cursor: None,
            debug_overlay: false,
        })
    }

    fn window(&self) -> &Window {
        self.window.as_ref()
    }

    fn resize(&mut self, new_size: PhysicalSize<u32>) {
        self.gpu.resize(new_size);
    }

    fn set_scale_factor(&mut self, scale_factor: f32) {
        self.scale_factor = scale_factor;
        self.gpu.set_scale_factor(scale_factor);
    }

    fn render_frame(&mut self, now: Instant) -> std::result::Result<(), wgpu::SurfaceError> {
        self.gpu.poll_media();
        self.gpu.advance_video();

        let size = self.gpu.surface_size();
        let scale = self.scale_factor.max(f32::EPSILON);
        let logical = (size.width as f32 / scale, size.height as f32 / scale);
        let cursor = self
            .cursor
            .map(|position| (position.x as f32 / scale, position.y as f32 / scale));
        let parallax = parallax_offset(logical, cursor, self.settings.parallax_strength);

        self.gpu.render(self.clock.elapsed(now), parallax)
    }

    /// Routes one property either to window-level settings or down into the
    /// GPU state. Returns the new frame rate when it changed.
    fn apply_property(&mut self, update: &PropertyUpdate) -> Option<f32> {
        match update {
            PropertyUpdate::FpsLock(frame_rate) => {
                info!(frame_rate, "frame rate changed");
                self.settings.frame_rate = *frame_rate;
                return Some(*frame_rate);
            }
            PropertyUpdate::ParallaxIntensity(strength) => {
                self.settings.parallax_strength = *strength;
            }
            PropertyUpdate::Debug(enabled) => {
                self.debug_overlay = *enabled;
                debug!(enabled, "debug overlay toggled");
            }
            PropertyUpdate::Unknown { name } => {
                warn!(name, "unrecognised property ignored");
            }
            other => self.gpu.apply_property(other),
        }
        None
    }
}

/// Cloneable handle for feeding control messages into a running window.
#[derive(Clone)]
pub struct ControlHandle {
    proxy: EventLoopProxy<ControlEvent>,
}

impl ControlHandle {
    pub fn send(&self, event: ControlEvent) -> Result<()> {
        self.proxy
            .send_event(event)
            .map_err(|err| anyhow!("window thread is gone: {err}"))
    }

    pub fn apply_property(&self, update: PropertyUpdate) -> Result<()> {
        self.send(ControlEvent::Property(update))
    }

    pub fn set_playback(&self, is_paused: bool) -> Result<()> {
        self.send(ControlEvent::Playback { is_paused })
    }
}

/// Owns the render thread. The event loop runs there so the caller's thread
/// stays free for the host control stream.
pub struct WindowRuntime {
    handle: ControlHandle,
    join_handle: Option<JoinHandle<Result<()>>>,
}

impl WindowRuntime {
    pub fn spawn(config: RendererConfig) -> Result<Self> {
        let (ready_tx, ready_rx) = bounded(1);
        let join_handle = thread::Builder::new()
            .name("rainpaper-window".into())
            .spawn(move || run_window_thread(config, ready_tx))
            .map_err(|err| anyhow!("failed to spawn window thread: {err}"))?;

        let proxy = ready_rx
            .recv()
            .map_err(|err| anyhow!("window thread failed to initialise: {err}"))??;

        Ok(Self {
            handle: ControlHandle { proxy },
            join_handle: Some(join_handle),
        })
    }

    pub fn handle(&self) -> ControlHandle {
        self.handle.clone()
    }

    /// Blocks until the event loop exits, either via shutdown or window
    /// close.
    pub fn join(mut self) -> Result<()> {
        if let Some(join_handle) = self.join_handle.take() {
            join_handle
                .join()
                .map_err(|err| anyhow!("window thread panicked: {err:?}"))??;
        }
        Ok(())
    }

    pub fn shutdown(mut self) -> Result<()> {
        if let Some(join_handle) = self.join_handle.take() {
            let _ = self.handle.send(ControlEvent::Shutdown);
            join_handle
                .join()
                .map_err(|err| anyhow!("window thread panicked: {err:?}"))??;
        }
        Ok(())
    }
}

impl Drop for WindowRuntime {
    fn drop(&mut self) {
        if let Some(join_handle) = self.join_handle.take() {
            let _ = self.handle.send(ControlEvent::Shutdown);
            let _ = join_handle.join();
        }
    }
}

fn run_window_thread(
    config: RendererConfig,
    ready_tx: Sender<Result<EventLoopProxy<ControlEvent>>>,
) -> Result<()> {
    let mut builder = EventLoopBuilder::<ControlEvent>::with_user_event();
    #[cfg(any(target_os = "linux", target_os = "android"))]
    {
        use winit::platform::wayland::EventLoopBuilderExtWayland;
        EventLoopBuilderExtWayland::with_any_thread(&mut builder, true);
    }
    let event_loop = builder
        .build()
        .map_err(|err| anyhow!("failed to create event loop: {err}"))?;
    let proxy = event_loop.create_proxy();

    let window_size = PhysicalSize::new(config.surface_size.0, config.surface_size.1);
    let window = WindowBuilder::new()
        .with_title("rainpaper")
        .with_inner_size(window_size)
        .build(&event_loop)
        .map_err(|err| anyhow!("failed to create wallpaper window: {err}"))?;
    let window = Arc::new(window);

    let mut state = match WindowState::new(window, &config) {
        Ok(state) => state,
        Err(err) => {
            // The spawner only sees this message, so keep the whole chain.
            let message = describe_init_failure(&err);
            let _ = ready_tx.send(Err(anyhow!("{message}")));
            return Err(anyhow!("{message}"));
        }
    };

    let mut scheduler = FrameScheduler::new(config.settings.frame_rate);
    state.window().request_redraw();

    let _ = ready_tx.send(Ok(proxy));

    let mut result = Ok(());
    let run_result = event_loop.run(move |event, elwt| {
        match event {
            Event::UserEvent(control) => match control {
                ControlEvent::Property(update) => {
                    if let Some(frame_rate) = state.apply_property(&update) {
                        scheduler.set_frame_rate(frame_rate);
                    }
                }
                ControlEvent::Playback { is_paused } => {
                    let now = Instant::now();
                    if is_paused {
                        state.clock.pause(now);
                    } else {
                        state.clock.resume(now);
                        state.window().request_redraw();
                    }
                }
                ControlEvent::Shutdown => {
                    elwt.exit();
                }
            },
            Event::WindowEvent { window_id, event } if window_id == state.window().id() => {
                match event {
                    WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                        elwt.exit();
                    }
                    WindowEvent::CursorMoved { position, .. } => {
                        state.cursor = Some(position);
                    }
                    WindowEvent::Resized(new_size) => {
                        state.resize(new_size);
                    }
                    WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                        state.set_scale_factor(scale_factor as f32);
                    }
                    WindowEvent::RedrawRequested => {
                        let now = Instant::now();
                        match state.render_frame(now) {
                            Ok(()) => {
                                scheduler.mark_rendered(now);
                            }
                            Err(wgpu::SurfaceError::Lost) | Err(wgpu::SurfaceError::Outdated) => {
                                state.gpu.recover_surface();
                            }
                            Err(wgpu::SurfaceError::OutOfMemory) => {
                                tracing::error!("surface out of memory; exiting");
                                elwt.exit();
                            }
                            Err(err) => {
                                warn!(error = ?err, "surface error; retrying next frame");
                            }
                        }
                    }
                    _ => {}
                }
            }
            Event::AboutToWait => {
                if !state.clock.is_running() {
                    elwt.set_control_flow(ControlFlow::Wait);
                    return;
                }
                let now = Instant::now();
                if scheduler.ready_for_frame(now) {
                    state.window().request_redraw();
                    elwt.set_control_flow(ControlFlow::Wait);
                } else if let Some(deadline) = scheduler.next_deadline() {
                    elwt.set_control_flow(ControlFlow::WaitUntil(deadline));
                } else {
                    elwt.set_control_flow(ControlFlow::Wait);
                }
            }
            _ => {}
        }
    });

    if let Err(err) = run_result {
        result = Err(anyhow!("window event loop error: {err}"));
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheduler_renders_immediately_then_paces() {
        let mut scheduler = FrameScheduler::new(30.0);
        let start = Instant::now();
        assert!(scheduler.ready_for_frame(start));

        scheduler.mark_rendered(start);
        assert!(!scheduler.ready_for_frame(start + Duration::from_millis(10)));
        assert!(scheduler.ready_for_frame(start + Duration::from_millis(34)));
    }

    #[test]
    fn frame_rate_change_takes_effect_without_waiting() {
        let mut scheduler = FrameScheduler::new(30.0);
        let start = Instant::now();
        scheduler.mark_rendered(start);
        assert!(!scheduler.ready_for_frame(start));

        scheduler.set_frame_rate(60.0);
        assert!(scheduler.ready_for_frame(start));
        scheduler.mark_rendered(start);
        assert!(scheduler.ready_for_frame(start + Duration::from_millis(17)));
    }

    #[test]
    fn zero_frame_rates_are_clamped() {
        let scheduler = FrameScheduler::new(0.0);
        assert_eq!(scheduler.interval, Duration::from_secs_f32(1.0));
    }

    #[test]
    fn parallax_matches_the_pointer_formula() {
        // (extent - cursor * strength) / 90 on each axis.
        let offset = parallax_offset((1920.0, 1080.0), Some((960.0, 540.0)), 1.0);
        assert!((offset.0 - (1920.0 - 960.0) / 90.0).abs() < 1e-6);
        assert!((offset.1 - (1080.0 - 540.0) / 90.0).abs() < 1e-6);
    }

    #[test]
    fn init_failure_message_keeps_the_error_chain() {
        use anyhow::Context as _;

        let err = anyhow::anyhow!("no suitable GPU adapter")
            .context("failed to create rendering surface");
        let message = describe_init_failure(&err);
        assert!(message.contains("failed to create rendering surface"));
        assert!(message.contains("no suitable GPU adapter"));
    }

    #[test]
    fn parallax_is_inert_without_strength_or_pointer() {
        assert_eq!(
            parallax_offset((1920.0, 1080.0), Some((10.0, 10.0)), 0.0),
            (0.0, 0.0)
        );
        assert_eq!(parallax_offset((1920.0, 1080.0), None, 2.0), (0.0, 0.0));
    }
}
