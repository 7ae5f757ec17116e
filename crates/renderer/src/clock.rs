use std::time::{Duration, Instant};

/// Elapsed time is wound back to zero once it crosses this threshold (six
/// hours) so the f32 handed to the shader never loses enough precision to
/// make the animation visibly stutter.
pub const ELAPSED_RESET_SECONDS: f32 = 21_600.0;

/// Monotonic elapsed-time source feeding the shader's time uniform.
///
/// Two states: Running and Paused. Pausing captures the elapsed value (or
/// zero, if it already crossed the reset threshold) and resuming continues
/// from the captured value. While running, a per-frame [`SceneClock::elapsed`]
/// call performs the periodic reset.
#[derive(Debug, Clone, Copy)]
pub struct SceneClock {
    origin: Instant,
    paused_at: Option<f32>,
}

impl SceneClock {
    pub fn new(now: Instant) -> Self {
        Self {
            origin: now,
            paused_at: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.paused_at.is_none()
    }

    /// Seconds elapsed since the clock origin, resetting the origin once the
    /// drift threshold is crossed. While paused this returns the captured
    /// value unchanged.
    pub fn elapsed(&mut self, now: Instant) -> f32 {
        if let Some(frozen) = self.paused_at {
            return frozen;
        }
        let elapsed = now.saturating_duration_since(self.origin).as_secs_f32();
        if elapsed > ELAPSED_RESET_SECONDS {
            self.origin = now;
            return 0.0;
        }
        elapsed
    }

    /// Running -> Paused. Values beyond the reset threshold are clamped to
    /// zero so a resume after a long uptime starts fresh instead of carrying
    /// a stale six-hour timestamp.
    pub fn pause(&mut self, now: Instant) {
        if self.paused_at.is_some() {
            return;
        }
        let elapsed = now.saturating_duration_since(self.origin).as_secs_f32();
        let captured = if elapsed > ELAPSED_RESET_SECONDS {
            0.0
        } else {
            elapsed
        };
        self.paused_at = Some(captured);
    }

    /// Paused -> Running, continuing from the captured elapsed value.
    pub fn resume(&mut self, now: Instant) {
        if let Some(captured) = self.paused_at.take() {
            self.origin = now - Duration::from_secs_f32(captured);
        }
    }
}
