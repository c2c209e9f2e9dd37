//! Timing curves for the clear and refill effects.
//!
//! All engine state is final before an effect starts; these functions only
//! map elapsed time to draw positions.

use crate::refill::FallDescriptor;
use std::time::Duration;

/// Length of the fall effect
pub const FALL_DURATION: Duration = Duration::from_millis(300);

/// Frames of the explode (shrink) effect
pub const EXPLODE_FRAMES: u32 = 30;

/// Ease-out cubic on `t` clamped to `0..=1`
pub fn ease_out_cubic(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    1.0 - (1.0 - t).powi(3)
}

/// Linear progress of the fall effect after `elapsed`
pub fn fall_progress(elapsed: Duration) -> f32 {
    (elapsed.as_secs_f32() / FALL_DURATION.as_secs_f32()).min(1.0)
}

/// True once every fall has landed
pub fn falls_finished(elapsed: Duration) -> bool {
    elapsed >= FALL_DURATION
}

impl FallDescriptor {
    /// Fractional row of the falling token after `elapsed`
    pub fn row_at(&self, elapsed: Duration) -> f32 {
        let eased = ease_out_cubic(fall_progress(elapsed));
        let from = self.from_row as f32;
        from + eased * (self.to_row as f32 - from)
    }
}

/// Scale of an exploding token at `frame`
pub fn explode_scale(frame: u32) -> f32 {
    (1.0 - frame as f32 / EXPLODE_FRAMES as f32).max(0.0)
}
