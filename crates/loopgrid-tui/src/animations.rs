use loopgrid_core::animation::{explode_scale, falls_finished, EXPLODE_FRAMES};
use loopgrid_core::{ExplodeDescriptor, FallDescriptor, Grid, Position};
use std::time::{Duration, Instant};

/// What a turn effect is showing right now
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EffectPhase {
    /// Cleared tokens shrinking on the old board, at this scale
    Exploding(f32),
    /// Tokens falling into the new board, this long after the first frame
    Falling(Duration),
}

/// Clear-then-refill effect for one submitted turn
#[derive(Debug, Clone)]
pub struct TurnEffect {
    /// Board as it looked when the path was submitted
    pub before: Grid,
    pub exploded: Vec<ExplodeDescriptor>,
    pub falls: Vec<FallDescriptor>,
    frame: u32,
    fall_start: Option<Instant>,
}

impl TurnEffect {
    pub fn new(before: Grid, exploded: Vec<ExplodeDescriptor>, falls: Vec<FallDescriptor>) -> Self {
        Self {
            before,
            exploded,
            falls,
            frame: 0,
            fall_start: None,
        }
    }

    pub fn phase(&self) -> EffectPhase {
        match self.fall_start {
            None => EffectPhase::Exploding(explode_scale(self.frame)),
            Some(start) => EffectPhase::Falling(start.elapsed()),
        }
    }

    /// Advance one frame. Returns true once the effect has played out.
    pub fn tick(&mut self) -> bool {
        match self.fall_start {
            None => {
                self.frame += 1;
                if self.frame > EXPLODE_FRAMES {
                    self.fall_start = Some(Instant::now());
                }
                false
            }
            Some(start) => falls_finished(start.elapsed()),
        }
    }

    pub fn is_exploding(&self, pos: Position) -> bool {
        self.exploded.iter().any(|e| e.position == pos)
    }

    /// True if a falling token lands on `pos`, so the final board must not
    /// draw it there yet
    pub fn lands_on(&self, pos: Position) -> bool {
        self.falls
            .iter()
            .any(|f| f.column == pos.x && f.to_row == pos.y)
    }
}
