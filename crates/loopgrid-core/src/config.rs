use crate::hamiltonian::TourSearchConfig;
use crate::refill::RefillPolicy;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use thiserror::Error;

pub const GRID_SIZE_RANGE: RangeInclusive<usize> = 3..=10;
pub const GROUP_COUNT_RANGE: RangeInclusive<u8> = 2..=8;
pub const VARIANT_RANGE: RangeInclusive<u8> = 1..=8;

/// How a finished drag is turned into a move
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SubmitMode {
    /// Releasing the pointer submits the path
    #[default]
    Auto,
    /// The path stays on the board until submitted explicitly
    Manual,
}

/// Settings fixed for the lifetime of one game
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub grid_size: usize,
    pub moves_limit: u32,
    pub group_count: u8,
    pub variants_per_group: u8,
    pub submit_mode: SubmitMode,
    pub tour: TourSearchConfig,
    pub refill: RefillPolicy,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            grid_size: 5,
            moves_limit: 30,
            group_count: 5,
            variants_per_group: 4,
            submit_mode: SubmitMode::Auto,
            tour: TourSearchConfig::default(),
            refill: RefillPolicy::default(),
        }
    }
}

/// Rejected configuration values
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("grid size {0} is outside {min}..={max}", min = GRID_SIZE_RANGE.start(), max = GRID_SIZE_RANGE.end())]
    GridSize(usize),
    #[error("a game needs at least one move")]
    NoMoves,
    #[error("group count {0} is outside {min}..={max}", min = GROUP_COUNT_RANGE.start(), max = GROUP_COUNT_RANGE.end())]
    GroupCount(u8),
    #[error("variants per group {0} is outside {min}..={max}", min = VARIANT_RANGE.start(), max = VARIANT_RANGE.end())]
    Variants(u8),
}

impl GameConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !GRID_SIZE_RANGE.contains(&self.grid_size) {
            return Err(ConfigError::GridSize(self.grid_size));
        }
        if self.moves_limit == 0 {
            return Err(ConfigError::NoMoves);
        }
        if !GROUP_COUNT_RANGE.contains(&self.group_count) {
            return Err(ConfigError::GroupCount(self.group_count));
        }
        if !VARIANT_RANGE.contains(&self.variants_per_group) {
            return Err(ConfigError::Variants(self.variants_per_group));
        }
        Ok(())
    }

    /// Number of cells on the board
    pub fn cell_count(&self) -> usize {
        self.grid_size * self.grid_size
    }
}
