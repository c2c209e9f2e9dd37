//! Rule engine for a loop-drawing tile puzzle.
//!
//! Players drag a path across a square grid of grouped tokens. Straight steps
//! stay inside a group, diagonal steps switch groups, and closing the path on
//! its first cell clears every token of the visited groups. Cleared columns are
//! refilled from above; a clear of the whole board earns a bonus board that one
//! loop can empty again.

pub mod animation;
pub mod config;
pub mod game;
pub mod grid;
pub mod hamiltonian;
pub mod input;
pub mod leaderboard;
pub mod refill;
pub mod scoring;
pub mod selection;


pub use config::{ConfigError, GameConfig, SubmitMode};
pub use game::{BoardSource, ExplodeDescriptor, Game, TurnReport};
pub use grid::{Grid, GroupId, Position, Token, VariantId};
pub use hamiltonian::{GenerationFailure, TourSearchConfig};
pub use input::{resolve_point, CellMetrics};
pub use leaderboard::{Leaderboard, LeaderboardEntry, Ranking};
pub use refill::{FallDescriptor, RefillPolicy};
pub use selection::{Direction, PathStep, Selection, SelectionPhase};
