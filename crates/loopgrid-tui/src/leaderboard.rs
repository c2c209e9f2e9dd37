//! Leaderboard storage backends
//!
//! The backend is picked from the environment:
//! - Local: JSON file in the local data directory
//! - Test: in-memory mock

use loopgrid_core::{Leaderboard, LeaderboardEntry};
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;

/// Environment configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    /// Scores persist to a local file
    Local,
    /// Scores live in memory only
    Test,
}

impl Environment {
    /// Detect environment from the LOOPGRID_ENV variable
    pub fn detect() -> Self {
        Self::from_name(std::env::var("LOOPGRID_ENV").ok().as_deref())
    }

    fn from_name(name: Option<&str>) -> Self {
        match name {
            Some("test") | Some("testing") => Environment::Test,
            _ => Environment::Local,
        }
    }
}

pub type LeaderboardResult<T> = Result<T, LeaderboardError>;

#[derive(Debug, Error)]
pub enum LeaderboardError {
    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),
    #[error("unreadable scores: {0}")]
    Format(#[from] serde_json::Error),
    #[error("leaderboard unavailable")]
    Unavailable,
}

/// Trait for leaderboard backends
pub trait LeaderboardBackend: Send + Sync {
    /// Record a finished game
    fn submit_score(&self, entry: LeaderboardEntry) -> LeaderboardResult<()>;

    /// Snapshot of every table
    fn leaderboard(&self) -> LeaderboardResult<Leaderboard>;

    /// Delete all scores
    fn clear(&self) -> LeaderboardResult<()>;

    fn is_available(&self) -> bool;

    /// Backend name for display
    fn backend_name(&self) -> &'static str;
}

// ==================== Local File Backend ====================

/// File-backed leaderboard
pub struct LocalLeaderboard {
    path: PathBuf,
    cache: Mutex<Option<Leaderboard>>,
}

impl LocalLeaderboard {
    pub fn new() -> Self {
        let path = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("loopgrid_scores.json");
        Self::with_path(path)
    }

    pub fn with_path(path: PathBuf) -> Self {
        Self {
            path,
            cache: Mutex::new(None),
        }
    }

    fn load(&self) -> Leaderboard {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(ref board) = *cache {
            return board.clone();
        }

        let board = match fs::read_to_string(&self.path) {
            Ok(json) => serde_json::from_str(&json).unwrap_or_else(|e| {
                log::warn!("ignoring unreadable scores in {}: {e}", self.path.display());
                Leaderboard::default()
            }),
            Err(_) => Leaderboard::default(),
        };

        *cache = Some(board.clone());
        board
    }

    fn save(&self, board: &Leaderboard) -> LeaderboardResult<()> {
        let json = serde_json::to_string_pretty(board)?;
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(&self.path, json)?;

        *self.cache.lock().unwrap_or_else(PoisonError::into_inner) = Some(board.clone());
        Ok(())
    }
}

impl Default for LocalLeaderboard {
    fn default() -> Self {
        Self::new()
    }
}

impl LeaderboardBackend for LocalLeaderboard {
    fn submit_score(&self, entry: LeaderboardEntry) -> LeaderboardResult<()> {
        let mut board = self.load();
        board.record(entry);
        self.save(&board)
    }

    fn leaderboard(&self) -> LeaderboardResult<Leaderboard> {
        Ok(self.load())
    }

    fn clear(&self) -> LeaderboardResult<()> {
        self.save(&Leaderboard::default())
    }

    fn is_available(&self) -> bool {
        true
    }

    fn backend_name(&self) -> &'static str {
        "Local"
    }
}

// ==================== Mock Backend for Testing ====================

/// In-memory leaderboard
pub struct MockLeaderboard {
    data: Mutex<Leaderboard>,
    available: Mutex<bool>,
}

impl MockLeaderboard {
    pub fn new() -> Self {
        Self {
            data: Mutex::new(Leaderboard::default()),
            available: Mutex::new(true),
        }
    }

    /// Set whether the backend should report as available
    #[cfg(test)]
    pub fn set_available(&self, available: bool) {
        *self.available.lock().unwrap_or_else(PoisonError::into_inner) = available;
    }

    fn check_available(&self) -> LeaderboardResult<()> {
        if *self.available.lock().unwrap_or_else(PoisonError::into_inner) {
            Ok(())
        } else {
            Err(LeaderboardError::Unavailable)
        }
    }
}

impl Default for MockLeaderboard {
    fn default() -> Self {
        Self::new()
    }
}

impl LeaderboardBackend for MockLeaderboard {
    fn submit_score(&self, entry: LeaderboardEntry) -> LeaderboardResult<()> {
        self.check_available()?;
        self.data
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .record(entry);
        Ok(())
    }

    fn leaderboard(&self) -> LeaderboardResult<Leaderboard> {
        self.check_available()?;
        Ok(self.data.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }

    fn clear(&self) -> LeaderboardResult<()> {
        self.check_available()?;
        self.data.lock().unwrap_or_else(PoisonError::into_inner).clear();
        Ok(())
    }

    fn is_available(&self) -> bool {
        *self.available.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn backend_name(&self) -> &'static str {
        "Mock"
    }
}

/// Create a backend for the given environment
pub fn create_backend(env: Environment) -> Arc<dyn LeaderboardBackend> {
    match env {
        Environment::Local => Arc::new(LocalLeaderboard::new()),
        Environment::Test => Arc::new(MockLeaderboard::new()),
    }
}

/// Create a backend for the detected environment
pub fn create_backend_auto() -> Arc<dyn LeaderboardBackend> {
    let env = Environment::detect();
    log::debug!("leaderboard environment: {env:?}");
    create_backend(env)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(score: i64) -> LeaderboardEntry {
        LeaderboardEntry {
            score,
            grid_size: 5,
            moves_limit: 30,
            mean: score as f64 / 30.0,
            date: "2024-03-01".to_string(),
        }
    }

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("loopgrid-{}-{}.json", name, std::process::id()))
    }

    #[test]
    fn test_mock_backend() {
        let backend = MockLeaderboard::new();
        backend.submit_score(entry(10)).unwrap();
        backend.submit_score(entry(30)).unwrap();

        let board = backend.leaderboard().unwrap();
        let scores: Vec<i64> = board.best_total(5, 30).iter().map(|e| e.score).collect();
        assert_eq!(scores, vec![30, 10]);

        backend.clear().unwrap();
        assert!(backend.leaderboard().unwrap().is_empty());
    }

    #[test]
    fn test_mock_unavailable() {
        let backend = MockLeaderboard::new();
        backend.set_available(false);

        assert!(!backend.is_available());
        assert!(matches!(
            backend.submit_score(entry(1)),
            Err(LeaderboardError::Unavailable)
        ));
        assert!(backend.leaderboard().is_err());
    }

    #[test]
    fn test_environment_names() {
        assert_eq!(Environment::from_name(None), Environment::Local);
        assert_eq!(Environment::from_name(Some("test")), Environment::Test);
        assert_eq!(Environment::from_name(Some("prod")), Environment::Local);
    }

    #[test]
    fn test_local_backend_persists() {
        let path = temp_path("scores");
        let _ = fs::remove_file(&path);

        let backend = LocalLeaderboard::with_path(path.clone());
        assert_eq!(backend.backend_name(), "Local");
        backend.submit_score(entry(12)).unwrap();

        // a fresh handle reads the file back
        let reopened = LocalLeaderboard::with_path(path.clone());
        let board = reopened.leaderboard().unwrap();
        assert_eq!(board.best_total(5, 30).len(), 1);
        assert_eq!(board.best_mean(5)[0].score, 12);

        reopened.clear().unwrap();
        assert!(LocalLeaderboard::with_path(path.clone()).leaderboard().unwrap().is_empty());
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_local_backend_ignores_corrupt_file() {
        let path = temp_path("corrupt");
        fs::write(&path, "not json").unwrap();
        let backend = LocalLeaderboard::with_path(path.clone());
        assert!(backend.leaderboard().unwrap().is_empty());
        let _ = fs::remove_file(&path);
    }
}
