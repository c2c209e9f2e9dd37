//! Best-score tables.
//!
//! Two rankings are kept: best totals per `(grid size, move limit)` pair and
//! best means per grid size. Persistence lives with the front end.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Entries kept per table
pub const MAX_ENTRIES: usize = 10;

/// One finished game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub score: i64,
    pub grid_size: usize,
    pub moves_limit: u32,
    pub mean: f64,
    /// `YYYY-MM-DD`
    pub date: String,
}

/// Which ranking a table holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Ranking {
    #[default]
    Total,
    Mean,
}

impl Ranking {
    pub fn toggle(self) -> Self {
        match self {
            Ranking::Total => Ranking::Mean,
            Ranking::Mean => Ranking::Total,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Ranking::Total => "Total",
            Ranking::Mean => "Mean",
        }
    }
}

pub fn total_key(grid_size: usize, moves_limit: u32) -> String {
    format!("total_{}x{}", grid_size, moves_limit)
}

pub fn mean_key(grid_size: usize) -> String {
    format!("mean_{}", grid_size)
}

/// Tables keyed by [`total_key`] / [`mean_key`], each sorted descending
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Leaderboard {
    #[serde(default)]
    tables: BTreeMap<String, Vec<LeaderboardEntry>>,
}

impl Leaderboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a finished game in both rankings
    pub fn record(&mut self, entry: LeaderboardEntry) {
        let total = total_key(entry.grid_size, entry.moves_limit);
        insert_ranked(
            self.tables.entry(total).or_default(),
            entry.clone(),
            |e| e.score as f64,
        );
        let mean = mean_key(entry.grid_size);
        insert_ranked(self.tables.entry(mean).or_default(), entry, |e| e.mean);
    }

    pub fn best_total(&self, grid_size: usize, moves_limit: u32) -> &[LeaderboardEntry] {
        self.table(&total_key(grid_size, moves_limit))
    }

    pub fn best_mean(&self, grid_size: usize) -> &[LeaderboardEntry] {
        self.table(&mean_key(grid_size))
    }

    /// Entries for `ranking`; the move limit is ignored for means
    pub fn ranked(&self, ranking: Ranking, grid_size: usize, moves_limit: u32) -> &[LeaderboardEntry] {
        match ranking {
            Ranking::Total => self.best_total(grid_size, moves_limit),
            Ranking::Mean => self.best_mean(grid_size),
        }
    }

    fn table(&self, key: &str) -> &[LeaderboardEntry] {
        self.tables.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Grid sizes with at least one recorded game, ascending
    pub fn grid_sizes(&self) -> Vec<usize> {
        self.entries().map(|e| e.grid_size).collect::<BTreeSet<_>>().into_iter().collect()
    }

    /// Move limits with at least one recorded game, ascending
    pub fn moves_limits(&self) -> Vec<u32> {
        self.entries().map(|e| e.moves_limit).collect::<BTreeSet<_>>().into_iter().collect()
    }

    fn entries(&self) -> impl Iterator<Item = &LeaderboardEntry> {
        self.tables.values().flatten()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.values().all(Vec::is_empty)
    }

    pub fn clear(&mut self) {
        self.tables.clear();
    }
}

/// Insert after every entry that ranks at least as high, then cap the table
fn insert_ranked<F>(table: &mut Vec<LeaderboardEntry>, entry: LeaderboardEntry, key: F)
where
    F: Fn(&LeaderboardEntry) -> f64,
{
    let value = key(&entry);
    let pos = table
        .iter()
        .position(|e| key(e) < value)
        .unwrap_or(table.len());
    table.insert(pos, entry);
    table.truncate(MAX_ENTRIES);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(score: i64, grid_size: usize, moves_limit: u32, mean: f64, date: &str) -> LeaderboardEntry {
        LeaderboardEntry {
            score,
            grid_size,
            moves_limit,
            mean,
            date: date.to_string(),
        }
    }

    #[test]
    fn test_keys() {
        assert_eq!(total_key(5, 30), "total_5x30");
        assert_eq!(mean_key(6), "mean_6");
    }

    #[test]
    fn test_sorted_descending() {
        let mut board = Leaderboard::new();
        board.record(entry(40, 5, 30, 1.33, "2024-01-01"));
        board.record(entry(90, 5, 30, 3.0, "2024-01-02"));
        board.record(entry(60, 5, 30, 2.0, "2024-01-03"));

        let scores: Vec<i64> = board.best_total(5, 30).iter().map(|e| e.score).collect();
        assert_eq!(scores, vec![90, 60, 40]);
        let means: Vec<f64> = board.best_mean(5).iter().map(|e| e.mean).collect();
        assert_eq!(means, vec![3.0, 2.0, 1.33]);
    }

    #[test]
    fn test_ties_keep_earlier_first() {
        let mut board = Leaderboard::new();
        board.record(entry(50, 5, 30, 1.0, "first"));
        board.record(entry(50, 5, 30, 1.0, "second"));
        let dates: Vec<&str> = board.best_total(5, 30).iter().map(|e| e.date.as_str()).collect();
        assert_eq!(dates, vec!["first", "second"]);
    }

    #[test]
    fn test_capped_at_ten() {
        let mut board = Leaderboard::new();
        for score in 0..15 {
            board.record(entry(score, 5, 30, score as f64 / 30.0, "d"));
        }
        let table = board.best_total(5, 30);
        assert_eq!(table.len(), MAX_ENTRIES);
        assert_eq!(table[0].score, 14);
        assert_eq!(table[9].score, 5);
    }

    #[test]
    fn test_tables_are_separate() {
        let mut board = Leaderboard::new();
        board.record(entry(10, 5, 30, 0.33, "d"));
        board.record(entry(20, 5, 10, 2.0, "d"));
        board.record(entry(30, 7, 30, 1.0, "d"));

        assert_eq!(board.best_total(5, 30).len(), 1);
        assert_eq!(board.best_total(5, 10).len(), 1);
        // means are keyed by grid size only
        assert_eq!(board.best_mean(5).len(), 2);
        assert_eq!(board.ranked(Ranking::Mean, 5, 999).len(), 2);
        assert!(board.best_total(6, 30).is_empty());

        assert_eq!(board.grid_sizes(), vec![5, 7]);
        assert_eq!(board.moves_limits(), vec![10, 30]);

        board.clear();
        assert!(board.is_empty());
        assert!(board.grid_sizes().is_empty());
    }

    #[test]
    fn test_persisted_shape() {
        let mut board = Leaderboard::new();
        board.record(entry(12, 5, 30, 0.4, "2024-05-06"));
        let json = serde_json::to_string(&board).unwrap();
        assert!(json.contains("total_5x30"));
        let back: Leaderboard = serde_json::from_str(&json).unwrap();
        assert_eq!(back, board);
    }
}
