// Typed rows shared by the fetchers, the algorithms and the stored tables.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Yahoo's per-season team id (1..=num_teams).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TeamNumber(pub u32);

impl fmt::Display for TeamNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Category name to value for one team over some span.
pub type StatLine = BTreeMap<String, f64>;

/// Win/loss/tie tally, used both for matchups and single categories.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinLossTie {
    pub wins: u32,
    pub losses: u32,
    pub ties: u32,
}

impl WinLossTie {
    pub fn new(wins: u32, losses: u32, ties: u32) -> Self {
        Self { wins, losses, ties }
    }

    pub fn total(&self) -> u32 {
        self.wins + self.losses + self.ties
    }

    /// Wins plus half of the ties.
    pub fn points(&self) -> f64 {
        self.wins as f64 + self.ties as f64 / 2.0
    }

    pub fn pct(&self) -> f64 {
        match self.total() {
            0 => 0.0,
            n => self.points() / n as f64,
        }
    }

    pub fn add(&mut self, other: WinLossTie) {
        self.wins += other.wins;
        self.losses += other.losses;
        self.ties += other.ties;
    }
}

impl fmt::Display for WinLossTie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.wins, self.losses, self.ties)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseRecordError(pub String);

impl fmt::Display for ParseRecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid W-L-T record `{}`", self.0)
    }
}

impl std::error::Error for ParseRecordError {}

impl FromStr for WinLossTie {
    type Err = ParseRecordError;

    /// Parses `"W-L-T"`; a missing tie count reads as 0.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseRecordError(s.to_string());
        let parts: Vec<&str> = s.trim().split('-').map(str::trim).collect();
        if parts.len() < 2 || parts.len() > 3 {
            return Err(err());
        }
        let num = |p: &str| p.parse::<u32>().map_err(|_| err());
        Ok(Self {
            wins: num(parts[0])?,
            losses: num(parts[1])?,
            ties: match parts.get(2) {
                Some(t) => num(t)?,
                None => 0,
            },
        })
    }
}

/// Team name to team number, from the league home page links.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamEntry {
    pub team: String,
    pub team_number: TeamNumber,
}

/// One row of the league standings table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonRecord {
    pub rank: u32,
    pub team: String,
    pub team_number: TeamNumber,
    pub record: WinLossTie,
    /// Yahoo marks playoff clinchers with a `*` beside the rank.
    pub clinched: bool,
}

impl SeasonRecord {
    pub fn raw_score(&self) -> f64 {
        self.record.points()
    }
}

/// Season W-L-T within one category (headtoheadstats `type=record`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRecord {
    pub team: String,
    pub team_number: TeamNumber,
    pub category: String,
    pub record: WinLossTie,
}

/// Season-to-date category totals (headtoheadstats `type=stats`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamStats {
    pub team: String,
    pub team_number: TeamNumber,
    pub stats: StatLine,
}

/// One side of a matchup page: the stat line and categories won.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchupLine {
    pub team: String,
    pub stats: StatLine,
    pub score: f64,
}

/// A team's category line for one week.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyStats {
    pub week: u32,
    pub team: String,
    pub team_number: TeamNumber,
    pub opponent: String,
    pub opponent_number: TeamNumber,
    pub stats: StatLine,
}

/// A team's matchup outcome for one week, with ties split between both sides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyResult {
    pub week: u32,
    pub team: String,
    pub team_number: TeamNumber,
    pub opponent: String,
    pub opponent_number: TeamNumber,
    pub score: f64,
    pub opponent_score: f64,
    pub score_difference: f64,
    /// `(difference + C) / 2C`, 0.0 for a shutout loss and 1.0 for a sweep.
    pub normalized_score_difference: f64,
}

impl WeeklyResult {
    pub fn won(&self, categories: usize) -> bool {
        self.score > categories as f64 / 2.0
    }

    pub fn lost(&self, categories: usize) -> bool {
        self.score < categories as f64 / 2.0
    }
}

/// A scheduled pairing; every matchup is stored once per direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub week: u32,
    pub team: String,
    pub team_number: TeamNumber,
    pub opponent: String,
    pub opponent_number: TeamNumber,
}

/// In-progress matchup score for the current week.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentMatchup {
    pub team: String,
    pub record: WinLossTie,
}
