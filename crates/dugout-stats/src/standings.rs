// Standings: live table with the in-progress week, the season trend and
// playoff clinch/elimination status.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use dugout_core::model::{CurrentMatchup, SeasonRecord, TeamNumber, WeeklyResult, WinLossTie};

use crate::ranking::{rank_average, rank_min, Order};

// ---------------------------------------------------------------------------
// Live standings
// ---------------------------------------------------------------------------

/// In-progress matchup from the current week's category counts.
/// Categories neither side leads are draws.
pub fn current_matchup(team: &str, wins: u32, losses: u32, categories: usize) -> CurrentMatchup {
    let ties = (categories as u32).saturating_sub(wins + losses);
    CurrentMatchup {
        team: team.to_string(),
        record: WinLossTie::new(wins, losses, ties),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveStanding {
    pub team: String,
    pub team_number: TeamNumber,
    pub manager: String,
    /// Yahoo's standings rank, before the current week.
    pub rank: u32,
    pub clinched: bool,
    pub season: WinLossTie,
    pub current: WinLossTie,
    /// Season record plus the current matchup as it stands.
    pub live: WinLossTie,
    pub raw_score_static: f64,
    pub raw_score: f64,
    pub games_back: f64,
    pub pct: f64,
    /// Current matchup as `W-L-T`.
    pub current_matchup: String,
    /// Rank on live raw score; tied teams share the best rank.
    pub rank_live: u32,
}

/// Fold the current week's matchups into the season standings.
///
/// Matchups join on team name. Teams with no current matchup carry a
/// 0-0-0 week. Rows come back sorted by live raw score, best first.
pub fn live_standings(
    records: &[SeasonRecord],
    current: &[CurrentMatchup],
    manager_for: impl Fn(TeamNumber) -> String,
) -> Vec<LiveStanding> {
    let mut rows: Vec<LiveStanding> = records
        .iter()
        .map(|rec| {
            let week = current
                .iter()
                .find(|c| c.team == rec.team)
                .map(|c| c.record)
                .unwrap_or_default();
            let mut live = rec.record;
            live.add(week);
            LiveStanding {
                team: rec.team.clone(),
                team_number: rec.team_number,
                manager: manager_for(rec.team_number),
                rank: rec.rank,
                clinched: rec.clinched,
                season: rec.record,
                current: week,
                live,
                raw_score_static: rec.raw_score(),
                raw_score: live.points(),
                games_back: 0.0,
                pct: live.pct(),
                current_matchup: week.to_string(),
                rank_live: 0,
            }
        })
        .collect();

    let max = rows
        .iter()
        .map(|r| r.raw_score)
        .fold(f64::NEG_INFINITY, f64::max);
    let scores: Vec<f64> = rows.iter().map(|r| r.raw_score).collect();
    for (row, rank) in rows.iter_mut().zip(rank_min(&scores, Order::Descending)) {
        row.games_back = max - row.raw_score;
        row.rank_live = rank;
    }

    rows.sort_by(|a, b| b.raw_score.total_cmp(&a.raw_score));
    rows
}

// ---------------------------------------------------------------------------
// Season trend
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendRow {
    pub week: u32,
    pub team: String,
    pub team_number: TeamNumber,
    pub raw_score: f64,
    /// Rank on cumulative raw score within the week, ties averaged.
    pub rank: f64,
}

/// Cumulative tie-adjusted score per team after each week.
pub fn season_trend(results: &[WeeklyResult], categories: usize) -> Vec<TrendRow> {
    let c = categories as f64;
    let mut by_team: BTreeMap<TeamNumber, Vec<&WeeklyResult>> = BTreeMap::new();
    for r in results {
        by_team.entry(r.team_number).or_default().push(r);
    }

    let mut by_week: BTreeMap<u32, Vec<TrendRow>> = BTreeMap::new();
    for (team_number, mut weeks) in by_team {
        weeks.sort_by_key(|r| r.week);
        let mut running = 0.0;
        for r in weeks {
            // Rows stored before tie adjustment still sum to fewer than C.
            running += r.score + (c - (r.score + r.opponent_score)).max(0.0) / 2.0;
            by_week.entry(r.week).or_default().push(TrendRow {
                week: r.week,
                team: r.team.clone(),
                team_number,
                raw_score: running,
                rank: 0.0,
            });
        }
    }

    let mut out = Vec::new();
    for (_, mut rows) in by_week {
        let scores: Vec<f64> = rows.iter().map(|r| r.raw_score).collect();
        for (row, rank) in rows.iter_mut().zip(rank_average(&scores, Order::Descending)) {
            row.rank = rank;
        }
        out.extend(rows);
    }
    out
}

// ---------------------------------------------------------------------------
// Playoff status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayoffStatus {
    Clinched,
    InContention,
    Eliminated,
}

impl PlayoffStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PlayoffStatus::Clinched => "Clinched",
            PlayoffStatus::InContention => "In Contention",
            PlayoffStatus::Eliminated => "Eliminated",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayoffRow {
    pub team: String,
    pub team_number: TeamNumber,
    pub manager: String,
    pub raw_score: f64,
    pub max_possible: f64,
    pub playoff_status: PlayoffStatus,
    pub seed_status: String,
}

/// Clinch and elimination math on the current standings.
///
/// `weeks_left` full weeks of `categories` points each remain. Ties in raw
/// score keep the standings order.
pub fn playoff_status(
    records: &[SeasonRecord],
    weeks_left: u32,
    categories: usize,
    playoff_spots: usize,
    manager_for: impl Fn(TeamNumber) -> String,
) -> Vec<PlayoffRow> {
    let remaining = weeks_left as f64 * categories as f64;
    let mut sorted: Vec<&SeasonRecord> = records.iter().collect();
    sorted.sort_by(|a, b| b.raw_score().total_cmp(&a.raw_score()));
    let points: Vec<f64> = sorted.iter().map(|r| r.raw_score()).collect();

    let last_in = playoff_spots.checked_sub(1).and_then(|i| points.get(i)).copied();
    let first_out = points.get(playoff_spots).copied();

    sorted
        .iter()
        .enumerate()
        .map(|(i, rec)| {
            let current = points[i];
            let max_possible = current + remaining;

            let playoff_status = if i >= playoff_spots {
                match last_in {
                    Some(cutoff) if max_possible < cutoff => PlayoffStatus::Eliminated,
                    _ => PlayoffStatus::InContention,
                }
            } else {
                match first_out {
                    Some(chaser) if current > chaser + remaining => PlayoffStatus::Clinched,
                    None => PlayoffStatus::Clinched,
                    _ => PlayoffStatus::InContention,
                }
            };

            let seed_status = match i {
                0 => match points.get(1) {
                    Some(&second) if current > second + remaining => "Clinched #1 Seed",
                    _ => "TBD",
                },
                1 => match points.get(2) {
                    Some(&third) if current > third + remaining => {
                        if max_possible >= points[0] {
                            "Clinched Top 2 Seed"
                        } else {
                            "Clinched #2 Seed"
                        }
                    }
                    _ => "TBD",
                },
                _ => "TBD",
            };

            PlayoffRow {
                team: rec.team.clone(),
                team_number: rec.team_number,
                manager: manager_for(rec.team_number),
                raw_score: current,
                max_possible,
                playoff_status,
                seed_status: seed_status.to_string(),
            }
        })
        .collect()
}
