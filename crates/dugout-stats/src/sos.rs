// Schedule assembly and remaining strength of schedule.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::warn;

use dugout_core::model::{ScheduleEntry, TeamEntry, TeamNumber};

use crate::power::NormalizedRow;
use crate::ranking::{mean, percentile_rank, rank_min, round2, sample_std, Order};

// ---------------------------------------------------------------------------
// Schedule
// ---------------------------------------------------------------------------

/// Expand one week's scraped pairings into schedule rows for both sides.
///
/// Each matchup appears on two team pages, so a pair already seen in either
/// direction is skipped. Self-pairings (bye or parse noise) are dropped.
pub fn schedule_week(
    week: u32,
    pairings: &[(TeamNumber, TeamNumber)],
    teams: &[TeamEntry],
) -> Vec<ScheduleEntry> {
    let name = |n: TeamNumber| {
        teams
            .iter()
            .find(|t| t.team_number == n)
            .map(|t| t.team.clone())
            .unwrap_or_else(|| format!("Team {n}"))
    };

    let mut seen: BTreeSet<(TeamNumber, TeamNumber)> = BTreeSet::new();
    let mut out = Vec::new();
    for &(a, b) in pairings {
        if a == b {
            warn!("schedule: week {week} pairs team {a} with itself");
            continue;
        }
        let key = if a < b { (a, b) } else { (b, a) };
        if !seen.insert(key) {
            continue;
        }
        for (team, opp) in [(a, b), (b, a)] {
            out.push(ScheduleEntry {
                week,
                team: name(team),
                team_number: team,
                opponent: name(opp),
                opponent_number: opp,
            });
        }
    }
    out.sort_by_key(|e| e.team_number);
    out
}

// ---------------------------------------------------------------------------
// Remaining strength of schedule
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Difficulty {
    Hard,
    Average,
    Easy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SosRow {
    pub team: String,
    pub team_number: TeamNumber,
    pub total_opponent_power: f64,
    pub avg_opponent_power: f64,
    pub games_remaining: usize,
    pub sos_percentile: f64,
    /// 1 is the hardest remaining schedule.
    pub sos_rank: u32,
    pub difficulty: Difficulty,
}

/// Sum the power scores of every opponent still on each team's schedule.
///
/// Only schedule rows from `current_week` on count. Opponents without a
/// power row are skipped with a warning. Rows come back hardest first.
pub fn remaining_sos(
    schedule: &[ScheduleEntry],
    power: &[NormalizedRow],
    current_week: u32,
) -> Vec<SosRow> {
    let scores: BTreeMap<TeamNumber, f64> =
        power.iter().map(|p| (p.team_number, p.score_sum)).collect();

    let mut by_team: BTreeMap<TeamNumber, (String, Vec<f64>)> = BTreeMap::new();
    for entry in schedule.iter().filter(|e| e.week >= current_week) {
        let Some(&score) = scores.get(&entry.opponent_number) else {
            warn!(
                "sos: no power score for team {} (week {})",
                entry.opponent_number, entry.week
            );
            continue;
        };
        by_team
            .entry(entry.team_number)
            .or_insert_with(|| (entry.team.clone(), Vec::new()))
            .1
            .push(score);
    }

    let mut rows: Vec<SosRow> = by_team
        .into_iter()
        .map(|(team_number, (team, opps))| {
            let total: f64 = opps.iter().sum();
            SosRow {
                team,
                team_number,
                total_opponent_power: round2(total),
                avg_opponent_power: round2(total / opps.len() as f64),
                games_remaining: opps.len(),
                sos_percentile: 0.0,
                sos_rank: 0,
                difficulty: Difficulty::Average,
            }
        })
        .collect();

    let avgs: Vec<f64> = rows.iter().map(|r| r.avg_opponent_power).collect();
    let totals: Vec<f64> = rows.iter().map(|r| r.total_opponent_power).collect();
    let (m, sd) = (mean(&avgs), sample_std(&avgs));
    let pct = percentile_rank(&avgs);
    let ranks = rank_min(&totals, Order::Descending);

    for (i, row) in rows.iter_mut().enumerate() {
        row.sos_percentile = round2(pct[i]);
        row.sos_rank = ranks[i];
        row.difficulty = if row.avg_opponent_power > m + sd {
            Difficulty::Hard
        } else if row.avg_opponent_power < m - sd {
            Difficulty::Easy
        } else {
            Difficulty::Average
        };
    }

    rows.sort_by_key(|r| r.sos_rank);
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn team(n: u32) -> TeamEntry {
        TeamEntry {
            team: format!("Team {n}"),
            team_number: TeamNumber(n),
        }
    }

    fn power(n: u32, score_sum: f64) -> NormalizedRow {
        NormalizedRow {
            team: format!("Team {n}"),
            team_number: TeamNumber(n),
            stats: Default::default(),
            scores: Default::default(),
            score_sum,
            score_rank: 0.0,
            standings_rank: None,
            score_variation: None,
        }
    }

    #[test]
    fn schedule_week_dedupes_both_directions() {
        let teams: Vec<TeamEntry> = (1..=4).map(team).collect();
        let pairings = vec![
            (TeamNumber(1), TeamNumber(2)),
            (TeamNumber(2), TeamNumber(1)),
            (TeamNumber(3), TeamNumber(4)),
            (TeamNumber(4), TeamNumber(3)),
            (TeamNumber(4), TeamNumber(4)),
        ];

        let rows = schedule_week(5, &pairings, &teams);

        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].team_number, TeamNumber(1));
        assert_eq!(rows[0].opponent_number, TeamNumber(2));
        assert_eq!(rows[3].opponent, "Team 3");
        assert!(rows.iter().all(|r| r.week == 5));
    }

    #[test]
    fn remaining_sos_uses_current_and_future_weeks() {
        let teams: Vec<TeamEntry> = (1..=4).map(team).collect();
        let pair = |a: u32, b: u32| (TeamNumber(a), TeamNumber(b));
        let mut schedule = schedule_week(1, &[pair(1, 2), pair(3, 4)], &teams);
        schedule.extend(schedule_week(2, &[pair(1, 3), pair(2, 4)], &teams));
        schedule.extend(schedule_week(3, &[pair(1, 4), pair(2, 3)], &teams));
        let power = vec![power(1, 800.0), power(2, 600.0), power(3, 400.0), power(4, 200.0)];

        let rows = remaining_sos(&schedule, &power, 2);

        assert_eq!(rows.len(), 4);
        assert!(rows.iter().all(|r| r.games_remaining == 2));
        // Teams 3 and 4 both face 1 and 2: 1400, tied hardest.
        assert_eq!(rows[0].team_number, TeamNumber(3));
        assert_eq!(rows[0].sos_rank, 1);
        assert_eq!(rows[1].sos_rank, 1);
        assert_eq!(rows[0].total_opponent_power, 1400.0);
        assert_eq!(rows[0].avg_opponent_power, 700.0);
        // Teams 1 and 2 both face 3 and 4: 600.
        assert_eq!(rows[2].team_number, TeamNumber(1));
        assert_eq!(rows[2].sos_rank, 3);
        assert_eq!(rows[2].sos_percentile, 37.5);
    }

    #[test]
    fn difficulty_flags_outliers() {
        let teams: Vec<TeamEntry> = (1..=6).map(team).collect();
        let pair = |a: u32, b: u32| (TeamNumber(a), TeamNumber(b));
        let schedule = schedule_week(1, &[pair(1, 2), pair(3, 4), pair(5, 6)], &teams);
        let power = vec![
            power(1, 100.0),
            power(2, 1000.0),
            power(3, 500.0),
            power(4, 510.0),
            power(5, 505.0),
            power(6, 495.0),
        ];

        let rows = remaining_sos(&schedule, &power, 1);
        let by_team = |n: u32| rows.iter().find(|r| r.team_number == TeamNumber(n)).unwrap();

        assert_eq!(by_team(1).difficulty, Difficulty::Hard);
        assert_eq!(by_team(2).difficulty, Difficulty::Easy);
        assert_eq!(by_team(3).difficulty, Difficulty::Average);
    }

    #[test]
    fn nothing_remaining_is_empty() {
        let teams: Vec<TeamEntry> = (1..=2).map(team).collect();
        let schedule = schedule_week(1, &[(TeamNumber(1), TeamNumber(2))], &teams);
        assert!(remaining_sos(&schedule, &[power(1, 1.0), power(2, 2.0)], 2).is_empty());
    }
}
