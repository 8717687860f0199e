// Running ELO ratings from weekly matchup margins.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use dugout_core::config::EloConfig;
use dugout_core::model::{ScheduleEntry, TeamNumber, WeeklyResult};

/// One team's rating entering `week`, and how it got there.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EloRow {
    pub week: u32,
    pub team: String,
    pub team_number: TeamNumber,
    /// Rating going into the previous week's matchup.
    pub prior_elo: f64,
    /// Expected result rescaled to `[-1, 1]`.
    pub expected_result: f64,
    /// Actual margin rescaled to `[-1, 1]`.
    pub actual_result: f64,
    pub new_elo: f64,
}

/// Win expectancy for a team rated `team` against one rated `opponent`.
pub fn expected_outcome(team: f64, opponent: f64, config: &EloConfig) -> f64 {
    1.0 / (1.0 + config.base.powf((opponent - team) / config.divisor))
}

/// Rating after one matchup.
///
/// Both the expectation and the normalized score difference are stretched
/// from `[0, 1]` to `[-1, 1]` so a dead-even result moves nothing.
pub fn update(
    rating: f64,
    opponent: f64,
    normalized_score_difference: f64,
    config: &EloConfig,
) -> (f64, f64, f64) {
    let expected = (expected_outcome(rating, opponent, config) - 0.5) * 2.0;
    let actual = (normalized_score_difference - 0.5) * 2.0;
    (expected, actual, rating + config.k_factor * (actual - expected))
}

/// Replay every completed week and return the rating table for weeks
/// `1..=last_week + 1`.
///
/// Week 1 rows hold the initial rating. A team with no schedule entry or no
/// result in some week keeps its rating and gets no row for the next week.
pub fn running_elo(
    teams: &[(TeamNumber, String)],
    schedule: &[ScheduleEntry],
    results: &[WeeklyResult],
    last_week: u32,
    config: &EloConfig,
) -> Vec<EloRow> {
    let mut ratings: BTreeMap<TeamNumber, f64> = teams
        .iter()
        .map(|(n, _)| (*n, config.initial_rating))
        .collect();
    let mut names: BTreeMap<TeamNumber, String> = teams.iter().cloned().collect();

    let mut rows: Vec<EloRow> = teams
        .iter()
        .map(|(n, name)| EloRow {
            week: 1,
            team: name.clone(),
            team_number: *n,
            prior_elo: config.initial_rating,
            expected_result: 0.0,
            actual_result: 0.0,
            new_elo: config.initial_rating,
        })
        .collect();

    for week in 1..=last_week {
        let start = ratings.clone();
        for (&team_number, &rating) in &start {
            let Some(pairing) = schedule
                .iter()
                .find(|s| s.week == week && s.team_number == team_number)
            else {
                warn!("elo: team {team_number} has no schedule entry for week {week}");
                continue;
            };
            let Some(result) = results
                .iter()
                .find(|r| r.week == week && r.team_number == team_number)
            else {
                warn!("elo: team {team_number} has no result for week {week}");
                continue;
            };
            let Some(&opponent) = start.get(&pairing.opponent_number) else {
                warn!(
                    "elo: opponent {} of team {team_number} is unrated in week {week}",
                    pairing.opponent_number
                );
                continue;
            };

            let (expected, actual, new_elo) =
                update(rating, opponent, result.normalized_score_difference, config);
            ratings.insert(team_number, new_elo);
            names.insert(team_number, result.team.clone());
            rows.push(EloRow {
                week: week + 1,
                team: result.team.clone(),
                team_number,
                prior_elo: rating,
                expected_result: expected,
                actual_result: actual,
                new_elo,
            });
        }
    }

    rows
}
