// Recent-form windows and a naive projection of the current week's matchups.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use dugout_core::categories::CategorySet;
use dugout_core::model::{ScheduleEntry, StatLine, TeamNumber, WeeklyStats, WinLossTie};

use crate::allplay::{stat, TeamCoefficient};
use crate::error::StatsError;

/// Coefficient rows from the last `weeks` weeks before `current_week`.
pub fn recent_coefficients(
    rows: &[TeamCoefficient],
    current_week: u32,
    weeks: u32,
) -> Vec<TeamCoefficient> {
    let from = current_week.saturating_sub(weeks);
    rows.iter().filter(|r| r.week >= from).cloned().collect()
}

/// Mean stat line per team over weeks `current_week - weeks .. current_week`.
pub fn recent_averages(
    rows: &[WeeklyStats],
    current_week: u32,
    weeks: u32,
    categories: &CategorySet,
) -> Result<BTreeMap<TeamNumber, (String, StatLine)>, StatsError> {
    let from = current_week.saturating_sub(weeks);
    let mut sums: BTreeMap<TeamNumber, (String, StatLine, u32)> = BTreeMap::new();

    for row in rows.iter().filter(|r| r.week >= from && r.week < current_week) {
        let entry = sums
            .entry(row.team_number)
            .or_insert_with(|| (row.team.clone(), StatLine::new(), 0));
        for category in categories.iter() {
            *entry.1.entry(category.name.clone()).or_insert(0.0) +=
                stat(&row.team, &row.stats, &category.name)?;
        }
        entry.2 += 1;
    }

    Ok(sums
        .into_iter()
        .map(|(n, (team, totals, count))| {
            let means = totals
                .into_iter()
                .map(|(k, v)| (k, v / count as f64))
                .collect();
            (n, (team, means))
        })
        .collect())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub week: u32,
    pub team: String,
    pub team_number: TeamNumber,
    pub opponent: String,
    pub opponent_number: TeamNumber,
    /// Category name to 1.0 (projected win), 0.0 (loss) or 0.5 (dead even).
    pub outcomes: BTreeMap<String, f64>,
    pub projected: WinLossTie,
}

/// Project each scheduled matchup of `current_week` from recent averages.
///
/// Teams without recent stats on either side of a pairing are skipped.
pub fn predict_week(
    rows: &[WeeklyStats],
    schedule: &[ScheduleEntry],
    current_week: u32,
    window: u32,
    categories: &CategorySet,
) -> Result<Vec<Prediction>, StatsError> {
    let averages = recent_averages(rows, current_week, window, categories)?;
    let mut out = Vec::new();

    for pairing in schedule.iter().filter(|s| s.week == current_week) {
        let (Some((team, mine)), Some((opponent, theirs))) = (
            averages.get(&pairing.team_number),
            averages.get(&pairing.opponent_number),
        ) else {
            warn!(
                "predict: no recent stats for {} vs {} in week {current_week}",
                pairing.team_number, pairing.opponent_number
            );
            continue;
        };

        let mut outcomes = BTreeMap::new();
        let mut projected = WinLossTie::default();
        for category in categories.iter() {
            let a = stat(team, mine, &category.name)?;
            let b = stat(opponent, theirs, &category.name)?;
            let (value, tally) = match category.direction.compare(a, b) {
                Ordering::Greater => (1.0, WinLossTie::new(1, 0, 0)),
                Ordering::Less => (0.0, WinLossTie::new(0, 1, 0)),
                Ordering::Equal => (0.5, WinLossTie::new(0, 0, 1)),
            };
            outcomes.insert(category.name.clone(), value);
            projected.add(tally);
        }

        out.push(Prediction {
            week: current_week,
            team: team.clone(),
            team_number: pairing.team_number,
            opponent: opponent.clone(),
            opponent_number: pairing.opponent_number,
            outcomes,
            projected,
        });
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dugout_core::categories::{Aggregation, Category, Direction, Side};

    fn cats() -> CategorySet {
        CategorySet::new(vec![
            Category {
                name: "HR".into(),
                side: Side::Batting,
                direction: Direction::HigherIsBetter,
                aggregation: Aggregation::Sum,
            },
            Category {
                name: "SB".into(),
                side: Side::Batting,
                direction: Direction::HigherIsBetter,
                aggregation: Aggregation::Sum,
            },
            Category {
                name: "ERA".into(),
                side: Side::Pitching,
                direction: Direction::LowerIsBetter,
                aggregation: Aggregation::Mean,
            },
        ])
    }

    fn stats(week: u32, n: u32, hr: f64, sb: f64, era: f64) -> WeeklyStats {
        WeeklyStats {
            week,
            team: format!("Team {n}"),
            team_number: TeamNumber(n),
            opponent: String::new(),
            opponent_number: TeamNumber(0),
            stats: [("HR", hr), ("SB", sb), ("ERA", era)]
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        }
    }

    fn coefficient(week: u32) -> TeamCoefficient {
        TeamCoefficient {
            week,
            team: "Team 1".into(),
            team_number: TeamNumber(1),
            opponent: "Team 2".into(),
            opponent_number: TeamNumber(2),
            coefficients: BTreeMap::new(),
            expected_wins: 6.0,
        }
    }

    #[test]
    fn coefficient_windows() {
        let rows: Vec<TeamCoefficient> = (1..=9).map(coefficient).collect();
        assert_eq!(recent_coefficients(&rows, 10, 4).len(), 4);
        assert_eq!(recent_coefficients(&rows, 10, 2).len(), 2);
        assert_eq!(recent_coefficients(&rows, 3, 4).len(), 9);
    }

    #[test]
    fn averages_ignore_weeks_outside_window() {
        let rows = vec![
            stats(1, 1, 100.0, 0.0, 9.0),
            stats(4, 1, 10.0, 2.0, 3.0),
            stats(5, 1, 6.0, 4.0, 4.0),
            stats(6, 1, 99.0, 99.0, 0.0),
        ];
        let avg = recent_averages(&rows, 6, 4, &cats()).unwrap();
        let (_, line) = &avg[&TeamNumber(1)];
        assert_eq!(line["HR"], 8.0);
        assert_eq!(line["ERA"], 3.5);
    }

    #[test]
    fn predicts_direction_aware_outcomes() {
        let rows = vec![
            stats(3, 1, 10.0, 2.0, 3.0),
            stats(3, 2, 8.0, 2.0, 4.0),
            stats(4, 1, 12.0, 4.0, 3.0),
            stats(4, 2, 8.0, 4.0, 2.0),
        ];
        let schedule = vec![
            ScheduleEntry {
                week: 5,
                team: "Team 1".into(),
                team_number: TeamNumber(1),
                opponent: "Team 2".into(),
                opponent_number: TeamNumber(2),
            },
            ScheduleEntry {
                week: 5,
                team: "Team 2".into(),
                team_number: TeamNumber(2),
                opponent: "Team 1".into(),
                opponent_number: TeamNumber(1),
            },
        ];

        let preds = predict_week(&rows, &schedule, 5, 4, &cats()).unwrap();

        assert_eq!(preds.len(), 2);
        // HR 11 vs 8 win, SB 3 vs 3 tie, ERA 3.0 vs 3.0 tie.
        assert_eq!(preds[0].projected, WinLossTie::new(1, 0, 2));
        assert_eq!(preds[0].outcomes["SB"], 0.5);
        assert_eq!(preds[1].projected, WinLossTie::new(0, 1, 2));
    }

    #[test]
    fn missing_recent_stats_skips_pairing() {
        let rows = vec![stats(4, 1, 10.0, 2.0, 3.0)];
        let schedule = vec![ScheduleEntry {
            week: 5,
            team: "Team 1".into(),
            team_number: TeamNumber(1),
            opponent: "Team 2".into(),
            opponent_number: TeamNumber(2),
        }];
        assert!(predict_week(&rows, &schedule, 5, 4, &cats()).unwrap().is_empty());
    }
}
