// Luck: how far actual results stray from what the all-play numbers predicted.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use dugout_core::config::LuckConfig;
use dugout_core::model::{TeamNumber, WeeklyResult};

use crate::allplay::{AllPlayRecord, MatchupCoefficient};
use crate::ranking::{mean, round2};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LuckCategory {
    Lucky,
    Average,
    Unlucky,
}

impl LuckCategory {
    /// Positive differences mean the team scored below expectation.
    pub fn classify(luck_difference: f64, threshold: f64) -> Self {
        if luck_difference > threshold {
            LuckCategory::Unlucky
        } else if luck_difference < -threshold {
            LuckCategory::Lucky
        } else {
            LuckCategory::Average
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LuckCategory::Lucky => "Lucky",
            LuckCategory::Average => "Average",
            LuckCategory::Unlucky => "Unlucky",
        }
    }
}

// ---------------------------------------------------------------------------
// Weekly analysis
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyLuck {
    pub week: u32,
    pub team: String,
    pub team_number: TeamNumber,
    pub opponent: String,
    pub opponent_number: TeamNumber,
    pub expected_wins: f64,
    pub actual_wins: f64,
    /// Expected minus actual.
    pub luck_difference: f64,
    /// 1 is the unluckiest team of the week.
    pub luck_rank: u32,
    pub luck_category: LuckCategory,
    pub opponent_expected_wins: f64,
    pub expected_win_diff: f64,
    pub team_won: bool,
    pub team_lost: bool,
    pub underdog_victory: bool,
    pub favorite_loss: bool,
    pub upset_magnitude: f64,
    pub extreme_outlier: bool,
}

/// Join matchup coefficients with actual results and grade every team-week.
///
/// Coefficient rows without a matching result are skipped. Output is
/// ordered by week, then by luck rank.
pub fn weekly_luck(
    coefficients: &[MatchupCoefficient],
    results: &[WeeklyResult],
    categories: usize,
    config: &LuckConfig,
) -> Vec<WeeklyLuck> {
    let mut by_week: BTreeMap<u32, Vec<WeeklyLuck>> = BTreeMap::new();

    for c in coefficients {
        let Some(result) = results
            .iter()
            .find(|r| r.week == c.week && r.team_number == c.team_number)
        else {
            continue;
        };

        let expected_wins = c.team_expected_wins;
        let actual_wins = result.score;
        let expected_win_diff = expected_wins - c.opponent_expected_wins;
        let team_won = result.won(categories);
        let team_lost = result.lost(categories);
        let underdog_victory = expected_win_diff < 0.0 && team_won;
        let favorite_loss = expected_win_diff > 0.0 && team_lost;
        let upset_magnitude = expected_win_diff.abs();
        let luck_difference = expected_wins - actual_wins;

        by_week.entry(c.week).or_default().push(WeeklyLuck {
            week: c.week,
            team: c.team.clone(),
            team_number: c.team_number,
            opponent: c.opponent.clone(),
            opponent_number: c.opponent_number,
            expected_wins,
            actual_wins,
            luck_difference,
            luck_rank: 0,
            luck_category: LuckCategory::classify(luck_difference, config.threshold),
            opponent_expected_wins: c.opponent_expected_wins,
            expected_win_diff,
            team_won,
            team_lost,
            underdog_victory,
            favorite_loss,
            upset_magnitude,
            extreme_outlier: (underdog_victory || favorite_loss)
                && upset_magnitude >= config.outlier_magnitude,
        });
    }

    let mut out = Vec::new();
    for (_, mut rows) in by_week {
        rows.sort_by(|a, b| b.luck_difference.total_cmp(&a.luck_difference));
        for (i, row) in rows.iter_mut().enumerate() {
            row.luck_rank = i as u32 + 1;
        }
        out.extend(rows);
    }
    out
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LuckTotals {
    pub team: String,
    pub team_number: TeamNumber,
    pub total_luck_diff: f64,
    pub avg_luck_diff: f64,
    pub weeks_played: u32,
    pub total_expected: f64,
    pub total_actual: f64,
}

/// Season totals per team, unluckiest first. Sums are rounded to 2 decimals.
pub fn team_totals(weekly: &[WeeklyLuck]) -> Vec<LuckTotals> {
    let mut by_team: BTreeMap<TeamNumber, Vec<&WeeklyLuck>> = BTreeMap::new();
    for row in weekly {
        by_team.entry(row.team_number).or_default().push(row);
    }

    let mut out: Vec<LuckTotals> = by_team
        .into_iter()
        .filter_map(|(team_number, rows)| {
            let latest = rows.iter().max_by_key(|r| r.week)?;
            let diffs: Vec<f64> = rows.iter().map(|r| r.luck_difference).collect();
            Some(LuckTotals {
                team: latest.team.clone(),
                team_number,
                total_luck_diff: round2(diffs.iter().sum()),
                avg_luck_diff: round2(mean(&diffs)),
                weeks_played: rows.len() as u32,
                total_expected: round2(rows.iter().map(|r| r.expected_wins).sum()),
                total_actual: round2(rows.iter().map(|r| r.actual_wins).sum()),
            })
        })
        .collect();
    out.sort_by(|a, b| b.total_luck_diff.total_cmp(&a.total_luck_diff));
    out
}

// ---------------------------------------------------------------------------
// Luck coefficient
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LuckCoefficient {
    pub team: String,
    pub team_number: TeamNumber,
    pub matchups: u32,
    /// Matchup wins with draws counted half.
    pub actual_wins: f64,
    /// Sum of weekly all-play win pct.
    pub expected_wins: f64,
    /// Actual minus expected; positive is lucky.
    pub luck_coefficient: f64,
    /// Matchups won in a week the team sat in the bottom half of all-play.
    pub lucky_wins: u32,
    /// Matchups lost in a week the team sat in the top half of all-play.
    pub unlucky_losses: u32,
    /// `(lucky_wins - unlucky_losses) / matchups`.
    pub tag_ratio: f64,
}

/// Compare each team's real matchup record with its all-play expectation.
///
/// Weeks missing from either input are ignored. Ordered luckiest first.
pub fn luck_coefficients(
    results: &[WeeklyResult],
    all_play: &[AllPlayRecord],
    categories: usize,
) -> Vec<LuckCoefficient> {
    let mut teams_per_week: BTreeMap<u32, usize> = BTreeMap::new();
    for record in all_play {
        *teams_per_week.entry(record.week).or_default() += 1;
    }

    let mut by_team: BTreeMap<TeamNumber, LuckCoefficient> = BTreeMap::new();
    for result in results {
        let Some(record) = all_play
            .iter()
            .find(|a| a.week == result.week && a.team_number == result.team_number)
        else {
            continue;
        };
        let teams = teams_per_week.get(&result.week).copied().unwrap_or(0) as f64;
        let top_half = (record.rank as f64) <= teams / 2.0;

        let entry = by_team
            .entry(result.team_number)
            .or_insert_with(|| LuckCoefficient {
                team: result.team.clone(),
                team_number: result.team_number,
                matchups: 0,
                actual_wins: 0.0,
                expected_wins: 0.0,
                luck_coefficient: 0.0,
                lucky_wins: 0,
                unlucky_losses: 0,
                tag_ratio: 0.0,
            });
        entry.team = result.team.clone();
        entry.matchups += 1;
        entry.expected_wins += record.pct;
        if result.won(categories) {
            entry.actual_wins += 1.0;
            if !top_half {
                entry.lucky_wins += 1;
            }
        } else if result.lost(categories) {
            if top_half {
                entry.unlucky_losses += 1;
            }
        } else {
            entry.actual_wins += 0.5;
        }
    }

    let mut out: Vec<LuckCoefficient> = by_team
        .into_values()
        .map(|mut c| {
            c.luck_coefficient = c.actual_wins - c.expected_wins;
            if c.matchups > 0 {
                c.tag_ratio =
                    (c.lucky_wins as f64 - c.unlucky_losses as f64) / c.matchups as f64;
            }
            c
        })
        .collect();
    out.sort_by(|a, b| b.luck_coefficient.total_cmp(&a.luck_coefficient));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use dugout_core::model::WinLossTie;

    fn approx_eq(a: f64, b: f64, eps: f64) -> bool {
        (a - b).abs() < eps
    }

    fn coeff(week: u32, team: u32, opp: u32, exp: f64, opp_exp: f64) -> MatchupCoefficient {
        MatchupCoefficient {
            week,
            team: format!("Team {team}"),
            team_number: TeamNumber(team),
            team_expected_wins: exp,
            opponent: format!("Team {opp}"),
            opponent_number: TeamNumber(opp),
            opponent_expected_wins: opp_exp,
            matchup_difference: round2(exp - opp_exp),
            matchup_power: round2(exp + opp_exp),
        }
    }

    fn result(week: u32, team: u32, opp: u32, score: f64) -> WeeklyResult {
        WeeklyResult {
            week,
            team: format!("Team {team}"),
            team_number: TeamNumber(team),
            opponent: format!("Team {opp}"),
            opponent_number: TeamNumber(opp),
            score,
            opponent_score: 12.0 - score,
            score_difference: 2.0 * score - 12.0,
            normalized_score_difference: score / 12.0,
        }
    }

    fn all_play(week: u32, team: u32, rank: u32, pct: f64) -> AllPlayRecord {
        AllPlayRecord {
            week,
            team: format!("Team {team}"),
            team_number: TeamNumber(team),
            matchups: WinLossTie::default(),
            categories: WinLossTie::default(),
            pct,
            rank,
        }
    }

    #[test]
    fn classify_thresholds() {
        assert_eq!(LuckCategory::classify(0.6, 0.5), LuckCategory::Unlucky);
        assert_eq!(LuckCategory::classify(0.5, 0.5), LuckCategory::Average);
        assert_eq!(LuckCategory::classify(-0.51, 0.5), LuckCategory::Lucky);
    }

    #[test]
    fn weekly_luck_flags_upsets() {
        let coefficients = vec![
            coeff(1, 1, 2, 8.0, 4.5),
            coeff(1, 2, 1, 4.5, 8.0),
            coeff(1, 3, 4, 6.0, 5.5),
            coeff(1, 4, 3, 5.5, 6.0),
        ];
        let results = vec![
            result(1, 1, 2, 4.0),
            result(1, 2, 1, 8.0),
            result(1, 3, 4, 6.0),
            result(1, 4, 3, 6.0),
        ];

        let luck = weekly_luck(&coefficients, &results, 12, &LuckConfig::default());

        assert_eq!(luck.len(), 4);
        let first = &luck[0];
        assert_eq!(first.team_number, TeamNumber(1));
        assert_eq!(first.luck_rank, 1);
        assert!(approx_eq(first.luck_difference, 4.0, 1e-12));
        assert_eq!(first.luck_category, LuckCategory::Unlucky);
        assert!(first.favorite_loss);
        assert!(first.extreme_outlier);

        let last = luck.last().unwrap();
        assert_eq!(last.team_number, TeamNumber(2));
        assert_eq!(last.luck_rank, 4);
        assert_eq!(last.luck_category, LuckCategory::Lucky);
        assert!(last.underdog_victory);

        // A 6-6 draw is neither a win nor a loss.
        let drawn = luck.iter().find(|l| l.team_number == TeamNumber(3)).unwrap();
        assert!(!drawn.team_won && !drawn.team_lost);
        assert!(!drawn.extreme_outlier);
    }

    #[test]
    fn small_upsets_are_not_outliers() {
        let coefficients = vec![coeff(2, 1, 2, 6.0, 5.0)];
        let results = vec![result(2, 1, 2, 5.0)];
        let luck = weekly_luck(&coefficients, &results, 12, &LuckConfig::default());
        assert!(luck[0].favorite_loss);
        assert!(!luck[0].extreme_outlier);
    }

    #[test]
    fn weekly_luck_skips_rows_without_results() {
        let coefficients = vec![coeff(1, 1, 2, 6.0, 6.0), coeff(2, 1, 2, 6.0, 6.0)];
        let results = vec![result(1, 1, 2, 6.0)];
        let luck = weekly_luck(&coefficients, &results, 12, &LuckConfig::default());
        assert_eq!(luck.len(), 1);
        assert_eq!(luck[0].week, 1);
    }

    #[test]
    fn team_totals_sum_and_sort() {
        let coefficients = vec![
            coeff(1, 1, 2, 7.0, 5.0),
            coeff(1, 2, 1, 5.0, 7.0),
            coeff(2, 1, 2, 6.0, 6.0),
            coeff(2, 2, 1, 6.0, 6.0),
        ];
        let results = vec![
            result(1, 1, 2, 5.0),
            result(1, 2, 1, 7.0),
            result(2, 1, 2, 7.0),
            result(2, 2, 1, 5.0),
        ];
        let luck = weekly_luck(&coefficients, &results, 12, &LuckConfig::default());
        let totals = team_totals(&luck);

        assert_eq!(totals.len(), 2);
        assert_eq!(totals[0].team_number, TeamNumber(1));
        assert!(approx_eq(totals[0].total_luck_diff, 1.0, 1e-12));
        assert!(approx_eq(totals[0].avg_luck_diff, 0.5, 1e-12));
        assert_eq!(totals[0].weeks_played, 2);
        assert!(approx_eq(totals[0].total_expected, 13.0, 1e-12));
        assert!(approx_eq(totals[1].total_luck_diff, -1.0, 1e-12));
    }

    #[test]
    fn luck_coefficient_and_tags() {
        let results = vec![
            result(1, 1, 2, 7.0),
            result(1, 2, 1, 5.0),
            result(2, 1, 2, 4.0),
            result(2, 2, 1, 8.0),
            result(3, 1, 2, 6.0),
            result(3, 2, 1, 6.0),
        ];
        let all_play = vec![
            // Week 1: team 1 wins from the bottom half.
            all_play(1, 1, 2, 0.2),
            all_play(1, 2, 1, 0.8),
            // Week 2: team 1 loses from the top half.
            all_play(2, 1, 1, 0.9),
            all_play(2, 2, 2, 0.1),
            all_play(3, 1, 1, 0.5),
            all_play(3, 2, 1, 0.5),
        ];

        let coeffs = luck_coefficients(&results, &all_play, 12);
        let team1 = coeffs.iter().find(|c| c.team_number == TeamNumber(1)).unwrap();

        assert_eq!(team1.matchups, 3);
        assert!(approx_eq(team1.actual_wins, 1.5, 1e-12));
        assert!(approx_eq(team1.expected_wins, 1.6, 1e-12));
        assert!(approx_eq(team1.luck_coefficient, -0.1, 1e-12));
        assert_eq!(team1.lucky_wins, 1);
        assert_eq!(team1.unlucky_losses, 1);
        assert!(approx_eq(team1.tag_ratio, 0.0, 1e-12));

        let team2 = coeffs.iter().find(|c| c.team_number == TeamNumber(2)).unwrap();
        assert!(approx_eq(team2.luck_coefficient, 0.1, 1e-12));
        assert_eq!(team2.lucky_wins, 1);
        assert_eq!(team2.unlucky_losses, 1);
        assert_eq!(coeffs[0].team_number, TeamNumber(2));
    }
}
