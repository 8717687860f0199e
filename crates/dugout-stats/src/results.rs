// Weekly matchup results with tie adjustment, plus single-week category bests.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use dugout_core::categories::CategorySet;
use dugout_core::model::{MatchupLine, TeamNumber, WeeklyResult, WeeklyStats};

use crate::allplay::stat;
use crate::error::StatsError;

/// Split a matchup page into the requested team's line and its opponent's.
///
/// The page lists the `mid1` team first and the opponent second.
pub fn matchup_sides(lines: &[MatchupLine]) -> Result<(&MatchupLine, &MatchupLine), StatsError> {
    match lines {
        [team, opponent] => Ok((team, opponent)),
        _ => Err(StatsError::MalformedMatchup { rows: lines.len() }),
    }
}

/// Build the tie-adjusted result for `team` against `opponent`.
///
/// Yahoo scores count categories won outright. The categories neither side
/// won are split evenly so both scores always sum to the category count.
pub fn weekly_result(
    week: u32,
    team: &MatchupLine,
    team_number: TeamNumber,
    opponent: &MatchupLine,
    opponent_number: TeamNumber,
    categories: usize,
) -> WeeklyResult {
    let c = categories as f64;
    let ties = (c - team.score - opponent.score).max(0.0);
    let score = team.score + ties / 2.0;
    let opponent_score = opponent.score + ties / 2.0;
    let score_difference = score - opponent_score;

    WeeklyResult {
        week,
        team: team.team.clone(),
        team_number,
        opponent: opponent.team.clone(),
        opponent_number,
        score,
        opponent_score,
        score_difference,
        normalized_score_difference: normalized_score_difference(score_difference, categories),
    }
}

/// Map a score difference in `[-C, C]` onto `[0, 1]`.
pub fn normalized_score_difference(difference: f64, categories: usize) -> f64 {
    let c = categories as f64;
    (difference + c) / (2.0 * c)
}

/// The best single-week total in one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonBest {
    pub category: String,
    pub team: String,
    pub team_number: TeamNumber,
    pub week: u32,
    pub opponent: String,
    pub total: f64,
}

/// Best weekly line per category, in category order. The earliest row wins
/// a tie. Categories with no rows are skipped.
pub fn season_bests(
    rows: &[WeeklyStats],
    categories: &CategorySet,
) -> Result<Vec<SeasonBest>, StatsError> {
    let mut bests = Vec::new();
    for category in categories.iter() {
        let mut best: Option<(&WeeklyStats, f64)> = None;
        for row in rows {
            let value = stat(&row.team, &row.stats, &category.name)?;
            let better = match best {
                None => true,
                Some((_, current)) => category.direction.compare(value, current) == Ordering::Greater,
            };
            if better {
                best = Some((row, value));
            }
        }
        if let Some((row, total)) = best {
            bests.push(SeasonBest {
                category: category.name.clone(),
                team: row.team.clone(),
                team_number: row.team_number,
                week: row.week,
                opponent: row.opponent.clone(),
                total,
            });
        }
    }
    Ok(bests)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dugout_core::categories::{Aggregation, Category, Direction, Side};

    fn approx_eq(a: f64, b: f64, eps: f64) -> bool {
        (a - b).abs() < eps
    }

    fn line(team: &str, score: f64) -> MatchupLine {
        MatchupLine {
            team: team.into(),
            stats: Default::default(),
            score,
        }
    }

    #[test]
    fn ties_are_split_between_both_sides() {
        let r = weekly_result(
            4,
            &line("Alpha", 6.0),
            TeamNumber(1),
            &line("Bravo", 4.0),
            TeamNumber(2),
            12,
        );
        assert!(approx_eq(r.score, 7.0, 1e-12));
        assert!(approx_eq(r.opponent_score, 5.0, 1e-12));
        assert!(approx_eq(r.score_difference, 2.0, 1e-12));
        assert!(approx_eq(r.normalized_score_difference, 14.0 / 24.0, 1e-12));
        assert_eq!(r.opponent, "Bravo");
    }

    #[test]
    fn no_ties_leaves_scores_untouched() {
        let r = weekly_result(1, &line("A", 9.0), TeamNumber(1), &line("B", 3.0), TeamNumber(2), 12);
        assert!(approx_eq(r.score, 9.0, 1e-12));
        assert!(approx_eq(r.opponent_score, 3.0, 1e-12));
    }

    #[test]
    fn normalized_difference_bounds() {
        assert!(approx_eq(normalized_score_difference(-12.0, 12), 0.0, 1e-12));
        assert!(approx_eq(normalized_score_difference(0.0, 12), 0.5, 1e-12));
        assert!(approx_eq(normalized_score_difference(12.0, 12), 1.0, 1e-12));
    }

    #[test]
    fn matchup_sides_requires_two_rows() {
        let lines = vec![line("A", 6.0), line("B", 5.0)];
        let (a, b) = matchup_sides(&lines).unwrap();
        assert_eq!(a.team, "A");
        assert_eq!(b.team, "B");
        assert_eq!(
            matchup_sides(&lines[..1]).unwrap_err(),
            StatsError::MalformedMatchup { rows: 1 }
        );
    }

    #[test]
    fn season_bests_respect_direction() {
        let cats = CategorySet::new(vec![
            Category {
                name: "HR".into(),
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
        ]);
        let row = |week: u32, n: u32, hr: f64, era: f64| WeeklyStats {
            week,
            team: format!("Team {n}"),
            team_number: TeamNumber(n),
            opponent: "Other".into(),
            opponent_number: TeamNumber(99),
            stats: [("HR".to_string(), hr), ("ERA".to_string(), era)]
                .into_iter()
                .collect(),
        };
        let rows = vec![row(1, 1, 14.0, 3.9), row(2, 2, 14.0, 1.2), row(3, 3, 9.0, 2.0)];

        let bests = season_bests(&rows, &cats).unwrap();
        assert_eq!(bests.len(), 2);
        assert_eq!(bests[0].category, "HR");
        assert_eq!(bests[0].team_number, TeamNumber(1));
        assert_eq!(bests[1].category, "ERA");
        assert_eq!(bests[1].week, 2);
        assert!(approx_eq(bests[1].total, 1.2, 1e-12));

        assert!(season_bests(&[], &cats).unwrap().is_empty());
    }
}
