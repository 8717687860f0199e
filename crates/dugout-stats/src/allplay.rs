// All-play simulation: every team's week measured against the whole league
// instead of just its scheduled opponent.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use dugout_core::categories::CategorySet;
use dugout_core::model::{StatLine, TeamNumber, WeeklyStats, WinLossTie};

use crate::error::StatsError;
use crate::ranking::{rank_average, round2, Order};

// ---------------------------------------------------------------------------
// Expected-win coefficients
// ---------------------------------------------------------------------------

/// Share of the league a team beat in each category for one week.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamCoefficient {
    pub week: u32,
    pub team: String,
    pub team_number: TeamNumber,
    pub opponent: String,
    pub opponent_number: TeamNumber,
    /// Category name to `(n - rank) / (n - 1)`.
    pub coefficients: BTreeMap<String, f64>,
    /// Sum of the category coefficients.
    pub expected_wins: f64,
}

/// Look up `category` in a stat line, naming the team when it is absent.
pub(crate) fn stat(team: &str, stats: &StatLine, category: &str) -> Result<f64, StatsError> {
    stats
        .get(category)
        .copied()
        .ok_or_else(|| StatsError::MissingCategory {
            team: team.to_string(),
            category: category.to_string(),
        })
}

/// Compute expected wins for every team in one week.
///
/// Each category ranks the league best-first with ties averaged. The best
/// team earns 1.0, the worst 0.0, and a team tied with everyone 0.5.
pub fn expected_wins(
    week: u32,
    rows: &[WeeklyStats],
    categories: &CategorySet,
) -> Result<Vec<TeamCoefficient>, StatsError> {
    let n = rows.len();
    if n < 2 {
        return Err(StatsError::NotEnoughTeams { week, teams: n });
    }

    let mut out: Vec<TeamCoefficient> = rows
        .iter()
        .map(|r| TeamCoefficient {
            week,
            team: r.team.clone(),
            team_number: r.team_number,
            opponent: r.opponent.clone(),
            opponent_number: r.opponent_number,
            coefficients: BTreeMap::new(),
            expected_wins: 0.0,
        })
        .collect();

    let denom = (n - 1) as f64;
    for category in categories.iter() {
        let values = rows
            .iter()
            .map(|r| stat(&r.team, &r.stats, &category.name))
            .collect::<Result<Vec<f64>, _>>()?;
        let ranks = rank_average(&values, Order::from(category.direction));
        for (row, rank) in out.iter_mut().zip(ranks) {
            let coeff = (n as f64 - rank) / denom;
            row.coefficients.insert(category.name.clone(), coeff);
            row.expected_wins += coeff;
        }
    }

    Ok(out)
}

// ---------------------------------------------------------------------------
// Matchup coefficients
// ---------------------------------------------------------------------------

/// Expected wins for both sides of a scheduled matchup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchupCoefficient {
    pub week: u32,
    pub team: String,
    pub team_number: TeamNumber,
    pub team_expected_wins: f64,
    pub opponent: String,
    pub opponent_number: TeamNumber,
    pub opponent_expected_wins: f64,
    /// Team minus opponent, rounded to 2 decimals.
    pub matchup_difference: f64,
    /// Team plus opponent, rounded to 2 decimals.
    pub matchup_power: f64,
}

/// Join each team's expected wins with those of its actual opponent.
pub fn matchup_coefficients(
    coefficients: &[TeamCoefficient],
) -> Result<Vec<MatchupCoefficient>, StatsError> {
    coefficients
        .iter()
        .map(|c| {
            let opp = coefficients
                .iter()
                .find(|o| o.team_number == c.opponent_number)
                .ok_or(StatsError::MissingOpponent {
                    week: c.week,
                    team: c.team_number,
                    opponent: c.opponent_number,
                })?;
            Ok(MatchupCoefficient {
                week: c.week,
                team: c.team.clone(),
                team_number: c.team_number,
                team_expected_wins: c.expected_wins,
                opponent: c.opponent.clone(),
                opponent_number: c.opponent_number,
                opponent_expected_wins: opp.expected_wins,
                matchup_difference: round2(c.expected_wins - opp.expected_wins),
                matchup_power: round2(c.expected_wins + opp.expected_wins),
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Head-to-head simulation
// ---------------------------------------------------------------------------

/// Category tally for `a` against `b`; a tie in a category counts for neither.
pub fn h2h_result(
    a: &WeeklyStats,
    b: &WeeklyStats,
    categories: &CategorySet,
) -> Result<WinLossTie, StatsError> {
    let mut tally = WinLossTie::default();
    for category in categories.iter() {
        let av = stat(&a.team, &a.stats, &category.name)?;
        let bv = stat(&b.team, &b.stats, &category.name)?;
        match category.direction.compare(av, bv) {
            Ordering::Greater => tally.wins += 1,
            Ordering::Less => tally.losses += 1,
            Ordering::Equal => tally.ties += 1,
        }
    }
    Ok(tally)
}

/// A team's results had it played everyone in the league in one week.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllPlayRecord {
    pub week: u32,
    pub team: String,
    pub team_number: TeamNumber,
    /// Simulated matchups won, lost and drawn.
    pub matchups: WinLossTie,
    /// Categories won, lost and tied across all simulated matchups.
    pub categories: WinLossTie,
    /// `(W + T/2) / (W + L + T)` over simulated matchups.
    pub pct: f64,
    /// 1 plus the number of teams with a strictly higher pct.
    pub rank: u32,
}

/// Play every ordered pair of teams for one week.
pub fn simulate_week(
    week: u32,
    rows: &[WeeklyStats],
    categories: &CategorySet,
) -> Result<Vec<AllPlayRecord>, StatsError> {
    if rows.len() < 2 {
        return Err(StatsError::NotEnoughTeams {
            week,
            teams: rows.len(),
        });
    }

    let mut records = Vec::with_capacity(rows.len());
    for (i, a) in rows.iter().enumerate() {
        let mut matchups = WinLossTie::default();
        let mut cats = WinLossTie::default();
        for (j, b) in rows.iter().enumerate() {
            if i == j {
                continue;
            }
            let tally = h2h_result(a, b, categories)?;
            cats.add(tally);
            match tally.wins.cmp(&tally.losses) {
                Ordering::Greater => matchups.wins += 1,
                Ordering::Less => matchups.losses += 1,
                Ordering::Equal => matchups.ties += 1,
            }
        }
        records.push(AllPlayRecord {
            week,
            team: a.team.clone(),
            team_number: a.team_number,
            matchups,
            categories: cats,
            pct: matchups.pct(),
            rank: 0,
        });
    }

    let pcts: Vec<f64> = records.iter().map(|r| r.pct).collect();
    for record in records.iter_mut() {
        record.rank = pcts.iter().filter(|&&p| p > record.pct).count() as u32 + 1;
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dugout_core::categories::{Aggregation, Category, Direction, Side};

    fn approx_eq(a: f64, b: f64, eps: f64) -> bool {
        (a - b).abs() < eps
    }

    /// Two categories: HR (more is better) and ERA (less is better).
    fn cats() -> CategorySet {
        CategorySet::new(vec![
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
        ])
    }

    fn row(n: u32, opp: u32, hr: f64, era: f64) -> WeeklyStats {
        WeeklyStats {
            week: 3,
            team: format!("Team {n}"),
            team_number: TeamNumber(n),
            opponent: format!("Team {opp}"),
            opponent_number: TeamNumber(opp),
            stats: [("HR".to_string(), hr), ("ERA".to_string(), era)]
                .into_iter()
                .collect(),
        }
    }

    fn league() -> Vec<WeeklyStats> {
        vec![
            row(1, 2, 12.0, 2.50),
            row(2, 1, 8.0, 3.00),
            row(3, 4, 8.0, 4.10),
            row(4, 3, 5.0, 3.60),
        ]
    }

    #[test]
    fn expected_wins_rank_each_category() {
        let coeffs = expected_wins(3, &league(), &cats()).unwrap();
        // HR ranks: 1, 2.5, 2.5, 4. ERA ranks: 1, 2, 4, 3. n - 1 = 3.
        assert!(approx_eq(coeffs[0].expected_wins, 2.0, 1e-12));
        assert!(approx_eq(coeffs[1].coefficients["HR"], 0.5, 1e-12));
        assert!(approx_eq(coeffs[1].expected_wins, 0.5 + 2.0 / 3.0, 1e-12));
        assert!(approx_eq(coeffs[2].expected_wins, 0.5, 1e-12));
        assert!(approx_eq(coeffs[3].expected_wins, 1.0 / 3.0, 1e-12));
    }

    #[test]
    fn expected_wins_total_is_half_the_pairings() {
        // Every category hands out exactly n/2 coefficient in total.
        let coeffs = expected_wins(3, &league(), &cats()).unwrap();
        let total: f64 = coeffs.iter().map(|c| c.expected_wins).sum();
        assert!(approx_eq(total, 4.0, 1e-12));
    }

    #[test]
    fn expected_wins_needs_two_teams() {
        let err = expected_wins(5, &league()[..1], &cats()).unwrap_err();
        assert_eq!(err, StatsError::NotEnoughTeams { week: 5, teams: 1 });
    }

    #[test]
    fn expected_wins_reports_missing_category() {
        let mut rows = league();
        rows[2].stats.remove("ERA");
        match expected_wins(3, &rows, &cats()).unwrap_err() {
            StatsError::MissingCategory { team, category } => {
                assert_eq!(team, "Team 3");
                assert_eq!(category, "ERA");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn matchup_coefficients_join_opponents() {
        let coeffs = expected_wins(3, &league(), &cats()).unwrap();
        let matchups = matchup_coefficients(&coeffs).unwrap();
        let m = &matchups[0];
        assert_eq!(m.opponent_number, TeamNumber(2));
        assert!(approx_eq(m.opponent_expected_wins, 0.5 + 2.0 / 3.0, 1e-12));
        assert_eq!(m.matchup_difference, 0.83);
        assert_eq!(m.matchup_power, 3.17);
        assert_eq!(matchups[1].matchup_difference, -0.83);
    }

    #[test]
    fn matchup_coefficients_missing_opponent() {
        let coeffs = expected_wins(3, &league()[..3], &cats()).unwrap();
        let err = matchup_coefficients(&coeffs).unwrap_err();
        assert_eq!(
            err,
            StatsError::MissingOpponent {
                week: 3,
                team: TeamNumber(3),
                opponent: TeamNumber(4),
            }
        );
    }

    #[test]
    fn h2h_counts_category_ties_separately() {
        let rows = league();
        let tally = h2h_result(&rows[1], &rows[2], &cats()).unwrap();
        assert_eq!(tally, WinLossTie::new(1, 0, 1));
        let reverse = h2h_result(&rows[2], &rows[1], &cats()).unwrap();
        assert_eq!(reverse, WinLossTie::new(0, 1, 1));
    }

    #[test]
    fn simulate_week_records_and_ranks() {
        let records = simulate_week(3, &league(), &cats()).unwrap();

        // Team 1 sweeps everyone.
        assert_eq!(records[0].matchups, WinLossTie::new(3, 0, 0));
        assert_eq!(records[0].categories, WinLossTie::new(6, 0, 0));
        assert_eq!(records[0].rank, 1);

        // Team 2 beats 3 (1-0-1) and 4 (2-0), loses to 1.
        assert_eq!(records[1].matchups, WinLossTie::new(2, 1, 0));
        assert_eq!(records[1].rank, 2);

        // Teams 3 and 4 split their categories: a drawn matchup each.
        assert_eq!(records[2].matchups, WinLossTie::new(0, 2, 1));
        assert_eq!(records[3].matchups, WinLossTie::new(0, 2, 1));
        assert!(approx_eq(records[3].pct, 0.5 / 3.0, 1e-12));
        assert_eq!(records[2].rank, 3);
        assert_eq!(records[3].rank, 3);
    }
}
