// Power rankings: normalized category scores, stat-rank power scores and
// category record ranks, for a season to date or any single week.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use dugout_core::categories::{Aggregation, CategorySet, Side};
use dugout_core::model::{CategoryRecord, TeamNumber, TeamStats, WeeklyStats, WinLossTie};

use crate::allplay::stat;
use crate::error::StatsError;
use crate::ranking::{mean, min_max_score, rank_average, Order};

/// Standings rank per team, used to measure how far stats and results diverge.
pub type StandingsRanks = BTreeMap<TeamNumber, u32>;

fn column(rows: &[TeamStats], category: &str) -> Result<Vec<f64>, StatsError> {
    rows.iter()
        .map(|r| stat(&r.team, &r.stats, category))
        .collect()
}

// ---------------------------------------------------------------------------
// Normalized power score
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRow {
    pub team: String,
    pub team_number: TeamNumber,
    pub stats: BTreeMap<String, f64>,
    /// Category name to its 0-100 category score.
    pub scores: BTreeMap<String, f64>,
    pub score_sum: f64,
    /// Descending rank of `score_sum`, ties averaged.
    pub score_rank: f64,
    pub standings_rank: Option<u32>,
    /// `score_rank - standings_rank`; negative means results outrun the stats.
    pub score_variation: Option<f64>,
}

/// Min-max every category to 0-100 and sum the scores into a power score.
pub fn normalized_scores(
    rows: &[TeamStats],
    categories: &CategorySet,
    standings: &StandingsRanks,
) -> Result<Vec<NormalizedRow>, StatsError> {
    let mut out: Vec<NormalizedRow> = rows
        .iter()
        .map(|r| NormalizedRow {
            team: r.team.clone(),
            team_number: r.team_number,
            stats: r.stats.clone(),
            scores: BTreeMap::new(),
            score_sum: 0.0,
            score_rank: 0.0,
            standings_rank: standings.get(&r.team_number).copied(),
            score_variation: None,
        })
        .collect();

    for category in categories.iter() {
        let values = column(rows, &category.name)?;
        for (row, score) in out.iter_mut().zip(min_max_score(&values, category.direction)) {
            row.scores.insert(category.name.clone(), score);
            row.score_sum += score;
        }
    }

    let sums: Vec<f64> = out.iter().map(|r| r.score_sum).collect();
    for (row, rank) in out.iter_mut().zip(rank_average(&sums, Order::Descending)) {
        row.score_rank = rank;
        row.score_variation = row.standings_rank.map(|s| rank - s as f64);
    }

    Ok(out)
}

// ---------------------------------------------------------------------------
// Stats power rank
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerRow {
    pub team: String,
    pub team_number: TeamNumber,
    pub stats: BTreeMap<String, f64>,
    /// Category name to league rank (1 = best, ties averaged).
    pub stat_ranks: BTreeMap<String, f64>,
    /// Sum of category ranks over the team count; lower is stronger.
    pub stats_power_score: f64,
    pub stats_power_rank: f64,
    pub standings_rank: Option<u32>,
    pub variation: Option<f64>,
    pub batter_rank: f64,
    pub pitcher_rank: f64,
}

/// Rank every category and fold the ranks into a single power score.
pub fn stats_power_ranks(
    rows: &[TeamStats],
    categories: &CategorySet,
    standings: &StandingsRanks,
) -> Result<Vec<PowerRow>, StatsError> {
    let n = rows.len() as f64;
    let mut out: Vec<PowerRow> = rows
        .iter()
        .map(|r| PowerRow {
            team: r.team.clone(),
            team_number: r.team_number,
            stats: r.stats.clone(),
            stat_ranks: BTreeMap::new(),
            stats_power_score: 0.0,
            stats_power_rank: 0.0,
            standings_rank: standings.get(&r.team_number).copied(),
            variation: None,
            batter_rank: 0.0,
            pitcher_rank: 0.0,
        })
        .collect();

    for category in categories.iter() {
        let values = column(rows, &category.name)?;
        let ranks = rank_average(&values, Order::from(category.direction));
        for (row, rank) in out.iter_mut().zip(ranks) {
            row.stat_ranks.insert(category.name.clone(), rank);
            row.stats_power_score += rank;
            match category.side {
                Side::Batting => row.batter_rank += rank,
                Side::Pitching => row.pitcher_rank += rank,
            }
        }
    }

    let half = n / 2.0;
    for row in out.iter_mut() {
        row.stats_power_score /= n;
        row.batter_rank /= half;
        row.pitcher_rank /= half;
    }

    let scores: Vec<f64> = out.iter().map(|r| r.stats_power_score).collect();
    for (row, rank) in out.iter_mut().zip(rank_average(&scores, Order::Ascending)) {
        row.stats_power_rank = rank;
        row.variation = row.standings_rank.map(|s| rank - s as f64);
    }

    Ok(out)
}

// ---------------------------------------------------------------------------
// Category record ranks
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordRankRow {
    pub team: String,
    pub team_number: TeamNumber,
    pub records: BTreeMap<String, WinLossTie>,
    /// Category name to rank by record points (W + T/2), best first.
    pub ranks: BTreeMap<String, f64>,
}

/// Rank each team's season record within every category.
///
/// Teams appear in the order their first record row appears; a team with
/// no record in some category ranks on zero points there.
pub fn record_ranks(records: &[CategoryRecord], categories: &CategorySet) -> Vec<RecordRankRow> {
    let mut out: Vec<RecordRankRow> = Vec::new();
    for rec in records {
        let idx = match out.iter().position(|r| r.team_number == rec.team_number) {
            Some(i) => i,
            None => {
                out.push(RecordRankRow {
                    team: rec.team.clone(),
                    team_number: rec.team_number,
                    records: BTreeMap::new(),
                    ranks: BTreeMap::new(),
                });
                out.len() - 1
            }
        };
        out[idx].records.insert(rec.category.clone(), rec.record);
    }

    for category in categories.iter() {
        let points: Vec<f64> = out
            .iter()
            .map(|r| r.records.get(&category.name).map_or(0.0, WinLossTie::points))
            .collect();
        for (row, rank) in out.iter_mut().zip(rank_average(&points, Order::Descending)) {
            row.ranks.insert(category.name.clone(), rank);
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Season-to-date aggregation
// ---------------------------------------------------------------------------

/// Combine weekly lines through `through_week` into one line per team.
///
/// Counting categories are summed; rate categories are averaged over the
/// weeks the team played. The team name is taken from its latest week.
pub fn season_to_date(
    rows: &[WeeklyStats],
    through_week: u32,
    categories: &CategorySet,
) -> Result<Vec<TeamStats>, StatsError> {
    let mut by_team: BTreeMap<TeamNumber, Vec<&WeeklyStats>> = BTreeMap::new();
    for row in rows.iter().filter(|r| r.week <= through_week) {
        by_team.entry(row.team_number).or_default().push(row);
    }

    let mut out = Vec::with_capacity(by_team.len());
    for (team_number, weeks) in by_team {
        let Some(latest) = weeks.iter().max_by_key(|w| w.week) else {
            continue;
        };
        let mut stats = BTreeMap::new();
        for category in categories.iter() {
            let values = weeks
                .iter()
                .map(|w| stat(&w.team, &w.stats, &category.name))
                .collect::<Result<Vec<f64>, _>>()?;
            let value = match category.aggregation {
                Aggregation::Sum => values.iter().sum(),
                Aggregation::Mean => mean(&values),
            };
            stats.insert(category.name.clone(), value);
        }
        out.push(TeamStats {
            team: latest.team.clone(),
            team_number,
            stats,
        });
    }
    Ok(out)
}

fn weeks_in(rows: &[WeeklyStats]) -> Vec<u32> {
    let mut weeks: Vec<u32> = rows.iter().map(|r| r.week).collect();
    weeks.sort_unstable();
    weeks.dedup();
    weeks
}

/// Normalized scores recomputed over the season to date after every week.
pub fn running_normalized_ranks(
    rows: &[WeeklyStats],
    categories: &CategorySet,
) -> Result<Vec<(u32, Vec<NormalizedRow>)>, StatsError> {
    weeks_in(rows)
        .into_iter()
        .map(|week| {
            let totals = season_to_date(rows, week, categories)?;
            Ok((week, normalized_scores(&totals, categories, &StandingsRanks::new())?))
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiteRow {
    pub week: u32,
    pub team: String,
    pub team_number: TeamNumber,
    pub stats: BTreeMap<String, f64>,
    pub stat_ranks: BTreeMap<String, f64>,
    /// Mean of the category ranks; lower is stronger.
    pub stats_power_rank: f64,
}

/// Running stats power rank for every stored week, from weekly lines alone.
pub fn power_ranks_lite(
    rows: &[WeeklyStats],
    categories: &CategorySet,
) -> Result<Vec<LiteRow>, StatsError> {
    let mut out = Vec::new();
    for week in weeks_in(rows) {
        let totals = season_to_date(rows, week, categories)?;
        let mut week_rows: Vec<LiteRow> = totals
            .iter()
            .map(|t| LiteRow {
                week,
                team: t.team.clone(),
                team_number: t.team_number,
                stats: t.stats.clone(),
                stat_ranks: BTreeMap::new(),
                stats_power_rank: 0.0,
            })
            .collect();
        for category in categories.iter() {
            let values = column(&totals, &category.name)?;
            let ranks = rank_average(&values, Order::from(category.direction));
            for (row, rank) in week_rows.iter_mut().zip(ranks) {
                row.stat_ranks.insert(category.name.clone(), rank);
            }
        }
        for row in week_rows.iter_mut() {
            let ranks: Vec<f64> = row.stat_ranks.values().copied().collect();
            row.stats_power_rank = mean(&ranks);
        }
        out.extend(week_rows);
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// All-time ratings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllTimeRating {
    pub season: i32,
    pub manager: String,
    pub team: String,
    pub team_number: TeamNumber,
    pub scores: BTreeMap<String, f64>,
    pub score_sum: f64,
    pub score_rank: f64,
}

/// Rate one season's final category totals, labelled by manager.
pub fn all_time_ratings(
    season: i32,
    rows: &[TeamStats],
    categories: &CategorySet,
    manager_for: impl Fn(TeamNumber) -> String,
) -> Result<Vec<AllTimeRating>, StatsError> {
    Ok(normalized_scores(rows, categories, &StandingsRanks::new())?
        .into_iter()
        .map(|r| AllTimeRating {
            season,
            manager: manager_for(r.team_number),
            team: r.team,
            team_number: r.team_number,
            scores: r.scores,
            score_sum: r.score_sum,
            score_rank: r.score_rank,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dugout_core::categories::{Category, Direction};

    fn approx_eq(a: f64, b: f64, eps: f64) -> bool {
        (a - b).abs() < eps
    }

    fn category(name: &str, side: Side, direction: Direction, aggregation: Aggregation) -> Category {
        Category {
            name: name.into(),
            side,
            direction,
            aggregation,
        }
    }

    /// HR (batting, summed) and ERA (pitching, averaged, lower wins).
    fn cats() -> CategorySet {
        CategorySet::new(vec![
            category("HR", Side::Batting, Direction::HigherIsBetter, Aggregation::Sum),
            category("ERA", Side::Pitching, Direction::LowerIsBetter, Aggregation::Mean),
        ])
    }

    fn team(n: u32, hr: f64, era: f64) -> TeamStats {
        TeamStats {
            team: format!("Team {n}"),
            team_number: TeamNumber(n),
            stats: [("HR".to_string(), hr), ("ERA".to_string(), era)]
                .into_iter()
                .collect(),
        }
    }

    fn weekly(week: u32, n: u32, hr: f64, era: f64) -> WeeklyStats {
        WeeklyStats {
            week,
            team: format!("Team {n}"),
            team_number: TeamNumber(n),
            opponent: String::new(),
            opponent_number: TeamNumber(0),
            stats: [("HR".to_string(), hr), ("ERA".to_string(), era)]
                .into_iter()
                .collect(),
        }
    }

    #[test]
    fn normalized_scores_sum_and_rank() {
        let rows = vec![team(1, 40.0, 3.00), team(2, 20.0, 4.00), team(3, 30.0, 3.50)];
        let standings: StandingsRanks = [(TeamNumber(1), 2), (TeamNumber(2), 3)].into_iter().collect();

        let out = normalized_scores(&rows, &cats(), &standings).unwrap();

        assert!(approx_eq(out[0].score_sum, 200.0, 1e-9));
        assert!(approx_eq(out[1].score_sum, 0.0, 1e-9));
        assert!(approx_eq(out[2].score_sum, 100.0, 1e-9));
        assert!(approx_eq(out[2].scores["ERA"], 50.0, 1e-9));
        assert_eq!(out[0].score_rank, 1.0);
        assert_eq!(out[2].score_rank, 2.0);
        assert_eq!(out[0].score_variation, Some(-1.0));
        assert_eq!(out[1].score_variation, Some(0.0));
        assert_eq!(out[2].score_variation, None);
    }

    #[test]
    fn normalized_scores_constant_category_adds_nothing() {
        let rows = vec![team(1, 10.0, 3.00), team(2, 10.0, 4.00)];
        let out = normalized_scores(&rows, &cats(), &StandingsRanks::new()).unwrap();
        assert_eq!(out[0].scores["HR"], 0.0);
        assert!(approx_eq(out[0].score_sum, 100.0, 1e-9));
        assert!(approx_eq(out[1].score_sum, 0.0, 1e-9));
    }

    #[test]
    fn stats_power_ranks_fold_category_ranks() {
        let rows = vec![
            team(1, 40.0, 3.00),
            team(2, 20.0, 4.00),
            team(3, 30.0, 3.50),
            team(4, 30.0, 2.00),
        ];
        let standings: StandingsRanks = [(TeamNumber(4), 1)].into_iter().collect();

        let out = stats_power_ranks(&rows, &cats(), &standings).unwrap();

        // HR ranks: 1, 4, 2.5, 2.5. ERA ranks: 2, 4, 3, 1.
        assert!(approx_eq(out[0].stats_power_score, 3.0 / 4.0, 1e-12));
        assert!(approx_eq(out[1].stats_power_score, 8.0 / 4.0, 1e-12));
        assert!(approx_eq(out[3].stats_power_score, 3.5 / 4.0, 1e-12));
        assert_eq!(out[0].stats_power_rank, 1.0);
        assert_eq!(out[3].stats_power_rank, 2.0);
        assert_eq!(out[1].stats_power_rank, 4.0);
        assert_eq!(out[3].variation, Some(1.0));
        // Batting and pitching halves divide by n / 2.
        assert!(approx_eq(out[2].batter_rank, 2.5 / 2.0, 1e-12));
        assert!(approx_eq(out[2].pitcher_rank, 3.0 / 2.0, 1e-12));
    }

    #[test]
    fn record_ranks_use_points() {
        let rec = |n: u32, cat: &str, w: u32, l: u32, t: u32| CategoryRecord {
            team: format!("Team {n}"),
            team_number: TeamNumber(n),
            category: cat.into(),
            record: WinLossTie::new(w, l, t),
        };
        let records = vec![
            rec(1, "HR", 10, 5, 1),
            rec(2, "HR", 9, 4, 3),
            rec(3, "HR", 4, 12, 0),
            rec(1, "ERA", 6, 10, 0),
            rec(2, "ERA", 12, 4, 0),
            rec(3, "ERA", 8, 8, 0),
        ];

        let out = record_ranks(&records, &cats());

        assert_eq!(out.len(), 3);
        // HR points: 10.5, 10.5, 4.
        assert_eq!(out[0].ranks["HR"], 1.5);
        assert_eq!(out[1].ranks["HR"], 1.5);
        assert_eq!(out[2].ranks["HR"], 3.0);
        assert_eq!(out[1].ranks["ERA"], 1.0);
        assert_eq!(out[0].records["ERA"], WinLossTie::new(6, 10, 0));
    }

    #[test]
    fn season_to_date_sums_and_averages() {
        let rows = vec![
            weekly(1, 1, 10.0, 3.00),
            weekly(2, 1, 6.0, 5.00),
            weekly(3, 1, 9.0, 1.00),
            weekly(1, 2, 4.0, 2.00),
        ];

        let through_two = season_to_date(&rows, 2, &cats()).unwrap();
        assert_eq!(through_two.len(), 2);
        assert!(approx_eq(through_two[0].stats["HR"], 16.0, 1e-12));
        assert!(approx_eq(through_two[0].stats["ERA"], 4.0, 1e-12));
        assert!(approx_eq(through_two[1].stats["HR"], 4.0, 1e-12));

        let all = season_to_date(&rows, 3, &cats()).unwrap();
        assert!(approx_eq(all[0].stats["ERA"], 3.0, 1e-12));
    }

    #[test]
    fn running_normalized_has_one_block_per_week() {
        let rows = vec![
            weekly(1, 1, 10.0, 3.00),
            weekly(1, 2, 4.0, 2.00),
            weekly(2, 1, 1.0, 6.00),
            weekly(2, 2, 12.0, 2.00),
        ];
        let running = running_normalized_ranks(&rows, &cats()).unwrap();
        assert_eq!(running.len(), 2);
        assert_eq!(running[0].0, 1);
        // Week 1: each team wins one category.
        assert!(approx_eq(running[0].1[0].score_sum, 100.0, 1e-9));
        // Through week 2: team 2 leads both (HR 16 vs 11, ERA 2.0 vs 4.5).
        assert!(approx_eq(running[1].1[1].score_sum, 200.0, 1e-9));
        assert_eq!(running[1].1[1].score_rank, 1.0);
    }

    #[test]
    fn power_ranks_lite_averages_ranks() {
        let rows = vec![
            weekly(1, 1, 10.0, 3.00),
            weekly(1, 2, 4.0, 2.00),
            weekly(1, 3, 4.0, 5.00),
        ];
        let lite = power_ranks_lite(&rows, &cats()).unwrap();
        assert_eq!(lite.len(), 3);
        // Team 1: HR 1, ERA 2. Team 3: HR 2.5, ERA 3.
        assert!(approx_eq(lite[0].stats_power_rank, 1.5, 1e-12));
        assert!(approx_eq(lite[2].stats_power_rank, 2.75, 1e-12));
    }

    #[test]
    fn all_time_ratings_label_managers() {
        let rows = vec![team(1, 40.0, 3.00), team(2, 20.0, 4.00)];
        let out = all_time_ratings(2024, &rows, &cats(), |n| format!("Manager {n}")).unwrap();
        assert_eq!(out[0].manager, "Manager 1");
        assert_eq!(out[0].season, 2024);
        assert_eq!(out[0].score_rank, 1.0);
    }
}
