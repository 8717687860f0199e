// Static HTML site built from the stored tables.

pub mod html;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Display;
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use serde::de::DeserializeOwned;
use tracing::info;

use dugout_core::db::{HistoryTable, LiveTable, SeriesTable};
use dugout_core::model::{TeamNumber, WinLossTie};
use dugout_stats::allplay::AllPlayRecord;
use dugout_stats::elo::EloRow;
use dugout_stats::h2h::HeadToHead;
use dugout_stats::innings::InningsCheck;
use dugout_stats::luck::{LuckCoefficient, LuckTotals, WeeklyLuck};
use dugout_stats::power::{AllTimeRating, LiteRow, NormalizedRow, PowerRow};
use dugout_stats::prediction::Prediction;
use dugout_stats::results::SeasonBest;
use dugout_stats::sos::SosRow;
use dugout_stats::standings::{LiveStanding, PlayoffRow, TrendRow};

use crate::jobs::Context;
use html::{num, signed, Cell, Page};

/// Render every page into the configured report directory and return the
/// written paths.
pub fn write_site(ctx: &Context<'_>) -> Result<Vec<PathBuf>> {
    let dir = PathBuf::from(&ctx.config.pipeline.output.report_dir);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create report dir {}", dir.display()))?;

    let pages = [
        ("index.html", index_page(ctx)?),
        ("power.html", power_page(ctx)?),
        ("standings.html", standings_page(ctx)?),
        ("luck.html", luck_page(ctx)?),
        ("elo.html", elo_page(ctx)?),
        ("trends.html", trends_page(ctx)?),
        ("sos.html", sos_page(ctx)?),
        ("h2h.html", h2h_page(ctx)?),
        ("managers.html", managers_page(ctx)?),
        ("bests.html", bests_page(ctx)?),
    ];

    let league_name = &ctx.config.league.name;
    let mut written = Vec::with_capacity(pages.len());
    for (file, page) in pages {
        let path = dir.join(file);
        write_page(&path, &page.render(league_name))?;
        written.push(path);
    }
    info!("report: wrote {} pages to {}", written.len(), dir.display());
    Ok(written)
}

fn write_page(path: &Path, text: &str) -> Result<()> {
    std::fs::write(path, text).with_context(|| format!("failed to write {}", path.display()))
}

// ---------------------------------------------------------------------------
// Pages
// ---------------------------------------------------------------------------

fn index_page(ctx: &Context<'_>) -> Result<Page> {
    let league = &ctx.config.league;
    let mut page = Page::new(&league.name);
    page.paragraph(&format!(
        "Season {}, week {} of {}.",
        league.season,
        ctx.week.min(league.regular_season_weeks),
        league.regular_season_weeks
    ));

    let mut power: Vec<PowerRow> = ctx.db.read_live(LiveTable::PowerRanks)?;
    power.sort_by(|a, b| a.stats_power_rank.total_cmp(&b.stats_power_rank));
    page.heading("Top of the power rankings");
    let rows: Vec<Vec<Cell>> = power
        .iter()
        .take(3)
        .map(|r| vec![r.team.as_str().into(), num(r.stats_power_rank, 1)])
        .collect();
    page.table(&["Team", "Power rank"], &rows);

    let mut totals: Vec<LuckTotals> = ctx.db.read_live(LiveTable::LuckTeamTotals)?;
    totals.sort_by(|a, b| b.total_luck_diff.total_cmp(&a.total_luck_diff));
    if let (Some(lucky), Some(unlucky)) = (totals.first(), totals.last()) {
        page.heading("Luck");
        page.paragraph(&format!(
            "Luckiest: {} ({:+.2}). Unluckiest: {} ({:+.2}).",
            lucky.team, lucky.total_luck_diff, unlucky.team, unlucky.total_luck_diff
        ));
    }
    Ok(page)
}

fn power_page(ctx: &Context<'_>) -> Result<Page> {
    let mut rows: Vec<PowerRow> = ctx.db.read_live(LiveTable::PowerRanks)?;
    rows.sort_by(|a, b| a.stats_power_rank.total_cmp(&b.stats_power_rank));

    let cats = ctx.categories.names();
    let mut headers: Vec<&str> = vec!["Team", "Power", "Score", "Standing", "Variation", "Bat", "Pitch"];
    headers.extend(cats.iter().copied());

    let body: Vec<Vec<Cell>> = rows
        .iter()
        .map(|r| {
            let mut cells: Vec<Cell> = vec![
                r.team.as_str().into(),
                num(r.stats_power_rank, 1),
                num(r.stats_power_score, 1),
                r.standings_rank.map(|n| n.to_string()).unwrap_or_default().into(),
                r.variation.map(|v| signed(v, 1)).unwrap_or_else(|| "".into()),
                num(r.batter_rank, 1),
                num(r.pitcher_rank, 1),
            ];
            cells.extend(
                cats.iter()
                    .map(|c| r.stat_ranks.get(*c).map(|v| num(*v, 1)).unwrap_or_else(|| "".into())),
            );
            cells
        })
        .collect();

    let mut page = Page::new("Power rankings");
    page.paragraph("Category ranks are 1 for the league leader; ties share the lower rank.");
    page.table(&headers, &body);
    Ok(page)
}

fn standings_page(ctx: &Context<'_>) -> Result<Page> {
    let mut page = Page::new("Standings");

    let mut live: Vec<LiveStanding> = ctx.db.read_live(LiveTable::LiveStandings)?;
    live.sort_by_key(|r| r.rank_live);
    let rows: Vec<Vec<Cell>> = live
        .iter()
        .map(|r| {
            let team = if r.clinched {
                format!("{} *", r.team)
            } else {
                r.team.clone()
            };
            vec![
                r.rank_live.to_string().into(),
                team.into(),
                r.manager.as_str().into(),
                r.season.to_string().into(),
                r.current_matchup.as_str().into(),
                r.live.to_string().into(),
                num(r.pct, 3),
                num(r.games_back, 1),
            ]
        })
        .collect();
    page.heading("Live standings");
    page.table(
        &["Live rank", "Team", "Manager", "Season", "This week", "Live", "Pct", "GB"],
        &rows,
    );

    let playoffs: Vec<PlayoffRow> = ctx.db.read_live(LiveTable::PlayoffStatus)?;
    let rows: Vec<Vec<Cell>> = playoffs
        .iter()
        .map(|r| {
            vec![
                r.team.as_str().into(),
                num(r.raw_score, 1),
                num(r.max_possible, 1),
                r.playoff_status.as_str().into(),
                r.seed_status.as_str().into(),
            ]
        })
        .collect();
    page.heading("Playoff picture");
    page.table(&["Team", "Score", "Max possible", "Status", "Seed"], &rows);

    let innings: Vec<InningsCheck> = ctx.db.read_live(LiveTable::MinimumInnings)?;
    let rows: Vec<Vec<Cell>> = innings
        .iter()
        .filter(|r| !r.minimum_met)
        .map(|r| {
            vec![
                r.team.as_str().into(),
                r.current_ip.map(|v| num(v, 1)).unwrap_or_else(|| "".into()),
                r.required_ip.map(|v| num(v, 1)).unwrap_or_else(|| "".into()),
                r.outs_needed.to_string().into(),
                r.error.clone().unwrap_or_default().into(),
            ]
        })
        .collect();
    page.heading("Below the innings minimum");
    page.table(&["Team", "IP", "Required", "Outs needed", "Error"], &rows);
    Ok(page)
}

fn luck_page(ctx: &Context<'_>) -> Result<Page> {
    let mut page = Page::new("Luck");

    let mut totals: Vec<LuckTotals> = ctx.db.read_live(LiveTable::LuckTeamTotals)?;
    totals.sort_by(|a, b| b.total_luck_diff.total_cmp(&a.total_luck_diff));
    let rows: Vec<Vec<Cell>> = totals
        .iter()
        .map(|r| {
            vec![
                r.team.as_str().into(),
                signed(r.total_luck_diff, 2),
                signed(r.avg_luck_diff, 2),
                num(r.total_expected, 2),
                num(r.total_actual, 1),
                r.weeks_played.to_string().into(),
            ]
        })
        .collect();
    page.heading("Season luck");
    page.table(
        &["Team", "Luck", "Per week", "Expected", "Actual", "Weeks"],
        &rows,
    );

    let coefficients: Vec<LuckCoefficient> = ctx.db.read_live(LiveTable::LuckCoefficients)?;
    let rows: Vec<Vec<Cell>> = coefficients
        .iter()
        .map(|r| {
            vec![
                r.team.as_str().into(),
                signed(r.luck_coefficient, 3),
                r.lucky_wins.to_string().into(),
                r.unlucky_losses.to_string().into(),
                num(r.tag_ratio, 2),
            ]
        })
        .collect();
    page.heading("Luck coefficients");
    page.table(
        &["Team", "Coefficient", "Lucky wins", "Unlucky losses", "Tag ratio"],
        &rows,
    );

    let weekly: Vec<WeeklyLuck> = ctx.db.read_live(LiveTable::WeeklyLuckAnalysis)?;
    if let Some(last) = weekly.iter().map(|w| w.week).max() {
        let rows: Vec<Vec<Cell>> = weekly
            .iter()
            .filter(|w| w.week == last)
            .map(|w| {
                let mut note = Vec::new();
                if w.underdog_victory {
                    note.push("upset win");
                }
                if w.favorite_loss {
                    note.push("upset loss");
                }
                if w.extreme_outlier {
                    note.push("outlier");
                }
                vec![
                    w.team.as_str().into(),
                    w.opponent.as_str().into(),
                    num(w.expected_wins, 2),
                    num(w.actual_wins, 1),
                    signed(w.luck_difference, 2),
                    w.luck_category.as_str().into(),
                    note.join(", ").into(),
                ]
            })
            .collect();
        page.heading(&format!("Week {last}"));
        page.table(
            &["Team", "Opponent", "Expected", "Actual", "Luck", "Verdict", "Notes"],
            &rows,
        );
    }
    Ok(page)
}

/// One chart line per team.
type Series = Vec<(String, Vec<Option<f64>>)>;

/// Chart data from `(x, team number, team, value)` points: sorted x labels
/// and one series per team in team-number order. Missing points are gaps.
fn team_series<X: Ord + Copy + Display>(
    points: impl IntoIterator<Item = (X, TeamNumber, String, f64)>,
) -> (Vec<String>, Series) {
    let mut xs = BTreeSet::new();
    let mut by_team: BTreeMap<(TeamNumber, String), BTreeMap<X, f64>> = BTreeMap::new();
    for (x, number, team, value) in points {
        xs.insert(x);
        by_team.entry((number, team)).or_default().insert(x, value);
    }
    let series = by_team
        .into_iter()
        .map(|((_, team), values)| {
            let data = xs.iter().map(|x| values.get(x).copied()).collect();
            (team, data)
        })
        .collect();
    let labels = xs.iter().map(|x| x.to_string()).collect();
    (labels, series)
}

fn elo_series(rows: &[EloRow]) -> (Vec<String>, Series) {
    team_series(rows.iter().map(|r| (r.week, r.team_number, r.team.clone(), r.new_elo)))
}

fn elo_page(ctx: &Context<'_>) -> Result<Page> {
    let rows: Vec<EloRow> = ctx.db.read_series(SeriesTable::RunningElo)?;
    let mut page = Page::new("ELO ratings");
    let (labels, series) = elo_series(&rows);
    if !series.is_empty() {
        page.line_chart("elo-trend", &labels, &series);
    }

    let mut latest: Vec<&EloRow> = match rows.iter().map(|r| r.week).max() {
        Some(last) => rows.iter().filter(|r| r.week == last).collect(),
        None => Vec::new(),
    };
    latest.sort_by(|a, b| b.new_elo.total_cmp(&a.new_elo));
    let table: Vec<Vec<Cell>> = latest
        .iter()
        .map(|r| {
            vec![
                r.team.as_str().into(),
                num(r.new_elo, 0),
                signed(r.new_elo - r.prior_elo, 1),
                num(r.expected_result, 3),
                num(r.actual_result, 3),
            ]
        })
        .collect();
    page.heading("Current ratings");
    page.table(&["Team", "ELO", "Last change", "Expected", "Actual"], &table);
    Ok(page)
}

/// Every stored week of a per-week table, mapped to chart points.
fn weekly_points<T: DeserializeOwned>(
    ctx: &Context<'_>,
    table: SeriesTable,
    point: impl Fn(T) -> (TeamNumber, String, f64),
) -> Result<Vec<(u32, TeamNumber, String, f64)>> {
    let mut points = Vec::new();
    for week in ctx.db.stored_weeks(table)? {
        let rows: Vec<T> = ctx.db.read_week(table, week)?;
        points.extend(rows.into_iter().map(|row| {
            let (number, team, value) = point(row);
            (week, number, team, value)
        }));
    }
    Ok(points)
}

fn trend_chart(page: &mut Page, id: &str, title: &str, points: Vec<(u32, TeamNumber, String, f64)>) {
    page.heading(title);
    let (labels, series) = team_series(points);
    if series.is_empty() {
        page.paragraph("No data yet.");
    } else {
        page.line_chart(id, &labels, &series);
    }
}

fn trends_page(ctx: &Context<'_>) -> Result<Page> {
    let mut page = Page::new("Season trends");
    page.paragraph("Ranks are 1 for the league leader.");

    let normalized = weekly_points(ctx, SeriesTable::RunningNormalizedRanks, |r: NormalizedRow| {
        (r.team_number, r.team, r.score_sum)
    })?;
    trend_chart(&mut page, "trend-normalized", "Normalized power score", normalized);

    let power = weekly_points(ctx, SeriesTable::PowerRanksSeasonTrend, |r: PowerRow| {
        (r.team_number, r.team, r.stats_power_rank)
    })?;
    trend_chart(&mut page, "trend-power", "Power rank", power);

    let lite: Vec<LiteRow> = ctx.db.read_live(LiveTable::PowerRanksLite)?;
    let lite = lite
        .into_iter()
        .map(|r| (r.week, r.team_number, r.team, r.stats_power_rank))
        .collect();
    trend_chart(&mut page, "trend-stats", "Running stats rank", lite);

    let standings = weekly_points(ctx, SeriesTable::StandingsSeasonTrend, |r: TrendRow| {
        (r.team_number, r.team, r.rank)
    })?;
    trend_chart(&mut page, "trend-standings", "Standings rank", standings);

    let all_play = weekly_points(ctx, SeriesTable::AllPlay, |r: AllPlayRecord| {
        (r.team_number, r.team, r.pct)
    })?;
    trend_chart(&mut page, "trend-all-play", "All-play win pct", all_play);
    Ok(page)
}

fn sos_page(ctx: &Context<'_>) -> Result<Page> {
    let mut page = Page::new("Schedule");

    let sos: Vec<SosRow> = ctx.db.read_live(LiveTable::RemainingSos)?;
    let rows: Vec<Vec<Cell>> = sos
        .iter()
        .map(|r| {
            vec![
                r.sos_rank.to_string().into(),
                r.team.as_str().into(),
                num(r.avg_opponent_power, 1),
                r.games_remaining.to_string().into(),
                num(r.sos_percentile, 1),
                format!("{:?}", r.difficulty).into(),
            ]
        })
        .collect();
    page.heading("Remaining strength of schedule");
    page.table(
        &["Rank", "Team", "Avg opponent", "Games", "Percentile", "Difficulty"],
        &rows,
    );

    let predictions: Vec<Prediction> = ctx.db.read_live(LiveTable::WeeklyPrediction)?;
    let rows: Vec<Vec<Cell>> = predictions
        .iter()
        .map(|p| {
            vec![
                Cell::from(p.team.as_str()),
                p.opponent.as_str().into(),
                p.projected.to_string().into(),
            ]
        })
        .collect();
    page.heading(&format!("Week {} projections", ctx.week));
    page.table(&["Team", "Opponent", "Projected"], &rows);
    Ok(page)
}

fn h2h_page(ctx: &Context<'_>) -> Result<Page> {
    let rows: Vec<HeadToHead> = ctx.db.read_live(LiveTable::HeadToHead)?;
    let body: Vec<Vec<Cell>> = rows
        .iter()
        .map(|r| {
            vec![
                r.manager.as_str().into(),
                r.opponent.as_str().into(),
                r.record.to_string().into(),
                num(r.pct(), 3),
                num(r.score_for, 1),
                num(r.score_against, 1),
                r.games.to_string().into(),
            ]
        })
        .collect();
    let mut page = Page::new("Rivalries");
    page.table(
        &["Manager", "Opponent", "Record", "Pct", "For", "Against", "Games"],
        &body,
    );
    Ok(page)
}

/// Career line for one manager across the archived seasons.
#[derive(Debug, Clone, PartialEq)]
struct Career {
    manager: String,
    seasons: usize,
    avg_score: f64,
    best_rank: f64,
    top_seasons: usize,
}

fn careers(ratings: &[AllTimeRating]) -> Vec<Career> {
    let mut by_manager: BTreeMap<&str, Vec<&AllTimeRating>> = BTreeMap::new();
    for r in ratings {
        by_manager.entry(r.manager.as_str()).or_default().push(r);
    }
    let mut careers: Vec<Career> = by_manager
        .into_iter()
        .map(|(manager, seasons)| Career {
            manager: manager.to_string(),
            seasons: seasons.len(),
            avg_score: seasons.iter().map(|r| r.score_sum).sum::<f64>() / seasons.len() as f64,
            best_rank: seasons.iter().map(|r| r.score_rank).fold(f64::INFINITY, f64::min),
            top_seasons: seasons.iter().filter(|r| r.score_rank <= 1.0).count(),
        })
        .collect();
    careers.sort_by(|a, b| b.avg_score.total_cmp(&a.avg_score));
    careers
}

/// Overall head-to-head line for one manager.
#[derive(Debug, Clone, PartialEq)]
struct Rivalry {
    manager: String,
    record: WinLossTie,
    best_rival: Option<String>,
    nemesis: Option<String>,
}

/// Totals per manager; the best rival is the opponent beaten most often by
/// pct, the nemesis the one beaten least. Ties go to the opponent met more.
fn rivalries(rows: &[HeadToHead]) -> Vec<Rivalry> {
    let mut by_manager: BTreeMap<&str, Vec<&HeadToHead>> = BTreeMap::new();
    for r in rows.iter().filter(|r| r.games > 0) {
        by_manager.entry(r.manager.as_str()).or_default().push(r);
    }
    by_manager
        .into_iter()
        .map(|(manager, mut opponents)| {
            let mut record = WinLossTie::default();
            for o in &opponents {
                record.add(o.record);
            }
            opponents.sort_by(|a, b| {
                b.pct()
                    .total_cmp(&a.pct())
                    .then(b.games.cmp(&a.games))
                    .then(a.opponent.cmp(&b.opponent))
            });
            let best_rival = opponents.first().map(|o| o.opponent.clone());
            let nemesis = opponents
                .iter()
                .min_by(|a, b| {
                    a.pct()
                        .total_cmp(&b.pct())
                        .then(b.games.cmp(&a.games))
                        .then(a.opponent.cmp(&b.opponent))
                })
                .map(|o| o.opponent.clone());
            Rivalry {
                manager: manager.to_string(),
                record,
                best_rival,
                nemesis,
            }
        })
        .collect()
}

fn managers_page(ctx: &Context<'_>) -> Result<Page> {
    let mut page = Page::new("Managers");

    let ratings: Vec<AllTimeRating> = ctx.db.read_history(HistoryTable::Ratings, None)?;
    let rows: Vec<Vec<Cell>> = careers(&ratings)
        .iter()
        .map(|c| {
            vec![
                c.manager.as_str().into(),
                c.seasons.to_string().into(),
                num(c.avg_score, 2),
                num(c.best_rank, 1),
                c.top_seasons.to_string().into(),
            ]
        })
        .collect();
    page.heading("All-time ratings");
    page.table(&["Manager", "Seasons", "Avg score", "Best rank", "Top-rated"], &rows);

    // Managers stand in for teams so a line follows a person across seasons.
    let mut numbers: BTreeMap<&str, TeamNumber> = BTreeMap::new();
    for r in &ratings {
        let next = TeamNumber(numbers.len() as u32);
        numbers.entry(r.manager.as_str()).or_insert(next);
    }
    let (labels, series) = team_series(
        ratings
            .iter()
            .map(|r| (r.season, numbers[r.manager.as_str()], r.manager.clone(), r.score_sum)),
    );
    if !series.is_empty() {
        page.heading("Rating score by season");
        page.line_chart("manager-seasons", &labels, &series);
    }

    let h2h: Vec<HeadToHead> = ctx.db.read_live(LiveTable::HeadToHead)?;
    let rows: Vec<Vec<Cell>> = rivalries(&h2h)
        .into_iter()
        .map(|r| {
            vec![
                r.manager.into(),
                r.record.to_string().into(),
                num(r.record.pct(), 3),
                r.best_rival.unwrap_or_default().into(),
                r.nemesis.unwrap_or_default().into(),
            ]
        })
        .collect();
    page.heading("Head-to-head");
    page.table(&["Manager", "Record", "Pct", "Best rival", "Nemesis"], &rows);
    Ok(page)
}

fn bests_page(ctx: &Context<'_>) -> Result<Page> {
    let mut page = Page::new("Season bests");
    for (title, table) in [
        ("Regular weeks", LiveTable::SeasonsBestRegular),
        ("Long weeks", LiveTable::SeasonsBestLong),
    ] {
        let rows: Vec<SeasonBest> = ctx.db.read_live(table)?;
        let body: Vec<Vec<Cell>> = rows
            .iter()
            .map(|r| {
                vec![
                    r.category.as_str().into(),
                    r.team.as_str().into(),
                    num(r.total, 3),
                    r.week.to_string().into(),
                    r.opponent.as_str().into(),
                ]
            })
            .collect();
        page.heading(title);
        page.table(&["Category", "Team", "Total", "Week", "Opponent"], &body);
    }
    Ok(page)
}
