// Jobs that work only from stored tables.

use std::collections::{BTreeMap, BTreeSet};

use anyhow::Result;
use tracing::{info, warn};

use dugout_core::db::{HistoryTable, LiveTable, SeriesTable};
use dugout_core::model::{ScheduleEntry, SeasonRecord, TeamStats, WeeklyResult, WeeklyStats};
use dugout_stats::allplay::{self, AllPlayRecord, TeamCoefficient};
use dugout_stats::elo::running_elo;
use dugout_stats::h2h::{self, SeasonResults};
use dugout_stats::luck::{self, WeeklyLuck};
use dugout_stats::power::{self, NormalizedRow};
use dugout_stats::{prediction, results, sos, standings};

use super::collect::season_ratings;
use super::Context;

fn by_week<T>(rows: Vec<T>, week: impl Fn(&T) -> u32) -> BTreeMap<u32, Vec<T>> {
    let mut out: BTreeMap<u32, Vec<T>> = BTreeMap::new();
    for row in rows {
        out.entry(week(&row)).or_default().push(row);
    }
    out
}

/// Expected-win coefficients and all-play records for weeks not yet analysed.
pub fn all_play(ctx: &Context<'_>) -> Result<()> {
    let done = ctx.db.stored_weeks(SeriesTable::Coefficient)?;
    let stats: Vec<WeeklyStats> = ctx.db.read_series(SeriesTable::WeekStats)?;

    for (week, rows) in by_week(stats, |r| r.week) {
        if done.contains(&week) {
            continue;
        }
        let coefficients = allplay::expected_wins(week, &rows, &ctx.categories)?;
        let records = allplay::simulate_week(week, &rows, &ctx.categories)?;
        ctx.db.write_week(SeriesTable::Coefficient, week, &coefficients)?;
        ctx.db.write_week(SeriesTable::AllPlay, week, &records)?;
        info!("all-play: analysed week {week}");
    }
    Ok(())
}

/// Rebuild the running normalized ranks for every stored week, plus the
/// lite power table.
pub fn recalc(ctx: &Context<'_>) -> Result<()> {
    let stats: Vec<WeeklyStats> = ctx.db.read_series(SeriesTable::WeekStats)?;
    for (week, rows) in power::running_normalized_ranks(&stats, &ctx.categories)? {
        ctx.db
            .write_week(SeriesTable::RunningNormalizedRanks, week, &rows)?;
    }
    let lite = power::power_ranks_lite(&stats, &ctx.categories)?;
    ctx.db.write_live(LiveTable::PowerRanksLite, &lite)?;
    Ok(())
}

/// Weekly luck for new weeks, then season totals and luck coefficients over
/// everything stored.
pub fn luck(ctx: &Context<'_>) -> Result<()> {
    let mut weekly: Vec<WeeklyLuck> = ctx.db.read_live(LiveTable::WeeklyLuckAnalysis)?;
    let analysed: BTreeSet<u32> = weekly.iter().map(|w| w.week).collect();

    let coefficients: Vec<TeamCoefficient> = ctx.db.read_series(SeriesTable::Coefficient)?;
    let results: Vec<WeeklyResult> = ctx.db.read_series(SeriesTable::WeeklyResults)?;

    for (week, rows) in by_week(coefficients, |c| c.week) {
        if analysed.contains(&week) {
            continue;
        }
        let matchups = allplay::matchup_coefficients(&rows)?;
        let week_results: Vec<WeeklyResult> =
            results.iter().filter(|r| r.week == week).cloned().collect();
        let graded = luck::weekly_luck(
            &matchups,
            &week_results,
            ctx.category_count(),
            &ctx.config.pipeline.luck,
        );
        info!("luck: graded {} team-weeks for week {week}", graded.len());
        weekly.extend(graded);
    }
    weekly.sort_by_key(|w| (w.week, w.luck_rank));

    ctx.db.write_live(LiveTable::WeeklyLuckAnalysis, &weekly)?;
    ctx.db
        .write_live(LiveTable::LuckTeamTotals, &luck::team_totals(&weekly))?;

    let all_play: Vec<AllPlayRecord> = ctx.db.read_series(SeriesTable::AllPlay)?;
    let coefficients = luck::luck_coefficients(&results, &all_play, ctx.category_count());
    ctx.db.write_live(LiveTable::LuckCoefficients, &coefficients)?;
    Ok(())
}

/// Replay the season's results into running ELO ratings.
pub fn elo(ctx: &Context<'_>) -> Result<()> {
    let teams: Vec<_> = ctx
        .teams()?
        .into_iter()
        .map(|t| (t.team_number, t.team))
        .collect();
    let results: Vec<WeeklyResult> = ctx.db.read_series(SeriesTable::WeeklyResults)?;
    let Some(last_week) = results.iter().map(|r| r.week).max() else {
        warn!("elo: no weekly results stored");
        return Ok(());
    };

    // Past pairings come from the results; the schedule table only holds
    // weeks still to play.
    let pairings: Vec<ScheduleEntry> = results
        .iter()
        .map(|r| ScheduleEntry {
            week: r.week,
            team: r.team.clone(),
            team_number: r.team_number,
            opponent: r.opponent.clone(),
            opponent_number: r.opponent_number,
        })
        .collect();

    let rows = running_elo(&teams, &pairings, &results, last_week, &ctx.config.pipeline.elo);
    for (week, week_rows) in by_week(rows, |r| r.week) {
        ctx.db.write_week(SeriesTable::RunningElo, week, &week_rows)?;
    }
    Ok(())
}

/// Clinch and elimination status from the stored season records.
pub fn playoffs(ctx: &Context<'_>) -> Result<()> {
    let records: Vec<SeasonRecord> = ctx.db.read_live(LiveTable::SeasonRecords)?;
    if records.is_empty() {
        anyhow::bail!("no season records stored; run `dugout standings` first");
    }
    let rows = standings::playoff_status(
        &records,
        ctx.weeks_left(),
        ctx.category_count(),
        ctx.config.league.playoff_spots,
        |n| ctx.manager(n),
    );
    ctx.db.write_live(LiveTable::PlayoffStatus, &rows)?;
    Ok(())
}

/// Cumulative standings after every week.
pub fn season_trend(ctx: &Context<'_>) -> Result<()> {
    let results: Vec<WeeklyResult> = ctx.db.read_series(SeriesTable::WeeklyResults)?;
    let trend = standings::season_trend(&results, ctx.category_count());
    for (week, rows) in by_week(trend, |r| r.week) {
        ctx.db
            .write_week(SeriesTable::StandingsSeasonTrend, week, &rows)?;
    }
    Ok(())
}

/// Remaining strength of schedule against the current power scores.
pub fn sos(ctx: &Context<'_>) -> Result<()> {
    let schedule = ctx.db.read_schedule(None)?;
    let power: Vec<NormalizedRow> = ctx.db.read_live(LiveTable::NormalizedRanks)?;
    if power.is_empty() {
        anyhow::bail!("no normalized ranks stored; run `dugout power-ranks` first");
    }
    let rows = sos::remaining_sos(&schedule, &power, ctx.week);
    if rows.is_empty() {
        info!("sos: no regular-season games remain");
    }
    ctx.db.write_live(LiveTable::RemainingSos, &rows)?;
    Ok(())
}

/// Recent coefficient windows and the projected current week.
pub fn predict(ctx: &Context<'_>) -> Result<()> {
    let coefficients: Vec<TeamCoefficient> = ctx.db.read_series(SeriesTable::Coefficient)?;
    ctx.db.write_live(
        LiveTable::CoefficientLastFour,
        &prediction::recent_coefficients(&coefficients, ctx.week, 4),
    )?;
    ctx.db.write_live(
        LiveTable::CoefficientLastTwo,
        &prediction::recent_coefficients(&coefficients, ctx.week, 2),
    )?;

    let stats: Vec<WeeklyStats> = ctx.db.read_series(SeriesTable::WeekStats)?;
    let schedule = ctx.db.read_schedule(Some(ctx.week))?;
    let predictions = prediction::predict_week(&stats, &schedule, ctx.week, 4, &ctx.categories)?;
    ctx.db.write_live(LiveTable::WeeklyPrediction, &predictions)?;
    Ok(())
}

/// Rate the current season's category totals into the all-time table.
pub fn all_time(ctx: &Context<'_>) -> Result<()> {
    let stats: Vec<TeamStats> = ctx.db.read_live(LiveTable::CategoryStats)?;
    if stats.is_empty() {
        anyhow::bail!("no category stats stored; run `dugout power-ranks` first");
    }
    let season = ctx.config.league.season;
    let ratings = season_ratings(season, &stats, &ctx.categories, &ctx.config.league)?;
    ctx.db.write_history(season, HistoryTable::Ratings, &ratings)?;
    Ok(())
}

/// Best single-week line per category, split into long and regular weeks.
pub fn season_bests(ctx: &Context<'_>) -> Result<()> {
    let stats: Vec<WeeklyStats> = ctx.db.read_series(SeriesTable::WeekStats)?;
    let long_weeks = &ctx.config.league.long_weeks;
    let (long, regular): (Vec<WeeklyStats>, Vec<WeeklyStats>) =
        stats.into_iter().partition(|r| long_weeks.contains(&r.week));

    ctx.db.write_live(
        LiveTable::SeasonsBestLong,
        &results::season_bests(&long, &ctx.categories)?,
    )?;
    ctx.db.write_live(
        LiveTable::SeasonsBestRegular,
        &results::season_bests(&regular, &ctx.categories)?,
    )?;
    Ok(())
}

/// Manager head-to-head records over archived seasons and the current one.
pub fn head_to_head(ctx: &Context<'_>) -> Result<()> {
    let league = &ctx.config.league;
    let mut seasons: Vec<(i32, Vec<WeeklyResult>)> = Vec::new();
    for season in ctx.db.history_seasons(HistoryTable::WeeklyResults)? {
        if season == league.season {
            continue;
        }
        seasons.push((
            season,
            ctx.db.read_history(HistoryTable::WeeklyResults, Some(season))?,
        ));
    }
    seasons.push((league.season, ctx.db.read_series(SeriesTable::WeeklyResults)?));

    let views: Vec<SeasonResults<'_>> = seasons
        .iter()
        .map(|(season, results)| SeasonResults {
            season: *season,
            results,
        })
        .collect();
    let rows = h2h::head_to_head(
        &views,
        ctx.category_count(),
        league.regular_season_weeks,
        |season, n| league.manager_for(season, n.0),
    );
    info!("h2h: {} manager pairings over {} seasons", rows.len(), views.len());
    ctx.db.write_live(LiveTable::HeadToHead, &rows)?;
    Ok(())
}
