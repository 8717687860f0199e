// Jobs that pull pages from the league source.

use anyhow::{Context as _, Result};
use tracing::{info, warn};

use dugout_core::categories::CategorySet;
use dugout_core::config::LeagueConfig;
use dugout_core::db::{HistoryTable, LiveTable, SeriesTable};
use dugout_core::model::{TeamEntry, TeamNumber, TeamStats, WeeklyResult, WeeklyStats};
use dugout_stats::innings::InningsCheck;
use dugout_stats::power::{self, StandingsRanks};
use dugout_stats::results::{matchup_sides, weekly_result};
use dugout_stats::sos::schedule_week;
use dugout_stats::standings::{current_matchup, live_standings};

use super::Context;
use crate::source::LeagueSource;

fn number_for(teams: &[TeamEntry], name: &str) -> Option<TeamNumber> {
    teams.iter().find(|t| t.team == name).map(|t| t.team_number)
}

/// One week of matchup pages: a stat line and a result per team.
///
/// Every team page is read, so each matchup is seen from both sides. A page
/// whose opponent cannot be matched to a team number is skipped.
pub async fn collect_week(
    source: &dyn LeagueSource,
    week: u32,
    teams: &[TeamEntry],
    categories: usize,
) -> Result<(Vec<WeeklyStats>, Vec<WeeklyResult>)> {
    let mut stats = Vec::with_capacity(teams.len());
    let mut results = Vec::with_capacity(teams.len());

    for entry in teams {
        let lines = source
            .matchup(week, entry.team_number)
            .await
            .with_context(|| format!("matchup page for team {} week {week}", entry.team_number))?;
        let (mine, theirs) = matchup_sides(&lines)?;
        let Some(opponent_number) = number_for(teams, &theirs.team) else {
            warn!(
                "week {week}: opponent `{}` of team {} is not in the team dictionary",
                theirs.team, entry.team_number
            );
            continue;
        };

        stats.push(WeeklyStats {
            week,
            team: mine.team.clone(),
            team_number: entry.team_number,
            opponent: theirs.team.clone(),
            opponent_number,
            stats: mine.stats.clone(),
        });
        results.push(weekly_result(
            week,
            mine,
            entry.team_number,
            theirs,
            opponent_number,
            categories,
        ));
    }

    Ok((stats, results))
}

/// Refresh the team dictionary and store every completed week not yet held.
pub async fn results(ctx: &Context<'_>, source: &dyn LeagueSource) -> Result<()> {
    let teams = source.teams().await.context("team dictionary")?;
    ctx.db.write_live(LiveTable::TeamDict, &teams)?;

    let stored = ctx.db.stored_weeks(SeriesTable::WeeklyResults)?;
    let stored_stats = ctx.db.stored_weeks(SeriesTable::WeekStats)?;
    for week in 1..=ctx.last_completed_week() {
        if stored.contains(&week) && stored_stats.contains(&week) {
            continue;
        }
        let (stats, results) = collect_week(source, week, &teams, ctx.category_count()).await?;
        ctx.db.write_week(SeriesTable::WeekStats, week, &stats)?;
        ctx.db.write_week(SeriesTable::WeeklyResults, week, &results)?;
        info!("stored week {week}: {} results", results.len());
    }

    let all_stats: Vec<WeeklyStats> = ctx.db.read_series(SeriesTable::WeekStats)?;
    let lite = power::power_ranks_lite(&all_stats, &ctx.categories)?;
    ctx.db.write_live(LiveTable::PowerRanksLite, &lite)?;
    Ok(())
}

/// Season records, category records and category stats, ranked three ways.
pub async fn power_ranks(ctx: &Context<'_>, source: &dyn LeagueSource) -> Result<()> {
    let records = source.standings().await.context("standings")?;
    let category_records = source.category_records().await.context("category records")?;
    let category_stats = source.category_stats().await.context("category stats")?;
    ctx.db.write_live(LiveTable::SeasonRecords, &records)?;
    ctx.db.write_live(LiveTable::CategoryRecords, &category_records)?;
    ctx.db.write_live(LiveTable::CategoryStats, &category_stats)?;

    let ranks: StandingsRanks = records.iter().map(|r| (r.team_number, r.rank)).collect();
    let normalized = power::normalized_scores(&category_stats, &ctx.categories, &ranks)?;
    let power_rows = power::stats_power_ranks(&category_stats, &ctx.categories, &ranks)?;
    let record_rows = power::record_ranks(&category_records, &ctx.categories);

    ctx.db.write_live(LiveTable::NormalizedRanks, &normalized)?;
    ctx.db.write_live(LiveTable::PowerRanks, &power_rows)?;
    ctx.db.write_live(LiveTable::RecordRanks, &record_rows)?;

    let week = ctx.last_completed_week();
    if week > 0 {
        ctx.db
            .write_week(SeriesTable::RunningNormalizedRanks, week, &normalized)?;
        ctx.db
            .write_week(SeriesTable::PowerRanksSeasonTrend, week, &power_rows)?;
    }
    info!("ranked {} teams", normalized.len());
    Ok(())
}

/// Replace the stored schedule with pairings from the current week through
/// the end of the regular season.
pub async fn schedule(ctx: &Context<'_>, source: &dyn LeagueSource) -> Result<()> {
    let teams = ctx.teams()?;
    ctx.db.clear_schedule()?;

    for week in ctx.week..=ctx.config.league.regular_season_weeks {
        let mut pairings = Vec::new();
        for entry in &teams {
            let lines = match source.matchup(week, entry.team_number).await {
                Ok(lines) => lines,
                Err(e) => {
                    warn!("schedule: week {week} team {}: {e}", entry.team_number);
                    continue;
                }
            };
            let Ok((mine, theirs)) = matchup_sides(&lines) else {
                warn!("schedule: week {week} team {} has no matchup", entry.team_number);
                continue;
            };
            match (number_for(&teams, &mine.team), number_for(&teams, &theirs.team)) {
                (Some(a), Some(b)) => pairings.push((a, b)),
                _ => warn!(
                    "schedule: week {week}: cannot map `{}` vs `{}`",
                    mine.team, theirs.team
                ),
            }
        }
        let entries = schedule_week(week, &pairings, &teams);
        if entries.is_empty() {
            warn!("schedule: no pairings found for week {week}");
            continue;
        }
        ctx.db.write_schedule_week(week, &entries)?;
        info!("scheduled week {week}: {} rows", entries.len());
    }
    Ok(())
}

/// Season standings folded together with the current week's matchups.
pub async fn standings(ctx: &Context<'_>, source: &dyn LeagueSource) -> Result<()> {
    let records = source.standings().await.context("standings")?;
    ctx.db.write_live(LiveTable::SeasonRecords, &records)?;

    let mut current = Vec::new();
    if ctx.week <= ctx.config.league.regular_season_weeks {
        for record in &records {
            let lines = source
                .matchup(ctx.week, record.team_number)
                .await
                .with_context(|| format!("current matchup for team {}", record.team_number))?;
            let (mine, theirs) = matchup_sides(&lines)?;
            current.push(current_matchup(
                &mine.team,
                mine.score as u32,
                theirs.score as u32,
                ctx.category_count(),
            ));
        }
    }

    let rows = live_standings(&records, &current, |n| ctx.manager(n));
    ctx.db.write_live(LiveTable::LiveStandings, &rows)?;
    Ok(())
}

/// Minimum innings progress for every team. A page that fails still gets a
/// row carrying the error.
pub async fn innings(ctx: &Context<'_>, source: &dyn LeagueSource) -> Result<()> {
    let teams = ctx.teams()?;
    let mut rows = Vec::with_capacity(teams.len());
    for entry in &teams {
        let row = match source.innings_text(entry.team_number).await {
            Ok(Some(text)) => InningsCheck::from_text(&entry.team, entry.team_number, &text),
            Ok(None) => {
                warn!("innings: no progress span for team {}", entry.team_number);
                InningsCheck::failed(&entry.team, entry.team_number, "minimum innings span not found")
            }
            Err(e) => {
                warn!("innings: team {}: {e}", entry.team_number);
                InningsCheck::failed(&entry.team, entry.team_number, e.to_string())
            }
        };
        rows.push(row);
    }
    let short = rows.iter().filter(|r| !r.minimum_met).count();
    info!("innings: {short} of {} teams below the minimum", rows.len());
    ctx.db.write_live(LiveTable::MinimumInnings, &rows)?;
    Ok(())
}

/// Archive a finished season: every regular-season weekly result and the
/// final category ratings, labelled with that season's managers.
pub async fn archive_season(
    ctx: &Context<'_>,
    season: i32,
    source: &dyn LeagueSource,
) -> Result<()> {
    let league: &LeagueConfig = &ctx.config.league;
    let teams = source.teams().await.context("team dictionary")?;

    let mut all_results = Vec::new();
    for week in 1..=league.regular_season_weeks {
        let (_, results) = collect_week(source, week, &teams, ctx.category_count())
            .await
            .with_context(|| format!("season {season} week {week}"))?;
        all_results.extend(results);
    }
    ctx.db
        .write_history(season, HistoryTable::WeeklyResults, &all_results)?;

    let stats: Vec<TeamStats> = source.category_stats().await.context("category stats")?;
    let ratings = season_ratings(season, &stats, &ctx.categories, league)?;
    ctx.db.write_history(season, HistoryTable::Ratings, &ratings)?;
    info!(
        "archived season {season}: {} results, {} ratings",
        all_results.len(),
        ratings.len()
    );
    Ok(())
}

pub(crate) fn season_ratings(
    season: i32,
    stats: &[TeamStats],
    categories: &CategorySet,
    league: &LeagueConfig,
) -> Result<Vec<power::AllTimeRating>> {
    Ok(power::all_time_ratings(season, stats, categories, |n| {
        league.manager_for(season, n.0)
    })?)
}
