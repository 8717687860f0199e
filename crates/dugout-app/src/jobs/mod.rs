// Batch jobs. Each one reads from the league source and/or the database,
// runs a dugout-stats transform and writes the result back to a table.

pub mod analyze;
pub mod collect;

use std::fmt;

use anyhow::{Context as _, Result};
use tracing::{error, info, warn};

use dugout_core::categories::CategorySet;
use dugout_core::config::Config;
use dugout_core::db::{Database, LiveTable};
use dugout_core::model::{TeamEntry, TeamNumber};

use crate::source::LeagueSource;
use crate::{export, report};

/// Everything a job needs besides the league source.
pub struct Context<'a> {
    pub config: &'a Config,
    pub db: &'a Database,
    pub categories: CategorySet,
    /// The week in progress. Weeks before it are complete.
    pub week: u32,
}

impl<'a> Context<'a> {
    pub fn new(config: &'a Config, db: &'a Database, week: u32) -> Self {
        Self {
            config,
            db,
            categories: CategorySet::from_league(&config.league),
            week,
        }
    }

    pub fn category_count(&self) -> usize {
        self.categories.len()
    }

    /// Most recent finished week, 0 before week 1 ends.
    pub fn last_completed_week(&self) -> u32 {
        self.week.saturating_sub(1)
    }

    /// Regular-season weeks still open to scoring, the week in progress
    /// included. Zero once the regular season is over.
    pub fn weeks_left(&self) -> u32 {
        (self.config.league.regular_season_weeks + 1).saturating_sub(self.week)
    }

    pub fn manager(&self, team_number: TeamNumber) -> String {
        self.config
            .league
            .manager_for(self.config.league.season, team_number.0)
    }

    /// Stored team dictionary; the `results` job refreshes it.
    pub fn teams(&self) -> Result<Vec<TeamEntry>> {
        let teams: Vec<TeamEntry> = self.db.read_live(LiveTable::TeamDict)?;
        if teams.is_empty() {
            anyhow::bail!("team dictionary is empty; run `dugout results` first");
        }
        Ok(teams)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Job {
    Results,
    AllPlay,
    PowerRanks,
    Recalc,
    Luck,
    Elo,
    Schedule,
    Standings,
    Playoffs,
    SeasonTrend,
    Sos,
    Predict,
    Innings,
    AllTime,
    SeasonBests,
    HeadToHead,
    Export,
    Report,
}

impl Job {
    /// The standard daily sequence. Order matters: later jobs read what
    /// earlier ones wrote.
    pub const DAILY: [Job; 17] = [
        Job::Results,
        Job::AllPlay,
        Job::PowerRanks,
        Job::Recalc,
        Job::Luck,
        Job::Elo,
        Job::Schedule,
        Job::Standings,
        Job::Playoffs,
        Job::SeasonTrend,
        Job::Sos,
        Job::Predict,
        Job::Innings,
        Job::AllTime,
        Job::SeasonBests,
        Job::HeadToHead,
        Job::Report,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Job::Results => "results",
            Job::AllPlay => "all-play",
            Job::PowerRanks => "power-ranks",
            Job::Recalc => "recalc",
            Job::Luck => "luck",
            Job::Elo => "elo",
            Job::Schedule => "schedule",
            Job::Standings => "standings",
            Job::Playoffs => "playoffs",
            Job::SeasonTrend => "season-trend",
            Job::Sos => "sos",
            Job::Predict => "predict",
            Job::Innings => "innings",
            Job::AllTime => "all-time",
            Job::SeasonBests => "season-bests",
            Job::HeadToHead => "h2h",
            Job::Export => "export",
            Job::Report => "report",
        }
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Run one job to completion.
pub async fn run(job: Job, ctx: &Context<'_>, source: &dyn LeagueSource) -> Result<()> {
    info!("job {job}: starting (week {})", ctx.week);
    match job {
        Job::Results => collect::results(ctx, source).await,
        Job::PowerRanks => collect::power_ranks(ctx, source).await,
        Job::Schedule => collect::schedule(ctx, source).await,
        Job::Standings => collect::standings(ctx, source).await,
        Job::Innings => collect::innings(ctx, source).await,
        Job::AllPlay => analyze::all_play(ctx),
        Job::Recalc => analyze::recalc(ctx),
        Job::Luck => analyze::luck(ctx),
        Job::Elo => analyze::elo(ctx),
        Job::Playoffs => analyze::playoffs(ctx),
        Job::SeasonTrend => analyze::season_trend(ctx),
        Job::Sos => analyze::sos(ctx),
        Job::Predict => analyze::predict(ctx),
        Job::AllTime => analyze::all_time(ctx),
        Job::SeasonBests => analyze::season_bests(ctx),
        Job::HeadToHead => analyze::head_to_head(ctx),
        Job::Export => export::export_all(ctx.db, &ctx.config.pipeline.output.export_dir).map(|_| ()),
        Job::Report => report::write_site(ctx).map(|_| ()),
    }
    .with_context(|| format!("job {job} failed"))?;
    info!("job {job}: done");
    Ok(())
}

/// Run the daily sequence. A failed job is logged and the rest still run;
/// the error count decides the result.
pub async fn daily(ctx: &Context<'_>, source: &dyn LeagueSource) -> Result<()> {
    let mut failed = Vec::new();
    for job in Job::DAILY {
        if job == Job::Schedule && schedule_is_current(ctx)? {
            info!("job schedule: week {} already scheduled, skipping", ctx.week);
            continue;
        }
        if let Err(e) = run(job, ctx, source).await {
            error!("{e:#}");
            failed.push(job);
        }
    }
    if failed.is_empty() {
        Ok(())
    } else {
        warn!("daily run finished with {} failed jobs", failed.len());
        let names: Vec<&str> = failed.iter().map(|j| j.as_str()).collect();
        anyhow::bail!("failed jobs: {}", names.join(", "))
    }
}

/// True when the current week already has stored pairings, or the regular
/// season is over.
fn schedule_is_current(ctx: &Context<'_>) -> Result<bool> {
    if ctx.week > ctx.config.league.regular_season_weeks {
        return Ok(true);
    }
    Ok(!ctx.db.read_schedule(Some(ctx.week))?.is_empty())
}
