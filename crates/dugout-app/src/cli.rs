// Command-line arguments.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::jobs::Job;

/// Fantasy baseball league analytics.
///
/// Scrapes the league's standings and matchup pages into a local database,
/// derives rankings, luck and ratings from them, and writes CSV exports and
/// a static HTML report.
#[derive(Parser, Debug)]
#[command(name = "dugout", version, about, long_about = None)]
pub struct Args {
    /// Directory holding `config/` and the database.
    #[arg(long, global = true, default_value = ".")]
    pub base_dir: PathBuf,

    /// Treat this as the week in progress instead of the one derived from
    /// the calendar.
    #[arg(long, global = true, value_name = "WEEK")]
    pub week: Option<u32>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run the full daily sequence, continuing past failed jobs.
    Daily,
    /// Fetch the team dictionary and every completed week.
    Results,
    /// Expected wins and all-play records per week.
    AllPlay,
    /// Category records and stats ranked into power scores.
    PowerRanks,
    /// Rebuild running normalized ranks for every stored week.
    Recalc,
    /// Weekly luck, season luck totals and luck coefficients.
    Luck,
    /// Running ELO ratings.
    Elo,
    /// Fetch the remaining regular-season schedule.
    Schedule,
    /// Live standings with the current week folded in.
    Standings,
    /// Clinch and elimination status.
    Playoffs,
    /// Cumulative standings after each week.
    SeasonTrend,
    /// Remaining strength of schedule.
    Sos,
    /// Project the current week's matchups.
    Predict,
    /// Minimum innings progress per team.
    Innings,
    /// Rate this season's category totals into the all-time table.
    AllTime,
    /// Best single-week category totals.
    SeasonBests,
    /// Manager head-to-head records across seasons.
    H2h,
    /// Write every stored table to CSV.
    Export,
    /// Render the HTML report.
    Report,
    /// Archive the seasons listed under `[[history]]` in pipeline.toml.
    History {
        /// Only archive this season.
        #[arg(long)]
        season: Option<i32>,
    },
    /// Refresh the OAuth token and call the fantasy API once.
    CheckAuth,
}

impl Command {
    /// The single job this command runs, if it maps to one.
    pub fn job(&self) -> Option<Job> {
        let job = match self {
            Command::Results => Job::Results,
            Command::AllPlay => Job::AllPlay,
            Command::PowerRanks => Job::PowerRanks,
            Command::Recalc => Job::Recalc,
            Command::Luck => Job::Luck,
            Command::Elo => Job::Elo,
            Command::Schedule => Job::Schedule,
            Command::Standings => Job::Standings,
            Command::Playoffs => Job::Playoffs,
            Command::SeasonTrend => Job::SeasonTrend,
            Command::Sos => Job::Sos,
            Command::Predict => Job::Predict,
            Command::Innings => Job::Innings,
            Command::AllTime => Job::AllTime,
            Command::SeasonBests => Job::SeasonBests,
            Command::H2h => Job::HeadToHead,
            Command::Export => Job::Export,
            Command::Report => Job::Report,
            Command::Daily | Command::History { .. } | Command::CheckAuth => return None,
        };
        Some(job)
    }
}
