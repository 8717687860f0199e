use dugout_core::model::TeamNumber;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum StatsError {
    #[error("week {week}: need at least two teams, got {teams}")]
    NotEnoughTeams { week: u32, teams: usize },

    #[error("team {team} is missing category `{category}`")]
    MissingCategory { team: String, category: String },

    #[error("week {week}: opponent {opponent} of team {team} has no row")]
    MissingOpponent {
        week: u32,
        team: TeamNumber,
        opponent: TeamNumber,
    },

    #[error("matchup page has {rows} team rows, expected 2")]
    MalformedMatchup { rows: usize },
}
