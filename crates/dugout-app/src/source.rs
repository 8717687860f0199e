// The seam between the jobs and wherever league pages come from.

use async_trait::async_trait;

use dugout_core::model::{CategoryRecord, MatchupLine, SeasonRecord, TeamEntry, TeamNumber, TeamStats};

use crate::error::FetchError;

/// Read access to one league season.
///
/// `YahooClient` implements this against the live site; tests use fixture
/// sources. Team names come back exactly as the provider shows them, and
/// stat columns are already normalized to configured category names.
#[async_trait]
pub trait LeagueSource: Send + Sync {
    /// Season standings from the league home page, best first.
    async fn standings(&self) -> Result<Vec<SeasonRecord>, FetchError>;

    /// Team name to team number, from the standings links.
    async fn teams(&self) -> Result<Vec<TeamEntry>, FetchError>;

    /// Season W-L-T per team and category, batting and pitching combined.
    async fn category_records(&self) -> Result<Vec<CategoryRecord>, FetchError>;

    /// Season stat totals per team, batting and pitching combined.
    async fn category_stats(&self) -> Result<Vec<TeamStats>, FetchError>;

    /// Both lines of `team`'s matchup in `week`: the team first, then its
    /// opponent.
    async fn matchup(&self, week: u32, team: TeamNumber) -> Result<Vec<MatchupLine>, FetchError>;

    /// Minimum innings progress text from the team page, if shown.
    async fn innings_text(&self, team: TeamNumber) -> Result<Option<String>, FetchError>;
}
