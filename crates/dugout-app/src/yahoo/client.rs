// Throttled page fetcher for the public Yahoo league site.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, OnceCell};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use dugout_core::categories::CategorySet;
use dugout_core::config::{HttpConfig, LeagueConfig};
use dugout_core::model::{
    CategoryRecord, MatchupLine, SeasonRecord, TeamEntry, TeamNumber, TeamStats,
};

use crate::error::FetchError;
use crate::source::LeagueSource;
use crate::yahoo::parse;

const INITIAL_BACKOFF: Duration = Duration::from_millis(500);

/// `LeagueSource` backed by scraped league pages.
pub struct YahooClient {
    http: reqwest::Client,
    base_url: String,
    categories: CategorySet,
    aliases: HashMap<String, String>,
    delay: Duration,
    max_retries: u32,
    last_request: Mutex<Option<Instant>>,
    teams: OnceCell<Vec<TeamEntry>>,
}

impl YahooClient {
    /// Client for `base_url`, which must end with `/`.
    pub fn new(
        base_url: &str,
        league: &LeagueConfig,
        http: &HttpConfig,
    ) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(http.user_agent.clone())
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|source| FetchError::Http {
                url: base_url.to_string(),
                source,
            })?;
        let mut base_url = base_url.to_string();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Ok(Self {
            http: client,
            base_url,
            categories: CategorySet::from_league(league),
            aliases: league.aliases.clone(),
            delay: Duration::from_millis(http.request_delay_ms),
            max_retries: http.max_retries,
            last_request: Mutex::new(None),
            teams: OnceCell::new(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Wait until `delay` has passed since the previous request.
    async fn throttle(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.delay {
                tokio::time::sleep(self.delay - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    /// GET a page body, retrying timeouts, connection failures, 429 and 5xx.
    pub async fn fetch_page(&self, url: &str) -> Result<String, FetchError> {
        let mut attempt = 0u32;
        let mut backoff = INITIAL_BACKOFF;
        loop {
            self.throttle().await;
            debug!("GET {url} (attempt {})", attempt + 1);
            match self.http.get(url).send().await {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        return resp.text().await.map_err(|source| FetchError::Http {
                            url: url.to_string(),
                            source,
                        });
                    }
                    let transient = status.as_u16() == 429 || status.is_server_error();
                    if !transient || attempt >= self.max_retries {
                        return Err(FetchError::Status {
                            url: url.to_string(),
                            status: status.as_u16(),
                        });
                    }
                    warn!(
                        "{status} from {url}, retrying in {backoff:?} (attempt {}/{})",
                        attempt + 1,
                        self.max_retries
                    );
                }
                Err(e) => {
                    if !(e.is_timeout() || e.is_connect()) || attempt >= self.max_retries {
                        return Err(FetchError::Http {
                            url: url.to_string(),
                            source: e,
                        });
                    }
                    warn!(
                        "request error {e} for {url}, retrying in {backoff:?} (attempt {}/{})",
                        attempt + 1,
                        self.max_retries
                    );
                }
            }
            tokio::time::sleep(backoff).await;
            attempt += 1;
            backoff = backoff.saturating_mul(2);
        }
    }

    async fn team_entries(&self) -> Result<&[TeamEntry], FetchError> {
        let teams = self
            .teams
            .get_or_try_init(|| async {
                let url = self.base_url.clone();
                let html = self.fetch_page(&url).await?;
                let teams = parse::parse_team_links(&html, &url)?;
                info!("found {} teams at {url}", teams.len());
                Ok::<_, FetchError>(teams)
            })
            .await?;
        Ok(teams.as_slice())
    }

    async fn head_to_head_page(&self, side: &str, kind: &str) -> Result<(String, String), FetchError> {
        let url = self.url(&format!("headtoheadstats?pt={side}&type={kind}"));
        let html = self.fetch_page(&url).await?;
        Ok((url, html))
    }
}

#[async_trait]
impl LeagueSource for YahooClient {
    async fn standings(&self) -> Result<Vec<SeasonRecord>, FetchError> {
        let html = self.fetch_page(&self.base_url).await?;
        parse::parse_standings(&html, &self.base_url)
    }

    async fn teams(&self) -> Result<Vec<TeamEntry>, FetchError> {
        Ok(self.team_entries().await?.to_vec())
    }

    async fn category_records(&self) -> Result<Vec<CategoryRecord>, FetchError> {
        let teams = self.team_entries().await?;
        let mut out = Vec::new();
        for side in ["B", "P"] {
            let (url, html) = self.head_to_head_page(side, "record").await?;
            out.extend(parse::parse_category_records(
                &html,
                &url,
                teams,
                &self.categories,
                &self.aliases,
            )?);
        }
        Ok(out)
    }

    async fn category_stats(&self) -> Result<Vec<TeamStats>, FetchError> {
        let teams = self.team_entries().await?;
        let mut merged: Vec<TeamStats> = Vec::new();
        for side in ["B", "P"] {
            let (url, html) = self.head_to_head_page(side, "stats").await?;
            for row in
                parse::parse_category_stats(&html, &url, teams, &self.categories, &self.aliases)?
            {
                match merged.iter_mut().find(|m| m.team_number == row.team_number) {
                    Some(existing) => existing.stats.extend(row.stats),
                    None => merged.push(row),
                }
            }
        }
        Ok(merged)
    }

    async fn matchup(&self, week: u32, team: TeamNumber) -> Result<Vec<MatchupLine>, FetchError> {
        let url = self.url(&format!("matchup?week={week}&module=matchup&mid1={team}"));
        let html = self.fetch_page(&url).await?;
        parse::parse_matchup(&html, &url, &self.categories, &self.aliases)
    }

    async fn innings_text(&self, team: TeamNumber) -> Result<Option<String>, FetchError> {
        let url = self.url(&team.to_string());
        let html = self.fetch_page(&url).await?;
        parse::parse_innings(&html)
    }
}
