// Configuration loading and parsing (league.toml, pipeline.toml, credentials.toml).

use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub league: LeagueConfig,
    pub pipeline: PipelineConfig,
    pub credentials: CredentialsConfig,
    pub db_path: String,
}

// ---------------------------------------------------------------------------
// league.toml structs
// ---------------------------------------------------------------------------

/// Wrapper for the top-level `[league]` table in league.toml.
#[derive(Debug, Clone, Deserialize)]
struct LeagueFile {
    league: LeagueConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LeagueConfig {
    pub name: String,
    pub season: i32,
    /// League home page, e.g. `https://baseball.fantasysports.yahoo.com/b1/30332/`.
    pub url: String,
    pub num_teams: usize,
    pub season_start: NaiveDate,
    pub regular_season_weeks: u32,
    pub playoff_spots: usize,
    /// Weeks that run longer than seven days; their totals are compared
    /// separately from regular weeks.
    #[serde(default)]
    pub long_weeks: Vec<u32>,
    pub batting_categories: CategoriesSection,
    pub pitching_categories: CategoriesSection,
    pub scoring: ScoringSection,
    #[serde(default)]
    pub aliases: HashMap<String, String>,
    #[serde(default)]
    pub managers: Vec<ManagerAssignment>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CategoriesSection {
    pub categories: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScoringSection {
    /// Categories where the smaller value wins (ERA, WHIP).
    pub lower_is_better: Vec<String>,
    /// Rate categories that are averaged rather than summed across weeks.
    #[serde(default)]
    pub averaged: Vec<String>,
}

/// Team numbers are stable within a season but reshuffle between seasons,
/// so the manager behind a number is keyed by both.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ManagerAssignment {
    pub season: i32,
    pub team_number: u32,
    pub name: String,
}

impl LeagueConfig {
    /// Total number of categories decided in each weekly matchup.
    pub fn category_count(&self) -> usize {
        self.batting_categories.categories.len() + self.pitching_categories.categories.len()
    }

    /// The in-progress scoring week for `today`. Weeks before it are complete.
    ///
    /// Before opening day this is week 1; after the regular season it stays
    /// pinned one past the final week so every regular-season week counts as
    /// complete.
    pub fn current_week(&self, today: NaiveDate) -> u32 {
        if today < self.season_start {
            return 1;
        }
        let days = (today - self.season_start).num_days();
        let week = (days / 7) as u32 + 1;
        week.min(self.regular_season_weeks + 1)
    }

    /// Manager name for a team number in a given season, or `Team {n}`.
    pub fn manager_for(&self, season: i32, team_number: u32) -> String {
        self.managers
            .iter()
            .find(|m| m.season == season && m.team_number == team_number)
            .map(|m| m.name.clone())
            .unwrap_or_else(|| format!("Team {team_number}"))
    }

    /// Base URL for a past season's league pages.
    pub fn history_url(&self, season: i32, league_id: &str) -> String {
        format!("https://baseball.fantasysports.yahoo.com/{season}/b1/{league_id}/")
    }
}

// ---------------------------------------------------------------------------
// pipeline.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire pipeline.toml file.
#[derive(Debug, Clone, Deserialize)]
struct PipelineFile {
    database: DatabaseSection,
    http: HttpConfig,
    output: OutputConfig,
    elo: EloConfig,
    luck: LuckConfig,
    #[serde(default)]
    history: Vec<HistoricalSeason>,
}

#[derive(Debug, Clone, Deserialize)]
struct DatabaseSection {
    #[serde(default)]
    path: String,
}

/// The public pipeline config assembled from the pipeline.toml sections.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub http: HttpConfig,
    pub output: OutputConfig,
    pub elo: EloConfig,
    pub luck: LuckConfig,
    pub history: Vec<HistoricalSeason>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub request_delay_ms: u64,
    pub max_retries: u32,
    pub user_agent: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    pub report_dir: String,
    pub export_dir: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EloConfig {
    pub initial_rating: f64,
    pub k_factor: f64,
    pub base: f64,
    pub divisor: f64,
}

impl Default for EloConfig {
    fn default() -> Self {
        Self {
            initial_rating: 1000.0,
            k_factor: 50.0,
            base: 25.0,
            divisor: 400.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LuckConfig {
    pub threshold: f64,
    pub outlier_magnitude: f64,
}

impl Default for LuckConfig {
    fn default() -> Self {
        Self {
            threshold: 0.5,
            outlier_magnitude: 2.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct HistoricalSeason {
    pub season: i32,
    pub league_id: String,
}

// ---------------------------------------------------------------------------
// credentials.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Default)]
pub struct CredentialsConfig {
    pub yahoo_client_id: Option<String>,
    pub yahoo_client_secret: Option<String>,
    pub yahoo_refresh_token: Option<String>,
}

impl CredentialsConfig {
    /// True when every field needed for an OAuth refresh is present.
    pub fn has_yahoo_oauth(&self) -> bool {
        [
            &self.yahoo_client_id,
            &self.yahoo_client_secret,
            &self.yahoo_refresh_token,
        ]
        .iter()
        .all(|v| v.as_deref().is_some_and(|s| !s.is_empty()))
    }
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/league.toml`,
/// `config/pipeline.toml`, and (optionally) `config/credentials.toml`,
/// all relative to the given `base_dir`.
///
/// Does not copy defaults; `load_config()` does that first.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let config_dir = base_dir.join("config");

    // --- league.toml (required) ---
    let league_path = config_dir.join("league.toml");
    let league_text = read_file(&league_path)?;
    let league_file: LeagueFile =
        toml::from_str(&league_text).map_err(|e| ConfigError::ParseError {
            path: league_path.clone(),
            source: e,
        })?;
    let mut league = league_file.league;
    if !league.url.ends_with('/') {
        league.url.push('/');
    }

    // --- pipeline.toml (required) ---
    let pipeline_path = config_dir.join("pipeline.toml");
    let pipeline_text = read_file(&pipeline_path)?;
    let pipeline_file: PipelineFile =
        toml::from_str(&pipeline_text).map_err(|e| ConfigError::ParseError {
            path: pipeline_path.clone(),
            source: e,
        })?;

    let db_path = if pipeline_file.database.path.trim().is_empty() {
        default_db_path()?
    } else {
        pipeline_file.database.path
    };

    let pipeline = PipelineConfig {
        http: pipeline_file.http,
        output: pipeline_file.output,
        elo: pipeline_file.elo,
        luck: pipeline_file.luck,
        history: pipeline_file.history,
    };

    // --- credentials.toml (optional) ---
    let credentials_path = config_dir.join("credentials.toml");
    let credentials = if credentials_path.exists() {
        let cred_text = read_file(&credentials_path)?;
        toml::from_str(&cred_text).map_err(|e| ConfigError::ParseError {
            path: credentials_path.clone(),
            source: e,
        })?
    } else {
        CredentialsConfig::default()
    };

    let config = Config {
        league,
        pipeline,
        credentials,
        db_path,
    };

    validate(&config)?;

    Ok(config)
}

/// Files the pipeline cannot start without. `credentials.toml` is optional
/// and only ships as an `.example`, so it is never seeded.
const REQUIRED_FILES: [&str; 2] = ["league.toml", "pipeline.toml"];

/// Seed `config/league.toml` and `config/pipeline.toml` from the templates in
/// `defaults/` when they are missing. Existing files are never touched.
/// Returns the paths that were written.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let config_dir = base_dir.join("config");
    let defaults_dir = base_dir.join("defaults");
    let mut seeded = Vec::new();

    for name in REQUIRED_FILES {
        let target = config_dir.join(name);
        if target.exists() {
            continue;
        }
        let template = defaults_dir.join(name);
        if !template.is_file() {
            return Err(ConfigError::DefaultsCopyError {
                message: format!(
                    "config/{name} is missing under {} and there is no defaults/{name} \
                     to seed it from; run dugout from the workspace root or pass --base-dir",
                    base_dir.display()
                ),
            });
        }
        std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("cannot create {}: {e}", config_dir.display()),
        })?;
        std::fs::copy(&template, &target).map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("cannot seed {name}: {e}"),
        })?;
        info!(target: "dugout::config", "seeded {name} from {}", template.display());
        seeded.push(target);
    }

    Ok(seeded)
}

/// Load config relative to `base_dir`, copying defaults first.
pub fn load_config(base_dir: &Path) -> Result<Config, ConfigError> {
    ensure_config_files(base_dir)?;
    load_config_from(base_dir)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

/// `<data dir>/dugout.db` for the current platform.
fn default_db_path() -> Result<String, ConfigError> {
    let dirs = directories::ProjectDirs::from("", "", "dugout").ok_or_else(|| {
        ConfigError::ValidationError {
            field: "database.path".into(),
            message: "empty and no platform data directory is available".into(),
        }
    })?;
    let data_dir = dirs.data_dir();
    std::fs::create_dir_all(data_dir).map_err(|e| ConfigError::ValidationError {
        field: "database.path".into(),
        message: format!("cannot create {}: {e}", data_dir.display()),
    })?;
    Ok(data_dir.join("dugout.db").to_string_lossy().into_owned())
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    let league = &config.league;

    if league.num_teams < 2 {
        return Err(ConfigError::ValidationError {
            field: "league.num_teams".into(),
            message: format!("must be at least 2, got {}", league.num_teams),
        });
    }

    if league.playoff_spots == 0 || league.playoff_spots >= league.num_teams {
        return Err(ConfigError::ValidationError {
            field: "league.playoff_spots".into(),
            message: format!(
                "must be between 1 and {} (num_teams - 1), got {}",
                league.num_teams - 1,
                league.playoff_spots
            ),
        });
    }

    if league.regular_season_weeks == 0 {
        return Err(ConfigError::ValidationError {
            field: "league.regular_season_weeks".into(),
            message: "must be greater than 0".into(),
        });
    }

    if league.category_count() == 0 {
        return Err(ConfigError::ValidationError {
            field: "league.batting_categories".into(),
            message: "at least one scoring category is required".into(),
        });
    }

    let all: Vec<&String> = league
        .batting_categories
        .categories
        .iter()
        .chain(league.pitching_categories.categories.iter())
        .collect();
    for (i, name) in all.iter().enumerate() {
        if all[..i].contains(name) {
            return Err(ConfigError::ValidationError {
                field: "league.categories".into(),
                message: format!("category `{name}` is listed twice"),
            });
        }
    }

    let scoring_lists: &[(&str, &Vec<String>)] = &[
        ("league.scoring.lower_is_better", &league.scoring.lower_is_better),
        ("league.scoring.averaged", &league.scoring.averaged),
    ];
    for (field, names) in scoring_lists {
        if let Some(unknown) = names.iter().find(|n| !all.contains(n)) {
            return Err(ConfigError::ValidationError {
                field: field.to_string(),
                message: format!("`{unknown}` is not a configured category"),
            });
        }
    }

    // ELO parameters
    let elo = &config.pipeline.elo;
    if elo.k_factor <= 0.0 {
        return Err(ConfigError::ValidationError {
            field: "elo.k_factor".into(),
            message: format!("must be > 0, got {}", elo.k_factor),
        });
    }
    if elo.base <= 1.0 {
        return Err(ConfigError::ValidationError {
            field: "elo.base".into(),
            message: format!("must be > 1, got {}", elo.base),
        });
    }
    if elo.divisor <= 0.0 {
        return Err(ConfigError::ValidationError {
            field: "elo.divisor".into(),
            message: format!("must be > 0, got {}", elo.divisor),
        });
    }

    let luck = &config.pipeline.luck;
    if luck.threshold < 0.0 || luck.outlier_magnitude < 0.0 {
        return Err(ConfigError::ValidationError {
            field: "luck".into(),
            message: "thresholds must be non-negative".into(),
        });
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
