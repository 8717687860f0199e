// dugout entry point.
//
// Startup sequence:
// 1. Parse arguments
// 2. Initialize tracing (log to file)
// 3. Load config
// 4. Open database
// 5. Resolve the week in progress
// 6. Dispatch the command

use std::path::Path;

use anyhow::Context as _;
use clap::Parser;
use tracing::{error, info};

use dugout_app::cli::{Args, Command};
use dugout_app::jobs::{self, collect, Context};
use dugout_app::yahoo::{oauth, YahooClient};
use dugout_core::config;
use dugout_core::db::Database;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    init_tracing(&args.base_dir)?;
    info!("dugout starting: {:?}", args.command);

    let config = config::load_config(&args.base_dir).context("failed to load configuration")?;
    info!(
        "Config loaded: league={}, season {}, {} teams",
        config.league.name, config.league.season, config.league.num_teams
    );

    let db_path = resolve(&args.base_dir, &config.db_path);
    let db = Database::open(&db_path).context("failed to open database")?;
    info!("Database opened at {db_path}");

    let week = match args.week {
        Some(week) => week,
        None => config
            .league
            .current_week(chrono::Local::now().date_naive()),
    };
    let ctx = Context::new(&config, &db, week);

    let result = run(&args.command, &ctx).await;
    if let Err(e) = &result {
        error!("{e:#}");
    }
    result
}

async fn run(command: &Command, ctx: &Context<'_>) -> anyhow::Result<()> {
    let config = ctx.config;

    if *command == Command::CheckAuth {
        if !config.credentials.has_yahoo_oauth() {
            anyhow::bail!(
                "check-auth needs yahoo_client_id, yahoo_client_secret and \
                 yahoo_refresh_token in config/credentials.toml"
            );
        }
        let http = reqwest::Client::new();
        let games = oauth::check_auth(&http, &config.credentials).await?;
        println!("{}", serde_json::to_string_pretty(&games)?);
        return Ok(());
    }

    if let Command::History { season } = command {
        let seasons = config
            .pipeline
            .history
            .iter()
            .filter(|h| season.map_or(true, |s| s == h.season));
        let mut archived = 0;
        for entry in seasons {
            let url = config.league.history_url(entry.season, &entry.league_id);
            let source = YahooClient::new(&url, &config.league, &config.pipeline.http)?;
            collect::archive_season(ctx, entry.season, &source).await?;
            archived += 1;
        }
        if archived == 0 {
            anyhow::bail!("no matching [[history]] entries in pipeline.toml");
        }
        return Ok(());
    }

    let source = YahooClient::new(&config.league.url, &config.league, &config.pipeline.http)?;
    match command.job() {
        Some(job) => jobs::run(job, ctx, &source).await,
        None => jobs::daily(ctx, &source).await,
    }
}

/// A relative database path lives under the base directory.
fn resolve(base_dir: &Path, path: &str) -> String {
    let p = Path::new(path);
    if p.is_absolute() || path == ":memory:" {
        path.to_string()
    } else {
        base_dir.join(p).to_string_lossy().into_owned()
    }
}

fn init_tracing(base_dir: &Path) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = base_dir.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("dugout.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("dugout=info,dugout_app=info,dugout_core=info,dugout_stats=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
