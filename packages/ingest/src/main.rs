mod cli;

use std::fs::OpenOptions;
use std::sync::Mutex;

use anyhow::{Context, bail};
use clap::Parser;
use common::storage::FilesystemMediaStore;
use ingest::config::{AppConfig, LoggingConfig};
use ingest::media::MediaFetcher;
use ingest::stream::OAuthCredentials;
use ingest::timeline::{self, TimelineClient};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn init_tracing(logging: &LoggingConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(filter);

    match &logging.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).init();
        }
        None => builder.init(),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = cli::Args::parse();

    let config = AppConfig::load_from(&args.config).context("Failed to load config")?;
    init_tracing(&config.logging)?;

    if let Err(e) = config.validate() {
        error!(error = %e, "Invalid configuration");
        return Err(e.into());
    }

    if args.create {
        store::database::init_db(&config.database)
            .await
            .context("Failed to create tables")?;
        info!("Tables created");
        return Ok(());
    }

    if args.drop {
        if !args.yes {
            bail!("Refusing to drop all tables without --yes");
        }
        let db = store::database::connect(&config.database, 1)
            .await
            .context("Failed to connect to database")?;
        store::database::drop_tables(&db)
            .await
            .context("Failed to drop tables")?;
        if FilesystemMediaStore::remove_all(&config.media.path).await? {
            info!(path = %config.media.path.display(), "Removed media directory");
        }
        return Ok(());
    }

    if let Err(e) = config.validate_credentials() {
        error!(error = %e, "Cannot reach upstream without credentials");
        return Err(e.into());
    }

    if let Some(user_id) = args.timeline {
        let db = store::database::init_db(&config.database)
            .await
            .context("Failed to open database")?;
        let media = if config.media.enabled {
            Some(MediaFetcher::new(&config.media).await?)
        } else {
            None
        };
        let client = TimelineClient::new(
            args.timeline_url.clone(),
            OAuthCredentials::from(&config.credentials),
        )?;
        timeline::backfill(&client, &db, media.as_ref(), user_id)
            .await
            .context("Timeline backfill failed")?;
        return Ok(());
    }

    info!(
        url = %config.stream.url,
        languages = ?config.stream.languages,
        database = ?config.database.kind,
        "tweetdb starting"
    );

    let pipeline = ingest::pipeline::start(&config)
        .await
        .context("Failed to start pipeline")?;

    if let Err(e) = pipeline.coordinator.run_until_signal().await {
        error!(error = %e, "Shutdown finished with errors");
        return Err(e.into());
    }
    Ok(())
}
