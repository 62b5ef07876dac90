//! subdx command-line entry point.
//!
//! Runs the subtitle pipeline once per invocation. Configuration comes from
//! `SUBDX_*` environment variables (and `SUBDX_CONFIG_FILE`); logs go to stderr
//! so stdout stays clean for JSON or subtitle text.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use subdx_client::{CacheTtls, CinemetaClient, SubdivxClient, SubtitleQuery, SubtitleService, TitleKind, validate};
use subdx_core::{AppConfig, CacheDb, Memoizer};
use tokio::io::AsyncWriteExt;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "subdx", version, about = "Search and download Spanish subtitles from subdivx")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Rank subtitles for a movie or series episode.
    Search {
        /// "movie" or "series".
        #[arg(long, value_parser = parse_kind)]
        kind: TitleKind,

        /// IMDb title id, e.g. tt0944947.
        #[arg(long)]
        imdb_id: String,

        #[arg(long)]
        season: Option<u32>,

        #[arg(long)]
        episode: Option<u32>,

        /// Video filename to rank against.
        #[arg(long)]
        filename: Option<String>,
    },

    /// Download a subtitle and print it as UTF-8.
    Fetch {
        /// Subtitle id from `search`.
        id: String,

        /// Write to a file instead of stdout.
        #[arg(long, short = 'o', value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

fn parse_kind(value: &str) -> Result<TitleKind, String> {
    value.parse().map_err(|e: subdx_core::Error| e.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = AppConfig::load()?;

    let memoizer = Memoizer::new(CacheDb::open(&config.db_path).await?);
    let service = SubtitleService::new(
        memoizer.clone(),
        Arc::new(CinemetaClient::from_config(&config)?),
        Arc::new(SubdivxClient::from_config(&config)?),
        CacheTtls::from(&config),
    );

    let outcome = run(&service, args.command).await;
    memoizer.close().await?;
    outcome
}

async fn run(service: &SubtitleService, command: Command) -> Result<()> {
    match command {
        Command::Search { kind, imdb_id, season, episode, filename } => {
            let query = SubtitleQuery { kind, imdb_id, season, episode, filename };
            let ranked = service.find_subtitles(&query).await?;
            println!("{}", serde_json::to_string_pretty(&ranked)?);
        }
        Command::Fetch { id, output } => {
            let id = validate::subtitle_id(&id)?;
            let subtitle = service.fetch_subtitle(id).await?;
            tracing::info!(name = %subtitle.name, encoding = %subtitle.encoding, "fetched subtitle");

            match output {
                Some(path) => tokio::fs::write(&path, &subtitle.data).await?,
                None => {
                    let mut stdout = tokio::io::stdout();
                    stdout.write_all(&subtitle.data).await?;
                    stdout.flush().await?;
                }
            }
        }
    }

    Ok(())
}
