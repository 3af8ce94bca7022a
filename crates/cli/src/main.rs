//! gazette command line entry point.
//!
//! A thin consumer of the content layer: lists editions, shows articles,
//! runs incremental searches, and manages bookmarks. Logging goes to stderr
//! so stdout stays clean for output.

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use gazette_client::{
    AlwaysOnline, ContentStore, FetchConfig, HttpFetcher, NoopTelemetry, SearchAggregator, SearchEvent, SearchState,
};
use gazette_core::{AppConfig, CacheDb, Error};

#[derive(Parser)]
#[command(name = "gazette", about = "Offline-first reader for the gazette edition feed", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List known edition ids, most recent first
    Editions {
        /// Bypass the cached index
        #[arg(long)]
        refresh: bool,
    },
    /// Print one edition with its articles
    Show {
        /// Edition id
        id: String,
        /// Bypass the cached copy
        #[arg(long)]
        refresh: bool,
    },
    /// Print a single article
    Article {
        /// Edition id
        edition_id: String,
        /// Article id
        article_id: String,
    },
    /// Search article titles and bodies across all editions
    Search {
        /// Query text (two characters minimum)
        query: String,
    },
    /// Check whether a new edition has been published
    Check,
    /// Bookmark an article
    Bookmark {
        /// Edition id
        edition_id: String,
        /// Article id
        article_id: String,
    },
    /// Remove a bookmark
    Unbookmark {
        /// Article id
        article_id: String,
    },
    /// List bookmarked articles
    Saved,
    /// Delete expired cache entries
    Purge,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load().context("loading configuration")?;
    tracing::debug!("using content repository {}", config.base_url);

    let db = CacheDb::open(&config.db_path)
        .await
        .with_context(|| format!("opening cache at {}", config.db_path.display()))?;
    let fetcher = HttpFetcher::new(FetchConfig::from(&config)).context("building HTTP client")?;
    let store = Arc::new(ContentStore::new(
        db,
        Arc::new(fetcher),
        Arc::new(AlwaysOnline),
        Arc::new(NoopTelemetry),
        &config,
    ));

    match cli.command {
        Commands::Editions { refresh } => {
            for id in store.get_edition_ids(refresh).await? {
                println!("{}", id);
            }
        }
        Commands::Show { id, refresh } => {
            let Some(edition) = store.get_edition(&id, refresh).await? else {
                return Err(Error::NotFound(format!("edition {}", id)).into());
            };
            println!("{} (updated {})", edition.id, edition.updated_at);
            for article in &edition.articles {
                let marker = if article.is_saved { "*" } else { " " };
                println!("{} {}  {}", marker, article.id, article.title);
            }
        }
        Commands::Article { edition_id, article_id } => {
            let Some(article) = store.get_article(&edition_id, &article_id).await? else {
                return Err(Error::NotFound(format!("article {} in edition {}", article_id, edition_id)).into());
            };
            println!("{}", article.title);
            println!();
            println!("{}", article.body);
        }
        Commands::Search { query } => {
            let aggregator = SearchAggregator::new(store);
            let mut events = aggregator.search(&query);

            while let Some(event) = events.recv().await {
                match event {
                    SearchEvent::Batch(batch) => {
                        for article in batch {
                            println!("{}/{}  {}", article.edition_id, article.id, article.title);
                        }
                    }
                    SearchEvent::State(SearchState::Idle) => {
                        eprintln!("query too short, nothing searched");
                    }
                    SearchEvent::State(SearchState::Empty) => {
                        eprintln!("no matches");
                    }
                    SearchEvent::State(SearchState::Error) => {
                        bail!("search failed; see logs");
                    }
                    SearchEvent::State(_) => {}
                }
            }
        }
        Commands::Check => {
            if store.preload_next_edition().await? {
                println!("a new edition is available");
            } else {
                println!("no new edition");
            }
        }
        Commands::Bookmark { edition_id, article_id } => {
            let Some(article) = store.get_article(&edition_id, &article_id).await? else {
                return Err(Error::NotFound(format!("article {} in edition {}", article_id, edition_id)).into());
            };
            store.bookmark_article(&article).await?;
            println!("saved {}", article.title);
        }
        Commands::Unbookmark { article_id } => {
            store.unbookmark_article(&article_id).await?;
            println!("removed {}", article_id);
        }
        Commands::Saved => {
            for article in store.saved_articles().await? {
                println!("{}/{}  {}", article.edition_id, article.id, article.title);
            }
        }
        Commands::Purge => {
            let deleted = store.db().purge_expired_documents().await?;
            println!("purged {} expired cache entries", deleted);
        }
    }

    Ok(())
}
