use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use commhub_classifier::{evidence_from_page, probe};
use commhub_fetch::{HttpClientConfig, HttpFetcher};
use commhub_seed::{connect_store, load_profile_table, run_seed, PgStore, SeedConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "commhub-cli")]
#[command(about = "CommHub seeding, site classification and admin server")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Seed demo data into DATABASE_URL (or an in-memory store) and write a run report.
    Seed {
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long)]
        report_dir: Option<PathBuf>,
    },
    /// Classify a page from local evidence without fetching it.
    Classify {
        #[arg(long)]
        url: String,
        #[arg(long)]
        html_file: Option<PathBuf>,
        #[arg(long)]
        server: Option<String>,
    },
    /// Fetch a live URL and classify it.
    Probe { url: String },
    /// Print the loaded platform profile table.
    Profiles,
    Migrate,
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let mut config = SeedConfig::from_env();

    match cli.command.unwrap_or(Commands::Seed {
        seed: None,
        report_dir: None,
    }) {
        Commands::Seed { seed, report_dir } => {
            if let Some(seed) = seed {
                config.seed = seed;
            }
            if let Some(dir) = report_dir {
                config.reports_dir = dir;
            }
            let store = connect_store(&config).await?;
            let summary = run_seed(store.as_ref(), &config).await?;
            println!(
                "seed complete: run_id={} seed={} performers={} bookings={} reports={}",
                summary.run_id,
                summary.seed,
                summary.counts.performers,
                summary.counts.bookings,
                config.reports_dir.display()
            );
        }
        Commands::Classify {
            url,
            html_file,
            server,
        } => {
            let html = match html_file {
                Some(path) => tokio::fs::read_to_string(&path)
                    .await
                    .with_context(|| format!("reading {}", path.display()))?,
                None => String::new(),
            };
            let table = load_profile_table(&config).await?;
            let evidence = evidence_from_page(&url, &html, server.as_deref());
            let report = table.classify(&evidence).to_report();
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Probe { url } => {
            let table = load_profile_table(&config).await?;
            let http = HttpFetcher::new(HttpClientConfig::from_env())?;
            let report = probe(&http, &table, &url).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Profiles => {
            let table = load_profile_table(&config).await?;
            for profile in table.profiles() {
                println!(
                    "{:<20} {:<12} {:<10} confidence={:.2} samples={}",
                    profile.slug,
                    profile.category.as_str(),
                    profile.best_fetch_method.as_str(),
                    profile.confidence_score,
                    profile.sample_size
                );
            }
        }
        Commands::Migrate => {
            let url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL must be set to run migrations")?;
            let store = PgStore::connect(url)
                .await
                .context("connecting to DATABASE_URL")?;
            store.migrate().await.context("running migrations")?;
            info!("migrations applied");
        }
        Commands::Serve => {
            commhub_web::serve_from_env().await?;
        }
    }

    Ok(())
}
