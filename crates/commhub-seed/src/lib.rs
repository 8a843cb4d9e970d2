//! Demo data seeding: storage seam, factories, seeders and the orchestrator
//! that runs them in foreign-key order.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use commhub_classifier::{ClassifierError, ProfileTable};
use thiserror::Error;
use tracing::info;

pub mod factory;
pub mod orchestrator;
pub mod seeders;
pub mod store;

pub use factory::Factory;
pub use orchestrator::{SeedContext, SeedOrchestrator, SeedRunSummary, StepReport, StepStatus};
pub use seeders::Seeder;
pub use store::{MemoryStore, PgStore, SeedStore, StoreError, TableCounts};

pub const CRATE_NAME: &str = "commhub-seed";

#[derive(Debug, Error)]
pub enum SeedError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("{seeder} seeder requires {missing}; seed them first")]
    MissingPrerequisite {
        seeder: &'static str,
        missing: &'static str,
    },
    #[error(transparent)]
    Profiles(#[from] ClassifierError),
}

/// How many count-based rows each seeder adds per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedCounts {
    pub members_per_tenant: usize,
    pub venues: usize,
    pub performers: usize,
    pub businesses: usize,
    pub events: usize,
    pub bookings: usize,
    pub follows: usize,
    pub reviews: usize,
    pub ratings: usize,
}

impl Default for SeedCounts {
    fn default() -> Self {
        Self {
            members_per_tenant: 5,
            venues: 12,
            performers: 24,
            businesses: 15,
            events: 40,
            bookings: 80,
            follows: 60,
            reviews: 30,
            ratings: 45,
        }
    }
}

impl SeedCounts {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            members_per_tenant: env_count("COMMHUB_SEED_MEMBERS", d.members_per_tenant),
            venues: env_count("COMMHUB_SEED_VENUES", d.venues),
            performers: env_count("COMMHUB_SEED_PERFORMERS", d.performers),
            businesses: env_count("COMMHUB_SEED_BUSINESSES", d.businesses),
            events: env_count("COMMHUB_SEED_EVENTS", d.events),
            bookings: env_count("COMMHUB_SEED_BOOKINGS", d.bookings),
            follows: env_count("COMMHUB_SEED_FOLLOWS", d.follows),
            reviews: env_count("COMMHUB_SEED_REVIEWS", d.reviews),
            ratings: env_count("COMMHUB_SEED_RATINGS", d.ratings),
        }
    }
}

fn env_count(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[derive(Debug, Clone)]
pub struct SeedConfig {
    /// Absent means seed into an in-process store.
    pub database_url: Option<String>,
    pub seed: u64,
    pub counts: SeedCounts,
    pub reports_dir: PathBuf,
    /// YAML file replacing the builtin platform profile table.
    pub profiles_file: Option<PathBuf>,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            seed: 42,
            counts: SeedCounts::default(),
            reports_dir: PathBuf::from("./reports"),
            profiles_file: None,
        }
    }
}

impl SeedConfig {
    pub fn from_env() -> Self {
        Self {
            database_url: std::env::var("DATABASE_URL")
                .ok()
                .filter(|v| !v.trim().is_empty()),
            seed: std::env::var("COMMHUB_SEED")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(42),
            counts: SeedCounts::from_env(),
            reports_dir: std::env::var("COMMHUB_REPORTS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./reports")),
            profiles_file: std::env::var("COMMHUB_PROFILES_FILE").ok().map(PathBuf::from),
        }
    }
}

/// Open the configured store, applying migrations when it is Postgres.
pub async fn connect_store(config: &SeedConfig) -> Result<Arc<dyn SeedStore>> {
    match &config.database_url {
        Some(url) => {
            let store = PgStore::connect(url)
                .await
                .context("connecting to DATABASE_URL")?;
            store.migrate().await.context("running migrations")?;
            Ok(Arc::new(store))
        }
        None => {
            info!("DATABASE_URL not set; using in-memory store");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

/// The builtin profile table, or the one in `config.profiles_file`.
pub async fn load_profile_table(config: &SeedConfig) -> Result<ProfileTable> {
    match &config.profiles_file {
        Some(path) => {
            let text = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("reading {}", path.display()))?;
            ProfileTable::from_yaml_str(&text)
                .with_context(|| format!("loading platform profiles from {}", path.display()))
        }
        None => ProfileTable::builtin().context("loading builtin platform profiles"),
    }
}

/// Seed `store` with the standard sequence and write the run report.
pub async fn run_seed(store: &dyn SeedStore, config: &SeedConfig) -> Result<SeedRunSummary> {
    let table = load_profile_table(config).await?;
    let orchestrator = SeedOrchestrator::standard(table.profiles().cloned().collect());
    let summary = orchestrator.run(store, config.seed, config.counts).await?;
    let dir = summary.write_seed_report(&config.reports_dir).await?;
    info!(run_id = %summary.run_id, reports_dir = %dir.display(), "seed run finished");
    Ok(summary)
}
