//! Runs seeders in dependency order and reports what each one did.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use commhub_core::PlatformProfile;
use serde::Serialize;
use tokio::fs;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use crate::factory::Factory;
use crate::seeders::{
    BookingSeeder, BusinessSeeder, EngagementSeeder, EventSeeder, FoundationSeeder,
    PerformerSeeder, PlatformProfilesSeeder, Seeder, VenueSeeder,
};
use crate::store::{SeedStore, TableCounts};
use crate::{SeedCounts, SeedError};

/// State shared by the seeders of one run.
pub struct SeedContext<'a> {
    pub store: &'a dyn SeedStore,
    pub factory: Factory,
    pub counts: SeedCounts,
}

impl<'a> SeedContext<'a> {
    pub fn new(store: &'a dyn SeedStore, factory: Factory, counts: SeedCounts) -> Self {
        Self {
            store,
            factory,
            counts,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Completed,
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepReport {
    pub seeder: String,
    pub status: StepStatus,
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub note: Option<String>,
}

impl StepReport {
    pub fn completed(seeder: &str) -> Self {
        Self {
            seeder: seeder.to_string(),
            status: StepStatus::Completed,
            inserted: 0,
            updated: 0,
            unchanged: 0,
            note: None,
        }
    }

    pub fn skipped(seeder: &str, note: &str) -> Self {
        Self {
            status: StepStatus::Skipped,
            note: Some(note.to_string()),
            ..Self::completed(seeder)
        }
    }

    pub fn is_skipped(&self) -> bool {
        self.status == StepStatus::Skipped
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SeedRunSummary {
    pub run_id: Uuid,
    pub seed: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub steps: Vec<StepReport>,
    pub counts: TableCounts,
}

impl SeedRunSummary {
    pub fn step(&self, seeder: &str) -> Option<&StepReport> {
        self.steps.iter().find(|s| s.seeder == seeder)
    }

    pub fn brief_markdown(&self) -> String {
        let steps = self
            .steps
            .iter()
            .map(|s| {
                let status = match s.status {
                    StepStatus::Completed => "completed",
                    StepStatus::Skipped => "skipped",
                };
                let note = s
                    .note
                    .as_deref()
                    .map(|n| format!(" ({n})"))
                    .unwrap_or_default();
                format!(
                    "| {} | {}{} | {} | {} | {} |",
                    s.seeder, status, note, s.inserted, s.updated, s.unchanged
                )
            })
            .collect::<Vec<_>>()
            .join("\n");
        let c = &self.counts;
        format!(
            "# CommHub Seed Brief\n\n- Run ID: `{}`\n- Seed: {}\n- Started: {}\n- Finished: {}\n\n\
             ## Steps\n\n| seeder | status | inserted | updated | unchanged |\n|---|---|---|---|---|\n{}\n\n\
             ## Table Counts\n\n- tenants: {}\n- users: {}\n- workspaces: {}\n- platform_profiles: {}\n\
             - venues: {}\n- performers: {}\n- businesses: {}\n- events: {}\n- bookings: {}\n\
             - follows: {}\n- reviews: {}\n- ratings: {}\n",
            self.run_id,
            self.seed,
            self.started_at,
            self.finished_at,
            steps,
            c.tenants,
            c.users,
            c.workspaces,
            c.platform_profiles,
            c.venues,
            c.performers,
            c.businesses,
            c.events,
            c.bookings,
            c.follows,
            c.reviews,
            c.ratings,
        )
    }

    /// Writes `seed_summary.json` and `seed_brief.md` under `<dir>/<run_id>/`.
    pub async fn write_seed_report(&self, dir: &Path) -> Result<PathBuf> {
        let run_dir = dir.join(self.run_id.to_string());
        fs::create_dir_all(&run_dir)
            .await
            .with_context(|| format!("creating {}", run_dir.display()))?;

        let json = serde_json::to_vec_pretty(self).context("serializing seed summary")?;
        fs::write(run_dir.join("seed_summary.json"), json)
            .await
            .context("writing seed_summary.json")?;
        fs::write(run_dir.join("seed_brief.md"), self.brief_markdown())
            .await
            .context("writing seed_brief.md")?;
        Ok(run_dir)
    }
}

pub struct SeedOrchestrator {
    seeders: Vec<Box<dyn Seeder>>,
}

impl SeedOrchestrator {
    pub fn new(seeders: Vec<Box<dyn Seeder>>) -> Self {
        Self { seeders }
    }

    /// Foundation first, then the profile registry, then every dependent
    /// aggregate after its parents.
    pub fn standard(profiles: Vec<PlatformProfile>) -> Self {
        Self::new(vec![
            Box::<FoundationSeeder>::default(),
            Box::new(PlatformProfilesSeeder::new(profiles)),
            Box::new(VenueSeeder),
            Box::new(PerformerSeeder),
            Box::new(BusinessSeeder),
            Box::new(EventSeeder),
            Box::new(BookingSeeder),
            Box::new(EngagementSeeder),
        ])
    }

    pub fn seeder_names(&self) -> Vec<&'static str> {
        self.seeders.iter().map(|s| s.name()).collect()
    }

    /// Soft skips are recorded and the run continues; a hard error stops it.
    pub async fn run(
        &self,
        store: &dyn SeedStore,
        seed: u64,
        counts: SeedCounts,
    ) -> Result<SeedRunSummary, SeedError> {
        let started_at = Utc::now();
        let run_id = Uuid::new_v4();
        let prior = store.counts().await?;
        let factory = Factory::for_run(seed, prior.generated_rows(), started_at);
        let mut ctx = SeedContext::new(store, factory, counts);
        let mut steps = Vec::with_capacity(self.seeders.len());

        for seeder in &self.seeders {
            let span = info_span!("seeder", name = seeder.name(), %run_id);
            let report = seeder.run(&mut ctx).instrument(span).await?;
            info!(
                seeder = seeder.name(),
                skipped = report.is_skipped(),
                inserted = report.inserted,
                updated = report.updated,
                unchanged = report.unchanged,
                "seeder finished"
            );
            steps.push(report);
        }

        Ok(SeedRunSummary {
            run_id,
            seed,
            started_at,
            finished_at: Utc::now(),
            steps,
            counts: store.counts().await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn small_counts() -> SeedCounts {
        SeedCounts {
            members_per_tenant: 2,
            venues: 4,
            performers: 6,
            businesses: 3,
            events: 8,
            bookings: 10,
            follows: 12,
            reviews: 5,
            ratings: 5,
        }
    }

    #[test]
    fn standard_order_puts_parents_first() {
        let names = SeedOrchestrator::standard(Vec::new()).seeder_names();
        assert_eq!(
            names,
            vec![
                "foundation",
                "platform_profiles",
                "venues",
                "performers",
                "businesses",
                "events",
                "bookings",
                "engagement"
            ]
        );
    }

    #[tokio::test]
    async fn report_files_are_written() {
        let store = MemoryStore::new();
        let summary = SeedOrchestrator::standard(Vec::new())
            .run(&store, 1, small_counts())
            .await
            .unwrap();
        let dir = tempfile::tempdir().unwrap();
        let run_dir = summary.write_seed_report(dir.path()).await.unwrap();

        let json: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(run_dir.join("seed_summary.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(json["steps"].as_array().unwrap().len(), 8);
        assert_eq!(json["counts"]["bookings"], 10);

        let brief = std::fs::read_to_string(run_dir.join("seed_brief.md")).unwrap();
        assert!(brief.contains("# CommHub Seed Brief"));
        assert!(brief.contains("| bookings | completed |"));
    }

    #[test]
    fn skipped_steps_keep_their_note() {
        let step = StepReport::skipped("venues", "no workspaces");
        assert!(step.is_skipped());
        assert_eq!(step.note.as_deref(), Some("no workspaces"));
        assert_eq!(step.inserted, 0);
    }
}
