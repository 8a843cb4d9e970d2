//! The individual seeding steps.

use std::collections::HashMap;

use async_trait::async_trait;
use commhub_core::{natural_id, PlatformProfile, Subject, Tenant, UpsertOutcome, User, Workspace};
use tracing::{info, warn};
use uuid::Uuid;

use crate::orchestrator::{SeedContext, StepReport};
use crate::SeedError;

#[async_trait]
pub trait Seeder: Send + Sync {
    fn name(&self) -> &'static str;
    async fn run(&self, ctx: &mut SeedContext<'_>) -> Result<StepReport, SeedError>;
}

/// Tenants, their users and one workspace each. Keyed by slug and email, so
/// re-running never duplicates rows.
#[derive(Debug, Clone)]
pub struct FoundationSeeder {
    tenants: Vec<(String, String)>,
}

pub const DEMO_TENANTS: &[(&str, &str)] = &[
    ("commhub-demo", "CommHub Demo"),
    ("riverside", "Riverside Community Hub"),
    ("old-town", "Old Town Arts District"),
];

impl Default for FoundationSeeder {
    fn default() -> Self {
        Self::new(
            DEMO_TENANTS
                .iter()
                .map(|(slug, name)| (slug.to_string(), name.to_string()))
                .collect(),
        )
    }
}

impl FoundationSeeder {
    pub fn new(tenants: Vec<(String, String)>) -> Self {
        Self { tenants }
    }
}

fn tally(report: &mut StepReport, created: bool) {
    if created {
        report.inserted += 1;
    } else {
        report.unchanged += 1;
    }
}

#[async_trait]
impl Seeder for FoundationSeeder {
    fn name(&self) -> &'static str {
        "foundation"
    }

    async fn run(&self, ctx: &mut SeedContext<'_>) -> Result<StepReport, SeedError> {
        let mut report = StepReport::completed(self.name());
        let now = ctx.factory.now();
        for (slug, name) in &self.tenants {
            let (tenant, created) = ctx
                .store
                .first_or_create_tenant(Tenant {
                    id: natural_id("tenant", slug),
                    slug: slug.clone(),
                    name: name.clone(),
                    created_at: now,
                })
                .await?;
            tally(&mut report, created);

            let admin_email = format!("admin@{slug}.commhub.test");
            let (admin, created) = ctx
                .store
                .first_or_create_user(User {
                    id: natural_id("user", &admin_email),
                    tenant_id: tenant.id,
                    email: admin_email,
                    name: format!("{} Admin", tenant.name),
                    created_at: now,
                })
                .await?;
            tally(&mut report, created);

            for i in 1..=ctx.counts.members_per_tenant {
                let email = format!("member{i}@{slug}.commhub.test");
                let (_, created) = ctx
                    .store
                    .first_or_create_user(User {
                        id: natural_id("user", &email),
                        tenant_id: tenant.id,
                        email,
                        name: format!("Member {i}"),
                        created_at: now,
                    })
                    .await?;
                tally(&mut report, created);
            }

            let workspace_slug = format!("{slug}-hub");
            let (_, created) = ctx
                .store
                .first_or_create_workspace(Workspace {
                    id: natural_id("workspace", &workspace_slug),
                    tenant_id: tenant.id,
                    owner_id: admin.id,
                    slug: workspace_slug,
                    name: format!("{} Hub", tenant.name),
                    created_at: now,
                })
                .await?;
            tally(&mut report, created);
        }
        Ok(report)
    }
}

/// Upserts the platform profile registry by slug.
#[derive(Debug, Clone)]
pub struct PlatformProfilesSeeder {
    profiles: Vec<PlatformProfile>,
}

impl PlatformProfilesSeeder {
    pub fn new(profiles: Vec<PlatformProfile>) -> Self {
        Self { profiles }
    }
}

#[async_trait]
impl Seeder for PlatformProfilesSeeder {
    fn name(&self) -> &'static str {
        "platform_profiles"
    }

    async fn run(&self, ctx: &mut SeedContext<'_>) -> Result<StepReport, SeedError> {
        let mut report = StepReport::completed(self.name());
        for profile in &self.profiles {
            match ctx.store.upsert_platform_profile(profile).await? {
                UpsertOutcome::Inserted => report.inserted += 1,
                UpsertOutcome::Updated => report.updated += 1,
            }
        }
        Ok(report)
    }
}

async fn workspace_ids(
    ctx: &SeedContext<'_>,
    seeder: &'static str,
) -> Result<Option<Vec<Uuid>>, SeedError> {
    let ids = ctx
        .store
        .workspaces()
        .await?
        .into_iter()
        .map(|w| w.id)
        .collect::<Vec<_>>();
    if ids.is_empty() {
        warn!(seeder, "no workspaces found; run the foundation seeder first");
        return Ok(None);
    }
    Ok(Some(ids))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct VenueSeeder;

#[async_trait]
impl Seeder for VenueSeeder {
    fn name(&self) -> &'static str {
        "venues"
    }

    async fn run(&self, ctx: &mut SeedContext<'_>) -> Result<StepReport, SeedError> {
        let Some(workspaces) = workspace_ids(ctx, self.name()).await? else {
            return Ok(StepReport::skipped(self.name(), "no workspaces"));
        };
        let mut report = StepReport::completed(self.name());
        for i in 0..ctx.counts.venues {
            let venue = ctx.factory.venue(workspaces[i % workspaces.len()]);
            ctx.store.insert_venue(&venue).await?;
            report.inserted += 1;
        }
        Ok(report)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PerformerSeeder;

#[async_trait]
impl Seeder for PerformerSeeder {
    fn name(&self) -> &'static str {
        "performers"
    }

    async fn run(&self, ctx: &mut SeedContext<'_>) -> Result<StepReport, SeedError> {
        let Some(workspaces) = workspace_ids(ctx, self.name()).await? else {
            return Ok(StepReport::skipped(self.name(), "no workspaces"));
        };
        let mut report = StepReport::completed(self.name());
        for i in 0..ctx.counts.performers {
            let performer = ctx.factory.performer(workspaces[i % workspaces.len()]);
            ctx.store.insert_performer(&performer).await?;
            report.inserted += 1;
        }
        Ok(report)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BusinessSeeder;

#[async_trait]
impl Seeder for BusinessSeeder {
    fn name(&self) -> &'static str {
        "businesses"
    }

    async fn run(&self, ctx: &mut SeedContext<'_>) -> Result<StepReport, SeedError> {
        let Some(workspaces) = workspace_ids(ctx, self.name()).await? else {
            return Ok(StepReport::skipped(self.name(), "no workspaces"));
        };
        let mut report = StepReport::completed(self.name());
        for i in 0..ctx.counts.businesses {
            let business = ctx.factory.business(workspaces[i % workspaces.len()]);
            ctx.store.insert_business(&business).await?;
            report.inserted += 1;
        }
        Ok(report)
    }
}

/// Events at existing venues. Most get a headliner from the venue's workspace
/// when one exists.
#[derive(Debug, Clone, Copy, Default)]
pub struct EventSeeder;

#[async_trait]
impl Seeder for EventSeeder {
    fn name(&self) -> &'static str {
        "events"
    }

    async fn run(&self, ctx: &mut SeedContext<'_>) -> Result<StepReport, SeedError> {
        let venues = ctx.store.venues().await?;
        if venues.is_empty() {
            warn!(seeder = self.name(), "no venues found; skipping events");
            return Ok(StepReport::skipped(self.name(), "no venues"));
        }
        let performers = ctx.store.performers().await?;
        let mut report = StepReport::completed(self.name());
        for _ in 0..ctx.counts.events {
            let venue = &venues[ctx.factory.index(venues.len())];
            let local = performers
                .iter()
                .filter(|p| p.workspace_id == venue.workspace_id)
                .collect::<Vec<_>>();
            let headliner = if !local.is_empty() && ctx.factory.chance(0.8) {
                Some(local[ctx.factory.index(local.len())])
            } else {
                None
            };
            let event = ctx.factory.event(venue, headliner);
            ctx.store.insert_event(&event).await?;
            report.inserted += 1;
        }
        Ok(report)
    }
}

/// Bookings by tenant members for events in their tenant's workspaces.
/// Unlike the other count-based seeders, missing users or events abort the run.
#[derive(Debug, Clone, Copy, Default)]
pub struct BookingSeeder;

#[async_trait]
impl Seeder for BookingSeeder {
    fn name(&self) -> &'static str {
        "bookings"
    }

    async fn run(&self, ctx: &mut SeedContext<'_>) -> Result<StepReport, SeedError> {
        let users = ctx.store.users().await?;
        if users.is_empty() {
            return Err(SeedError::MissingPrerequisite {
                seeder: self.name(),
                missing: "users",
            });
        }
        let events = ctx.store.events().await?;
        if events.is_empty() {
            return Err(SeedError::MissingPrerequisite {
                seeder: self.name(),
                missing: "events",
            });
        }
        let tenant_of = ctx
            .store
            .workspaces()
            .await?
            .into_iter()
            .map(|w| (w.id, w.tenant_id))
            .collect::<HashMap<_, _>>();

        let mut report = StepReport::completed(self.name());
        for _ in 0..ctx.counts.bookings {
            let event = &events[ctx.factory.index(events.len())];
            let tenant = tenant_of.get(&event.workspace_id);
            let members = users
                .iter()
                .filter(|u| Some(&u.tenant_id) == tenant)
                .collect::<Vec<_>>();
            let user = if members.is_empty() {
                &users[ctx.factory.index(users.len())]
            } else {
                members[ctx.factory.index(members.len())]
            };
            let booking = ctx.factory.booking(event, user.id);
            ctx.store.insert_booking(&booking).await?;
            report.inserted += 1;
        }
        Ok(report)
    }
}

/// Follows, reviews and ratings spread over every kind of subject.
#[derive(Debug, Clone, Copy, Default)]
pub struct EngagementSeeder;

#[async_trait]
impl Seeder for EngagementSeeder {
    fn name(&self) -> &'static str {
        "engagement"
    }

    async fn run(&self, ctx: &mut SeedContext<'_>) -> Result<StepReport, SeedError> {
        let users = ctx.store.users().await?;
        if users.is_empty() {
            warn!(seeder = self.name(), "no users found; skipping engagement");
            return Ok(StepReport::skipped(self.name(), "no users"));
        }
        let mut subjects = Vec::new();
        subjects.extend(ctx.store.performers().await?.iter().map(|p| Subject::Performer(p.id)));
        subjects.extend(ctx.store.venues().await?.iter().map(|v| Subject::Venue(v.id)));
        subjects.extend(ctx.store.businesses().await?.iter().map(|b| Subject::Business(b.id)));
        subjects.extend(ctx.store.events().await?.iter().map(|e| Subject::Event(e.id)));
        if subjects.is_empty() {
            warn!(seeder = self.name(), "nothing to follow, review or rate; skipping");
            return Ok(StepReport::skipped(self.name(), "no subjects"));
        }

        let mut report = StepReport::completed(self.name());
        for _ in 0..ctx.counts.follows {
            let user = users[ctx.factory.index(users.len())].id;
            let subject = subjects[ctx.factory.index(subjects.len())];
            let follow = ctx.factory.follow(user, subject);
            tally(&mut report, ctx.store.insert_follow(&follow).await?);
        }
        for _ in 0..ctx.counts.reviews {
            let user = users[ctx.factory.index(users.len())].id;
            let subject = subjects[ctx.factory.index(subjects.len())];
            let review = ctx.factory.review(user, subject);
            ctx.store.insert_review(&review).await?;
            report.inserted += 1;
        }
        for _ in 0..ctx.counts.ratings {
            let user = users[ctx.factory.index(users.len())].id;
            let subject = subjects[ctx.factory.index(subjects.len())];
            let rating = ctx.factory.rating(user, subject);
            ctx.store.insert_rating(&rating).await?;
            report.inserted += 1;
        }
        if report.unchanged > 0 {
            info!(
                seeder = self.name(),
                duplicates = report.unchanged,
                "skipped follows that already existed"
            );
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, SeedStore, TableCounts};
    use crate::{Factory, SeedCounts};
    use chrono::{TimeZone, Utc};

    fn context(store: &MemoryStore) -> SeedContext<'_> {
        SeedContext::new(
            store,
            Factory::new(42, Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap()),
            SeedCounts {
                members_per_tenant: 2,
                venues: 3,
                performers: 4,
                businesses: 2,
                events: 5,
                bookings: 6,
                follows: 10,
                reviews: 3,
                ratings: 3,
            },
        )
    }

    #[tokio::test]
    async fn foundation_is_idempotent() {
        let store = MemoryStore::new();
        let mut ctx = context(&store);
        let first = FoundationSeeder::default().run(&mut ctx).await.unwrap();
        let before = store.counts().await.unwrap();
        let second = FoundationSeeder::default().run(&mut ctx).await.unwrap();
        let after = store.counts().await.unwrap();

        assert_eq!(before, after);
        assert_eq!(before.tenants, DEMO_TENANTS.len());
        assert_eq!(before.users, DEMO_TENANTS.len() * 3);
        assert_eq!(before.workspaces, DEMO_TENANTS.len());
        assert_eq!(second.inserted, 0);
        assert_eq!(second.unchanged, first.inserted);
    }

    #[tokio::test]
    async fn dependents_skip_without_parents() {
        let store = MemoryStore::new();
        let mut ctx = context(&store);
        let seeders: Vec<Box<dyn Seeder>> = vec![
            Box::new(VenueSeeder),
            Box::new(PerformerSeeder),
            Box::new(BusinessSeeder),
            Box::new(EventSeeder),
            Box::new(EngagementSeeder),
        ];
        for seeder in seeders {
            let report = seeder.run(&mut ctx).await.unwrap();
            assert!(report.is_skipped(), "{} should skip", seeder.name());
        }
        assert_eq!(store.counts().await.unwrap(), TableCounts::default());
    }

    #[tokio::test]
    async fn bookings_require_events() {
        let store = MemoryStore::new();
        let mut ctx = context(&store);
        FoundationSeeder::default().run(&mut ctx).await.unwrap();
        let err = BookingSeeder.run(&mut ctx).await.unwrap_err();
        assert!(matches!(
            err,
            SeedError::MissingPrerequisite {
                seeder: "bookings",
                missing: "events"
            }
        ));
    }

    #[tokio::test]
    async fn bookings_stay_inside_the_event_tenant() {
        let store = MemoryStore::new();
        let mut ctx = context(&store);
        FoundationSeeder::default().run(&mut ctx).await.unwrap();
        VenueSeeder.run(&mut ctx).await.unwrap();
        EventSeeder.run(&mut ctx).await.unwrap();
        let report = BookingSeeder.run(&mut ctx).await.unwrap();
        assert_eq!(report.inserted, 6);
        assert_eq!(store.counts().await.unwrap().bookings, 6);
    }
}
