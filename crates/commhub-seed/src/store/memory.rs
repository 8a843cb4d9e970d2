//! In-process store for tests and dry runs.

use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use commhub_core::{
    Booking, Business, Event, Follow, Performer, PlatformProfile, Rating, Review, Subject, Tenant,
    UpsertOutcome, User, Venue, Workspace,
};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{SeedStore, StoreError, TableCounts};

#[derive(Debug, Default)]
struct Tables {
    tenants: Vec<Tenant>,
    users: Vec<User>,
    workspaces: Vec<Workspace>,
    platform_profiles: BTreeMap<String, PlatformProfile>,
    businesses: Vec<Business>,
    venues: Vec<Venue>,
    performers: Vec<Performer>,
    events: Vec<Event>,
    bookings: Vec<Booking>,
    follows: Vec<Follow>,
    follow_keys: HashSet<(Uuid, Subject)>,
    reviews: Vec<Review>,
    ratings: Vec<Rating>,
}

impl Tables {
    fn require(
        &self,
        present: bool,
        entity: &'static str,
        field: &'static str,
        id: Uuid,
    ) -> Result<(), StoreError> {
        if present {
            Ok(())
        } else {
            Err(StoreError::ForeignKey { entity, field, id })
        }
    }

    fn unique(&self, taken: bool, entity: &'static str, id: Uuid) -> Result<(), StoreError> {
        if taken {
            Err(StoreError::Duplicate {
                entity,
                key: id.to_string(),
            })
        } else {
            Ok(())
        }
    }

    fn has_tenant(&self, id: Uuid) -> bool {
        self.tenants.iter().any(|t| t.id == id)
    }

    fn has_user(&self, id: Uuid) -> bool {
        self.users.iter().any(|u| u.id == id)
    }

    fn has_workspace(&self, id: Uuid) -> bool {
        self.workspaces.iter().any(|w| w.id == id)
    }

    fn has_subject(&self, subject: &Subject) -> bool {
        match subject {
            Subject::Performer(id) => self.performers.iter().any(|p| p.id == *id),
            Subject::Venue(id) => self.venues.iter().any(|v| v.id == *id),
            Subject::Business(id) => self.businesses.iter().any(|b| b.id == *id),
            Subject::Event(id) => self.events.iter().any(|e| e.id == *id),
        }
    }

    fn require_subject(&self, entity: &'static str, subject: &Subject) -> Result<(), StoreError> {
        self.require(self.has_subject(subject), entity, "subject_id", subject.id())
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SeedStore for MemoryStore {
    async fn first_or_create_tenant(&self, tenant: Tenant) -> Result<(Tenant, bool), StoreError> {
        let mut t = self.tables.write().await;
        if let Some(existing) = t.tenants.iter().find(|row| row.slug == tenant.slug) {
            return Ok((existing.clone(), false));
        }
        t.tenants.push(tenant.clone());
        Ok((tenant, true))
    }

    async fn first_or_create_user(&self, user: User) -> Result<(User, bool), StoreError> {
        let mut t = self.tables.write().await;
        if let Some(existing) = t
            .users
            .iter()
            .find(|row| row.email.eq_ignore_ascii_case(&user.email))
        {
            return Ok((existing.clone(), false));
        }
        t.require(t.has_tenant(user.tenant_id), "user", "tenant_id", user.tenant_id)?;
        t.users.push(user.clone());
        Ok((user, true))
    }

    async fn first_or_create_workspace(
        &self,
        workspace: Workspace,
    ) -> Result<(Workspace, bool), StoreError> {
        let mut t = self.tables.write().await;
        if let Some(existing) = t.workspaces.iter().find(|row| row.slug == workspace.slug) {
            return Ok((existing.clone(), false));
        }
        t.require(
            t.has_tenant(workspace.tenant_id),
            "workspace",
            "tenant_id",
            workspace.tenant_id,
        )?;
        t.require(
            t.has_user(workspace.owner_id),
            "workspace",
            "owner_id",
            workspace.owner_id,
        )?;
        t.workspaces.push(workspace.clone());
        Ok((workspace, true))
    }

    async fn upsert_platform_profile(
        &self,
        profile: &PlatformProfile,
    ) -> Result<UpsertOutcome, StoreError> {
        profile.validate()?;
        let mut t = self.tables.write().await;
        match t
            .platform_profiles
            .insert(profile.slug.clone(), profile.clone())
        {
            Some(_) => Ok(UpsertOutcome::Updated),
            None => Ok(UpsertOutcome::Inserted),
        }
    }

    async fn platform_profiles(&self) -> Result<Vec<PlatformProfile>, StoreError> {
        let t = self.tables.read().await;
        Ok(t.platform_profiles.values().cloned().collect())
    }

    async fn insert_business(&self, business: &Business) -> Result<(), StoreError> {
        let mut t = self.tables.write().await;
        t.require(
            t.has_workspace(business.workspace_id),
            "business",
            "workspace_id",
            business.workspace_id,
        )?;
        t.unique(
            t.businesses.iter().any(|b| b.id == business.id),
            "business",
            business.id,
        )?;
        t.businesses.push(business.clone());
        Ok(())
    }

    async fn insert_venue(&self, venue: &Venue) -> Result<(), StoreError> {
        let mut t = self.tables.write().await;
        t.require(
            t.has_workspace(venue.workspace_id),
            "venue",
            "workspace_id",
            venue.workspace_id,
        )?;
        t.unique(t.venues.iter().any(|v| v.id == venue.id), "venue", venue.id)?;
        t.venues.push(venue.clone());
        Ok(())
    }

    async fn insert_performer(&self, performer: &Performer) -> Result<(), StoreError> {
        let mut t = self.tables.write().await;
        t.require(
            t.has_workspace(performer.workspace_id),
            "performer",
            "workspace_id",
            performer.workspace_id,
        )?;
        t.unique(
            t.performers.iter().any(|p| p.id == performer.id),
            "performer",
            performer.id,
        )?;
        t.performers.push(performer.clone());
        Ok(())
    }

    async fn insert_event(&self, event: &Event) -> Result<(), StoreError> {
        let mut t = self.tables.write().await;
        t.require(
            t.has_workspace(event.workspace_id),
            "event",
            "workspace_id",
            event.workspace_id,
        )?;
        t.require(
            t.venues.iter().any(|v| v.id == event.venue_id),
            "event",
            "venue_id",
            event.venue_id,
        )?;
        if let Some(performer_id) = event.performer_id {
            t.require(
                t.performers.iter().any(|p| p.id == performer_id),
                "event",
                "performer_id",
                performer_id,
            )?;
        }
        t.unique(t.events.iter().any(|e| e.id == event.id), "event", event.id)?;
        t.events.push(event.clone());
        Ok(())
    }

    async fn insert_booking(&self, booking: &Booking) -> Result<(), StoreError> {
        let mut t = self.tables.write().await;
        t.require(
            t.events.iter().any(|e| e.id == booking.event_id),
            "booking",
            "event_id",
            booking.event_id,
        )?;
        t.require(t.has_user(booking.user_id), "booking", "user_id", booking.user_id)?;
        t.unique(
            t.bookings.iter().any(|b| b.id == booking.id),
            "booking",
            booking.id,
        )?;
        if t
            .bookings
            .iter()
            .any(|b| b.booking_number == booking.booking_number)
        {
            return Err(StoreError::Duplicate {
                entity: "booking",
                key: booking.booking_number.clone(),
            });
        }
        t.bookings.push(booking.clone());
        Ok(())
    }

    async fn insert_follow(&self, follow: &Follow) -> Result<bool, StoreError> {
        let mut t = self.tables.write().await;
        t.require(t.has_user(follow.user_id), "follow", "user_id", follow.user_id)?;
        t.require_subject("follow", &follow.subject)?;
        t.unique(t.follows.iter().any(|f| f.id == follow.id), "follow", follow.id)?;
        if !t.follow_keys.insert((follow.user_id, follow.subject)) {
            return Ok(false);
        }
        t.follows.push(follow.clone());
        Ok(true)
    }

    async fn insert_review(&self, review: &Review) -> Result<(), StoreError> {
        let mut t = self.tables.write().await;
        t.require(t.has_user(review.user_id), "review", "user_id", review.user_id)?;
        t.require_subject("review", &review.subject)?;
        t.unique(t.reviews.iter().any(|r| r.id == review.id), "review", review.id)?;
        t.reviews.push(review.clone());
        Ok(())
    }

    async fn insert_rating(&self, rating: &Rating) -> Result<(), StoreError> {
        let mut t = self.tables.write().await;
        t.require(t.has_user(rating.user_id), "rating", "user_id", rating.user_id)?;
        t.require_subject("rating", &rating.subject)?;
        t.unique(t.ratings.iter().any(|r| r.id == rating.id), "rating", rating.id)?;
        t.ratings.push(rating.clone());
        Ok(())
    }

    async fn update_performer(&self, performer: &Performer) -> Result<bool, StoreError> {
        let mut t = self.tables.write().await;
        t.require(
            t.has_workspace(performer.workspace_id),
            "performer",
            "workspace_id",
            performer.workspace_id,
        )?;
        match t.performers.iter_mut().find(|p| p.id == performer.id) {
            Some(existing) => {
                *existing = performer.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn get_performer(&self, id: Uuid) -> Result<Option<Performer>, StoreError> {
        let t = self.tables.read().await;
        Ok(t.performers.iter().find(|p| p.id == id).cloned())
    }

    async fn users(&self) -> Result<Vec<User>, StoreError> {
        Ok(self.tables.read().await.users.clone())
    }

    async fn workspaces(&self) -> Result<Vec<Workspace>, StoreError> {
        Ok(self.tables.read().await.workspaces.clone())
    }

    async fn businesses(&self) -> Result<Vec<Business>, StoreError> {
        Ok(self.tables.read().await.businesses.clone())
    }

    async fn venues(&self) -> Result<Vec<Venue>, StoreError> {
        Ok(self.tables.read().await.venues.clone())
    }

    async fn performers(&self) -> Result<Vec<Performer>, StoreError> {
        let mut rows = self.tables.read().await.performers.clone();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn events(&self) -> Result<Vec<Event>, StoreError> {
        Ok(self.tables.read().await.events.clone())
    }

    async fn counts(&self) -> Result<TableCounts, StoreError> {
        let t = self.tables.read().await;
        Ok(TableCounts {
            tenants: t.tenants.len(),
            users: t.users.len(),
            workspaces: t.workspaces.len(),
            platform_profiles: t.platform_profiles.len(),
            businesses: t.businesses.len(),
            venues: t.venues.len(),
            performers: t.performers.len(),
            events: t.events.len(),
            bookings: t.bookings.len(),
            follows: t.follows.len(),
            reviews: t.reviews.len(),
            ratings: t.ratings.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use commhub_core::{natural_id, ProfileError};

    use crate::factory::Factory;

    fn tenant(slug: &str) -> Tenant {
        Tenant {
            id: natural_id("tenant", slug),
            slug: slug.to_string(),
            name: slug.to_uppercase(),
            created_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn first_or_create_keeps_the_original_row() {
        let store = MemoryStore::new();
        let (first, created) = store.first_or_create_tenant(tenant("demo")).await.unwrap();
        assert!(created);

        let mut renamed = tenant("demo");
        renamed.name = "Renamed".to_string();
        let (second, created) = store.first_or_create_tenant(renamed).await.unwrap();
        assert!(!created);
        assert_eq!(second, first);
        assert_eq!(store.counts().await.unwrap().tenants, 1);
    }

    #[tokio::test]
    async fn reinserting_an_id_is_a_duplicate() {
        let store = MemoryStore::new();
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let (tenant, _) = store.first_or_create_tenant(tenant("demo")).await.unwrap();
        let (owner, _) = store
            .first_or_create_user(User {
                id: natural_id("user", "owner@example.com"),
                tenant_id: tenant.id,
                email: "owner@example.com".to_string(),
                name: "Owner".to_string(),
                created_at: now,
            })
            .await
            .unwrap();
        let (workspace, _) = store
            .first_or_create_workspace(Workspace {
                id: natural_id("workspace", "demo-main"),
                tenant_id: tenant.id,
                owner_id: owner.id,
                slug: "demo-main".to_string(),
                name: "Demo".to_string(),
                created_at: now,
            })
            .await
            .unwrap();

        let mut factory = Factory::new(42, now);
        let venue = factory.venue(workspace.id);
        let business = factory.business(workspace.id);
        store.insert_venue(&venue).await.unwrap();
        store.insert_business(&business).await.unwrap();
        let event = factory.event(&venue, None);
        store.insert_event(&event).await.unwrap();
        let review = factory.review(owner.id, Subject::Venue(venue.id));
        let rating = factory.rating(owner.id, Subject::Event(event.id));
        store.insert_review(&review).await.unwrap();
        store.insert_rating(&rating).await.unwrap();

        let mut renamed = venue.clone();
        renamed.name = "Another Room".to_string();
        let err = store.insert_venue(&renamed).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Duplicate { entity: "venue", ref key } if *key == venue.id.to_string()
        ));
        assert!(matches!(
            store.insert_business(&business).await.unwrap_err(),
            StoreError::Duplicate { entity: "business", .. }
        ));
        assert!(matches!(
            store.insert_event(&event).await.unwrap_err(),
            StoreError::Duplicate { entity: "event", .. }
        ));
        assert!(matches!(
            store.insert_review(&review).await.unwrap_err(),
            StoreError::Duplicate { entity: "review", .. }
        ));
        assert!(matches!(
            store.insert_rating(&rating).await.unwrap_err(),
            StoreError::Duplicate { entity: "rating", .. }
        ));

        let counts = store.counts().await.unwrap();
        assert_eq!((counts.venues, counts.businesses, counts.events), (1, 1, 1));
        assert_eq!((counts.reviews, counts.ratings), (1, 1));
    }

    #[tokio::test]
    async fn oversized_profile_sample_sizes_are_refused() {
        let store = MemoryStore::new();
        let mut profile = commhub_classifier::ProfileTable::builtin()
            .unwrap()
            .get("wordpress")
            .cloned()
            .unwrap();
        profile.sample_size = u32::MAX;
        assert!(matches!(
            store.upsert_platform_profile(&profile).await.unwrap_err(),
            StoreError::InvalidProfile(ProfileError::SampleSizeTooLarge { .. })
        ));
        assert_eq!(store.counts().await.unwrap().platform_profiles, 0);
    }

    #[tokio::test]
    async fn dangling_foreign_keys_are_rejected() {
        let store = MemoryStore::new();
        let user = User {
            id: natural_id("user", "a@example.com"),
            tenant_id: natural_id("tenant", "nowhere"),
            email: "a@example.com".to_string(),
            name: "A".to_string(),
            created_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
        };
        let err = store.first_or_create_user(user).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::ForeignKey {
                entity: "user",
                field: "tenant_id",
                ..
            }
        ));
    }
}
