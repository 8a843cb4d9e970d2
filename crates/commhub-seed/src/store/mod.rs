//! Persistence seam for seeding and the admin resource.

use async_trait::async_trait;
use commhub_core::{
    Booking, Business, Event, Follow, Performer, PlatformProfile, ProfileError, Rating, Review,
    Tenant, UpsertOutcome, User, Venue, Workspace,
};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{entity}.{field} references missing row {id}")]
    ForeignKey {
        entity: &'static str,
        field: &'static str,
        id: Uuid,
    },
    #[error("{entity} with key {key} already exists")]
    Duplicate { entity: &'static str, key: String },
    #[error(transparent)]
    InvalidProfile(#[from] ProfileError),
    #[error("stored row is unreadable: {0}")]
    Corrupt(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

/// Row counts per table, used for run summaries and idempotence checks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TableCounts {
    pub tenants: usize,
    pub users: usize,
    pub workspaces: usize,
    pub platform_profiles: usize,
    pub businesses: usize,
    pub venues: usize,
    pub performers: usize,
    pub events: usize,
    pub bookings: usize,
    pub follows: usize,
    pub reviews: usize,
    pub ratings: usize,
}

impl TableCounts {
    /// Rows written by the count-based seeders, which add on every run.
    pub fn generated_rows(&self) -> u64 {
        [
            self.businesses,
            self.venues,
            self.performers,
            self.events,
            self.bookings,
            self.follows,
            self.reviews,
            self.ratings,
        ]
        .iter()
        .map(|&n| n as u64)
        .sum()
    }
}

/// Storage operations the seeders and the admin screens rely on.
///
/// `first_or_create_*` return the stored row (which may predate the call) and
/// whether this call created it. Plain inserts must reject dangling foreign keys.
#[async_trait]
pub trait SeedStore: Send + Sync {
    async fn first_or_create_tenant(&self, tenant: Tenant) -> Result<(Tenant, bool), StoreError>;
    async fn first_or_create_user(&self, user: User) -> Result<(User, bool), StoreError>;
    async fn first_or_create_workspace(
        &self,
        workspace: Workspace,
    ) -> Result<(Workspace, bool), StoreError>;

    async fn upsert_platform_profile(
        &self,
        profile: &PlatformProfile,
    ) -> Result<UpsertOutcome, StoreError>;
    async fn platform_profiles(&self) -> Result<Vec<PlatformProfile>, StoreError>;

    async fn insert_business(&self, business: &Business) -> Result<(), StoreError>;
    async fn insert_venue(&self, venue: &Venue) -> Result<(), StoreError>;
    async fn insert_performer(&self, performer: &Performer) -> Result<(), StoreError>;
    async fn insert_event(&self, event: &Event) -> Result<(), StoreError>;
    async fn insert_booking(&self, booking: &Booking) -> Result<(), StoreError>;
    /// Returns false when the user already follows the subject.
    async fn insert_follow(&self, follow: &Follow) -> Result<bool, StoreError>;
    async fn insert_review(&self, review: &Review) -> Result<(), StoreError>;
    async fn insert_rating(&self, rating: &Rating) -> Result<(), StoreError>;

    /// Returns false when no performer has this id.
    async fn update_performer(&self, performer: &Performer) -> Result<bool, StoreError>;
    async fn get_performer(&self, id: Uuid) -> Result<Option<Performer>, StoreError>;

    async fn users(&self) -> Result<Vec<User>, StoreError>;
    async fn workspaces(&self) -> Result<Vec<Workspace>, StoreError>;
    async fn businesses(&self) -> Result<Vec<Business>, StoreError>;
    async fn venues(&self) -> Result<Vec<Venue>, StoreError>;
    /// All performers, newest first.
    async fn performers(&self) -> Result<Vec<Performer>, StoreError>;
    async fn events(&self) -> Result<Vec<Event>, StoreError>;

    async fn counts(&self) -> Result<TableCounts, StoreError>;
}
