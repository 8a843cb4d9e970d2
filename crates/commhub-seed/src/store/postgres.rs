//! Postgres-backed store.

use std::time::Duration;

use async_trait::async_trait;
use commhub_core::{
    Booking, Business, DetectionSignatures, Event, Follow, Performer, PlatformProfile,
    ProfileError, Rating, Review, Subject, SubjectKind, Tenant, UpsertOutcome, User, Venue,
    Workspace,
};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use tracing::info;
use uuid::Uuid;

use super::{SeedStore, StoreError, TableCounts};

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(10))
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        info!("database migrations applied");
        Ok(())
    }

    async fn subject_exists(&self, subject: &Subject) -> Result<bool, StoreError> {
        let sql = format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE id = $1)",
            subject_table(subject.kind())
        );
        let exists: bool = sqlx::query_scalar(&sql)
            .bind(subject.id())
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    async fn require_subject(
        &self,
        entity: &'static str,
        subject: &Subject,
    ) -> Result<(), StoreError> {
        if self.subject_exists(subject).await? {
            Ok(())
        } else {
            Err(StoreError::ForeignKey {
                entity,
                field: "subject_id",
                id: subject.id(),
            })
        }
    }
}

fn subject_table(kind: SubjectKind) -> &'static str {
    match kind {
        SubjectKind::Performer => "performers",
        SubjectKind::Venue => "venues",
        SubjectKind::Business => "businesses",
        SubjectKind::Event => "events",
    }
}

fn violates_primary_key(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => db.constraint().is_some_and(|c| c.ends_with("_pkey")),
        _ => false,
    }
}

/// Translate constraint violations into store errors. `fks` lists the
/// foreign-key columns of the insert so the violated one can be reported.
fn insert_error(
    entity: &'static str,
    key: &str,
    fks: &[(&'static str, Uuid)],
    err: sqlx::Error,
) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_foreign_key_violation() {
            let constraint = db.constraint().unwrap_or_default();
            let hit = fks
                .iter()
                .find(|(field, _)| constraint.contains(field))
                .or_else(|| fks.first());
            if let Some((field, id)) = hit {
                return StoreError::ForeignKey {
                    entity,
                    field: *field,
                    id: *id,
                };
            }
        }
        if db.is_unique_violation() {
            return StoreError::Duplicate {
                entity,
                key: key.to_string(),
            };
        }
    }
    StoreError::Database(err)
}

fn parse_column<T>(row: &PgRow, column: &str) -> Result<T, StoreError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let raw: String = row.try_get(column)?;
    raw.parse()
        .map_err(|err: T::Err| StoreError::Corrupt(format!("{column}: {err}")))
}

fn tenant_from_row(row: &PgRow) -> Result<Tenant, StoreError> {
    Ok(Tenant {
        id: row.try_get("id")?,
        slug: row.try_get("slug")?,
        name: row.try_get("name")?,
        created_at: row.try_get("created_at")?,
    })
}

fn user_from_row(row: &PgRow) -> Result<User, StoreError> {
    Ok(User {
        id: row.try_get("id")?,
        tenant_id: row.try_get("tenant_id")?,
        email: row.try_get("email")?,
        name: row.try_get("name")?,
        created_at: row.try_get("created_at")?,
    })
}

fn workspace_from_row(row: &PgRow) -> Result<Workspace, StoreError> {
    Ok(Workspace {
        id: row.try_get("id")?,
        tenant_id: row.try_get("tenant_id")?,
        owner_id: row.try_get("owner_id")?,
        slug: row.try_get("slug")?,
        name: row.try_get("name")?,
        created_at: row.try_get("created_at")?,
    })
}

fn profile_from_row(row: &PgRow) -> Result<PlatformProfile, StoreError> {
    let fallback: Option<String> = row.try_get("fallback_fetch_method")?;
    let fallback_fetch_method = fallback
        .map(|raw| raw.parse())
        .transpose()
        .map_err(|err| StoreError::Corrupt(format!("fallback_fetch_method: {err}")))?;
    let sample_size: i32 = row.try_get("sample_size")?;
    Ok(PlatformProfile {
        slug: row.try_get("slug")?,
        display_name: row.try_get("display_name")?,
        category: parse_column(row, "category")?,
        detection_signatures: row
            .try_get::<Json<DetectionSignatures>, _>("detection_signatures")?
            .0,
        best_fetch_method: parse_column(row, "best_fetch_method")?,
        fallback_fetch_method,
        needs_js_rendering: row.try_get("needs_js_rendering")?,
        content_selectors: row.try_get::<Json<Vec<String>>, _>("content_selectors")?.0,
        noise_selectors: row.try_get::<Json<Vec<String>>, _>("noise_selectors")?.0,
        rss_patterns: row.try_get::<Json<Vec<String>>, _>("rss_patterns")?.0,
        api_patterns: row.try_get::<Json<Vec<String>>, _>("api_patterns")?.0,
        confidence_score: row.try_get("confidence_score")?,
        sample_size: u32::try_from(sample_size)
            .map_err(|_| StoreError::Corrupt(format!("sample_size: {sample_size}")))?,
        notes: row.try_get("notes")?,
    })
}

fn business_from_row(row: &PgRow) -> Result<Business, StoreError> {
    Ok(Business {
        id: row.try_get("id")?,
        workspace_id: row.try_get("workspace_id")?,
        name: row.try_get("name")?,
        slug: row.try_get("slug")?,
        category: row.try_get("category")?,
        city: row.try_get("city")?,
        website: row.try_get("website")?,
        created_at: row.try_get("created_at")?,
    })
}

fn venue_from_row(row: &PgRow) -> Result<Venue, StoreError> {
    Ok(Venue {
        id: row.try_get("id")?,
        workspace_id: row.try_get("workspace_id")?,
        name: row.try_get("name")?,
        slug: row.try_get("slug")?,
        venue_type: row.try_get("venue_type")?,
        capacity: row.try_get("capacity")?,
        address: row.try_get("address")?,
        city: row.try_get("city")?,
        created_at: row.try_get("created_at")?,
    })
}

fn performer_from_row(row: &PgRow) -> Result<Performer, StoreError> {
    Ok(Performer {
        id: row.try_get("id")?,
        workspace_id: row.try_get("workspace_id")?,
        name: row.try_get("name")?,
        genres: row.try_get("genres")?,
        bio: row.try_get("bio")?,
        home_city: row.try_get("home_city")?,
        years_active: row.try_get("years_active")?,
        is_verified: row.try_get("is_verified")?,
        is_touring: row.try_get("is_touring")?,
        available_for_booking: row.try_get("available_for_booking")?,
        base_price: row.try_get("base_price")?,
        minimum_booking_hours: row.try_get("minimum_booking_hours")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn event_from_row(row: &PgRow) -> Result<Event, StoreError> {
    Ok(Event {
        id: row.try_get("id")?,
        workspace_id: row.try_get("workspace_id")?,
        venue_id: row.try_get("venue_id")?,
        performer_id: row.try_get("performer_id")?,
        title: row.try_get("title")?,
        starts_at: row.try_get("starts_at")?,
        ends_at: row.try_get("ends_at")?,
        price_min: row.try_get("price_min")?,
        price_max: row.try_get("price_max")?,
        status: parse_column(row, "status")?,
        created_at: row.try_get("created_at")?,
    })
}

const PERFORMER_COLUMNS: &str = "id, workspace_id, name, genres, bio, home_city, years_active, \
     is_verified, is_touring, available_for_booking, base_price, minimum_booking_hours, \
     created_at, updated_at";

#[async_trait]
impl SeedStore for PgStore {
    async fn first_or_create_tenant(&self, tenant: Tenant) -> Result<(Tenant, bool), StoreError> {
        let inserted = sqlx::query(
            r#"
            INSERT INTO tenants (id, slug, name, created_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (slug) DO NOTHING
            "#,
        )
        .bind(tenant.id)
        .bind(&tenant.slug)
        .bind(&tenant.name)
        .bind(tenant.created_at)
        .execute(&self.pool)
        .await?
        .rows_affected()
            > 0;
        let row = sqlx::query("SELECT id, slug, name, created_at FROM tenants WHERE slug = $1")
            .bind(&tenant.slug)
            .fetch_one(&self.pool)
            .await?;
        Ok((tenant_from_row(&row)?, inserted))
    }

    async fn first_or_create_user(&self, user: User) -> Result<(User, bool), StoreError> {
        let inserted = sqlx::query(
            r#"
            INSERT INTO users (id, tenant_id, email, name, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(user.id)
        .bind(user.tenant_id)
        .bind(&user.email)
        .bind(&user.name)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(|err| insert_error("user", &user.email, &[("tenant_id", user.tenant_id)], err))?
        .rows_affected()
            > 0;
        let row = sqlx::query(
            "SELECT id, tenant_id, email, name, created_at FROM users WHERE lower(email) = lower($1)",
        )
        .bind(&user.email)
        .fetch_one(&self.pool)
        .await?;
        Ok((user_from_row(&row)?, inserted))
    }

    async fn first_or_create_workspace(
        &self,
        workspace: Workspace,
    ) -> Result<(Workspace, bool), StoreError> {
        let inserted = sqlx::query(
            r#"
            INSERT INTO workspaces (id, tenant_id, owner_id, slug, name, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (slug) DO NOTHING
            "#,
        )
        .bind(workspace.id)
        .bind(workspace.tenant_id)
        .bind(workspace.owner_id)
        .bind(&workspace.slug)
        .bind(&workspace.name)
        .bind(workspace.created_at)
        .execute(&self.pool)
        .await
        .map_err(|err| {
            insert_error(
                "workspace",
                &workspace.slug,
                &[
                    ("tenant_id", workspace.tenant_id),
                    ("owner_id", workspace.owner_id),
                ],
                err,
            )
        })?
        .rows_affected()
            > 0;
        let row = sqlx::query(
            "SELECT id, tenant_id, owner_id, slug, name, created_at FROM workspaces WHERE slug = $1",
        )
        .bind(&workspace.slug)
        .fetch_one(&self.pool)
        .await?;
        Ok((workspace_from_row(&row)?, inserted))
    }

    async fn upsert_platform_profile(
        &self,
        profile: &PlatformProfile,
    ) -> Result<UpsertOutcome, StoreError> {
        profile.validate()?;
        let sample_size = i32::try_from(profile.sample_size).map_err(|_| {
            ProfileError::SampleSizeTooLarge {
                slug: profile.slug.clone(),
                value: profile.sample_size,
            }
        })?;
        // xmax is zero only for freshly inserted tuples.
        let inserted: bool = sqlx::query_scalar(
            r#"
            INSERT INTO platform_profiles (
                slug, display_name, category, detection_signatures, best_fetch_method,
                fallback_fetch_method, needs_js_rendering, content_selectors, noise_selectors,
                rss_patterns, api_patterns, confidence_score, sample_size, notes, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, NOW())
            ON CONFLICT (slug) DO UPDATE SET
                display_name = EXCLUDED.display_name,
                category = EXCLUDED.category,
                detection_signatures = EXCLUDED.detection_signatures,
                best_fetch_method = EXCLUDED.best_fetch_method,
                fallback_fetch_method = EXCLUDED.fallback_fetch_method,
                needs_js_rendering = EXCLUDED.needs_js_rendering,
                content_selectors = EXCLUDED.content_selectors,
                noise_selectors = EXCLUDED.noise_selectors,
                rss_patterns = EXCLUDED.rss_patterns,
                api_patterns = EXCLUDED.api_patterns,
                confidence_score = EXCLUDED.confidence_score,
                sample_size = EXCLUDED.sample_size,
                notes = EXCLUDED.notes,
                updated_at = NOW()
            RETURNING (xmax = 0)
            "#,
        )
        .bind(&profile.slug)
        .bind(&profile.display_name)
        .bind(profile.category.as_str())
        .bind(Json(&profile.detection_signatures))
        .bind(profile.best_fetch_method.as_str())
        .bind(profile.fallback_fetch_method.map(|m| m.as_str()))
        .bind(profile.needs_js_rendering)
        .bind(Json(&profile.content_selectors))
        .bind(Json(&profile.noise_selectors))
        .bind(Json(&profile.rss_patterns))
        .bind(Json(&profile.api_patterns))
        .bind(profile.confidence_score)
        .bind(sample_size)
        .bind(&profile.notes)
        .fetch_one(&self.pool)
        .await?;
        Ok(if inserted {
            UpsertOutcome::Inserted
        } else {
            UpsertOutcome::Updated
        })
    }

    async fn platform_profiles(&self) -> Result<Vec<PlatformProfile>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT slug, display_name, category, detection_signatures, best_fetch_method,
                   fallback_fetch_method, needs_js_rendering, content_selectors, noise_selectors,
                   rss_patterns, api_patterns, confidence_score, sample_size, notes
              FROM platform_profiles
             ORDER BY slug
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(profile_from_row).collect()
    }

    async fn insert_business(&self, business: &Business) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO businesses (id, workspace_id, name, slug, category, city, website, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(business.id)
        .bind(business.workspace_id)
        .bind(&business.name)
        .bind(&business.slug)
        .bind(&business.category)
        .bind(&business.city)
        .bind(&business.website)
        .bind(business.created_at)
        .execute(&self.pool)
        .await
        .map_err(|err| {
            insert_error(
                "business",
                &business.id.to_string(),
                &[("workspace_id", business.workspace_id)],
                err,
            )
        })?;
        Ok(())
    }

    async fn insert_venue(&self, venue: &Venue) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO venues (id, workspace_id, name, slug, venue_type, capacity, address, city, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(venue.id)
        .bind(venue.workspace_id)
        .bind(&venue.name)
        .bind(&venue.slug)
        .bind(&venue.venue_type)
        .bind(venue.capacity)
        .bind(&venue.address)
        .bind(&venue.city)
        .bind(venue.created_at)
        .execute(&self.pool)
        .await
        .map_err(|err| {
            insert_error(
                "venue",
                &venue.id.to_string(),
                &[("workspace_id", venue.workspace_id)],
                err,
            )
        })?;
        Ok(())
    }

    async fn insert_performer(&self, performer: &Performer) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO performers (
                id, workspace_id, name, genres, bio, home_city, years_active, is_verified,
                is_touring, available_for_booking, base_price, minimum_booking_hours,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(performer.id)
        .bind(performer.workspace_id)
        .bind(&performer.name)
        .bind(&performer.genres)
        .bind(&performer.bio)
        .bind(&performer.home_city)
        .bind(performer.years_active)
        .bind(performer.is_verified)
        .bind(performer.is_touring)
        .bind(performer.available_for_booking)
        .bind(performer.base_price)
        .bind(performer.minimum_booking_hours)
        .bind(performer.created_at)
        .bind(performer.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|err| {
            insert_error(
                "performer",
                &performer.id.to_string(),
                &[("workspace_id", performer.workspace_id)],
                err,
            )
        })?;
        Ok(())
    }

    async fn insert_event(&self, event: &Event) -> Result<(), StoreError> {
        let mut fks = vec![
            ("workspace_id", event.workspace_id),
            ("venue_id", event.venue_id),
        ];
        if let Some(performer_id) = event.performer_id {
            fks.push(("performer_id", performer_id));
        }
        sqlx::query(
            r#"
            INSERT INTO events (
                id, workspace_id, venue_id, performer_id, title, starts_at, ends_at,
                price_min, price_max, status, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(event.id)
        .bind(event.workspace_id)
        .bind(event.venue_id)
        .bind(event.performer_id)
        .bind(&event.title)
        .bind(event.starts_at)
        .bind(event.ends_at)
        .bind(event.price_min)
        .bind(event.price_max)
        .bind(event.status.as_str())
        .bind(event.created_at)
        .execute(&self.pool)
        .await
        .map_err(|err| insert_error("event", &event.id.to_string(), &fks, err))?;
        Ok(())
    }

    async fn insert_booking(&self, booking: &Booking) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO bookings (
                id, workspace_id, event_id, user_id, booking_number, quantity,
                total_amount, status, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(booking.id)
        .bind(booking.workspace_id)
        .bind(booking.event_id)
        .bind(booking.user_id)
        .bind(&booking.booking_number)
        .bind(booking.quantity)
        .bind(booking.total_amount)
        .bind(booking.status.as_str())
        .bind(booking.created_at)
        .execute(&self.pool)
        .await
        .map_err(|err| {
            let key = if violates_primary_key(&err) {
                booking.id.to_string()
            } else {
                booking.booking_number.clone()
            };
            insert_error(
                "booking",
                &key,
                &[
                    ("event_id", booking.event_id),
                    ("user_id", booking.user_id),
                    ("workspace_id", booking.workspace_id),
                ],
                err,
            )
        })?;
        Ok(())
    }

    async fn insert_follow(&self, follow: &Follow) -> Result<bool, StoreError> {
        self.require_subject("follow", &follow.subject).await?;
        let inserted = sqlx::query(
            r#"
            INSERT INTO follows (id, user_id, subject_type, subject_id, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_id, subject_type, subject_id) DO NOTHING
            "#,
        )
        .bind(follow.id)
        .bind(follow.user_id)
        .bind(follow.subject.kind().as_str())
        .bind(follow.subject.id())
        .bind(follow.created_at)
        .execute(&self.pool)
        .await
        .map_err(|err| {
            insert_error(
                "follow",
                &follow.subject.to_string(),
                &[("user_id", follow.user_id)],
                err,
            )
        })?
        .rows_affected();
        Ok(inserted > 0)
    }

    async fn insert_review(&self, review: &Review) -> Result<(), StoreError> {
        self.require_subject("review", &review.subject).await?;
        sqlx::query(
            r#"
            INSERT INTO reviews (id, user_id, subject_type, subject_id, rating, title, body, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(review.id)
        .bind(review.user_id)
        .bind(review.subject.kind().as_str())
        .bind(review.subject.id())
        .bind(review.rating)
        .bind(&review.title)
        .bind(&review.body)
        .bind(review.created_at)
        .execute(&self.pool)
        .await
        .map_err(|err| {
            insert_error(
                "review",
                &review.id.to_string(),
                &[("user_id", review.user_id)],
                err,
            )
        })?;
        Ok(())
    }

    async fn insert_rating(&self, rating: &Rating) -> Result<(), StoreError> {
        self.require_subject("rating", &rating.subject).await?;
        sqlx::query(
            r#"
            INSERT INTO ratings (id, user_id, subject_type, subject_id, score, context, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(rating.id)
        .bind(rating.user_id)
        .bind(rating.subject.kind().as_str())
        .bind(rating.subject.id())
        .bind(rating.score)
        .bind(&rating.context)
        .bind(rating.created_at)
        .execute(&self.pool)
        .await
        .map_err(|err| {
            insert_error(
                "rating",
                &rating.id.to_string(),
                &[("user_id", rating.user_id)],
                err,
            )
        })?;
        Ok(())
    }

    async fn update_performer(&self, performer: &Performer) -> Result<bool, StoreError> {
        let updated = sqlx::query(
            r#"
            UPDATE performers
               SET workspace_id = $2,
                   name = $3,
                   genres = $4,
                   bio = $5,
                   home_city = $6,
                   years_active = $7,
                   is_verified = $8,
                   is_touring = $9,
                   available_for_booking = $10,
                   base_price = $11,
                   minimum_booking_hours = $12,
                   updated_at = $13
             WHERE id = $1
            "#,
        )
        .bind(performer.id)
        .bind(performer.workspace_id)
        .bind(&performer.name)
        .bind(&performer.genres)
        .bind(&performer.bio)
        .bind(&performer.home_city)
        .bind(performer.years_active)
        .bind(performer.is_verified)
        .bind(performer.is_touring)
        .bind(performer.available_for_booking)
        .bind(performer.base_price)
        .bind(performer.minimum_booking_hours)
        .bind(performer.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|err| {
            insert_error(
                "performer",
                &performer.id.to_string(),
                &[("workspace_id", performer.workspace_id)],
                err,
            )
        })?
        .rows_affected();
        Ok(updated > 0)
    }

    async fn get_performer(&self, id: Uuid) -> Result<Option<Performer>, StoreError> {
        let sql = format!("SELECT {PERFORMER_COLUMNS} FROM performers WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(performer_from_row).transpose()
    }

    async fn users(&self) -> Result<Vec<User>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, tenant_id, email, name, created_at FROM users ORDER BY created_at, email",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(user_from_row).collect()
    }

    async fn workspaces(&self) -> Result<Vec<Workspace>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, tenant_id, owner_id, slug, name, created_at FROM workspaces ORDER BY created_at, slug",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(workspace_from_row).collect()
    }

    async fn businesses(&self) -> Result<Vec<Business>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, workspace_id, name, slug, category, city, website, created_at
              FROM businesses
             ORDER BY created_at, id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(business_from_row).collect()
    }

    async fn venues(&self) -> Result<Vec<Venue>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, workspace_id, name, slug, venue_type, capacity, address, city, created_at
              FROM venues
             ORDER BY created_at, id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(venue_from_row).collect()
    }

    async fn performers(&self) -> Result<Vec<Performer>, StoreError> {
        let sql = format!("SELECT {PERFORMER_COLUMNS} FROM performers ORDER BY created_at DESC, id");
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.iter().map(performer_from_row).collect()
    }

    async fn events(&self) -> Result<Vec<Event>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, workspace_id, venue_id, performer_id, title, starts_at, ends_at,
                   price_min, price_max, status, created_at
              FROM events
             ORDER BY starts_at, id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(event_from_row).collect()
    }

    async fn counts(&self) -> Result<TableCounts, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT (SELECT COUNT(*) FROM tenants) AS tenants,
                   (SELECT COUNT(*) FROM users) AS users,
                   (SELECT COUNT(*) FROM workspaces) AS workspaces,
                   (SELECT COUNT(*) FROM platform_profiles) AS platform_profiles,
                   (SELECT COUNT(*) FROM businesses) AS businesses,
                   (SELECT COUNT(*) FROM venues) AS venues,
                   (SELECT COUNT(*) FROM performers) AS performers,
                   (SELECT COUNT(*) FROM events) AS events,
                   (SELECT COUNT(*) FROM bookings) AS bookings,
                   (SELECT COUNT(*) FROM follows) AS follows,
                   (SELECT COUNT(*) FROM reviews) AS reviews,
                   (SELECT COUNT(*) FROM ratings) AS ratings
            "#,
        )
        .fetch_one(&self.pool)
        .await?;
        let count = |column: &str| -> Result<usize, StoreError> {
            let n: i64 = row.try_get(column)?;
            usize::try_from(n).map_err(|_| StoreError::Corrupt(format!("{column} count: {n}")))
        };
        Ok(TableCounts {
            tenants: count("tenants")?,
            users: count("users")?,
            workspaces: count("workspaces")?,
            platform_profiles: count("platform_profiles")?,
            businesses: count("businesses")?,
            venues: count("venues")?,
            performers: count("performers")?,
            events: count("events")?,
            bookings: count("bookings")?,
            follows: count("follows")?,
            reviews: count("reviews")?,
            ratings: count("ratings")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subjects_map_to_their_tables() {
        assert_eq!(subject_table(SubjectKind::Performer), "performers");
        assert_eq!(subject_table(SubjectKind::Business), "businesses");
        assert_eq!(subject_table(SubjectKind::Event), "events");
    }

    #[test]
    fn non_database_errors_pass_through() {
        let err = insert_error("venue", "x", &[], sqlx::Error::RowNotFound);
        assert!(matches!(err, StoreError::Database(sqlx::Error::RowNotFound)));
        assert!(!violates_primary_key(&sqlx::Error::RowNotFound));
    }
}
