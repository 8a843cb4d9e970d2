//! Randomized-but-valid entity builders driven by an injected, seedable RNG.

use chrono::{DateTime, Duration, Utc};
use commhub_core::{
    slugify, Booking, BookingStatus, Business, Event, EventStatus, Follow, Performer, Rating,
    Review, Subject, Venue,
};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use uuid::Uuid;

const CITIES: &[&str] = &[
    "Asheville",
    "Boulder",
    "Burlington",
    "Chattanooga",
    "Eugene",
    "Madison",
    "Missoula",
    "Portland",
    "Santa Fe",
    "Savannah",
];

const STREETS: &[&str] = &[
    "Main St",
    "Oak Ave",
    "River Rd",
    "College St",
    "Market St",
    "Depot Ln",
    "Elm St",
];

const GENRES: &[&str] = &[
    "rock",
    "jazz",
    "blues",
    "folk",
    "country",
    "hip-hop",
    "electronic",
    "indie",
    "bluegrass",
    "soul",
    "comedy",
    "classical",
];

const NAME_ADJECTIVES: &[&str] = &[
    "Velvet", "Electric", "Midnight", "Copper", "Wild", "Golden", "Hollow", "Neon", "Silver",
    "Rusty",
];

const NAME_NOUNS: &[&str] = &[
    "Foxes", "Lanterns", "Rivers", "Pines", "Owls", "Engines", "Echoes", "Saints", "Harbors",
    "Ravens",
];

const VENUE_KINDS: &[(&str, &str)] = &[
    ("bar", "Tavern"),
    ("club", "Club"),
    ("theater", "Theater"),
    ("brewery", "Brewing Co."),
    ("park", "Park Pavilion"),
    ("cafe", "Coffee House"),
];

const BUSINESS_KINDS: &[(&str, &str)] = &[
    ("restaurant", "Kitchen"),
    ("retail", "Supply"),
    ("services", "Works"),
    ("salon", "Studio"),
    ("bakery", "Bakery"),
];

const EVENT_FORMATS: &[&str] = &[
    "Live at",
    "Late Show at",
    "Album Release at",
    "Open Air at",
    "Acoustic Night at",
];

const REVIEW_TITLES: &[&str] = &[
    "Great night out",
    "Would go again",
    "Solid, not amazing",
    "Loved it",
    "Sound could be better",
];

const RATING_CONTEXTS: &[&str] = &["overall", "sound", "atmosphere", "value", "staff"];

/// Round to whole cents.
fn cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// splitmix64 finalizer over the row count, folded into the seed.
fn run_stream_seed(seed: u64, prior_rows: u64) -> u64 {
    if prior_rows == 0 {
        return seed;
    }
    let mut z = prior_rows.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    seed ^ z ^ (z >> 31)
}

/// Builds seed rows. All randomness comes from the owned `StdRng`, so the
/// same seed and call order produce the same rows.
#[derive(Debug, Clone)]
pub struct Factory {
    rng: StdRng,
    now: DateTime<Utc>,
}

impl Factory {
    pub fn new(seed: u64, now: DateTime<Utc>) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            now,
        }
    }

    /// Factory for a run against a store already holding `prior_rows`
    /// generated rows. An empty store gets the plain `seed` stream, so fresh
    /// databases reproduce the same rows while re-runs draw new ids.
    pub fn for_run(seed: u64, prior_rows: u64, now: DateTime<Utc>) -> Self {
        Self::new(run_stream_seed(seed, prior_rows), now)
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    /// Uniform index into a collection of `len` items; `len` must be non-zero.
    pub fn index(&mut self, len: usize) -> usize {
        self.rng.gen_range(0..len)
    }

    pub fn chance(&mut self, probability: f64) -> bool {
        self.rng.gen_bool(probability)
    }

    pub fn id(&mut self) -> Uuid {
        uuid::Builder::from_random_bytes(self.rng.gen()).into_uuid()
    }

    fn pick<T: Copy>(&mut self, items: &[T]) -> T {
        items[self.rng.gen_range(0..items.len())]
    }

    fn past(&mut self, max_days: i64) -> DateTime<Utc> {
        self.now - Duration::minutes(self.rng.gen_range(0..max_days * 24 * 60))
    }

    fn band_name(&mut self) -> String {
        format!(
            "The {} {}",
            self.pick(NAME_ADJECTIVES),
            self.pick(NAME_NOUNS)
        )
    }

    pub fn business(&mut self, workspace_id: Uuid) -> Business {
        let id = self.id();
        let (category, suffix) = self.pick(BUSINESS_KINDS);
        let name = format!("{} {}", self.pick(NAME_ADJECTIVES), suffix);
        let slug = format!("{}-{}", slugify(&name), &id.simple().to_string()[..6]);
        let website = self
            .rng
            .gen_bool(0.7)
            .then(|| format!("https://{}.example.com", slugify(&name)));
        Business {
            id,
            workspace_id,
            name,
            slug,
            category: category.to_string(),
            city: self.pick(CITIES).to_string(),
            website,
            created_at: self.past(365),
        }
    }

    pub fn venue(&mut self, workspace_id: Uuid) -> Venue {
        let id = self.id();
        let (venue_type, suffix) = self.pick(VENUE_KINDS);
        let name = format!("{} {}", self.pick(NAME_ADJECTIVES), suffix);
        let slug = format!("{}-{}", slugify(&name), &id.simple().to_string()[..6]);
        Venue {
            id,
            workspace_id,
            name,
            slug,
            venue_type: venue_type.to_string(),
            capacity: self.rng.gen_range(40..2_000),
            address: format!("{} {}", self.rng.gen_range(1..999), self.pick(STREETS)),
            city: self.pick(CITIES).to_string(),
            created_at: self.past(365),
        }
    }

    pub fn performer(&mut self, workspace_id: Uuid) -> Performer {
        let id = self.id();
        let name = self.band_name();
        let genre_count = self.rng.gen_range(1..=3);
        let genres = GENRES
            .choose_multiple(&mut self.rng, genre_count)
            .map(|g| g.to_string())
            .collect::<Vec<_>>();
        let home_city = self.pick(CITIES).to_string();
        let bio = self.rng.gen_bool(0.8).then(|| {
            format!(
                "{name} play {} around {home_city} and beyond.",
                genres.join(" and ")
            )
        });
        let base_price = self
            .rng
            .gen_bool(0.75)
            .then(|| cents(self.rng.gen_range(150.0..2_500.0)));
        let created_at = self.past(730);
        Performer {
            id,
            workspace_id,
            name,
            genres,
            bio,
            home_city,
            years_active: self.rng.gen_range(0..30),
            is_verified: self.rng.gen_bool(0.3),
            is_touring: self.rng.gen_bool(0.4),
            available_for_booking: self.rng.gen_bool(0.85),
            base_price,
            minimum_booking_hours: self.rng.gen_range(1..=4),
            created_at,
            updated_at: created_at,
        }
    }

    /// An event at `venue`, in the same workspace, optionally headlined by `performer`.
    pub fn event(&mut self, venue: &Venue, performer: Option<&Performer>) -> Event {
        let id = self.id();
        let format = self.pick(EVENT_FORMATS);
        let title = match performer {
            Some(p) => format!("{} {format} {}", p.name, venue.name),
            None => format!("Community Night {format} {}", venue.name),
        };
        let starts_at = self.now + Duration::hours(self.rng.gen_range(-24 * 30..24 * 90));
        let ends_at = starts_at + Duration::hours(self.rng.gen_range(2..=5));
        let price_min = cents(self.rng.gen_range(0.0..40.0));
        let price_max = cents(price_min + self.rng.gen_range(0.0..60.0));
        let status = match self.rng.gen_range(0..10) {
            0 => EventStatus::Draft,
            1 => EventStatus::Cancelled,
            _ => EventStatus::Published,
        };
        Event {
            id,
            workspace_id: venue.workspace_id,
            venue_id: venue.id,
            performer_id: performer.map(|p| p.id),
            title,
            starts_at,
            ends_at,
            price_min,
            price_max,
            status,
            created_at: self.past(60),
        }
    }

    /// A booking whose total is quantity times a ticket price inside the event's range.
    pub fn booking(&mut self, event: &Event, user_id: Uuid) -> Booking {
        let id = self.id();
        let quantity = self.rng.gen_range(1..=6);
        let unit = if event.price_max > event.price_min {
            self.rng.gen_range(event.price_min..=event.price_max)
        } else {
            event.price_min
        };
        let status = match self.rng.gen_range(0..10) {
            0 => BookingStatus::Cancelled,
            1 | 2 => BookingStatus::Pending,
            _ => BookingStatus::Confirmed,
        };
        Booking {
            id,
            workspace_id: event.workspace_id,
            event_id: event.id,
            user_id,
            booking_number: format!("BK-{}", id.simple().to_string()[..10].to_uppercase()),
            quantity,
            total_amount: cents(unit * f64::from(quantity)),
            status,
            created_at: self.past(30),
        }
    }

    pub fn follow(&mut self, user_id: Uuid, subject: Subject) -> Follow {
        Follow {
            id: self.id(),
            user_id,
            subject,
            created_at: self.past(180),
        }
    }

    pub fn review(&mut self, user_id: Uuid, subject: Subject) -> Review {
        let rating = self.rng.gen_range(1..=5);
        let title = self.pick(REVIEW_TITLES).to_string();
        Review {
            id: self.id(),
            user_id,
            subject,
            rating,
            body: format!("{title}. Gave it {rating} out of 5."),
            title,
            created_at: self.past(180),
        }
    }

    pub fn rating(&mut self, user_id: Uuid, subject: Subject) -> Rating {
        Rating {
            id: self.id(),
            user_id,
            subject,
            score: self.rng.gen_range(1..=5),
            context: self.pick(RATING_CONTEXTS).to_string(),
            created_at: self.past(180),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn factory(seed: u64) -> Factory {
        Factory::new(seed, Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap())
    }

    #[test]
    fn same_seed_same_rows() {
        let ws = Uuid::nil();
        let mut a = factory(7);
        let mut b = factory(7);
        for _ in 0..5 {
            assert_eq!(a.performer(ws), b.performer(ws));
            assert_eq!(a.venue(ws), b.venue(ws));
        }
        assert_ne!(factory(7).performer(ws), factory(8).performer(ws));
    }

    #[test]
    fn events_stay_within_their_venue_workspace() {
        let mut f = factory(1);
        let venue = f.venue(Uuid::from_u128(9));
        let performer = f.performer(Uuid::from_u128(9));
        for _ in 0..20 {
            let event = f.event(&venue, Some(&performer));
            assert_eq!(event.workspace_id, venue.workspace_id);
            assert_eq!(event.performer_id, Some(performer.id));
            assert!(event.ends_at > event.starts_at);
            assert!(event.price_max >= event.price_min);
        }
    }

    #[test]
    fn booking_totals_respect_the_price_range() {
        let mut f = factory(3);
        let venue = f.venue(Uuid::nil());
        for _ in 0..50 {
            let event = f.event(&venue, None);
            let booking = f.booking(&event, Uuid::from_u128(1));
            let q = f64::from(booking.quantity);
            assert!(booking.total_amount >= cents(event.price_min * q) - 0.01);
            assert!(booking.total_amount <= cents(event.price_max * q) + 0.01);
            assert!(booking.booking_number.starts_with("BK-"));
        }
    }

    #[test]
    fn performers_have_valid_ranges() {
        let mut f = factory(11);
        for _ in 0..50 {
            let p = f.performer(Uuid::nil());
            assert!((1..=3).contains(&p.genres.len()));
            assert!((1..=4).contains(&p.minimum_booking_hours));
            assert!(p.created_at <= f.now());
            if let Some(price) = p.base_price {
                assert!(price >= 150.0);
            }
        }
    }

    #[test]
    fn later_runs_draw_a_different_stream() {
        let now = Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap();
        let ws = Uuid::nil();
        assert_eq!(
            Factory::for_run(42, 0, now).performer(ws),
            factory(42).performer(ws)
        );
        let first = Factory::for_run(42, 0, now).id();
        let second = Factory::for_run(42, 193, now).id();
        let third = Factory::for_run(42, 386, now).id();
        assert_ne!(first, second);
        assert_ne!(second, third);
        assert_eq!(second, Factory::for_run(42, 193, now).id());
    }

    #[test]
    fn scores_are_one_to_five() {
        let mut f = factory(5);
        let subject = Subject::Venue(Uuid::nil());
        for _ in 0..50 {
            assert!((1..=5).contains(&f.review(Uuid::nil(), subject).rating));
            assert!((1..=5).contains(&f.rating(Uuid::nil(), subject).score));
        }
    }
}
