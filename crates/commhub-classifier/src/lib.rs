//! Platform classifier: recognizes the platform behind an external website and
//! recommends how its content should be fetched and extracted.

use commhub_core::ProfileError;
use commhub_fetch::FetchError;
use thiserror::Error;

pub mod classify;
pub mod evidence;
pub mod probe;
pub mod table;

pub use classify::{Classification, ClassificationReport, Decision, SignatureHit};
pub use evidence::{evidence_from_page, has_minimal_static_content, has_spa_root_marker};
pub use probe::{probe, ProbeReport};
pub use table::{builtin_profiles, ProfileTable, SPA_JAVASCRIPT_SLUG, STATIC_HTML_SLUG};

pub const CRATE_NAME: &str = "commhub-classifier";

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("parsing platform profile table: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error(transparent)]
    InvalidProfile(#[from] ProfileError),
    #[error("duplicate platform profile slug {0}")]
    DuplicateSlug(String),
    #[error("profile table is missing the {0} fallback profile")]
    MissingFallback(&'static str),
    #[error("fallback profile {slug} is unusable: {reason}")]
    InvalidFallback { slug: String, reason: String },
    #[error(transparent)]
    Fetch(#[from] FetchError),
}
