//! Slug-unique registry of platform profiles.

use std::collections::HashMap;

use commhub_core::{EvidenceSource, PlatformProfile, UpsertOutcome};
use serde::Deserialize;

use crate::ClassifierError;

pub const STATIC_HTML_SLUG: &str = "static_html";
pub const SPA_JAVASCRIPT_SLUG: &str = "spa_javascript";

const BUILTIN_PROFILES_YAML: &str = include_str!("../data/platform_profiles.yaml");

#[derive(Debug, Deserialize)]
struct ProfilesFile {
    #[allow(dead_code)]
    version: u32,
    #[serde(default)]
    profiles: Vec<PlatformProfile>,
}

/// The platform profiles shipped with the crate.
pub fn builtin_profiles() -> Result<Vec<PlatformProfile>, ClassifierError> {
    parse_profiles_yaml(BUILTIN_PROFILES_YAML)
}

fn parse_profiles_yaml(text: &str) -> Result<Vec<PlatformProfile>, ClassifierError> {
    let file: ProfilesFile = serde_yaml::from_str(text)?;
    Ok(file.profiles)
}

#[derive(Debug, Clone)]
pub(crate) struct Entry {
    pub(crate) profile: PlatformProfile,
    /// Lowercased signatures, indexed like `EvidenceSource::ALL`.
    pub(crate) needles: [Vec<String>; 4],
}

impl Entry {
    fn new(profile: PlatformProfile) -> Self {
        let needles = EvidenceSource::ALL.map(|source| {
            profile
                .detection_signatures
                .for_source(source)
                .iter()
                .map(|s| s.trim().to_ascii_lowercase())
                .filter(|s| !s.is_empty())
                .collect()
        });
        Self { profile, needles }
    }

    pub(crate) fn is_generic_fallback(&self) -> bool {
        self.profile.slug == STATIC_HTML_SLUG || self.profile.slug == SPA_JAVASCRIPT_SLUG
    }
}

/// Immutable-by-default profile table. Always holds both generic fallback
/// profiles, which is what makes classification total.
#[derive(Debug, Clone)]
pub struct ProfileTable {
    pub(crate) entries: Vec<Entry>,
    by_slug: HashMap<String, usize>,
    pub(crate) static_idx: usize,
    pub(crate) spa_idx: usize,
}

impl ProfileTable {
    pub fn new(profiles: Vec<PlatformProfile>) -> Result<Self, ClassifierError> {
        let mut entries = Vec::with_capacity(profiles.len());
        let mut by_slug = HashMap::with_capacity(profiles.len());
        for profile in profiles {
            profile.validate()?;
            if by_slug.contains_key(&profile.slug) {
                return Err(ClassifierError::DuplicateSlug(profile.slug));
            }
            by_slug.insert(profile.slug.clone(), entries.len());
            entries.push(Entry::new(profile));
        }

        let static_idx = *by_slug
            .get(STATIC_HTML_SLUG)
            .ok_or(ClassifierError::MissingFallback(STATIC_HTML_SLUG))?;
        let spa_idx = *by_slug
            .get(SPA_JAVASCRIPT_SLUG)
            .ok_or(ClassifierError::MissingFallback(SPA_JAVASCRIPT_SLUG))?;

        let table = Self {
            entries,
            by_slug,
            static_idx,
            spa_idx,
        };
        table.check_fallback(&table.entries[spa_idx].profile)?;
        Ok(table)
    }

    pub fn builtin() -> Result<Self, ClassifierError> {
        Self::new(builtin_profiles()?)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, ClassifierError> {
        Self::new(parse_profiles_yaml(text)?)
    }

    fn check_fallback(&self, profile: &PlatformProfile) -> Result<(), ClassifierError> {
        if profile.slug != SPA_JAVASCRIPT_SLUG {
            return Ok(());
        }
        let reason = if !profile.needs_js_rendering {
            "spa fallback must require javascript rendering"
        } else if !profile.best_fetch_method.renders_javascript() {
            "spa fallback must fetch with a javascript-rendering method"
        } else {
            return Ok(());
        };
        Err(ClassifierError::InvalidFallback {
            slug: profile.slug.clone(),
            reason: reason.to_string(),
        })
    }

    /// Insert the profile if its slug is new, otherwise replace the stored one.
    pub fn upsert(&mut self, profile: PlatformProfile) -> Result<UpsertOutcome, ClassifierError> {
        profile.validate()?;
        self.check_fallback(&profile)?;
        match self.by_slug.get(&profile.slug) {
            Some(&idx) => {
                self.entries[idx] = Entry::new(profile);
                Ok(UpsertOutcome::Updated)
            }
            None => {
                self.by_slug.insert(profile.slug.clone(), self.entries.len());
                self.entries.push(Entry::new(profile));
                Ok(UpsertOutcome::Inserted)
            }
        }
    }

    pub fn get(&self, slug: &str) -> Option<&PlatformProfile> {
        self.by_slug.get(slug).map(|&idx| &self.entries[idx].profile)
    }

    pub fn profiles(&self) -> impl Iterator<Item = &PlatformProfile> {
        self.entries.iter().map(|e| &e.profile)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn static_fallback(&self) -> &PlatformProfile {
        &self.entries[self.static_idx].profile
    }

    pub fn spa_fallback(&self) -> &PlatformProfile {
        &self.entries[self.spa_idx].profile
    }
}
