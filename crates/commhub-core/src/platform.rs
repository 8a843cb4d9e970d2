//! Platform profile records used to recognize external websites and decide how
//! their content should be fetched.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ParseEnumError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlatformCategory {
    Government,
    Cms,
    WebsiteBuilder,
    Ecommerce,
    News,
    Events,
    Social,
    Custom,
}

impl PlatformCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Government => "government",
            Self::Cms => "cms",
            Self::WebsiteBuilder => "website_builder",
            Self::Ecommerce => "ecommerce",
            Self::News => "news",
            Self::Events => "events",
            Self::Social => "social",
            Self::Custom => "custom",
        }
    }
}

impl fmt::Display for PlatformCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlatformCategory {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "government" => Ok(Self::Government),
            "cms" => Ok(Self::Cms),
            "website_builder" => Ok(Self::WebsiteBuilder),
            "ecommerce" => Ok(Self::Ecommerce),
            "news" => Ok(Self::News),
            "events" => Ok(Self::Events),
            "social" => Ok(Self::Social),
            "custom" => Ok(Self::Custom),
            other => Err(ParseEnumError::new("platform category", other)),
        }
    }
}

/// Strategy an external fetcher should use to retrieve a site's content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchMethod {
    Rss,
    HttpGet,
    Api,
    AiExtract,
    Playwright,
    ScrapingbeeJs,
}

impl FetchMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rss => "rss",
            Self::HttpGet => "http_get",
            Self::Api => "api",
            Self::AiExtract => "ai_extract",
            Self::Playwright => "playwright",
            Self::ScrapingbeeJs => "scrapingbee_js",
        }
    }

    /// True when the method executes client-side scripts to materialize content.
    pub fn renders_javascript(&self) -> bool {
        matches!(self, Self::Playwright | Self::ScrapingbeeJs)
    }
}

impl fmt::Display for FetchMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FetchMethod {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rss" => Ok(Self::Rss),
            "http_get" => Ok(Self::HttpGet),
            "api" => Ok(Self::Api),
            "ai_extract" => Ok(Self::AiExtract),
            "playwright" => Ok(Self::Playwright),
            "scrapingbee_js" => Ok(Self::ScrapingbeeJs),
            other => Err(ParseEnumError::new("fetch method", other)),
        }
    }
}

/// Which part of a fetched page a detection signature is matched against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceSource {
    Html,
    Url,
    MetaGenerator,
    Server,
}

impl EvidenceSource {
    pub const ALL: [EvidenceSource; 4] = [
        EvidenceSource::Html,
        EvidenceSource::Url,
        EvidenceSource::MetaGenerator,
        EvidenceSource::Server,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Url => "url",
            Self::MetaGenerator => "meta_generator",
            Self::Server => "server",
        }
    }
}

/// Substring signatures per evidence source. Unknown keys are rejected so a
/// misspelled category cannot silently disable detection.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DetectionSignatures {
    #[serde(default)]
    pub html: Vec<String>,
    #[serde(default)]
    pub url: Vec<String>,
    #[serde(default)]
    pub meta_generator: Vec<String>,
    #[serde(default)]
    pub server: Vec<String>,
}

impl DetectionSignatures {
    pub fn for_source(&self, source: EvidenceSource) -> &[String] {
        match source {
            EvidenceSource::Html => &self.html,
            EvidenceSource::Url => &self.url,
            EvidenceSource::MetaGenerator => &self.meta_generator,
            EvidenceSource::Server => &self.server,
        }
    }

    pub fn is_empty(&self) -> bool {
        EvidenceSource::ALL
            .iter()
            .all(|source| self.for_source(*source).is_empty())
    }
}

/// Observations gathered from fetching one external page.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Evidence {
    #[serde(default)]
    pub html: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub server_header: Option<String>,
    #[serde(default)]
    pub meta_generator: Option<String>,
}

impl Evidence {
    pub fn new(url: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            url: url.into(),
            server_header: None,
            meta_generator: None,
        }
    }

    pub fn with_server_header(mut self, server: impl Into<String>) -> Self {
        self.server_header = Some(server.into());
        self
    }

    pub fn with_meta_generator(mut self, generator: impl Into<String>) -> Self {
        self.meta_generator = Some(generator.into());
        self
    }

    pub fn field(&self, source: EvidenceSource) -> Option<&str> {
        match source {
            EvidenceSource::Html => Some(self.html.as_str()),
            EvidenceSource::Url => Some(self.url.as_str()),
            EvidenceSource::MetaGenerator => self.meta_generator.as_deref(),
            EvidenceSource::Server => self.server_header.as_deref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformProfile {
    pub slug: String,
    pub display_name: String,
    pub category: PlatformCategory,
    #[serde(default)]
    pub detection_signatures: DetectionSignatures,
    pub best_fetch_method: FetchMethod,
    #[serde(default)]
    pub fallback_fetch_method: Option<FetchMethod>,
    #[serde(default)]
    pub needs_js_rendering: bool,
    #[serde(default)]
    pub content_selectors: Vec<String>,
    #[serde(default)]
    pub noise_selectors: Vec<String>,
    #[serde(default)]
    pub rss_patterns: Vec<String>,
    #[serde(default)]
    pub api_patterns: Vec<String>,
    pub confidence_score: f64,
    #[serde(default)]
    pub sample_size: u32,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProfileError {
    #[error("platform profile slug must not be empty")]
    EmptySlug,
    #[error("platform profile {slug}: confidence_score {value} is outside [0, 1]")]
    ConfidenceOutOfRange { slug: String, value: f64 },
    #[error("platform profile {slug}: fallback fetch method repeats the best method")]
    FallbackRepeatsBest { slug: String },
    #[error("platform profile {slug}: sample_size {value} exceeds {max}", max = SAMPLE_SIZE_MAX)]
    SampleSizeTooLarge { slug: String, value: u32 },
}

/// Largest sample size a profile row can store (a Postgres `INTEGER`).
pub const SAMPLE_SIZE_MAX: u32 = i32::MAX as u32;

impl PlatformProfile {
    pub fn validate(&self) -> Result<(), ProfileError> {
        if self.slug.trim().is_empty() {
            return Err(ProfileError::EmptySlug);
        }
        if !(0.0..=1.0).contains(&self.confidence_score) {
            return Err(ProfileError::ConfidenceOutOfRange {
                slug: self.slug.clone(),
                value: self.confidence_score,
            });
        }
        if self.fallback_fetch_method == Some(self.best_fetch_method) {
            return Err(ProfileError::FallbackRepeatsBest {
                slug: self.slug.clone(),
            });
        }
        if self.sample_size > SAMPLE_SIZE_MAX {
            return Err(ProfileError::SampleSizeTooLarge {
                slug: self.slug.clone(),
                value: self.sample_size,
            });
        }
        Ok(())
    }

    /// Primary strategy plus the strategy to try if the primary fails at call time.
    pub fn fetch_plan(&self) -> (FetchMethod, Option<FetchMethod>) {
        (self.best_fetch_method, self.fallback_fetch_method)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(slug: &str, confidence: f64) -> PlatformProfile {
        PlatformProfile {
            slug: slug.to_string(),
            display_name: slug.to_string(),
            category: PlatformCategory::Cms,
            detection_signatures: DetectionSignatures::default(),
            best_fetch_method: FetchMethod::HttpGet,
            fallback_fetch_method: Some(FetchMethod::Playwright),
            needs_js_rendering: false,
            content_selectors: vec![],
            noise_selectors: vec![],
            rss_patterns: vec![],
            api_patterns: vec![],
            confidence_score: confidence,
            sample_size: 0,
            notes: None,
        }
    }

    #[test]
    fn signature_keys_are_checked_when_deserializing() {
        let ok: DetectionSignatures =
            serde_yaml::from_str("html: ['wp-content']\nmeta_generator: ['wordpress']").unwrap();
        assert_eq!(ok.for_source(EvidenceSource::Html), ["wp-content".to_string()]);
        assert!(ok.server.is_empty());

        let typo = serde_yaml::from_str::<DetectionSignatures>("htlm: ['wp-content']");
        assert!(typo.is_err());
    }

    #[test]
    fn fetch_method_wire_names_round_trip_through_from_str() {
        for method in [
            FetchMethod::Rss,
            FetchMethod::HttpGet,
            FetchMethod::Api,
            FetchMethod::AiExtract,
            FetchMethod::Playwright,
            FetchMethod::ScrapingbeeJs,
        ] {
            let json = serde_json::to_string(&method).unwrap();
            assert_eq!(json, format!("\"{}\"", method.as_str()));
            assert_eq!(method.as_str().parse::<FetchMethod>().unwrap(), method);
        }
        assert!("curl".parse::<FetchMethod>().is_err());
    }

    #[test]
    fn validation_rejects_out_of_range_confidence() {
        assert!(profile("ok", 0.5).validate().is_ok());
        assert!(matches!(
            profile("too-high", 1.2).validate(),
            Err(ProfileError::ConfidenceOutOfRange { .. })
        ));
        assert!(matches!(profile(" ", 0.5).validate(), Err(ProfileError::EmptySlug)));

        let mut repeated = profile("repeat", 0.5);
        repeated.fallback_fetch_method = Some(FetchMethod::HttpGet);
        assert!(matches!(
            repeated.validate(),
            Err(ProfileError::FallbackRepeatsBest { .. })
        ));
    }

    #[test]
    fn validation_rejects_sample_sizes_past_the_column_range() {
        let mut p = profile("huge", 0.5);
        p.sample_size = SAMPLE_SIZE_MAX;
        assert!(p.validate().is_ok());

        p.sample_size = u32::MAX;
        assert_eq!(
            p.validate(),
            Err(ProfileError::SampleSizeTooLarge {
                slug: "huge".to_string(),
                value: u32::MAX,
            })
        );
    }

    #[test]
    fn evidence_fields_map_to_sources() {
        let evidence = Evidence::new("https://example.com", "<html></html>")
            .with_server_header("nginx");
        assert_eq!(evidence.field(EvidenceSource::Url), Some("https://example.com"));
        assert_eq!(evidence.field(EvidenceSource::Server), Some("nginx"));
        assert_eq!(evidence.field(EvidenceSource::MetaGenerator), None);
    }
}
