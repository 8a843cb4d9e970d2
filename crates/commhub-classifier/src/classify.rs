//! Matching evidence against the profile table.

use std::cmp::Ordering;

use commhub_core::{Evidence, EvidenceSource, FetchMethod, PlatformProfile};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::evidence::{has_minimal_static_content, has_spa_root_marker};
use crate::table::{Entry, ProfileTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// Exactly one best profile matched.
    Matched,
    /// Several profiles tied on confidence and sample size; a generic fallback was used.
    Ambiguous,
    /// No signature matched; a generic fallback was used.
    Unmatched,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureHit {
    pub source: EvidenceSource,
    pub needle: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Classification<'a> {
    pub profile: &'a PlatformProfile,
    pub decision: Decision,
    /// Signatures of the chosen profile found in the evidence.
    pub hits: Vec<SignatureHit>,
    /// Slugs that tied for first place when the decision is `Ambiguous`.
    pub ambiguous_with: Vec<String>,
}

impl Classification<'_> {
    pub fn fetch_plan(&self) -> (FetchMethod, Option<FetchMethod>) {
        self.profile.fetch_plan()
    }

    pub fn is_fallback(&self) -> bool {
        self.decision != Decision::Matched
    }

    pub fn to_report(&self) -> ClassificationReport {
        ClassificationReport {
            profile: self.profile.clone(),
            decision: self.decision,
            hits: self.hits.clone(),
            ambiguous_with: self.ambiguous_with.clone(),
        }
    }
}

/// Owned form of a [`Classification`], for responses that outlive the table borrow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub profile: PlatformProfile,
    pub decision: Decision,
    pub hits: Vec<SignatureHit>,
    pub ambiguous_with: Vec<String>,
}

struct Candidate<'a> {
    entry: &'a Entry,
    hits: Vec<SignatureHit>,
}

fn signature_hits(entry: &Entry, evidence: &LoweredEvidence) -> Vec<SignatureHit> {
    let mut hits = Vec::new();
    for (idx, source) in EvidenceSource::ALL.iter().enumerate() {
        let Some(haystack) = evidence.0[idx].as_deref() else {
            continue;
        };
        for needle in &entry.needles[idx] {
            if haystack.contains(needle.as_str()) {
                hits.push(SignatureHit {
                    source: *source,
                    needle: needle.clone(),
                });
            }
        }
    }
    hits
}

/// Evidence fields lowercased once, indexed like `EvidenceSource::ALL`.
struct LoweredEvidence([Option<String>; 4]);

impl LoweredEvidence {
    fn new(evidence: &Evidence) -> Self {
        Self(EvidenceSource::ALL.map(|source| evidence.field(source).map(str::to_ascii_lowercase)))
    }
}

/// Higher confidence wins, then larger sample size.
fn rank(a: &PlatformProfile, b: &PlatformProfile) -> Ordering {
    a.confidence_score
        .total_cmp(&b.confidence_score)
        .then(a.sample_size.cmp(&b.sample_size))
}

impl ProfileTable {
    /// Classify a page. Never fails: unmatched or tied evidence resolves to a
    /// generic fallback profile.
    pub fn classify(&self, evidence: &Evidence) -> Classification<'_> {
        let lowered = LoweredEvidence::new(evidence);
        let mut candidates = self
            .entries
            .iter()
            .filter(|entry| !entry.is_generic_fallback())
            .filter_map(|entry| {
                let hits = signature_hits(entry, &lowered);
                (!hits.is_empty()).then_some(Candidate { entry, hits })
            })
            .collect::<Vec<_>>();

        candidates.sort_by(|a, b| rank(&b.entry.profile, &a.entry.profile));

        let Some(best) = candidates.first() else {
            debug!(url = %evidence.url, "no platform signature matched");
            return self.fallback(evidence, Decision::Unmatched, Vec::new());
        };

        let tied = candidates
            .iter()
            .filter(|c| rank(&c.entry.profile, &best.entry.profile) == Ordering::Equal)
            .map(|c| c.entry.profile.slug.clone())
            .collect::<Vec<_>>();
        if tied.len() > 1 {
            debug!(url = %evidence.url, ?tied, "platform match is ambiguous");
            return self.fallback(evidence, Decision::Ambiguous, tied);
        }

        let Candidate { entry, hits } = candidates.swap_remove(0);
        debug!(url = %evidence.url, slug = %entry.profile.slug, "platform matched");
        Classification {
            profile: &entry.profile,
            decision: Decision::Matched,
            hits,
            ambiguous_with: Vec::new(),
        }
    }

    fn fallback(
        &self,
        evidence: &Evidence,
        decision: Decision,
        ambiguous_with: Vec<String>,
    ) -> Classification<'_> {
        let profile = if has_spa_root_marker(&evidence.html)
            && has_minimal_static_content(&evidence.html)
        {
            self.spa_fallback()
        } else {
            self.static_fallback()
        };
        Classification {
            profile,
            decision,
            hits: Vec::new(),
            ambiguous_with,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{SPA_JAVASCRIPT_SLUG, STATIC_HTML_SLUG};
    use commhub_core::{DetectionSignatures, PlatformCategory};

    fn table() -> ProfileTable {
        ProfileTable::builtin().unwrap()
    }

    fn custom(slug: &str, html: &[&str], confidence: f64, sample_size: u32) -> PlatformProfile {
        PlatformProfile {
            slug: slug.to_string(),
            display_name: slug.to_string(),
            category: PlatformCategory::Custom,
            detection_signatures: DetectionSignatures {
                html: html.iter().map(|s| s.to_string()).collect(),
                ..Default::default()
            },
            best_fetch_method: FetchMethod::HttpGet,
            fallback_fetch_method: None,
            needs_js_rendering: false,
            content_selectors: vec![],
            noise_selectors: vec![],
            rss_patterns: vec![],
            api_patterns: vec![],
            confidence_score: confidence,
            sample_size,
            notes: None,
        }
    }

    #[test]
    fn wp_content_paths_classify_as_wordpress() {
        let table = table();
        for html in [
            r#"<link rel="stylesheet" href="/wp-content/themes/twentytwenty/style.css">"#,
            r#"<img src="https://cdn.example.com/wp-content/uploads/2024/05/poster.jpg">"#,
            "/WP-CONTENT/ in upper case",
        ] {
            let result = table.classify(&Evidence::new("https://venue.example", html));
            assert_eq!(result.profile.slug, "wordpress", "html: {html}");
            assert_eq!(result.decision, Decision::Matched);
        }
    }

    #[test]
    fn wordpress_example_prefers_rss_feed() {
        let table = table();
        let evidence = Evidence::new("https://example.com/feed", r#"<div id="wp-content">...</div>"#);
        let result = table.classify(&evidence);
        assert_eq!(result.profile.best_fetch_method, FetchMethod::Rss);
        assert!(result.profile.rss_patterns.iter().any(|p| p == "/feed"));
        assert_eq!(result.fetch_plan(), (FetchMethod::Rss, Some(FetchMethod::HttpGet)));
        assert!(result
            .hits
            .iter()
            .any(|h| h.source == EvidenceSource::Html && h.needle == "wp-content"));
    }

    #[test]
    fn higher_confidence_wins_then_sample_size() {
        let mut table = table();
        table.upsert(custom("alpha", &["shared-marker"], 0.7, 10)).unwrap();
        table.upsert(custom("beta", &["shared-marker"], 0.8, 1)).unwrap();
        let evidence = Evidence::new("https://x.example", "<div class=shared-marker></div>");
        assert_eq!(table.classify(&evidence).profile.slug, "beta");

        table.upsert(custom("gamma", &["shared-marker"], 0.8, 50)).unwrap();
        let result = table.classify(&evidence);
        assert_eq!(result.profile.slug, "gamma");
        assert_eq!(result.decision, Decision::Matched);
    }

    #[test]
    fn full_tie_falls_back_to_generic_profile() {
        let mut table = table();
        table.upsert(custom("left", &["twin-marker"], 0.7, 10)).unwrap();
        table.upsert(custom("right", &["twin-marker"], 0.7, 10)).unwrap();

        let result = table.classify(&Evidence::new("https://x.example", "<p>twin-marker</p>"));
        assert_eq!(result.decision, Decision::Ambiguous);
        assert_eq!(result.profile.slug, STATIC_HTML_SLUG);
        assert_eq!(result.ambiguous_with.len(), 2);

        let shell = r#"<div id="root"></div><script>twin-marker</script>"#;
        let result = table.classify(&Evidence::new("https://x.example", shell));
        assert_eq!(result.decision, Decision::Ambiguous);
        assert_eq!(result.profile.slug, SPA_JAVASCRIPT_SLUG);
    }

    #[test]
    fn unmatched_plain_pages_use_static_html() {
        let evidence = Evidence::new(
            "https://smalltown-bakery.example/about",
            "<html><body><h1>About us</h1><p>Fresh bread daily.</p></body></html>",
        )
        .with_server_header("nginx/1.24");
        let table = table();
        let result = table.classify(&evidence);
        assert_eq!(result.profile.slug, STATIC_HTML_SLUG);
        assert_eq!(result.decision, Decision::Unmatched);
        assert!(result.is_fallback());
        assert!(result.hits.is_empty());
    }

    #[test]
    fn next_root_without_content_uses_spa_profile() {
        let html = r#"<html><head><script src="/bundle.js"></script></head><body><div id="__next"></div></body></html>"#;
        let table = table();
        let result = table.classify(&Evidence::new("https://app.example", html));
        assert_eq!(result.profile.slug, SPA_JAVASCRIPT_SLUG);
        assert!(result.profile.needs_js_rendering);
    }

    #[test]
    fn spa_marker_with_rendered_content_stays_static() {
        let body = "<p>Thursday open mic, doors at seven, sign-up sheet at the bar.</p>".repeat(6);
        let html = format!(r#"<div id="app">{body}</div>"#);
        let table = table();
        let result = table.classify(&Evidence::new("https://club.example", html));
        assert_eq!(result.profile.slug, STATIC_HTML_SLUG);
    }

    #[test]
    fn meta_generator_and_url_are_matched() {
        let table = table();
        let ghost = Evidence::new("https://blog.example", "<html></html>").with_meta_generator("Ghost 5.2");
        assert_eq!(table.classify(&ghost).profile.slug, "ghost");

        let wix = Evidence::new("https://someband.wixsite.com/home", "<html></html>");
        let result = table.classify(&wix);
        assert_eq!(result.profile.slug, "wix");
        assert!(result.profile.needs_js_rendering);
    }

    #[test]
    fn generic_profiles_are_never_signature_matched() {
        let mut table = table();
        let mut spa = table.spa_fallback().clone();
        spa.detection_signatures.html = vec!["anything".to_string()];
        table.upsert(spa).unwrap();
        let result = table.classify(&Evidence::new("https://x.example", "<p>anything</p>"));
        assert_eq!(result.decision, Decision::Unmatched);
        assert_eq!(result.profile.slug, STATIC_HTML_SLUG);
    }

    #[test]
    fn report_serializes_decision_and_profile() {
        let table = table();
        let report = table
            .classify(&Evidence::new("https://shop.example", r#"<script src="https://cdn.shopify.com/s/x.js">"#))
            .to_report();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["decision"], "matched");
        assert_eq!(json["profile"]["slug"], "shopify");
        assert_eq!(json["profile"]["best_fetch_method"], "api");
    }
}
