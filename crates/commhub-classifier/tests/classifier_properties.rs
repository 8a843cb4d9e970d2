use commhub_classifier::{
    evidence_from_page, probe, ClassifierError, Decision, ProfileTable, SPA_JAVASCRIPT_SLUG,
    STATIC_HTML_SLUG,
};
use commhub_core::{Evidence, FetchMethod};
use commhub_fetch::{FetchError, HttpClientConfig, HttpFetcher};

#[test]
fn every_builtin_signature_classifies_to_its_own_profile_or_a_stronger_one() {
    let table = ProfileTable::builtin().unwrap();
    for profile in table.profiles() {
        for needle in &profile.detection_signatures.html {
            let result = table.classify(&Evidence::new("https://probe.example", needle.clone()));
            assert_eq!(result.decision, Decision::Matched, "needle {needle}");
            assert!(
                result.profile.confidence_score >= profile.confidence_score,
                "{needle} resolved to weaker profile {}",
                result.profile.slug
            );
        }
    }
}

#[test]
fn wordpress_generator_page_end_to_end() {
    let html = r#"<!doctype html>
<html>
  <head>
    <meta name="generator" content="WordPress 6.5">
    <link rel="alternate" type="application/rss+xml" href="https://riverfront.example/feed/">
  </head>
  <body><article><p>Summer concert series on the riverfront.</p></article></body>
</html>"#;
    let evidence = evidence_from_page("https://riverfront.example/events", html, Some("Apache"));
    let table = ProfileTable::builtin().unwrap();
    let result = table.classify(&evidence);
    assert_eq!(result.profile.slug, "wordpress");
    assert_eq!(result.fetch_plan().0, FetchMethod::Rss);
}

#[test]
fn classification_is_total_for_odd_inputs() {
    let table = ProfileTable::builtin().unwrap();
    for evidence in [
        Evidence::default(),
        Evidence::new("", "\u{0}\u{ffff}<<<>>>"),
        Evidence::new("ftp://weird", "<div id=\"__nuxt\">").with_server_header(""),
    ] {
        let result = table.classify(&evidence);
        assert!(
            result.profile.slug == STATIC_HTML_SLUG || result.profile.slug == SPA_JAVASCRIPT_SLUG
        );
    }
}

#[tokio::test]
async fn probe_reports_invalid_urls_without_network() {
    let http = HttpFetcher::new(HttpClientConfig::default()).unwrap();
    let table = ProfileTable::builtin().unwrap();
    let err = probe(&http, &table, "definitely not a url").await.unwrap_err();
    assert!(matches!(err, ClassifierError::Fetch(FetchError::InvalidUrl { .. })));
}
