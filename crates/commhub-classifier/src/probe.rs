//! Fetch a live page and classify it.

use commhub_core::Evidence;
use commhub_fetch::HttpFetcher;
use serde::Serialize;
use tracing::info;

use crate::classify::ClassificationReport;
use crate::evidence::evidence_from_page;
use crate::table::ProfileTable;
use crate::ClassifierError;

#[derive(Debug, Clone, Serialize)]
pub struct ProbeReport {
    pub requested_url: String,
    pub final_url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub evidence: Evidence,
    pub classification: ClassificationReport,
}

pub async fn probe(
    http: &HttpFetcher,
    table: &ProfileTable,
    url: &str,
) -> Result<ProbeReport, ClassifierError> {
    let page = http.fetch_page(url).await?;
    let evidence = evidence_from_page(&page.final_url, &page.body_text(), page.server_header.as_deref());
    let classification = table.classify(&evidence).to_report();
    info!(
        url,
        slug = %classification.profile.slug,
        best_fetch_method = %classification.profile.best_fetch_method,
        "probed site"
    );
    Ok(ProbeReport {
        requested_url: url.to_string(),
        final_url: page.final_url,
        status: page.status.as_u16(),
        content_type: page.content_type,
        evidence,
        classification,
    })
}
