//! Axum + Askama admin UI for CommHub: the Performer resource screens, its
//! JSON API and a classification endpoint.

use std::sync::Arc;

use anyhow::Context;
use askama::Template;
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use commhub_classifier::{evidence_from_page, ProfileTable};
use commhub_seed::{
    connect_store, load_profile_table, SeedConfig, SeedOrchestrator, SeedStore, TableCounts,
};
use serde::Deserialize;
use tokio::net::TcpListener;
use tracing::info;

pub mod performers;
pub mod resource;

use resource::{performer_resource, ResourceDefinition};

pub const CRATE_NAME: &str = "commhub-web";

pub struct AppState {
    pub store: Arc<dyn SeedStore>,
    pub profiles: Arc<ProfileTable>,
    pub performers: ResourceDefinition,
}

impl AppState {
    pub fn new(store: Arc<dyn SeedStore>, profiles: ProfileTable) -> Self {
        Self {
            store,
            profiles: Arc::new(profiles),
            performers: performer_resource(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebConfig {
    pub host: String,
    pub port: u16,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

impl WebConfig {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            host: std::env::var("COMMHUB_WEB_HOST")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(d.host),
            port: std::env::var("COMMHUB_WEB_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(d.port),
        }
    }
}

#[derive(Template)]
#[template(path = "index.html")]
struct IndexTemplate {
    counts: TableCounts,
    profile_count: usize,
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/admin/resources/performers", get(performer_resource_handler))
        .route(
            "/performers",
            get(performers::performers_page).post(performers::create_performer_form),
        )
        .route("/performers/new", get(performers::new_performer_page))
        .route(
            "/performers/{id}",
            get(performers::performer_detail_page).post(performers::update_performer_form),
        )
        .route("/performers/{id}/edit", get(performers::edit_performer_page))
        .route(
            "/api/performers",
            get(performers::api_list_performers).post(performers::api_create_performer),
        )
        .route(
            "/api/performers/{id}",
            get(performers::api_get_performer).put(performers::api_update_performer),
        )
        .route("/api/classify", post(classify_handler))
        .route("/api/platform-profiles", get(platform_profiles_handler))
        .with_state(Arc::new(state))
}

pub async fn serve(config: &WebConfig, state: AppState) -> anyhow::Result<()> {
    let listener = TcpListener::bind((config.host.as_str(), config.port))
        .await
        .with_context(|| format!("binding {}:{}", config.host, config.port))?;
    info!(host = %config.host, port = config.port, "commhub admin listening");
    axum::serve(listener, app(state)).await?;
    Ok(())
}

/// Build state from the environment and serve. Without `DATABASE_URL` the
/// in-memory store is seeded first so the screens have rows to show.
pub async fn serve_from_env() -> anyhow::Result<()> {
    let seed_config = SeedConfig::from_env();
    let store = connect_store(&seed_config).await?;
    let profiles = load_profile_table(&seed_config).await?;
    if seed_config.database_url.is_none() {
        SeedOrchestrator::standard(profiles.profiles().cloned().collect())
            .run(store.as_ref(), seed_config.seed, seed_config.counts)
            .await
            .context("seeding the in-memory store")?;
    }
    serve(&WebConfig::from_env(), AppState::new(store, profiles)).await
}

async fn index_handler(State(state): State<Arc<AppState>>) -> Response {
    match state.store.counts().await {
        Ok(counts) => render_html(IndexTemplate {
            counts,
            profile_count: state.profiles.len(),
        }),
        Err(err) => server_error(err.into()),
    }
}

async fn performer_resource_handler(State(state): State<Arc<AppState>>) -> Response {
    Json(state.performers.clone()).into_response()
}

async fn platform_profiles_handler(State(state): State<Arc<AppState>>) -> Response {
    Json(state.profiles.profiles().collect::<Vec<_>>()).into_response()
}

/// Evidence for `/api/classify`. A missing `meta_generator` is read from the HTML.
#[derive(Debug, Deserialize)]
pub struct ClassifyRequest {
    pub url: String,
    #[serde(default)]
    pub html: String,
    #[serde(default)]
    pub server: Option<String>,
    #[serde(default)]
    pub meta_generator: Option<String>,
}

async fn classify_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ClassifyRequest>,
) -> Response {
    let mut evidence = evidence_from_page(&req.url, &req.html, req.server.as_deref());
    if let Some(generator) = req.meta_generator.filter(|g| !g.trim().is_empty()) {
        evidence.meta_generator = Some(generator);
    }
    let classification = state.profiles.classify(&evidence);
    info!(
        url = %req.url,
        platform = %classification.profile.slug,
        decision = ?classification.decision,
        "classified"
    );
    Json(classification.to_report()).into_response()
}

pub(crate) fn render_html<T: Template>(tpl: T) -> Response {
    match tpl.render() {
        Ok(html) => Html(html).into_response(),
        Err(err) => server_error(anyhow::anyhow!(err.to_string())),
    }
}

pub(crate) fn server_error(err: anyhow::Error) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Html(format!("Server error: {}", err)),
    )
        .into_response()
}
