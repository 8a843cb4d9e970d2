//! Performer screens (list, detail, create, edit) and the matching JSON API.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use askama::Template;
use axum::{
    extract::{Path as AxumPath, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    Form, Json,
};
use chrono::{DateTime, Utc};
use commhub_core::Performer;
use commhub_seed::StoreError;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::resource::{performer_cell, ResourceDefinition, SortDirection};
use crate::{render_html, server_error, AppState};

const MAX_PER_PAGE: usize = 100;
const MAX_GENRES: usize = 5;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PerformerQuery {
    pub search: Option<String>,
    pub genre: Option<String>,
    pub sort: Option<String>,
    pub dir: Option<SortDirection>,
    pub page: Option<usize>,
    pub per_page: Option<usize>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformerPage {
    pub data: Vec<Performer>,
    pub page: usize,
    pub per_page: usize,
    pub total: usize,
    pub total_pages: usize,
}

fn compare(a: &Performer, b: &Performer, field: &str) -> Ordering {
    match field {
        "name" => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
        "home_city" => a.home_city.to_lowercase().cmp(&b.home_city.to_lowercase()),
        "years_active" => a.years_active.cmp(&b.years_active),
        "base_price" => a
            .base_price
            .unwrap_or(-1.0)
            .total_cmp(&b.base_price.unwrap_or(-1.0)),
        _ => a.created_at.cmp(&b.created_at),
    }
}

/// Filter, sort and paginate performers according to the resource definition.
pub fn list_performers(
    def: &ResourceDefinition,
    all: Vec<Performer>,
    query: &PerformerQuery,
) -> PerformerPage {
    let search = non_empty(&query.search).map(str::to_lowercase);
    let genre = non_empty(&query.genre);

    let mut rows = all
        .into_iter()
        .filter(|p| {
            search.as_ref().map_or(true, |needle| {
                def.searchable_fields()
                    .any(|f| performer_cell(p, f.name).to_lowercase().contains(needle.as_str()))
            })
        })
        .filter(|p| genre.map_or(true, |g| p.genres.iter().any(|pg| pg.eq_ignore_ascii_case(g))))
        .collect::<Vec<_>>();

    let (sort_field, direction) = match non_empty(&query.sort).filter(|s| def.is_sortable(s)) {
        Some(field) => (field, query.dir.unwrap_or(SortDirection::Asc)),
        None => (
            def.default_sort.0,
            query.dir.unwrap_or(def.default_sort.1),
        ),
    };
    rows.sort_by(|a, b| {
        let ord = compare(a, b, sort_field);
        match direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    });

    let per_page = query.per_page.unwrap_or(def.per_page).clamp(1, MAX_PER_PAGE);
    let total = rows.len();
    let total_pages = total.max(1).div_ceil(per_page);
    let page = query.page.unwrap_or(1).clamp(1, total_pages);
    let data = rows
        .into_iter()
        .skip((page - 1) * per_page)
        .take(per_page)
        .collect();

    PerformerPage {
        data,
        page,
        per_page,
        total,
        total_pages,
    }
}

/// Per-field validation messages, keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn first(&self, field: &str) -> Option<&str> {
        self.0
            .get(field)
            .and_then(|msgs| msgs.first())
            .map(String::as_str)
    }

    fn merge(&mut self, other: FieldErrors) {
        for (field, messages) in other.0 {
            self.0.entry(field).or_default().extend(messages);
        }
    }
}

/// Create/update payload. Omitted fields take the defaults of a new performer.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PerformerInput {
    pub workspace_id: Option<Uuid>,
    pub name: String,
    pub genres: Vec<String>,
    pub bio: Option<String>,
    pub home_city: String,
    pub years_active: i32,
    pub is_verified: bool,
    pub is_touring: bool,
    pub available_for_booking: bool,
    pub base_price: Option<f64>,
    pub minimum_booking_hours: i32,
}

impl Default for PerformerInput {
    fn default() -> Self {
        Self {
            workspace_id: None,
            name: String::new(),
            genres: Vec::new(),
            bio: None,
            home_city: String::new(),
            years_active: 0,
            is_verified: false,
            is_touring: false,
            available_for_booking: true,
            base_price: None,
            minimum_booking_hours: 1,
        }
    }
}

impl PerformerInput {
    /// Trim text, lowercase and dedupe genres, round prices to cents.
    pub fn normalized(mut self) -> Self {
        self.name = self.name.trim().to_string();
        self.home_city = self.home_city.trim().to_string();
        self.bio = self
            .bio
            .map(|b| b.trim().to_string())
            .filter(|b| !b.is_empty());
        let mut seen = BTreeSet::new();
        self.genres = self
            .genres
            .iter()
            .map(|g| g.trim().to_lowercase())
            .filter(|g| seen.insert(g.clone()))
            .collect();
        self.base_price = self.base_price.map(|p| (p * 100.0).round() / 100.0);
        self
    }

    /// Check every field rule. `workspaces` are the ids a performer may belong to.
    pub fn validate(&self, def: &ResourceDefinition, workspaces: &[Uuid]) -> FieldErrors {
        let mut errors = FieldErrors::default();

        for field in def.form_fields().filter(|f| f.required) {
            let missing = match field.name {
                "workspace_id" => self.workspace_id.is_none(),
                "name" => self.name.trim().is_empty(),
                "genres" => self.genres.is_empty(),
                "home_city" => self.home_city.trim().is_empty(),
                _ => false,
            };
            if missing {
                errors.add(field.name, "is required");
            }
        }

        if let Some(id) = self.workspace_id {
            if !workspaces.contains(&id) {
                errors.add("workspace_id", "does not match an existing workspace");
            }
        }
        if self.name.chars().count() > 120 {
            errors.add("name", "must be at most 120 characters");
        }
        if self.genres.len() > MAX_GENRES {
            errors.add("genres", format!("must list at most {MAX_GENRES} genres"));
        }
        if self
            .genres
            .iter()
            .any(|g| g.trim().is_empty() || g.chars().count() > 40)
        {
            errors.add("genres", "each genre must be 1 to 40 characters");
        }
        if self.home_city.chars().count() > 120 {
            errors.add("home_city", "must be at most 120 characters");
        }
        if self.bio.as_ref().is_some_and(|b| b.chars().count() > 2_000) {
            errors.add("bio", "must be at most 2000 characters");
        }
        if !(0..=80).contains(&self.years_active) {
            errors.add("years_active", "must be between 0 and 80");
        }
        if self
            .base_price
            .is_some_and(|p| !p.is_finite() || p < 0.0)
        {
            errors.add("base_price", "must be zero or more");
        }
        if !(1..=24).contains(&self.minimum_booking_hours) {
            errors.add("minimum_booking_hours", "must be between 1 and 24");
        }
        errors
    }

    fn build(
        self,
        id: Uuid,
        workspace_id: Uuid,
        created_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Performer {
        Performer {
            id,
            workspace_id,
            name: self.name,
            genres: self.genres,
            bio: self.bio,
            home_city: self.home_city,
            years_active: self.years_active,
            is_verified: self.is_verified,
            is_touring: self.is_touring,
            available_for_booking: self.available_for_booking,
            base_price: self.base_price,
            minimum_booking_hours: self.minimum_booking_hours,
            created_at,
            updated_at: now,
        }
    }
}

/// Raw values posted by the HTML form. Checkboxes are present only when ticked.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PerformerFormFields {
    pub workspace_id: String,
    pub name: String,
    pub genres: String,
    pub bio: String,
    pub home_city: String,
    pub years_active: String,
    pub base_price: String,
    pub minimum_booking_hours: String,
    pub is_verified: Option<String>,
    pub is_touring: Option<String>,
    pub available_for_booking: Option<String>,
}

fn parse_optional<T: std::str::FromStr>(
    raw: &str,
    field: &str,
    message: &str,
    errors: &mut FieldErrors,
) -> Option<T> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            errors.add(field, message);
            None
        }
    }
}

impl PerformerFormFields {
    fn new_performer() -> Self {
        Self {
            minimum_booking_hours: "1".to_string(),
            available_for_booking: Some("on".to_string()),
            ..Self::default()
        }
    }

    fn from_performer(p: &Performer) -> Self {
        let flag = |on: bool| on.then(|| "on".to_string());
        Self {
            workspace_id: p.workspace_id.to_string(),
            name: p.name.clone(),
            genres: p.genres.join(", "),
            bio: p.bio.clone().unwrap_or_default(),
            home_city: p.home_city.clone(),
            years_active: p.years_active.to_string(),
            base_price: p.base_price.map(|v| format!("{v:.2}")).unwrap_or_default(),
            minimum_booking_hours: p.minimum_booking_hours.to_string(),
            is_verified: flag(p.is_verified),
            is_touring: flag(p.is_touring),
            available_for_booking: flag(p.available_for_booking),
        }
    }

    /// Convert text inputs to a typed payload, reporting values that do not parse.
    pub fn parse(&self) -> (PerformerInput, FieldErrors) {
        let mut errors = FieldErrors::default();
        let input = PerformerInput {
            workspace_id: parse_optional(
                &self.workspace_id,
                "workspace_id",
                "is not a valid id",
                &mut errors,
            ),
            name: self.name.clone(),
            genres: self
                .genres
                .split(',')
                .map(str::trim)
                .filter(|g| !g.is_empty())
                .map(ToString::to_string)
                .collect(),
            bio: Some(self.bio.clone()),
            home_city: self.home_city.clone(),
            years_active: parse_optional(
                &self.years_active,
                "years_active",
                "must be a whole number",
                &mut errors,
            )
            .unwrap_or(0),
            is_verified: self.is_verified.is_some(),
            is_touring: self.is_touring.is_some(),
            available_for_booking: self.available_for_booking.is_some(),
            base_price: parse_optional(&self.base_price, "base_price", "must be a number", &mut errors),
            minimum_booking_hours: parse_optional(
                &self.minimum_booking_hours,
                "minimum_booking_hours",
                "must be a whole number",
                &mut errors,
            )
            .unwrap_or(1),
        };
        (input, errors)
    }

    fn value(&self, field: &str) -> String {
        match field {
            "workspace_id" => self.workspace_id.clone(),
            "name" => self.name.clone(),
            "genres" => self.genres.clone(),
            "bio" => self.bio.clone(),
            "home_city" => self.home_city.clone(),
            "years_active" => self.years_active.clone(),
            "base_price" => self.base_price.clone(),
            "minimum_booking_hours" => self.minimum_booking_hours.clone(),
            _ => String::new(),
        }
    }

    fn checked(&self, field: &str) -> bool {
        match field {
            "is_verified" => self.is_verified.is_some(),
            "is_touring" => self.is_touring.is_some(),
            "available_for_booking" => self.available_for_booking.is_some(),
            _ => false,
        }
    }
}

struct SelectOption {
    value: String,
    label: String,
    selected: bool,
}

struct FormFieldView {
    name: &'static str,
    label: &'static str,
    input: &'static str,
    value: String,
    checked: bool,
    required: bool,
    help: String,
    error: String,
    options: Vec<SelectOption>,
}

struct RowView {
    id: String,
    title: String,
    cells: Vec<String>,
}

struct DetailRow {
    label: &'static str,
    value: String,
}

#[derive(Template)]
#[template(path = "performers.html")]
struct PerformersTemplate {
    title: String,
    columns: Vec<&'static str>,
    rows: Vec<RowView>,
    search: String,
    selected_genre: String,
    selected_sort: String,
    genres: Vec<SelectOption>,
    sort_options: Vec<SelectOption>,
    dir_desc: bool,
    page: usize,
    per_page: usize,
    total: usize,
    total_pages: usize,
    prev_page: usize,
    next_page: usize,
}

#[derive(Template)]
#[template(path = "performer_detail.html")]
struct PerformerDetailTemplate {
    title: String,
    id: String,
    rows: Vec<DetailRow>,
}

#[derive(Template)]
#[template(path = "performer_form.html")]
struct PerformerFormTemplate {
    title: String,
    action: String,
    cancel_href: String,
    fields: Vec<FormFieldView>,
    has_errors: bool,
}

pub(crate) async fn performers_page(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PerformerQuery>,
) -> Response {
    let def = &state.performers;
    let all = match state.store.performers().await {
        Ok(rows) => rows,
        Err(err) => return server_error(err.into()),
    };
    let known_genres = all
        .iter()
        .flat_map(|p| p.genres.iter().cloned())
        .collect::<BTreeSet<_>>();
    let listing = list_performers(def, all, &query);

    let selected_genre = non_empty(&query.genre).unwrap_or_default().to_lowercase();
    let selected_sort = non_empty(&query.sort)
        .filter(|s| def.is_sortable(s))
        .unwrap_or(def.default_sort.0);
    let table_fields = def
        .table_fields()
        .filter(|f| f.name != def.title_field)
        .collect::<Vec<_>>();

    render_html(PerformersTemplate {
        title: def.plural_label.to_string(),
        columns: table_fields.iter().map(|f| f.label).collect(),
        rows: listing
            .data
            .iter()
            .map(|p| RowView {
                id: p.id.to_string(),
                title: performer_cell(p, def.title_field),
                cells: table_fields
                    .iter()
                    .map(|f| performer_cell(p, f.name))
                    .collect(),
            })
            .collect(),
        search: non_empty(&query.search).unwrap_or_default().to_string(),
        genres: known_genres
            .into_iter()
            .map(|g| SelectOption {
                selected: g == selected_genre,
                label: g.clone(),
                value: g,
            })
            .collect(),
        selected_genre,
        sort_options: def
            .fields
            .iter()
            .filter(|f| f.sortable)
            .map(|f| SelectOption {
                value: f.name.to_string(),
                label: f.label.to_string(),
                selected: f.name == selected_sort,
            })
            .collect(),
        selected_sort: selected_sort.to_string(),
        dir_desc: query.dir.unwrap_or(def.default_sort.1) == SortDirection::Desc,
        page: listing.page,
        per_page: listing.per_page,
        total: listing.total,
        total_pages: listing.total_pages,
        prev_page: listing.page.saturating_sub(1).max(1),
        next_page: (listing.page + 1).min(listing.total_pages),
    })
}

fn not_found_page() -> Response {
    (StatusCode::NOT_FOUND, Html("Performer not found".to_string())).into_response()
}

async fn load_performer(state: &AppState, raw_id: &str) -> Result<Option<Performer>, StoreError> {
    match Uuid::parse_str(raw_id) {
        Ok(id) => state.store.get_performer(id).await,
        Err(_) => Ok(None),
    }
}

pub(crate) async fn performer_detail_page(
    State(state): State<Arc<AppState>>,
    AxumPath(id): AxumPath<String>,
) -> Response {
    match load_performer(&state, &id).await {
        Ok(Some(performer)) => render_html(PerformerDetailTemplate {
            title: performer.name.clone(),
            id: performer.id.to_string(),
            rows: state
                .performers
                .fields
                .iter()
                .map(|f| DetailRow {
                    label: f.label,
                    value: performer_cell(&performer, f.name),
                })
                .collect(),
        }),
        Ok(None) => not_found_page(),
        Err(err) => server_error(err.into()),
    }
}

async fn workspace_choices(state: &AppState) -> Result<Vec<(Uuid, String)>, StoreError> {
    Ok(state
        .store
        .workspaces()
        .await?
        .into_iter()
        .map(|w| (w.id, w.name))
        .collect())
}

fn form_view(
    def: &ResourceDefinition,
    fields: &PerformerFormFields,
    errors: &FieldErrors,
    workspaces: &[(Uuid, String)],
) -> Vec<FormFieldView> {
    def.form_fields()
        .map(|f| {
            let value = fields.value(f.name);
            let options = if f.references.is_some() {
                workspaces
                    .iter()
                    .map(|(id, name)| SelectOption {
                        selected: id.to_string() == value,
                        value: id.to_string(),
                        label: name.clone(),
                    })
                    .collect()
            } else {
                Vec::new()
            };
            FormFieldView {
                name: f.name,
                label: f.label,
                input: f.kind.input_type(),
                checked: fields.checked(f.name),
                value,
                required: f.required,
                help: f.help.unwrap_or_default().to_string(),
                error: errors.first(f.name).unwrap_or_default().to_string(),
                options,
            }
        })
        .collect()
}

async fn render_form(
    state: &AppState,
    status: StatusCode,
    title: String,
    action: String,
    cancel_href: String,
    fields: &PerformerFormFields,
    errors: &FieldErrors,
) -> Response {
    let workspaces = match workspace_choices(state).await {
        Ok(w) => w,
        Err(err) => return server_error(err.into()),
    };
    let mut resp = render_html(PerformerFormTemplate {
        title,
        action,
        cancel_href,
        fields: form_view(&state.performers, fields, errors, &workspaces),
        has_errors: !errors.is_empty(),
    });
    if resp.status() == StatusCode::OK {
        *resp.status_mut() = status;
    }
    resp
}

pub(crate) async fn new_performer_page(State(state): State<Arc<AppState>>) -> Response {
    render_form(
        &state,
        StatusCode::OK,
        "New performer".to_string(),
        "/performers".to_string(),
        "/performers".to_string(),
        &PerformerFormFields::new_performer(),
        &FieldErrors::default(),
    )
    .await
}

pub(crate) async fn edit_performer_page(
    State(state): State<Arc<AppState>>,
    AxumPath(id): AxumPath<String>,
) -> Response {
    match load_performer(&state, &id).await {
        Ok(Some(p)) => {
            render_form(
                &state,
                StatusCode::OK,
                format!("Edit {}", p.name),
                format!("/performers/{}", p.id),
                format!("/performers/{}", p.id),
                &PerformerFormFields::from_performer(&p),
                &FieldErrors::default(),
            )
            .await
        }
        Ok(None) => not_found_page(),
        Err(err) => server_error(err.into()),
    }
}

/// Why a save did not happen.
enum SaveError {
    Invalid(FieldErrors),
    NotFound,
    Store(StoreError),
}

impl From<StoreError> for SaveError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::ForeignKey { field, .. } => {
                let mut errors = FieldErrors::default();
                errors.add(field, "does not match an existing workspace");
                SaveError::Invalid(errors)
            }
            other => SaveError::Store(other),
        }
    }
}

async fn workspace_ids(state: &AppState) -> Result<Vec<Uuid>, StoreError> {
    Ok(state.store.workspaces().await?.into_iter().map(|w| w.id).collect())
}

async fn create_performer(
    state: &AppState,
    input: PerformerInput,
    parse_errors: FieldErrors,
) -> Result<Performer, SaveError> {
    let input = input.normalized();
    let mut errors = parse_errors;
    errors.merge(input.validate(&state.performers, &workspace_ids(state).await?));
    let Some(workspace_id) = input.workspace_id.filter(|_| errors.is_empty()) else {
        return Err(SaveError::Invalid(errors));
    };
    let now = Utc::now();
    let performer = input.build(Uuid::new_v4(), workspace_id, now, now);
    state.store.insert_performer(&performer).await?;
    info!(performer_id = %performer.id, name = %performer.name, "performer created");
    Ok(performer)
}

async fn update_performer(
    state: &AppState,
    id: Uuid,
    mut input: PerformerInput,
    parse_errors: FieldErrors,
) -> Result<Performer, SaveError> {
    let Some(existing) = state.store.get_performer(id).await? else {
        return Err(SaveError::NotFound);
    };
    input.workspace_id = input.workspace_id.or(Some(existing.workspace_id));
    let input = input.normalized();
    let mut errors = parse_errors;
    errors.merge(input.validate(&state.performers, &workspace_ids(state).await?));
    let Some(workspace_id) = input.workspace_id.filter(|_| errors.is_empty()) else {
        return Err(SaveError::Invalid(errors));
    };
    let performer = input.build(id, workspace_id, existing.created_at, Utc::now());
    if !state.store.update_performer(&performer).await? {
        return Err(SaveError::NotFound);
    }
    info!(performer_id = %performer.id, "performer updated");
    Ok(performer)
}

pub(crate) async fn create_performer_form(
    State(state): State<Arc<AppState>>,
    Form(fields): Form<PerformerFormFields>,
) -> Response {
    let (input, parse_errors) = fields.parse();
    match create_performer(&state, input, parse_errors).await {
        Ok(p) => Redirect::to(&format!("/performers/{}", p.id)).into_response(),
        Err(SaveError::Invalid(errors)) => {
            render_form(
                &state,
                StatusCode::UNPROCESSABLE_ENTITY,
                "New performer".to_string(),
                "/performers".to_string(),
                "/performers".to_string(),
                &fields,
                &errors,
            )
            .await
        }
        Err(SaveError::NotFound) => not_found_page(),
        Err(SaveError::Store(err)) => server_error(err.into()),
    }
}

pub(crate) async fn update_performer_form(
    State(state): State<Arc<AppState>>,
    AxumPath(id): AxumPath<String>,
    Form(fields): Form<PerformerFormFields>,
) -> Response {
    let Ok(id) = Uuid::parse_str(&id) else {
        return not_found_page();
    };
    let (input, parse_errors) = fields.parse();
    match update_performer(&state, id, input, parse_errors).await {
        Ok(p) => Redirect::to(&format!("/performers/{}", p.id)).into_response(),
        Err(SaveError::Invalid(errors)) => {
            render_form(
                &state,
                StatusCode::UNPROCESSABLE_ENTITY,
                "Edit performer".to_string(),
                format!("/performers/{id}"),
                format!("/performers/{id}"),
                &fields,
                &errors,
            )
            .await
        }
        Err(SaveError::NotFound) => not_found_page(),
        Err(SaveError::Store(err)) => server_error(err.into()),
    }
}

fn json_error(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({ "message": message }))).into_response()
}

fn api_save_error(err: SaveError) -> Response {
    match err {
        SaveError::Invalid(errors) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(serde_json::json!({
                "message": "validation failed",
                "errors": errors,
            })),
        )
            .into_response(),
        SaveError::NotFound => json_error(StatusCode::NOT_FOUND, "performer not found"),
        SaveError::Store(err) => json_error(StatusCode::INTERNAL_SERVER_ERROR, &err.to_string()),
    }
}

pub(crate) async fn api_list_performers(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PerformerQuery>,
) -> Response {
    match state.store.performers().await {
        Ok(all) => Json(list_performers(&state.performers, all, &query)).into_response(),
        Err(err) => json_error(StatusCode::INTERNAL_SERVER_ERROR, &err.to_string()),
    }
}

pub(crate) async fn api_get_performer(
    State(state): State<Arc<AppState>>,
    AxumPath(id): AxumPath<String>,
) -> Response {
    match load_performer(&state, &id).await {
        Ok(Some(p)) => Json(p).into_response(),
        Ok(None) => json_error(StatusCode::NOT_FOUND, "performer not found"),
        Err(err) => json_error(StatusCode::INTERNAL_SERVER_ERROR, &err.to_string()),
    }
}

pub(crate) async fn api_create_performer(
    State(state): State<Arc<AppState>>,
    Json(input): Json<PerformerInput>,
) -> Response {
    match create_performer(&state, input, FieldErrors::default()).await {
        Ok(p) => (StatusCode::CREATED, Json(p)).into_response(),
        Err(err) => api_save_error(err),
    }
}

pub(crate) async fn api_update_performer(
    State(state): State<Arc<AppState>>,
    AxumPath(id): AxumPath<String>,
    Json(input): Json<PerformerInput>,
) -> Response {
    let Ok(id) = Uuid::parse_str(&id) else {
        return json_error(StatusCode::NOT_FOUND, "performer not found");
    };
    match update_performer(&state, id, input, FieldErrors::default()).await {
        Ok(p) => Json(p).into_response(),
        Err(err) => api_save_error(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::performer_resource;
    use chrono::TimeZone;

    fn performer(name: &str, genres: &[&str], city: &str, day: u32) -> Performer {
        let at = Utc.with_ymd_and_hms(2026, 3, day, 9, 0, 0).unwrap();
        Performer {
            id: Uuid::new_v4(),
            workspace_id: Uuid::nil(),
            name: name.to_string(),
            genres: genres.iter().map(|g| g.to_string()).collect(),
            bio: None,
            home_city: city.to_string(),
            years_active: day as i32,
            is_verified: false,
            is_touring: false,
            available_for_booking: true,
            base_price: None,
            minimum_booking_hours: 1,
            created_at: at,
            updated_at: at,
        }
    }

    fn roster() -> Vec<Performer> {
        vec![
            performer("The Copper Owls", &["folk"], "Asheville", 1),
            performer("Neon Rivers", &["electronic", "indie"], "Portland", 2),
            performer("Velvet Saints", &["soul", "jazz"], "Savannah", 3),
            performer("Jazz Engines", &["jazz"], "Madison", 4),
        ]
    }

    #[test]
    fn search_matches_any_searchable_field() {
        let def = performer_resource();
        let query = PerformerQuery {
            search: Some("  portland ".into()),
            ..Default::default()
        };
        let page = list_performers(&def, roster(), &query);
        assert_eq!(page.total, 1);
        assert_eq!(page.data[0].name, "Neon Rivers");
    }

    #[test]
    fn genre_filter_ignores_case_and_defaults_to_newest_first() {
        let def = performer_resource();
        let query = PerformerQuery {
            genre: Some("JAZZ".into()),
            ..Default::default()
        };
        let names = list_performers(&def, roster(), &query)
            .data
            .into_iter()
            .map(|p| p.name)
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["Jazz Engines", "Velvet Saints"]);
    }

    #[test]
    fn unknown_sort_falls_back_and_pages_clamp() {
        let def = performer_resource();
        let query = PerformerQuery {
            sort: Some("bio".into()),
            page: Some(9),
            per_page: Some(3),
            ..Default::default()
        };
        let page = list_performers(&def, roster(), &query);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.page, 2);
        assert_eq!(page.data.len(), 1);
        assert_eq!(page.data[0].name, "The Copper Owls");

        let by_name = PerformerQuery {
            sort: Some("name".into()),
            ..Default::default()
        };
        assert_eq!(list_performers(&def, roster(), &by_name).data[0].name, "Jazz Engines");
    }

    #[test]
    fn validation_reports_every_bad_field() {
        let def = performer_resource();
        let input = PerformerInput {
            workspace_id: Some(Uuid::from_u128(7)),
            years_active: 200,
            base_price: Some(-5.0),
            minimum_booking_hours: 0,
            genres: (0..6).map(|i| format!("g{i}")).collect(),
            ..Default::default()
        };
        let errors = input.validate(&def, &[Uuid::nil()]);
        for field in [
            "workspace_id",
            "name",
            "home_city",
            "genres",
            "years_active",
            "base_price",
            "minimum_booking_hours",
        ] {
            assert!(errors.contains(field), "{field} should be flagged");
        }
        assert!(!errors.contains("bio"));
        assert_eq!(errors.first("name"), Some("is required"));
    }

    #[test]
    fn normalized_input_passes_validation() {
        let def = performer_resource();
        let ws = Uuid::from_u128(1);
        let input = PerformerInput {
            workspace_id: Some(ws),
            name: "  Wild Pines ".into(),
            genres: vec!["Folk".into(), "folk ".into(), "Bluegrass".into()],
            bio: Some("   ".into()),
            home_city: "Missoula".into(),
            base_price: Some(199.999),
            ..Default::default()
        }
        .normalized();
        assert!(input.validate(&def, &[ws]).is_empty());
        assert_eq!(input.name, "Wild Pines");
        assert_eq!(input.genres, vec!["folk", "bluegrass"]);
        assert_eq!(input.bio, None);
        assert_eq!(input.base_price, Some(200.0));
    }

    #[test]
    fn form_fields_parse_checkboxes_and_numbers() {
        let fields = PerformerFormFields {
            workspace_id: "not-a-uuid".into(),
            name: "Hollow Foxes".into(),
            genres: "rock, blues,,".into(),
            years_active: "ten".into(),
            base_price: "".into(),
            minimum_booking_hours: "3".into(),
            is_touring: Some("on".into()),
            ..Default::default()
        };
        let (input, errors) = fields.parse();
        assert_eq!(input.genres, vec!["rock", "blues"]);
        assert!(input.is_touring);
        assert!(!input.available_for_booking);
        assert_eq!(input.minimum_booking_hours, 3);
        assert_eq!(input.base_price, None);
        assert!(errors.contains("workspace_id"));
        assert!(errors.contains("years_active"));
        assert!(!errors.contains("base_price"));
    }
}
