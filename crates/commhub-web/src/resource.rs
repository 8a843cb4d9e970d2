//! Declarative admin resource bindings: which table backs a screen, which
//! fields appear in its grid and form, and how they are searched and sorted.

use commhub_core::Performer;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Id,
    Text,
    LongText,
    Tags,
    Integer,
    Money,
    Boolean,
    Reference,
    Timestamp,
}

impl FieldKind {
    /// HTML input used for this kind of field on the edit form.
    pub fn input_type(&self) -> &'static str {
        match self {
            Self::LongText => "textarea",
            Self::Integer | Self::Money => "number",
            Self::Boolean => "checkbox",
            Self::Reference => "select",
            Self::Id | Self::Text | Self::Tags | Self::Timestamp => "text",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub searchable: bool,
    pub sortable: bool,
    pub filterable: bool,
    pub in_table: bool,
    pub in_form: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub references: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help: Option<&'static str>,
}

impl FieldSpec {
    fn new(name: &'static str, label: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            label,
            kind,
            required: false,
            searchable: false,
            sortable: false,
            filterable: false,
            in_table: false,
            in_form: true,
            references: None,
            help: None,
        }
    }

    fn required(mut self) -> Self {
        self.required = true;
        self
    }

    fn searchable(mut self) -> Self {
        self.searchable = true;
        self
    }

    fn sortable(mut self) -> Self {
        self.sortable = true;
        self
    }

    fn filterable(mut self) -> Self {
        self.filterable = true;
        self
    }

    fn in_table(mut self) -> Self {
        self.in_table = true;
        self
    }

    fn read_only(mut self) -> Self {
        self.in_form = false;
        self
    }

    fn references(mut self, resource: &'static str) -> Self {
        self.references = Some(resource);
        self
    }

    fn help(mut self, text: &'static str) -> Self {
        self.help = Some(text);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceDefinition {
    pub name: &'static str,
    pub label: &'static str,
    pub plural_label: &'static str,
    pub table: &'static str,
    pub title_field: &'static str,
    pub default_sort: (&'static str, SortDirection),
    pub per_page: usize,
    pub fields: Vec<FieldSpec>,
}

impl ResourceDefinition {
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn table_fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter(|f| f.in_table)
    }

    pub fn form_fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter(|f| f.in_form)
    }

    pub fn searchable_fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter(|f| f.searchable)
    }

    pub fn is_sortable(&self, name: &str) -> bool {
        self.field(name).is_some_and(|f| f.sortable)
    }
}

pub fn performer_resource() -> ResourceDefinition {
    ResourceDefinition {
        name: "performers",
        label: "Performer",
        plural_label: "Performers",
        table: "performers",
        title_field: "name",
        default_sort: ("created_at", SortDirection::Desc),
        per_page: 20,
        fields: vec![
            FieldSpec::new("id", "ID", FieldKind::Id).read_only(),
            FieldSpec::new("workspace_id", "Workspace", FieldKind::Reference)
                .required()
                .references("workspaces"),
            FieldSpec::new("name", "Name", FieldKind::Text)
                .required()
                .searchable()
                .sortable()
                .in_table(),
            FieldSpec::new("genres", "Genres", FieldKind::Tags)
                .required()
                .filterable()
                .in_table()
                .help("Comma separated, up to 5"),
            FieldSpec::new("home_city", "Home city", FieldKind::Text)
                .required()
                .searchable()
                .sortable()
                .in_table(),
            FieldSpec::new("bio", "Bio", FieldKind::LongText).searchable(),
            FieldSpec::new("years_active", "Years active", FieldKind::Integer).sortable(),
            FieldSpec::new("base_price", "Base price", FieldKind::Money)
                .sortable()
                .in_table(),
            FieldSpec::new("minimum_booking_hours", "Minimum booking hours", FieldKind::Integer),
            FieldSpec::new("is_verified", "Verified", FieldKind::Boolean)
                .filterable()
                .in_table(),
            FieldSpec::new("is_touring", "Touring", FieldKind::Boolean).filterable(),
            FieldSpec::new("available_for_booking", "Available for booking", FieldKind::Boolean)
                .filterable()
                .in_table(),
            FieldSpec::new("created_at", "Created", FieldKind::Timestamp)
                .sortable()
                .read_only(),
            FieldSpec::new("updated_at", "Updated", FieldKind::Timestamp).read_only(),
        ],
    }
}

fn yes_no(value: bool) -> String {
    let text = if value { "yes" } else { "no" };
    text.to_string()
}

pub fn format_price(price: Option<f64>) -> String {
    price.map(|p| format!("${p:.2}")).unwrap_or_else(|| "n/a".to_string())
}

/// Display text for one field of a performer, as shown in tables and detail pages.
pub fn performer_cell(performer: &Performer, field: &str) -> String {
    match field {
        "id" => performer.id.to_string(),
        "workspace_id" => performer.workspace_id.to_string(),
        "name" => performer.name.clone(),
        "genres" => performer.genres.join(", "),
        "home_city" => performer.home_city.clone(),
        "bio" => performer.bio.clone().unwrap_or_default(),
        "years_active" => performer.years_active.to_string(),
        "base_price" => format_price(performer.base_price),
        "minimum_booking_hours" => performer.minimum_booking_hours.to_string(),
        "is_verified" => yes_no(performer.is_verified),
        "is_touring" => yes_no(performer.is_touring),
        "available_for_booking" => yes_no(performer.available_for_booking),
        "created_at" => performer.created_at.format("%Y-%m-%d %H:%M").to_string(),
        "updated_at" => performer.updated_at.format("%Y-%m-%d %H:%M").to_string(),
        _ => String::new(),
    }
}
