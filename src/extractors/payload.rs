// src/extractors/payload.rs
//! Typed views of the htmlwidget payloads embedded in the reports.
//!
//! Both widgets serialise as `{"x": {...}}`. The chart widget (plotly) carries
//! a layout and a list of series; the ranking widget (DataTables) carries
//! column definitions, an HTML container and column-major data.
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::utils::error::ExtractError;

#[derive(Debug, Deserialize)]
struct Widget<T> {
    x: T,
}

/// Decodes a widget payload, treating any shape problem as a missing payload.
pub fn decode<T: DeserializeOwned>(section_id: &str, raw: &str) -> Result<T, ExtractError> {
    serde_json::from_str::<Widget<T>>(raw)
        .map(|widget| widget.x)
        .map_err(|e| ExtractError::PayloadNotFound(format!("'{}': {}", section_id, e)))
}

/// Either a single value or a list; R serialisers unbox length-one vectors.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::Many(values) => values,
            OneOrMany::One(value) => vec![value],
        }
    }
}

// --- Chart widget ---

#[derive(Debug, Deserialize)]
pub struct ChartPayload {
    pub layout: ChartLayout,
    pub data: Vec<Series>,
}

#[derive(Debug, Deserialize)]
pub struct ChartLayout {
    pub title: ChartTitle,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ChartTitle {
    Text(String),
    Object { text: String },
}

impl ChartTitle {
    pub fn text(&self) -> &str {
        match self {
            ChartTitle::Text(text) | ChartTitle::Object { text } => text,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Series {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub name: Option<Value>,
    #[serde(default = "empty_values")]
    pub x: OneOrMany<Value>,
    #[serde(default = "empty_values")]
    pub y: OneOrMany<Value>,
    #[serde(default)]
    pub hovertemplate: Option<OneOrMany<String>>,
}

fn empty_values() -> OneOrMany<Value> {
    OneOrMany::Many(Vec::new())
}

// --- Ranking table widget ---

#[derive(Debug, Deserialize)]
pub struct RankingPayload {
    pub options: RankingOptions,
    #[serde(default)]
    pub container: Option<String>,
    pub data: Vec<OneOrMany<Value>>,
}

#[derive(Debug, Deserialize)]
pub struct RankingOptions {
    #[serde(rename = "columnDefs", default)]
    pub column_defs: Vec<ColumnDef>,
}

#[derive(Debug, Deserialize)]
pub struct ColumnDef {
    #[serde(default)]
    pub name: Option<String>,
}

/// Renders a JSON scalar the way it appears in the report tables.
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
