#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Plotly figure builders.
//!
//! The types here serialize to the JSON shape `Plotly.newPlot` accepts
//! (`{data, layout}`), so the frontend can render whatever the server
//! returns without reshaping it.

pub mod bar;
pub mod choropleth;

use serde::{Deserialize, Serialize};

pub use bar::{DAMAGE_COLORWAY, DURATION_COLORWAY, stacked_bar_figure, stacked_bar_traces};
pub use choropleth::{choropleth_figure, choropleth_trace};

/// A complete figure: traces plus layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Figure {
    pub data: Vec<Trace>,
    pub layout: Layout,
}

/// A single Plotly trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Trace {
    Bar(bar::BarTrace),
    Choropleth(choropleth::ChoroplethTrace),
}

/// Plotly title object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Title {
    pub text: String,
}

impl Title {
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Legend {
    pub title: Title,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Axis {
    pub title: Title,
    #[serde(rename = "tickformat", skip_serializing_if = "Option::is_none")]
    pub tick_format: Option<String>,
}

/// Map projection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Geo {
    pub scope: String,
    pub projection: Projection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Projection {
    #[serde(rename = "type")]
    pub kind: String,
}

/// Figure layout. Unset parts are left to Plotly's defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layout {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<Title>,
    #[serde(rename = "barmode", skip_serializing_if = "Option::is_none")]
    pub bar_mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legend: Option<Legend>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xaxis: Option<Axis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yaxis: Option<Axis>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub colorway: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geo: Option<Geo>,
}
