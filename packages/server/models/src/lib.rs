#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the displacement dashboard server.
//!
//! Chart endpoints return Plotly figures directly; the types here cover
//! everything else the frontend exchanges with the server.

use serde::{Deserialize, Serialize};

/// Health check response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHealth {
    /// Whether the service is healthy.
    pub healthy: bool,
    /// Service version.
    pub version: String,
}

/// One entry of a dropdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiFactorOption {
    /// Code sent back as the `factor` query parameter.
    pub value: String,
    /// Display name.
    pub label: String,
}

/// A dropdown control and the chart it drives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiControl {
    /// Control id; also the last segment of the chart endpoint path.
    pub id: String,
    /// Heading shown above the dropdown.
    pub title: String,
    /// Fixed outcome variable for bar charts; absent for the map.
    pub outcome: Option<String>,
    /// Initially selected option value.
    pub default_value: String,
    /// Selectable options, in display order.
    pub options: Vec<ApiFactorOption>,
}

/// Query parameters for the chart endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartQueryParams {
    /// Selected factor code. The control's default is used when absent.
    pub factor: Option<String>,
}

/// Error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
}

impl ApiError {
    #[must_use]
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
