//! State choropleth maps.

use displacement_geography_models::{GeoFactor, GeoSummary};
use serde::{Deserialize, Serialize};

use crate::{Figure, Geo, Layout, Projection, Title, Trace};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorBar {
    pub title: Title,
    #[serde(rename = "ticksuffix")]
    pub tick_suffix: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChoroplethTrace {
    #[serde(rename = "locationmode")]
    pub location_mode: String,
    /// Postal codes.
    pub locations: Vec<String>,
    /// Percentages (rate × 100).
    pub z: Vec<f64>,
    /// Hover text per location.
    pub text: Vec<String>,
    #[serde(rename = "hoverinfo")]
    pub hover_info: String,
    #[serde(rename = "colorscale")]
    pub color_scale: String,
    #[serde(rename = "colorbar")]
    pub color_bar: ColorBar,
}

/// Builds a map trace of `factor` across states.
///
/// States without a value for `factor` are left off the map.
#[must_use]
pub fn choropleth_trace(
    summaries: &[GeoSummary],
    factor: GeoFactor,
    description: &str,
) -> ChoroplethTrace {
    let mut locations = Vec::with_capacity(summaries.len());
    let mut z = Vec::with_capacity(summaries.len());
    let mut text = Vec::with_capacity(summaries.len());

    for summary in summaries {
        let Some(rate) = summary.rate(factor) else {
            continue;
        };
        let pct = rate * 100.0;
        locations.push(summary.abbr.clone());
        z.push(pct);
        text.push(format!("{}: {pct:.1}%", summary.state));
    }

    if locations.len() < summaries.len() {
        log::debug!(
            "{factor}: {} of {} states have no value",
            summaries.len() - locations.len(),
            summaries.len()
        );
    }

    ChoroplethTrace {
        location_mode: "USA-states".to_string(),
        locations,
        z,
        text,
        hover_info: "text".to_string(),
        color_scale: "Reds".to_string(),
        color_bar: ColorBar {
            title: Title::new(description),
            tick_suffix: "%".to_string(),
        },
    }
}

/// Builds the full USA map figure for `factor`.
#[must_use]
pub fn choropleth_figure(summaries: &[GeoSummary], factor: GeoFactor, description: &str) -> Figure {
    Figure {
        data: vec![Trace::Choropleth(choropleth_trace(
            summaries,
            factor,
            description,
        ))],
        layout: Layout {
            geo: Some(Geo {
                scope: "usa".to_string(),
                projection: Projection {
                    kind: "albers usa".to_string(),
                },
            }),
            ..Layout::default()
        },
    }
}
