//! Stacked bar charts from cross-tabs.
//!
//! One bar trace per outcome category; the x axis holds the factor
//! categories and each trace's heights are that outcome's share within
//! each category, so a stacked column always reaches 1.

use displacement_analytics_models::CrossTab;
use serde::{Deserialize, Serialize};

use crate::{Axis, Figure, Layout, Legend, Title, Trace};

/// Colors for the property damage chart, in damage category order.
pub const DAMAGE_COLORWAY: &[&str] = &["silver", "#15a74e", "#fcc210", "#9e4825"];

/// Colors for the displacement duration chart, in duration category order.
pub const DURATION_COLORWAY: &[&str] = &["silver", "#15a74e", "#fcc210", "#9e4825", "#212121"];

const Y_AXIS_TITLE: &str = "Proportion of respondents";
const PERCENT_TEXT: &str = "%{y:,.1%}";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarTrace {
    pub name: String,
    pub x: Vec<String>,
    /// `None` serializes as `null`, which Plotly leaves as a gap.
    pub y: Vec<Option<f64>>,
    #[serde(rename = "texttemplate")]
    pub text_template: String,
    #[serde(rename = "textposition")]
    pub text_position: String,
    #[serde(rename = "hovertemplate")]
    pub hover_template: String,
}

/// Legend name for an outcome label: the text before any parenthetical.
fn legend_name(label: &str) -> &str {
    label.split('(').next().unwrap_or(label).trim()
}

/// Builds one bar trace per column of `crosstab`.
#[must_use]
pub fn stacked_bar_traces(crosstab: &CrossTab) -> Vec<BarTrace> {
    let x: Vec<String> = crosstab.rows.iter().map(|r| r.label.clone()).collect();

    crosstab
        .columns
        .iter()
        .enumerate()
        .map(|(idx, column)| {
            let name = legend_name(&column.label).to_string();
            let y = crosstab
                .rows
                .iter()
                .map(|r| r.shares.get(idx).copied().filter(|s| s.is_finite()))
                .collect();
            let hover_template = format!(
                "<b>{}</b><br>{name}: {PERCENT_TEXT}<extra></extra>",
                crosstab.outcome_name
            );

            BarTrace {
                name,
                x: x.clone(),
                y,
                text_template: PERCENT_TEXT.to_string(),
                text_position: "inside".to_string(),
                hover_template,
            }
        })
        .collect()
}

/// Builds the full stacked bar figure for `crosstab` with the given colors.
#[must_use]
pub fn stacked_bar_figure(crosstab: &CrossTab, colorway: &[&str]) -> Figure {
    if crosstab.is_empty() {
        log::debug!(
            "Building empty {} by {} chart",
            crosstab.outcome,
            crosstab.factor
        );
    }

    let layout = Layout {
        bar_mode: Some("stack".to_string()),
        legend: Some(Legend {
            title: Title::new(&crosstab.outcome_name),
        }),
        xaxis: Some(Axis {
            title: Title::new(&crosstab.factor_name),
            tick_format: None,
        }),
        yaxis: Some(Axis {
            title: Title::new(Y_AXIS_TITLE),
            tick_format: Some(".0%".to_string()),
        }),
        colorway: colorway.iter().map(ToString::to_string).collect(),
        ..Layout::default()
    };

    Figure {
        data: stacked_bar_traces(crosstab)
            .into_iter()
            .map(Trace::Bar)
            .collect(),
        layout,
    }
}
