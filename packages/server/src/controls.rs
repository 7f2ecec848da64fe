//! Dropdown controls and the charts they drive.

use displacement_charts::{DAMAGE_COLORWAY, DURATION_COLORWAY};
use displacement_geography_models::GeoFactor;
use displacement_server_models::{ApiControl, ApiFactorOption};
use displacement_survey_models::Variable;
use strum::IntoEnumIterator as _;

use crate::dataset::Dataset;

/// Control id for the choropleth map.
pub const GEO_CONTROL_ID: &str = "geo";

/// A stacked bar chart with a fixed outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarChart {
    Damage,
    Duration,
}

impl BarChart {
    pub const ALL: &[Self] = &[Self::Damage, Self::Duration];

    #[must_use]
    pub const fn id(self) -> &'static str {
        match self {
            Self::Damage => "damage",
            Self::Duration => "duration",
        }
    }

    /// Outcome shown as the stacked categories.
    #[must_use]
    pub const fn outcome(self) -> Variable {
        match self {
            Self::Damage => Variable::DAMAGE,
            Self::Duration => Variable::DURATION,
        }
    }

    /// Factor selected when the page first loads: each chart starts out
    /// showing the other outcome.
    #[must_use]
    pub const fn default_factor(self) -> Variable {
        match self {
            Self::Damage => Variable::DURATION,
            Self::Duration => Variable::DAMAGE,
        }
    }

    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Damage => "Investigate damage trends with",
            Self::Duration => "Investigate duration trends with",
        }
    }

    #[must_use]
    pub const fn colorway(self) -> &'static [&'static str] {
        match self {
            Self::Damage => DAMAGE_COLORWAY,
            Self::Duration => DURATION_COLORWAY,
        }
    }
}

/// Factors selectable for `chart`, in display order.
///
/// A factor is offered when it is loaded in the respondent table and its
/// dictionary entry is categorical with at least one label. The chart's own
/// outcome is never offered.
#[must_use]
pub fn selectable_factors(dataset: &Dataset, chart: BarChart) -> Vec<Variable> {
    Variable::FACTORS
        .iter()
        .copied()
        .filter(|factor| *factor != chart.outcome())
        .filter(|factor| dataset.table.has_column(*factor))
        .filter(|factor| {
            dataset
                .dictionary
                .get(*factor)
                .is_some_and(|d| d.kind.is_categorical() && !d.conversion.is_empty())
        })
        .collect()
}

/// Builds the dropdown for a bar chart.
#[must_use]
pub fn bar_control(dataset: &Dataset, chart: BarChart) -> ApiControl {
    let options = selectable_factors(dataset, chart)
        .into_iter()
        .filter_map(|factor| {
            dataset.dictionary.get(factor).map(|d| ApiFactorOption {
                value: factor.to_string(),
                label: d.name.clone(),
            })
        })
        .collect();

    ApiControl {
        id: chart.id().to_string(),
        title: chart.title().to_string(),
        outcome: Some(chart.outcome().to_string()),
        default_value: chart.default_factor().to_string(),
        options,
    }
}

/// Builds the dropdown for the state map.
#[must_use]
pub fn geo_control() -> ApiControl {
    ApiControl {
        id: GEO_CONTROL_ID.to_string(),
        title: "Explore displacement by state".to_string(),
        outcome: None,
        default_value: GeoFactor::default().to_string(),
        options: GeoFactor::iter()
            .map(|factor| ApiFactorOption {
                value: factor.to_string(),
                label: factor.description().to_string(),
            })
            .collect(),
    }
}

/// All controls, in page order.
#[must_use]
pub fn controls(dataset: &Dataset) -> Vec<ApiControl> {
    BarChart::ALL
        .iter()
        .map(|chart| bar_control(dataset, *chart))
        .chain(std::iter::once(geo_control()))
        .collect()
}
