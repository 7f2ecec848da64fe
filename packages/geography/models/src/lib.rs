#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! State-level displacement summary types.
//!
//! These back the choropleth map. They come from a separate per-state
//! summary file and are independent of the respondent extract.

pub mod fips;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

/// A per-state rate that can be shown on the map.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum GeoFactor {
    /// Share of households displaced by a disaster.
    #[default]
    DisplacedRate,
    /// Share of displaced households that returned within a month.
    ReturnedWithinMonth,
    /// Share of displaced households that never returned.
    NeverReturned,
}

impl GeoFactor {
    /// Human-readable description, used as the colorbar title.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::DisplacedRate => "Households displaced",
            Self::ReturnedWithinMonth => "Displaced households that returned within a month",
            Self::NeverReturned => "Displaced households that never returned",
        }
    }
}

/// One state's row of the summary file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoSummary {
    /// State name as given in the file.
    pub state: String,
    /// Two-letter postal code.
    pub abbr: String,
    /// Two-digit FIPS code.
    pub fips: String,
    /// Fractional rate (0..=1) per factor. Factors missing from the file or
    /// left blank for this state are absent.
    pub rates: BTreeMap<GeoFactor, f64>,
}

impl GeoSummary {
    /// Rate for `factor`, if present.
    #[must_use]
    pub fn rate(&self, factor: GeoFactor) -> Option<f64> {
        self.rates.get(&factor).copied()
    }
}
