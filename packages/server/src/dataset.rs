//! Startup data loading.
//!
//! Everything the handlers read is loaded and preprocessed here, once,
//! before the HTTP server starts. The resulting [`Dataset`] is never
//! mutated afterwards.

use std::path::PathBuf;

use displacement_geography::{GeographyError, summary::load_geo_summary};
use displacement_geography_models::GeoSummary;
use displacement_survey::{
    SurveyError, dictionary::load_dictionary, preprocess::preprocess,
    respondents::load_respondents,
};
use displacement_survey_models::{DataDictionary, SurveyTable};
use thiserror::Error;

/// Default respondent extract location.
pub const DEFAULT_RESPONDENTS_PATH: &str = "data/displaced_households.csv";
/// Default data dictionary location.
pub const DEFAULT_DICTIONARY_PATH: &str = "data/data_dictionary.csv";
/// Default state summary location.
pub const DEFAULT_GEO_PATH: &str = "data/state_summary.csv";

/// Errors that can occur while loading the dataset.
#[derive(Debug, Error)]
pub enum DatasetError {
    /// Loading or preprocessing survey data failed.
    #[error(transparent)]
    Survey(#[from] SurveyError),

    /// Loading the state summary failed.
    #[error(transparent)]
    Geography(#[from] GeographyError),
}

/// Input file locations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPaths {
    pub respondents: PathBuf,
    pub dictionary: PathBuf,
    pub geo: PathBuf,
}

impl Default for DataPaths {
    fn default() -> Self {
        Self {
            respondents: PathBuf::from(DEFAULT_RESPONDENTS_PATH),
            dictionary: PathBuf::from(DEFAULT_DICTIONARY_PATH),
            geo: PathBuf::from(DEFAULT_GEO_PATH),
        }
    }
}

/// The read-only bundle shared by every request.
#[derive(Debug, Clone)]
pub struct Dataset {
    /// Preprocessed respondent table, including derived bin columns.
    pub table: SurveyTable,
    /// Data dictionary including the derived bin descriptors.
    pub dictionary: DataDictionary,
    /// Per-state summary, sorted by state name.
    pub geo: Vec<GeoSummary>,
}

/// Loads the dictionary and respondent extract, preprocesses them, and
/// loads the state summary.
///
/// # Errors
///
/// Returns [`DatasetError`] if any input cannot be loaded. Nothing is
/// served from a partially loaded dataset.
pub fn load_dataset(paths: &DataPaths, survey_year: i64) -> Result<Dataset, DatasetError> {
    let dictionary = load_dictionary(&paths.dictionary)?;
    let table = load_respondents(&paths.respondents)?;
    let (table, dictionary) = preprocess(table, &dictionary, survey_year)?;
    let geo = load_geo_summary(&paths.geo)?;

    log::info!(
        "Dataset ready: {} respondents, {} descriptors, {} states",
        table.len(),
        dictionary.len(),
        geo.len()
    );

    Ok(Dataset {
        table,
        dictionary,
        geo,
    })
}
