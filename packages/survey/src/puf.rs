//! Weekly public use file (PUF) archives.
//!
//! Each survey week is published as `<name>_PUF_CSV.zip`, holding the
//! respondent CSV next to a replicate weight CSV (`repwgt` in its name).
//! Loading a directory reads the respondent CSV of every archive, stacks
//! the weeks in file name order, and clears `-88`/`-99` codes to missing.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{Read, Seek};
use std::path::{Path, PathBuf};

use displacement_survey_models::{SurveyTable, Variable, WeightColumn, is_sentinel};

use crate::SurveyError;
use crate::respondents::read_respondents;

/// File name suffix of a weekly archive.
pub const PUF_ARCHIVE_SUFFIX: &str = "_PUF_CSV.zip";

const REPLICATE_WEIGHT_MARKER: &str = "repwgt";

/// Loads and stacks every `*_PUF_CSV.zip` archive in `dir`.
///
/// Columns missing from some weeks are missing for those weeks' records.
/// `PWEIGHT` is kept only when every week carries it.
///
/// # Errors
///
/// * [`SurveyError::Io`] if the directory cannot be listed
/// * [`SurveyError::NoPufArchives`] if it holds no archives
/// * [`SurveyError::Archive`] wrapping the failure of any single archive
pub fn load_puf_dir(dir: &Path) -> Result<SurveyTable, SurveyError> {
    let mut archives: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.ends_with(PUF_ARCHIVE_SUFFIX))
        })
        .collect();
    archives.sort();

    if archives.is_empty() {
        return Err(SurveyError::NoPufArchives {
            dir: dir.to_path_buf(),
        });
    }

    log::info!("Loading {} PUF archives from {}", archives.len(), dir.display());

    let weeks = archives
        .iter()
        .map(|path| load_puf_archive(path))
        .collect::<Result<Vec<_>, _>>()?;
    let table = stack(weeks)?;

    log::info!(
        "Loaded {} PUF records with {} survey columns",
        table.len(),
        table.variables().count()
    );

    Ok(table)
}

/// Loads the respondent CSV of one archive.
///
/// # Errors
///
/// Returns [`SurveyError::Archive`] naming `path` if the archive cannot be
/// opened or its respondent CSV cannot be read.
pub fn load_puf_archive(path: &Path) -> Result<SurveyTable, SurveyError> {
    log::debug!("Reading {}", path.display());
    File::open(path)
        .map_err(SurveyError::from)
        .and_then(read_puf_archive)
        .map_err(|e| SurveyError::Archive {
            path: path.to_path_buf(),
            source: Box::new(e),
        })
}

/// Reads the first respondent CSV in a zip archive, skipping replicate
/// weight files, with sentinel codes cleared to missing.
///
/// # Errors
///
/// * [`SurveyError::Zip`] if the archive is unreadable
/// * [`SurveyError::MissingPufCsv`] if it holds no respondent CSV
/// * any error [`read_respondents`] returns for the CSV itself
pub fn read_puf_archive<R: Read + Seek>(reader: R) -> Result<SurveyTable, SurveyError> {
    let mut archive = zip::ZipArchive::new(reader)?;

    let mut found = None;
    for i in 0..archive.len() {
        let entry = archive.by_index(i)?;
        let name = entry.name();
        if name.to_ascii_lowercase().ends_with(".csv") && !name.contains(REPLICATE_WEIGHT_MARKER) {
            log::debug!("Using {name}");
            found = Some(i);
            break;
        }
    }
    let index = found.ok_or(SurveyError::MissingPufCsv)?;

    let table = read_respondents(archive.by_index(index)?)?;
    clear_sentinels(&table)
}

/// Rebuilds `table` with sentinel codes replaced by missing values.
fn clear_sentinels(table: &SurveyTable) -> Result<SurveyTable, SurveyError> {
    let mut cleared = 0_usize;
    let mut out = SurveyTable::new(table.ids().to_vec());

    for column in [WeightColumn::Household, WeightColumn::Person] {
        if let Some(weights) = table.weights(column) {
            out = out.with_weights(column, weights.to_vec())?;
        }
    }
    for variable in table.variables() {
        let values = table
            .column(variable)
            .unwrap_or_default()
            .iter()
            .map(|value| match value {
                Some(code) if is_sentinel(*code) => {
                    cleared += 1;
                    None
                }
                other => *other,
            })
            .collect();
        out = out.with_column(variable, values)?;
    }

    log::debug!("Cleared {cleared} sentinel codes");
    Ok(out)
}

/// Concatenates weekly tables in order.
fn stack(weeks: Vec<SurveyTable>) -> Result<SurveyTable, SurveyError> {
    let variables: BTreeSet<Variable> = weeks.iter().flat_map(SurveyTable::variables).collect();
    let ids: Vec<String> = weeks.iter().flat_map(|w| w.ids().iter().cloned()).collect();
    let mut table = SurveyTable::new(ids);

    for column in [WeightColumn::Household, WeightColumn::Person] {
        let parts: Option<Vec<&[f64]>> = weeks.iter().map(|w| w.weights(column)).collect();
        match parts {
            Some(parts) => table = table.with_weights(column, parts.concat())?,
            None if weeks.iter().any(|w| w.weights(column).is_some()) => {
                log::warn!("{column} is missing from some weeks; dropping it");
            }
            None => {}
        }
    }

    for variable in variables {
        let values = weeks
            .iter()
            .flat_map(|week| match week.column(variable) {
                Some(values) => values.to_vec(),
                None => vec![None; week.len()],
            })
            .collect();
        table = table.with_column(variable, values)?;
    }

    Ok(table)
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Write as _};

    use zip::write::SimpleFileOptions;

    use super::*;

    const WEEK_50: &str = "\
SCRAM,WEEK,HWEIGHT,PWEIGHT,ND_DAMAGE,ND_HOWLONG,TBIRTH_YEAR
V50A,50,10,20,1,-99,1980
V50B,50,5,8,-88,2,1990
";

    const WEEK_51: &str = "\
SCRAM,WEEK,HWEIGHT,ND_DAMAGE,TENURE
V51A,51,7,3,2
";

    const REPLICATE_WEIGHTS: &str = "\
SCRAM,HWEIGHT1,HWEIGHT2
V50A,1,2
";

    fn archive(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
        for (name, contents) in entries {
            writer.start_file(*name, options).unwrap();
            writer.write_all(contents.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    fn fixture_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "displacement_survey_puf_{name}_{}",
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn replicate_weight_files_are_skipped() {
        let bytes = archive(&[
            ("pulse2022_repwgt_puf_50.csv", REPLICATE_WEIGHTS),
            ("pulse2022_data.dictionary_CSV_50.xlsx", "not a csv"),
            ("pulse2022_puf_50.csv", WEEK_50),
        ]);
        let table = read_puf_archive(Cursor::new(bytes)).unwrap();

        assert_eq!(table.ids(), ["V50A", "V50B"]);
        assert_eq!(table.weights(WeightColumn::Household), Some(&[10.0, 5.0][..]));
        assert!(table.has_column(Variable::NdDamage));
    }

    #[test]
    fn sentinels_become_missing() {
        let bytes = archive(&[("pulse2022_puf_50.csv", WEEK_50)]);
        let table = read_puf_archive(Cursor::new(bytes)).unwrap();

        assert_eq!(table.column(Variable::NdDamage), Some(&[Some(1), None][..]));
        assert_eq!(table.column(Variable::NdHowlong), Some(&[None, Some(2)][..]));
        assert_eq!(
            table.column(Variable::TbirthYear),
            Some(&[Some(1980), Some(1990)][..])
        );
    }

    #[test]
    fn archive_without_respondent_csv_is_error() {
        let bytes = archive(&[("pulse2022_repwgt_puf_50.csv", REPLICATE_WEIGHTS)]);
        let err = read_puf_archive(Cursor::new(bytes)).unwrap_err();
        assert!(matches!(err, SurveyError::MissingPufCsv));
    }

    #[test]
    fn weeks_are_stacked_in_file_order() {
        let dir = fixture_dir("stack");
        std::fs::write(
            dir.join("HPS_Week51_PUF_CSV.zip"),
            archive(&[("pulse2022_puf_51.csv", WEEK_51)]),
        )
        .unwrap();
        std::fs::write(
            dir.join("HPS_Week50_PUF_CSV.zip"),
            archive(&[
                ("pulse2022_repwgt_puf_50.csv", REPLICATE_WEIGHTS),
                ("pulse2022_puf_50.csv", WEEK_50),
            ]),
        )
        .unwrap();
        std::fs::write(dir.join("notes.txt"), "ignored").unwrap();

        let table = load_puf_dir(&dir).unwrap();

        assert_eq!(table.ids(), ["V50A", "V50B", "V51A"]);
        assert_eq!(
            table.weights(WeightColumn::Household),
            Some(&[10.0, 5.0, 7.0][..])
        );
        assert_eq!(table.weights(WeightColumn::Person), None);
        assert_eq!(
            table.column(Variable::NdDamage),
            Some(&[Some(1), None, Some(3)][..])
        );
        assert_eq!(
            table.column(Variable::Tenure),
            Some(&[None, None, Some(2)][..])
        );
        assert_eq!(
            table.column(Variable::TbirthYear),
            Some(&[Some(1980), Some(1990), None][..])
        );
    }

    #[test]
    fn empty_directory_is_error() {
        let dir = fixture_dir("empty");
        let err = load_puf_dir(&dir).unwrap_err();
        assert!(matches!(err, SurveyError::NoPufArchives { .. }));
    }

    #[test]
    fn unreadable_archive_names_its_path() {
        let dir = fixture_dir("corrupt");
        std::fs::write(dir.join("HPS_Week52_PUF_CSV.zip"), "not a zip").unwrap();

        let err = load_puf_dir(&dir).unwrap_err();
        match err {
            SurveyError::Archive { path, source } => {
                assert!(path.ends_with("HPS_Week52_PUF_CSV.zip"));
                assert!(matches!(*source, SurveyError::Zip(_)));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
