use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;

use crate::config::ColumnMapping;
use crate::normalize::{normalize_text, EducationVariable, Stratum};
use crate::utils::{coerce_numeric, non_empty, AnalysisError};

/// One examinee row as read from the source, before normalization
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecord {
    pub score: Option<String>,
    pub stratum: Option<String>,
    pub education_mother: Option<String>,
    pub education_father: Option<String>,
    pub municipality: Option<String>,
}

/// One normalized examinee row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub score_global: Option<f64>,
    pub stratum: Option<Stratum>,
    pub education_mother: Option<String>,
    pub education_father: Option<String>,
    pub municipality: Option<String>,
}

impl Record {
    /// Value of the chosen education variable
    pub fn education(&self, variable: EducationVariable) -> Option<&str> {
        match variable {
            EducationVariable::Mother => self.education_mother.as_deref(),
            EducationVariable::Father => self.education_father.as_deref(),
        }
    }
}

/// Data-quality signals collected while normalizing
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DataQuality {
    pub rows: usize,
    /// Raw stratum labels outside the six-level domain, with frequencies
    pub unrecognized_strata: BTreeMap<String, usize>,
    pub missing_stratum: usize,
    pub missing_score: usize,
    pub missing_municipality: usize,
}

impl DataQuality {
    pub fn unrecognized_stratum_rows(&self) -> usize {
        self.unrecognized_strata.values().sum()
    }
}

/// The normalized, read-only results table
#[derive(Debug, Clone, Serialize)]
pub struct Dataset {
    pub name: String,
    pub records: Vec<Record>,
    pub quality: DataQuality,
}

impl Dataset {
    /// Normalize raw rows into a dataset
    ///
    /// Municipality names are canonicalized, strata are mapped onto the
    /// six-level domain and scores coerced to numbers. Nothing here fails:
    /// unusable values become missing and are counted in [`DataQuality`].
    pub fn from_raw(name: String, raw: Vec<RawRecord>) -> Self {
        let mut quality = DataQuality {
            rows: raw.len(),
            ..DataQuality::default()
        };

        let records: Vec<Record> = raw
            .into_iter()
            .map(|row| {
                let score_global = row.score.as_deref().and_then(coerce_numeric);
                if score_global.is_none() {
                    quality.missing_score += 1;
                }

                let stratum = match row.stratum.as_deref().and_then(non_empty) {
                    Some(label) => {
                        let parsed = Stratum::parse_label(label);
                        if parsed.is_none() {
                            *quality
                                .unrecognized_strata
                                .entry(label.trim().to_string())
                                .or_default() += 1;
                        }
                        parsed
                    }
                    None => None,
                };
                if stratum.is_none() {
                    quality.missing_stratum += 1;
                }

                let municipality = row
                    .municipality
                    .as_deref()
                    .and_then(non_empty)
                    .map(normalize_text)
                    .filter(|m| !m.is_empty());
                if municipality.is_none() {
                    quality.missing_municipality += 1;
                }

                Record {
                    score_global,
                    stratum,
                    education_mother: clean_category(row.education_mother.as_deref()),
                    education_father: clean_category(row.education_father.as_deref()),
                    municipality,
                }
            })
            .collect();

        if !quality.unrecognized_strata.is_empty() {
            log::warn!(
                "dataset '{}': {} rows with unrecognized stratum treated as missing: {:?}",
                name,
                quality.unrecognized_stratum_rows(),
                quality.unrecognized_strata
            );
        }
        log::info!(
            "dataset '{}' loaded: {} rows ({} without score, {} without stratum)",
            name,
            quality.rows,
            quality.missing_score,
            quality.missing_stratum
        );

        Self {
            name,
            records,
            quality,
        }
    }

    /// Build a dataset from already-normalized records
    pub fn from_records(name: String, records: Vec<Record>) -> Self {
        let quality = DataQuality {
            rows: records.len(),
            missing_stratum: records.iter().filter(|r| r.stratum.is_none()).count(),
            missing_score: records.iter().filter(|r| r.score_global.is_none()).count(),
            missing_municipality: records.iter().filter(|r| r.municipality.is_none()).count(),
            ..DataQuality::default()
        };
        Self {
            name,
            records,
            quality,
        }
    }

    /// Get the number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if dataset is empty
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct municipalities, sorted
    pub fn municipalities(&self) -> BTreeSet<String> {
        self.records
            .iter()
            .filter_map(|r| r.municipality.clone())
            .collect()
    }

    /// Distinct strata present, in canonical order
    pub fn strata(&self) -> BTreeSet<Stratum> {
        self.records.iter().filter_map(|r| r.stratum).collect()
    }

    /// Distinct values of an education variable, sorted
    pub fn education_values(&self, variable: EducationVariable) -> BTreeSet<String> {
        self.records
            .iter()
            .filter_map(|r| r.education(variable).map(str::to_string))
            .collect()
    }

    /// Load dataset from CSV
    ///
    /// Every cell is read as text; the columns named by `mapping` must all
    /// be present in the header.
    pub fn from_csv(name: String, csv_data: &str, mapping: &ColumnMapping) -> crate::Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(csv_data.as_bytes());

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().trim_matches('"').to_string())
            .collect();
        let columns = ColumnIndex::resolve(&headers, mapping)?;

        let mut raw = Vec::new();
        for result in reader.records() {
            let record = result?;
            raw.push(columns.extract(|i| record.get(i)));
        }

        log::info!("CSV '{}': {} rows, {} columns", name, raw.len(), headers.len());
        Ok(Self::from_raw(name, raw))
    }

    /// Load dataset from a JSON array of objects keyed by column name
    pub fn from_json(name: String, json_data: &str, mapping: &ColumnMapping) -> crate::Result<Self> {
        let data: Vec<HashMap<String, serde_json::Value>> = serde_json::from_str(json_data)?;

        // Union of keys across rows; an empty array has no columns to check
        if !data.is_empty() {
            let keys: Vec<&str> = data
                .iter()
                .flat_map(|item| item.keys().map(String::as_str))
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect();
            check_columns(&keys, mapping)?;
        }

        let cell = |item: &HashMap<String, serde_json::Value>, key: &str| -> Option<String> {
            match item.get(key)? {
                serde_json::Value::String(s) => Some(s.clone()),
                serde_json::Value::Number(n) => Some(n.to_string()),
                serde_json::Value::Bool(b) => Some(b.to_string()),
                serde_json::Value::Null => None,
                other => Some(other.to_string()),
            }
        };

        let raw = data
            .iter()
            .map(|item| RawRecord {
                score: cell(item, &mapping.score),
                stratum: cell(item, &mapping.stratum),
                education_mother: cell(item, &mapping.education_mother),
                education_father: cell(item, &mapping.education_father),
                municipality: cell(item, &mapping.municipality),
            })
            .collect();

        Ok(Self::from_raw(name, raw))
    }
}

/// Table file format, chosen by extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Csv,
    Json,
    Arrow,
}

impl SourceFormat {
    /// `.json` and `.arrow`/`.arrows`/`.ipc` are recognized; anything else is CSV
    pub fn from_path(path: &Path) -> Self {
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase());
        match extension.as_deref() {
            Some("json") => SourceFormat::Json,
            Some("arrow") | Some("arrows") | Some("ipc") => SourceFormat::Arrow,
            _ => SourceFormat::Csv,
        }
    }
}

/// Fail when any mapped column is absent from `headers`
pub(crate) fn check_columns<S: AsRef<str>>(
    headers: &[S],
    mapping: &ColumnMapping,
) -> Result<(), AnalysisError> {
    let missing: Vec<&str> = mapping
        .required()
        .into_iter()
        .filter(|&name| !headers.iter().any(|h| h.as_ref() == name))
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(AnalysisError::ConfigError(format!(
            "missing required columns: {}",
            missing.join(", ")
        )))
    }
}

/// Trim a categorical cell, blank becomes missing
fn clean_category(raw: Option<&str>) -> Option<String> {
    raw.and_then(non_empty).map(|v| v.trim().to_string())
}

/// Positions of the mapped columns within a header row
#[derive(Debug, Clone, Copy)]
pub(crate) struct ColumnIndex {
    score: usize,
    stratum: usize,
    education_mother: usize,
    education_father: usize,
    municipality: usize,
}

impl ColumnIndex {
    pub(crate) fn resolve<S: AsRef<str>>(
        headers: &[S],
        mapping: &ColumnMapping,
    ) -> Result<Self, AnalysisError> {
        check_columns(headers, mapping)?;

        let find = |name: &str| headers.iter().position(|h| h.as_ref() == name);
        let at = |name: &str| find(name).unwrap_or_default();
        Ok(Self {
            score: at(&mapping.score),
            stratum: at(&mapping.stratum),
            education_mother: at(&mapping.education_mother),
            education_father: at(&mapping.education_father),
            municipality: at(&mapping.municipality),
        })
    }

    pub(crate) fn extract<'a, F>(&self, get: F) -> RawRecord
    where
        F: Fn(usize) -> Option<&'a str>,
    {
        let owned = |i: usize| get(i).map(str::to_string);
        RawRecord {
            score: owned(self.score),
            stratum: owned(self.stratum),
            education_mother: owned(self.education_mother),
            education_father: owned(self.education_father),
            municipality: owned(self.municipality),
        }
    }
}
