use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::dataset::{Dataset, Record};
use crate::normalize::{normalize_text, EducationVariable, Stratum};
use crate::utils::AnalysisError;

/// User selection for one computation cycle
///
/// Empty sets mean "everything present in the table".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Selection {
    pub municipalities: BTreeSet<String>,
    pub strata: BTreeSet<Stratum>,
    pub education: EducationVariable,
}

impl Selection {
    /// Build a selection from raw widget values
    ///
    /// Municipality names are normalized the same way the table is. Unknown
    /// stratum labels or education selectors fail fast.
    pub fn parse<M, S>(municipalities: M, strata: S, education: &str) -> Result<Self, AnalysisError>
    where
        M: IntoIterator,
        M::Item: AsRef<str>,
        S: IntoIterator,
        S::Item: AsRef<str>,
    {
        let strata = strata
            .into_iter()
            .map(|s| s.as_ref().parse::<Stratum>())
            .collect::<Result<BTreeSet<_>, _>>()?;
        Ok(Self {
            municipalities: municipalities
                .into_iter()
                .map(|m| normalize_text(m.as_ref()))
                .filter(|m| !m.is_empty())
                .collect(),
            strata,
            education: education.parse()?,
        })
    }

    pub fn with_municipalities<I, T>(mut self, municipalities: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        self.municipalities = municipalities
            .into_iter()
            .map(|m| normalize_text(m.as_ref()))
            .filter(|m| !m.is_empty())
            .collect();
        self
    }

    pub fn with_strata<I: IntoIterator<Item = Stratum>>(mut self, strata: I) -> Self {
        self.strata = strata.into_iter().collect();
        self
    }

    pub fn with_education(mut self, education: EducationVariable) -> Self {
        self.education = education;
        self
    }
}

/// The filters actually applied, after defaulting
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedFilters {
    pub municipalities: Vec<String>,
    pub strata: Vec<Stratum>,
    pub education: EducationVariable,
    /// True when the caller left the municipality set empty
    pub all_municipalities: bool,
    /// True when the caller left the stratum set empty
    pub all_strata: bool,
}

impl AppliedFilters {
    /// Number of selected municipalities; drives the gap threshold
    pub fn selection_size(&self) -> usize {
        self.municipalities.len()
    }

    /// True when neither filter was restricted by the caller
    pub fn is_unrestricted(&self) -> bool {
        self.all_municipalities && self.all_strata
    }
}

/// Order-preserving view of the rows passing the filters
#[derive(Debug, Clone)]
pub struct Subset<'a> {
    pub rows: Vec<&'a Record>,
    pub filters: AppliedFilters,
}

impl<'a> Subset<'a> {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn education(&self) -> EducationVariable {
        self.filters.education
    }
}

/// Apply a selection to the normalized table
///
/// A defaulted set does not restrict at all, so rows with a missing
/// municipality or stratum survive an unrestricted selection. An explicit
/// set only admits rows whose value is in it.
pub fn apply<'a>(dataset: &'a Dataset, selection: &Selection) -> Subset<'a> {
    let all_municipalities = selection.municipalities.is_empty();
    let all_strata = selection.strata.is_empty();

    let rows: Vec<&Record> = dataset
        .records
        .iter()
        .filter(|r| {
            all_municipalities
                || r.municipality
                    .as_ref()
                    .is_some_and(|m| selection.municipalities.contains(m))
        })
        .filter(|r| all_strata || r.stratum.is_some_and(|s| selection.strata.contains(&s)))
        .collect();

    let municipalities: Vec<String> = if all_municipalities {
        dataset.municipalities().into_iter().collect()
    } else {
        selection.municipalities.iter().cloned().collect()
    };
    let strata: Vec<Stratum> = if all_strata {
        dataset.strata().into_iter().collect()
    } else {
        selection.strata.iter().copied().collect()
    };

    log::debug!(
        "filter: {} of {} rows kept ({} municipalities, {} strata)",
        rows.len(),
        dataset.len(),
        municipalities.len(),
        strata.len()
    );

    Subset {
        rows,
        filters: AppliedFilters {
            municipalities,
            strata,
            education: selection.education,
            all_municipalities,
            all_strata,
        },
    }
}
