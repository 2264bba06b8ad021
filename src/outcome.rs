//! Typed no-data results for the presentation layer
//!
//! Every view the engine produces is either real data or a [`NoData`]
//! carrying the stage that ran dry and a readable reason. Consumers never
//! get a structurally empty aggregate to render.

use serde::Serialize;
use std::fmt;

use crate::aggregate::{Distribution, PivotTable};

/// Pipeline stage that produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Filter,
    Distribution,
    CrossTab,
    GapRanking,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Filter => f.write_str("filter"),
            Stage::Distribution => f.write_str("distribution"),
            Stage::CrossTab => f.write_str("cross-tab"),
            Stage::GapRanking => f.write_str("gap ranking"),
        }
    }
}

/// Why a stage has nothing to show
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NoDataReason {
    /// The filters matched no rows
    EmptySelection,
    /// Rows matched but none carried a stratum
    NoStratumData,
    /// No (stratum, education value) cell holds a scored row
    EmptyPivot,
    /// No municipality has scored rows in both the low and the high tier
    NoLowHighTierData { min_n: usize },
    /// Every candidate municipality fell under the sample threshold
    BelowMinSample { min_n: usize, candidates: usize },
}

impl fmt::Display for NoDataReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoDataReason::EmptySelection => f.write_str("the current filters match no rows"),
            NoDataReason::NoStratumData => {
                f.write_str("no rows with a recognized stratum in the current selection")
            }
            NoDataReason::EmptyPivot => f.write_str(
                "no stratum/education combination has a scored row in the current selection",
            ),
            NoDataReason::NoLowHighTierData { min_n } => write!(
                f,
                "no low/high tier data in the current selection (min_n = {})",
                min_n
            ),
            NoDataReason::BelowMinSample { min_n, candidates } => write!(
                f,
                "none of {} municipalities has at least {} scored rows in both low and high tiers (min_n = {})",
                candidates, min_n, min_n
            ),
        }
    }
}

/// The no-data sentinel
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NoData {
    pub stage: Stage,
    pub reason: NoDataReason,
    pub message: String,
}

impl NoData {
    pub fn new(stage: Stage, reason: NoDataReason) -> Self {
        let message = format!("{}: {}", stage, reason);
        Self {
            stage,
            reason,
            message,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Threshold applied when the gap stage ran dry, if any
    pub fn min_n(&self) -> Option<usize> {
        match self.reason {
            NoDataReason::BelowMinSample { min_n, .. }
            | NoDataReason::NoLowHighTierData { min_n } => Some(min_n),
            _ => None,
        }
    }
}

impl fmt::Display for NoData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Either a populated view or a no-data sentinel
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum Outcome<T> {
    Data(T),
    NoData(NoData),
}

impl<T> Outcome<T> {
    pub fn is_data(&self) -> bool {
        matches!(self, Outcome::Data(_))
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            Outcome::Data(value) => Some(value),
            Outcome::NoData(_) => None,
        }
    }

    pub fn into_data(self) -> Option<T> {
        match self {
            Outcome::Data(value) => Some(value),
            Outcome::NoData(_) => None,
        }
    }

    pub fn no_data(&self) -> Option<&NoData> {
        match self {
            Outcome::Data(_) => None,
            Outcome::NoData(no_data) => Some(no_data),
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Outcome<U> {
        match self {
            Outcome::Data(value) => Outcome::Data(f(value)),
            Outcome::NoData(no_data) => Outcome::NoData(no_data),
        }
    }
}

/// Sentinel for a stage downstream of an empty filter result
pub fn empty_selection<T>(stage: Stage) -> Outcome<T> {
    Outcome::NoData(NoData::new(stage, NoDataReason::EmptySelection))
}

/// Wrap a distribution, rejecting one without groups
pub fn guard_distribution(distribution: Distribution) -> Outcome<Distribution> {
    if distribution.is_empty() {
        Outcome::NoData(NoData::new(Stage::Distribution, NoDataReason::NoStratumData))
    } else {
        Outcome::Data(distribution)
    }
}

/// Wrap a pivot, rejecting one without cells
pub fn guard_pivot(pivot: PivotTable) -> Outcome<PivotTable> {
    if pivot.is_empty() {
        Outcome::NoData(NoData::new(Stage::CrossTab, NoDataReason::EmptyPivot))
    } else {
        Outcome::Data(pivot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::EducationVariable;
    use ndarray::Array2;

    #[test]
    fn test_no_data_message_names_stage() {
        let no_data = NoData::new(Stage::GapRanking, NoDataReason::NoLowHighTierData { min_n: 5 });
        assert_eq!(
            no_data.to_string(),
            "gap ranking: no low/high tier data in the current selection (min_n = 5)"
        );
        assert_eq!(no_data.min_n(), Some(5));

        let empty = NoData::new(Stage::CrossTab, NoDataReason::EmptyPivot);
        assert_eq!(empty.min_n(), None);
    }

    #[test]
    fn test_below_min_sample_reports_threshold() {
        let no_data = NoData::new(
            Stage::GapRanking,
            NoDataReason::BelowMinSample {
                min_n: 5,
                candidates: 3,
            },
        );
        assert_eq!(no_data.min_n(), Some(5));
        assert!(no_data.message().contains("min_n = 5"));
    }

    #[test]
    fn test_guard_rejects_empty_views() {
        assert!(guard_distribution(Distribution::default()).no_data().is_some());

        let pivot = PivotTable {
            education: EducationVariable::Mother,
            strata: Vec::new(),
            columns: Vec::new(),
            means: Array2::from_elem((0, 0), None),
            counts: Array2::zeros((0, 0)),
        };
        let outcome = guard_pivot(pivot);
        assert_eq!(outcome.no_data().unwrap().stage, Stage::CrossTab);
    }

    #[test]
    fn test_outcome_serializes_with_status_tag() {
        let outcome: Outcome<u32> = empty_selection(Stage::Filter);
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "no_data");
        assert_eq!(json["value"]["stage"], "filter");
        assert_eq!(json["value"]["reason"]["kind"], "empty_selection");

        let data: Outcome<u32> = Outcome::Data(7);
        let json = serde_json::to_value(&data).unwrap();
        assert_eq!(json["status"], "data");
        assert_eq!(json["value"], 7);
    }

    #[test]
    fn test_outcome_map() {
        let data: Outcome<u32> = Outcome::Data(2);
        assert_eq!(data.map(|v| v * 10).into_data(), Some(20));
        let none: Outcome<u32> = empty_selection(Stage::CrossTab);
        assert!(!none.map(|v| v * 10).is_data());
    }
}
