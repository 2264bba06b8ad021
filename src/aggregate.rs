//! Grouping of the filtered subset
//!
//! Three views are produced: per-stratum score distributions, a
//! stratum × education cross-tab of mean scores, and per-municipality
//! `(mean, count)` within each tier group. None of them fail on empty
//! input; they return empty structures that the outcome layer turns into
//! no-data results.

use ndarray::Array2;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::filter::Subset;
use crate::normalize::{EducationVariable, Stratum, Tier};
use crate::stats::{MeanCount, Statistics};

/// Score distribution of one stratum
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StratumGroup {
    pub stratum: Stratum,
    /// Rows in the group, scored or not
    pub rows: usize,
    /// Summary of the non-missing scores; `None` if every score is missing
    pub stats: Option<Statistics>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Distribution {
    pub groups: Vec<StratumGroup>,
}

impl Distribution {
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn group(&self, stratum: Stratum) -> Option<&StratumGroup> {
        self.groups.iter().find(|g| g.stratum == stratum)
    }
}

/// Group the subset by stratum, in canonical order
///
/// Rows without a stratum belong to no group; strata without rows are
/// omitted rather than reported as empty groups.
pub fn distribution(subset: &Subset) -> Distribution {
    let mut by_stratum: BTreeMap<Stratum, Vec<Option<f64>>> = BTreeMap::new();
    for row in &subset.rows {
        if let Some(stratum) = row.stratum {
            by_stratum.entry(stratum).or_default().push(row.score_global);
        }
    }

    let groups = by_stratum
        .into_iter()
        .map(|(stratum, scores)| StratumGroup {
            stratum,
            rows: scores.len(),
            stats: Statistics::compute(scores),
        })
        .collect();

    Distribution { groups }
}

/// Mean score by stratum (rows) and education value (columns)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PivotTable {
    pub education: EducationVariable,
    /// Row labels, canonical stratum order
    pub strata: Vec<Stratum>,
    /// Column labels, sorted
    pub columns: Vec<String>,
    /// `means[[row, col]]`; `None` where the combination has no scored row
    pub means: Array2<Option<f64>>,
    /// Scored rows behind each cell
    pub counts: Array2<usize>,
}

impl PivotTable {
    pub fn is_empty(&self) -> bool {
        self.strata.is_empty() || self.columns.is_empty()
    }

    /// Mean score for one cell
    pub fn get(&self, stratum: Stratum, value: &str) -> Option<f64> {
        let row = self.strata.iter().position(|s| *s == stratum)?;
        let col = self.columns.iter().position(|c| c == value)?;
        self.means[[row, col]]
    }

    pub fn count(&self, stratum: Stratum, value: &str) -> usize {
        let row = self.strata.iter().position(|s| *s == stratum);
        let col = self.columns.iter().position(|c| c == value);
        match (row, col) {
            (Some(row), Some(col)) => self.counts[[row, col]],
            _ => 0,
        }
    }
}

/// Cross-tabulate mean score by (stratum, education value)
///
/// Only rows with both keys present contribute. A stratum or education
/// value appears only if at least one of its cells holds a scored row, so
/// the table never carries an all-missing row or column.
pub fn cross_tab(subset: &Subset) -> PivotTable {
    let education = subset.education();
    let mut cells: BTreeMap<(Stratum, &str), MeanCount> = BTreeMap::new();
    for row in &subset.rows {
        if let (Some(stratum), Some(value)) = (row.stratum, row.education(education)) {
            cells.entry((stratum, value)).or_default().push(row.score_global);
        }
    }
    cells.retain(|_, acc| acc.count() > 0);

    let strata: Vec<Stratum> = cells
        .keys()
        .map(|(s, _)| *s)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let columns: Vec<String> = cells
        .keys()
        .map(|(_, v)| *v)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect();

    let mut means = Array2::from_elem((strata.len(), columns.len()), None);
    let mut counts = Array2::zeros((strata.len(), columns.len()));
    for ((stratum, value), acc) in &cells {
        // Both lookups succeed: labels were collected from these keys
        if let (Some(row), Some(col)) = (
            strata.iter().position(|s| s == stratum),
            columns.iter().position(|c| c == value),
        ) {
            means[[row, col]] = acc.mean();
            counts[[row, col]] = acc.count();
        }
    }

    PivotTable {
        education,
        strata,
        columns,
        means,
        counts,
    }
}

/// Mean and count of scores for one municipality within one tier
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TierStat {
    pub mean: Option<f64>,
    pub count: usize,
}

impl From<MeanCount> for TierStat {
    fn from(acc: MeanCount) -> Self {
        Self {
            mean: acc.mean(),
            count: acc.count(),
        }
    }
}

/// Per-municipality aggregates, one map per tier group
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TierAggregates {
    pub low: BTreeMap<String, TierStat>,
    pub mid: BTreeMap<String, TierStat>,
    pub high: BTreeMap<String, TierStat>,
}

impl TierAggregates {
    pub fn tier(&self, tier: Tier) -> &BTreeMap<String, TierStat> {
        match tier {
            Tier::Low => &self.low,
            Tier::Mid => &self.mid,
            Tier::High => &self.high,
        }
    }

    fn tier_mut(&mut self, tier: Tier) -> &mut BTreeMap<String, TierStat> {
        match tier {
            Tier::Low => &mut self.low,
            Tier::Mid => &mut self.mid,
            Tier::High => &mut self.high,
        }
    }

    pub fn is_empty(&self) -> bool {
        Tier::ALL.iter().all(|t| self.tier(*t).is_empty())
    }
}

/// Group by municipality within each tier
///
/// A municipality appears in a tier map when it has at least one row in
/// that tier; its mean is `None` if all of those rows lack a score.
pub fn tier_aggregates(subset: &Subset) -> TierAggregates {
    let mut acc: BTreeMap<(Tier, &str), MeanCount> = BTreeMap::new();
    for row in &subset.rows {
        if let (Some(stratum), Some(municipality)) = (row.stratum, row.municipality.as_deref()) {
            acc.entry((stratum.tier(), municipality))
                .or_default()
                .push(row.score_global);
        }
    }

    let mut out = TierAggregates::default();
    for ((tier, municipality), mean_count) in acc {
        out.tier_mut(tier)
            .insert(municipality.to_string(), mean_count.into());
    }
    out
}
