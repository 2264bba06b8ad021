use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::aggregate::{cross_tab, distribution, tier_aggregates, Distribution, PivotTable};
use crate::dataset::{DataQuality, Dataset};
use crate::filter::{apply, AppliedFilters, Selection};
use crate::gap::{rank, GapRanking};
use crate::normalize::{EducationVariable, Stratum};
use crate::outcome::{empty_selection, guard_distribution, guard_pivot, Outcome, Stage};

/// Everything the presentation layer needs for one filter state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub filters: AppliedFilters,
    /// Rows surviving the filters
    pub rows: usize,
    pub distribution: Outcome<Distribution>,
    pub cross_tab: Outcome<PivotTable>,
    pub ranking: Outcome<GapRanking>,
}

/// Run one computation cycle over an immutable table
///
/// Pure: the result depends only on `dataset` and `selection`.
pub fn compute(dataset: &Dataset, selection: &Selection) -> Dashboard {
    let subset = apply(dataset, selection);
    let rows = subset.len();

    if subset.is_empty() {
        log::debug!("selection matched no rows in '{}'", dataset.name);
        return Dashboard {
            filters: subset.filters,
            rows,
            distribution: empty_selection(Stage::Distribution),
            cross_tab: empty_selection(Stage::CrossTab),
            ranking: empty_selection(Stage::GapRanking),
        };
    }

    let distribution = guard_distribution(distribution(&subset));
    let cross_tab = guard_pivot(cross_tab(&subset));
    let ranking = rank(&tier_aggregates(&subset), subset.filters.selection_size());

    Dashboard {
        filters: subset.filters,
        rows,
        distribution,
        cross_tab,
        ranking,
    }
}

/// Values a UI can offer in its selectors
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectorOptions {
    pub municipalities: Vec<String>,
    pub strata: Vec<Stratum>,
    pub education_mother: Vec<String>,
    pub education_father: Vec<String>,
}

/// Shared handle over one normalized table
///
/// Cloning is cheap and clones share the table, so independent viewers can
/// compute concurrently without locking.
#[derive(Debug, Clone)]
pub struct GapEngine {
    dataset: Arc<Dataset>,
}

impl GapEngine {
    /// Create an engine over a normalized dataset
    pub fn new(dataset: Dataset) -> Self {
        Self {
            dataset: Arc::new(dataset),
        }
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn quality(&self) -> &DataQuality {
        &self.dataset.quality
    }

    /// Compute all three views for a selection
    pub fn compute(&self, selection: &Selection) -> Dashboard {
        compute(&self.dataset, selection)
    }

    /// Distinct selector values present in the table
    pub fn options(&self) -> SelectorOptions {
        let sorted = |set: BTreeSet<String>| set.into_iter().collect::<Vec<_>>();
        SelectorOptions {
            municipalities: sorted(self.dataset.municipalities()),
            strata: self.dataset.strata().into_iter().collect(),
            education_mother: sorted(self.dataset.education_values(EducationVariable::Mother)),
            education_father: sorted(self.dataset.education_values(EducationVariable::Father)),
        }
    }
}
