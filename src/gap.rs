//! High-minus-low gap ranking per municipality

use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeSet;

use crate::aggregate::{TierAggregates, TierStat};
use crate::normalize::Tier;
use crate::outcome::{NoData, NoDataReason, Outcome, Stage};

/// Minimum scored rows per compared tier, by number of selected municipalities
///
/// Small selections get a looser threshold so a single municipality can
/// still be ranked from a handful of examinees.
pub fn min_sample_size(selected_municipalities: usize) -> usize {
    match selected_municipalities {
        1 => 1,
        2..=5 => 5,
        _ => 20,
    }
}

/// One municipality after the outer merge of the three tier maps
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MunicipalityAggregate {
    pub municipality: String,
    pub low: Option<TierStat>,
    pub mid: Option<TierStat>,
    pub high: Option<TierStat>,
}

/// Outer-merge the tier maps on municipality, sorted by name
///
/// A municipality with no rows in a tier gets `None` for it, not zero.
pub fn merge(tiers: &TierAggregates) -> Vec<MunicipalityAggregate> {
    let names: BTreeSet<&String> = Tier::ALL
        .iter()
        .flat_map(|t| tiers.tier(*t).keys())
        .collect();

    names
        .into_iter()
        .map(|name| MunicipalityAggregate {
            municipality: name.clone(),
            low: tiers.low.get(name).copied(),
            mid: tiers.mid.get(name).copied(),
            high: tiers.high.get(name).copied(),
        })
        .collect()
}

/// A ranked municipality
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GapRow {
    pub municipality: String,
    pub mean_low: f64,
    pub count_low: usize,
    pub mean_mid: Option<f64>,
    pub count_mid: Option<usize>,
    pub mean_high: f64,
    pub count_high: usize,
    /// `mean_high - mean_low`
    pub gap: f64,
}

/// Ordered gap ranking with the threshold that produced it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GapRanking {
    pub min_n: usize,
    pub selection_size: usize,
    /// Municipalities with both tiers present but below `min_n`
    pub excluded: Vec<String>,
    /// Ascending by gap, ties by municipality name
    pub rows: Vec<GapRow>,
}

impl GapRanking {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row with the largest gap
    pub fn widest(&self) -> Option<&GapRow> {
        self.rows.last()
    }
}

/// Rank municipalities by the gap between high and low tier means
///
/// Mid-tier data is carried along for display but never required.
pub fn rank(tiers: &TierAggregates, selection_size: usize) -> Outcome<GapRanking> {
    let min_n = min_sample_size(selection_size);

    let mut candidates = 0usize;
    let mut excluded = Vec::new();
    let mut rows = Vec::new();

    for agg in merge(tiers) {
        let (low, high) = match (agg.low, agg.high) {
            (
                Some(TierStat { mean: Some(mean_low), count: count_low }),
                Some(TierStat { mean: Some(mean_high), count: count_high }),
            ) => ((mean_low, count_low), (mean_high, count_high)),
            _ => continue,
        };
        candidates += 1;

        if low.1 < min_n || high.1 < min_n {
            excluded.push(agg.municipality);
            continue;
        }

        rows.push(GapRow {
            municipality: agg.municipality,
            mean_low: low.0,
            count_low: low.1,
            mean_mid: agg.mid.and_then(|m| m.mean),
            count_mid: agg.mid.map(|m| m.count),
            mean_high: high.0,
            count_high: high.1,
            gap: high.0 - low.0,
        });
    }

    log::debug!(
        "gap ranking: {} candidates, {} ranked, {} below min_n={}",
        candidates,
        rows.len(),
        excluded.len(),
        min_n
    );

    if candidates == 0 {
        return Outcome::NoData(NoData::new(
            Stage::GapRanking,
            NoDataReason::NoLowHighTierData { min_n },
        ));
    }
    if rows.is_empty() {
        return Outcome::NoData(NoData::new(
            Stage::GapRanking,
            NoDataReason::BelowMinSample { min_n, candidates },
        ));
    }

    rows.sort_by(compare_rows);
    Outcome::Data(GapRanking {
        min_n,
        selection_size,
        excluded,
        rows,
    })
}

fn compare_rows(a: &GapRow, b: &GapRow) -> Ordering {
    a.gap
        .total_cmp(&b.gap)
        .then_with(|| a.municipality.cmp(&b.municipality))
}
