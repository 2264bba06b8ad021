use serde::Serialize;

/// Running mean/count over optional scores
///
/// Missing scores are skipped entirely: they count toward neither the sum
/// nor the denominator.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MeanCount {
    sum: f64,
    count: usize,
}

impl MeanCount {
    pub fn push(&mut self, score: Option<f64>) {
        if let Some(value) = score {
            self.sum += value;
            self.count += 1;
        }
    }

    /// Number of non-missing scores seen
    pub fn count(&self) -> usize {
        self.count
    }

    /// Arithmetic mean, or `None` if no score was seen
    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }
}

impl FromIterator<Option<f64>> for MeanCount {
    fn from_iter<I: IntoIterator<Item = Option<f64>>>(iter: I) -> Self {
        let mut acc = MeanCount::default();
        for score in iter {
            acc.push(score);
        }
        acc
    }
}

/// Summary statistics for one group of scores
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statistics {
    pub count: usize,
    pub mean: f64,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
    pub sum: f64,
}

impl Statistics {
    /// Compute statistics over the non-missing scores
    ///
    /// Returns `None` when no score is present.
    pub fn compute<I>(scores: I) -> Option<Self>
    where
        I: IntoIterator<Item = Option<f64>>,
    {
        let mut values: Vec<f64> = scores.into_iter().flatten().collect();
        if values.is_empty() {
            return None;
        }
        values.sort_by(f64::total_cmp);

        let count = values.len();
        let sum: f64 = values.iter().sum();

        Some(Statistics {
            count,
            mean: sum / count as f64,
            min: values[0],
            q1: quantile(&values, 0.25),
            median: quantile(&values, 0.5),
            q3: quantile(&values, 0.75),
            max: values[count - 1],
            sum,
        })
    }
}

/// Linear-interpolated quantile of sorted, non-empty values
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
}
