//! Summary views over formatted rows
//!
//! All operations are total: empty input yields an empty series, an empty
//! ranking or a zero sum.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use super::models::DatedRow;

/// Metric summed per label, labels ascending
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregatedSeries {
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

impl AggregatedSeries {
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn total(&self) -> f64 {
        self.values.iter().sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedGroup {
    pub key: String,
    pub total: f64,
}

/// Sum `metric` per row date; labels come back sorted ascending.
///
/// Rows without a date are skipped.
pub fn series_by_date<T, M>(rows: &[T], metric: M) -> AggregatedSeries
where
    T: DatedRow,
    M: Fn(&T) -> f64,
{
    series_by(rows, |row| row.date().map(str::to_owned), metric)
}

/// Sum `metric` grouped by `key`; labels sorted ascending.
pub fn series_by<T, K, M>(rows: &[T], key: K, metric: M) -> AggregatedSeries
where
    K: Fn(&T) -> Option<String>,
    M: Fn(&T) -> f64,
{
    let mut sums: BTreeMap<String, f64> = BTreeMap::new();
    for row in rows {
        let Some(label) = key(row) else {
            continue;
        };
        *sums.entry(label).or_insert(0.0) += metric(row);
    }

    let (labels, values) = sums.into_iter().unzip();
    AggregatedSeries { labels, values }
}

/// Sum `metric` per group, highest first, keeping at most `top_n` groups.
///
/// The sort is stable, so equal totals keep first-seen order. NaN totals
/// rank last.
pub fn ranked_by_group<T, G, M>(rows: &[T], group: G, metric: M, top_n: usize) -> Vec<RankedGroup>
where
    G: Fn(&T) -> Option<String>,
    M: Fn(&T) -> f64,
{
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<RankedGroup> = Vec::new();

    for row in rows {
        let Some(key) = group(row) else {
            continue;
        };
        let value = metric(row);
        match positions.get(&key) {
            Some(&index) => groups[index].total += value,
            None => {
                positions.insert(key.clone(), groups.len());
                groups.push(RankedGroup { key, total: value });
            }
        }
    }

    groups.sort_by(|a, b| {
        a.total
            .is_nan()
            .cmp(&b.total.is_nan())
            .then_with(|| b.total.total_cmp(&a.total))
    });
    groups.truncate(top_n);
    groups
}

/// Plain sum of `metric` across all rows
pub fn totals<T, M>(rows: &[T], metric: M) -> f64
where
    M: Fn(&T) -> f64,
{
    rows.iter().map(metric).sum()
}

/// Label and value of the largest entry; the leftmost one wins ties.
pub fn peak(series: &AggregatedSeries) -> Option<(&str, f64)> {
    let mut best: Option<(usize, f64)> = None;
    for (index, &value) in series.values.iter().enumerate() {
        match best {
            Some((_, current)) if value <= current || value.is_nan() => {}
            None if value.is_nan() => {}
            _ => best = Some((index, value)),
        }
    }

    best.and_then(|(index, value)| series.labels.get(index).map(|label| (label.as_str(), value)))
}
