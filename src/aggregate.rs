//! Grouping and statistics shared by the summary and the chart steps.

use std::collections::HashMap;
use std::fmt::Display;

use chrono::{Datelike, NaiveDateTime};
use serde::{Serialize, Serializer};

use crate::events::EdaError;
use crate::table::Table;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MonthKey {
    pub year: i32,
    pub month: u32,
}

impl MonthKey {
    pub fn of(stamp: &NaiveDateTime) -> Self {
        Self {
            year: stamp.year(),
            month: stamp.month(),
        }
    }

    pub fn next(self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }
}

impl Display for MonthKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl Serialize for MonthKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Every calendar month from `first` to `last`, inclusive.
pub fn month_range(first: MonthKey, last: MonthKey) -> Vec<MonthKey> {
    let mut months = Vec::new();
    let mut month = first;
    while month <= last {
        months.push(month);
        month = month.next();
    }
    months
}

/// Groups keyed by label in first-seen order.
struct Groups<T> {
    order: Vec<String>,
    members: HashMap<String, Vec<T>>,
}

impl<T> Groups<T> {
    fn collect<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (Option<String>, T)>,
    {
        let mut order = Vec::new();
        let mut members: HashMap<String, Vec<T>> = HashMap::new();
        for (label, value) in pairs {
            // rows without a label are dropped from every grouping
            let Some(label) = label else { continue };
            members
                .entry(label.clone())
                .or_insert_with(|| {
                    order.push(label);
                    Vec::new()
                })
                .push(value);
        }
        Self { order, members }
    }

    fn reduce<F>(mut self, f: F) -> Vec<(String, f64)>
    where
        F: Fn(Vec<T>) -> f64,
    {
        self.order
            .into_iter()
            .map(|label| {
                let values = self.members.remove(&label).unwrap_or_default();
                (label, f(values))
            })
            .collect()
    }
}

/// Stable descending sort on the value; NaN sinks to the end.
pub fn sort_descending(groups: &mut [(String, f64)]) {
    groups.sort_by(|a, b| match (a.1.is_nan(), b.1.is_nan()) {
        (true, true) => std::cmp::Ordering::Equal,
        (true, false) => std::cmp::Ordering::Greater,
        (false, true) => std::cmp::Ordering::Less,
        (false, false) => b.1.total_cmp(&a.1),
    });
}

/// Rows per distinct label, most frequent first.
pub fn value_counts(labels: &[Option<String>]) -> Vec<(String, f64)> {
    let mut counts =
        Groups::collect(labels.iter().map(|l| (l.clone(), ()))).reduce(|v| v.len() as f64);
    sort_descending(&mut counts);
    counts
}

pub fn group_sum(labels: &[Option<String>], values: &[Option<f64>]) -> Vec<(String, f64)> {
    Groups::collect(labels.iter().cloned().zip(values.iter().copied()))
        .reduce(|v| v.into_iter().flatten().sum())
}

pub fn group_mean(labels: &[Option<String>], values: &[Option<f64>]) -> Vec<(String, f64)> {
    Groups::collect(labels.iter().cloned().zip(values.iter().copied())).reduce(|v| {
        let present: Vec<f64> = v.into_iter().flatten().collect();
        mean(&present)
    })
}

/// Sum per calendar month across the whole date range, empty months included as zero.
pub fn monthly_sum(
    stamps: &[Option<NaiveDateTime>],
    values: &[Option<f64>],
) -> Vec<(MonthKey, f64)> {
    let mut totals: HashMap<MonthKey, f64> = HashMap::new();
    for (stamp, value) in stamps.iter().zip(values.iter()) {
        let Some(stamp) = stamp else { continue };
        *totals.entry(MonthKey::of(stamp)).or_insert(0.0) += value.unwrap_or(0.0);
    }

    let (Some(first), Some(last)) = (totals.keys().min(), totals.keys().max()) else {
        return Vec::new();
    };
    month_range(*first, *last)
        .into_iter()
        .map(|month| (month, totals.get(&month).copied().unwrap_or(0.0)))
        .collect()
}

/// Row counts per (month, label), chronological then first-seen label order.
///
/// Combinations with no rows are absent rather than zero.
pub fn monthly_counts_by(
    stamps: &[Option<NaiveDateTime>],
    labels: &[Option<String>],
) -> Vec<(MonthKey, String, usize)> {
    let mut label_order: Vec<&str> = Vec::new();
    let mut counts: HashMap<(MonthKey, &str), usize> = HashMap::new();
    for (stamp, label) in stamps.iter().zip(labels.iter()) {
        let (Some(stamp), Some(label)) = (stamp, label) else {
            continue;
        };
        if !label_order.contains(&label.as_str()) {
            label_order.push(label);
        }
        *counts.entry((MonthKey::of(stamp), label.as_str())).or_insert(0) += 1;
    }

    let mut rows: Vec<(MonthKey, String, usize)> = counts
        .into_iter()
        .map(|((month, label), count)| (month, label.to_owned(), count))
        .collect();
    rows.sort_by_key(|(month, label, _)| {
        let rank = label_order.iter().position(|l| *l == label.as_str());
        (*month, rank)
    });
    rows
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        f64::NAN
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Sample standard deviation (n - 1 denominator).
pub fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return f64::NAN;
    }
    let m = mean(values);
    let variance =
        values.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

/// Linear-interpolated quantile of already sorted values.
pub fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let pos = q * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    sorted[lower] + (sorted[upper] - sorted[lower]) * (pos - lower as f64)
}

/// Pearson correlation over rows where both values are present.
pub fn pearson(x: &[Option<f64>], y: &[Option<f64>]) -> f64 {
    let pairs: Vec<(f64, f64)> = x
        .iter()
        .zip(y.iter())
        .filter_map(|(a, b)| Some(((*a)?, (*b)?)))
        .collect();
    if pairs.len() < 2 {
        return f64::NAN;
    }

    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n;
    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (a, b) in &pairs {
        cov += (a - mean_x) * (b - mean_y);
        var_x += (a - mean_x).powi(2);
        var_y += (b - mean_y).powi(2);
    }
    if var_x == 0.0 || var_y == 0.0 {
        return f64::NAN;
    }
    (cov / (var_x.sqrt() * var_y.sqrt())).clamp(-1.0, 1.0)
}

pub fn correlation_matrix(table: &Table, columns: &[&str]) -> Result<Vec<Vec<f64>>, EdaError> {
    let data = columns
        .iter()
        .map(|name| table.numeric(name))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(data
        .iter()
        .map(|x| data.iter().map(|y| pearson(x, y)).collect())
        .collect())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bin {
    pub start: f64,
    pub end: f64,
    pub count: usize,
}

// upper bound before falling back to the Sturges width
const MAX_BINS: usize = 10_000;

/// Histogram edges picked by the numpy "auto" rule over the finite values.
pub fn histogram_bins(values: &[f64]) -> Vec<Bin> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return Vec::new();
    }
    sorted.sort_by(f64::total_cmp);
    let (min, max) = (sorted[0], sorted[sorted.len() - 1]);
    if min == max {
        return vec![Bin {
            start: min - 0.5,
            end: max + 0.5,
            count: sorted.len(),
        }];
    }

    let n = sorted.len() as f64;
    let range = max - min;
    let sturges = range / (n.log2() + 1.0);
    let iqr = quantile(&sorted, 0.75) - quantile(&sorted, 0.25);
    let fd = 2.0 * iqr / n.cbrt();
    let width = if fd > 0.0 && range / fd <= MAX_BINS as f64 {
        fd.min(sturges)
    } else {
        sturges
    };
    let bin_count = ((range / width).ceil() as usize).clamp(1, MAX_BINS);
    let width = range / bin_count as f64;

    let mut bins: Vec<Bin> = (0..bin_count)
        .map(|i| Bin {
            start: min + width * i as f64,
            end: if i + 1 == bin_count {
                max
            } else {
                min + width * (i + 1) as f64
            },
            count: 0,
        })
        .collect();
    for value in &sorted {
        // the last bin is closed on the right
        let idx = (((value - min) / width) as usize).min(bin_count - 1);
        bins[idx].count += 1;
    }
    bins
}

const KDE_GRID: usize = 200;

/// Gaussian KDE (Scott's bandwidth) over the data range, scaled to bin counts.
pub fn density_curve(values: &[f64], bin_width: f64) -> Vec<(f64, f64)> {
    let sigma = std_dev(values);
    if values.len() < 2 || !sigma.is_finite() || sigma == 0.0 {
        return Vec::new();
    }
    let n = values.len() as f64;
    let bandwidth = sigma * n.powf(-0.2);
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let step = (max - min) / (KDE_GRID - 1) as f64;
    let norm = 1.0 / (bandwidth * (2.0 * std::f64::consts::PI).sqrt());

    (0..KDE_GRID)
        .map(|i| {
            let x = min + step * i as f64;
            let density = values
                .iter()
                .map(|v| (-0.5 * ((x - v) / bandwidth).powi(2)).exp())
                .sum::<f64>()
                * norm
                / n;
            (x, density * n * bin_width)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn labels(raw: &[&str]) -> Vec<Option<String>> {
        raw.iter().map(|l| Some(l.to_string())).collect()
    }

    fn stamp(y: i32, m: u32, d: u32) -> Option<NaiveDateTime> {
        NaiveDate::from_ymd_opt(y, m, d)?.and_hms_opt(0, 0, 0)
    }

    #[test]
    fn test_value_counts_ties_keep_first_seen() {
        let counts = value_counts(&labels(&["b", "a", "a", "b", "c"]));
        assert_eq!(
            counts,
            vec![
                ("b".to_owned(), 2.0),
                ("a".to_owned(), 2.0),
                ("c".to_owned(), 1.0)
            ]
        );
    }

    #[test]
    fn test_group_sum_and_mean() {
        let keys = vec![Some("a".to_owned()), Some("b".to_owned()), None, Some("a".to_owned())];
        let values = vec![Some(1.0), Some(2.0), Some(100.0), None];

        assert_eq!(
            group_sum(&keys, &values),
            vec![("a".to_owned(), 1.0), ("b".to_owned(), 2.0)]
        );
        assert_eq!(
            group_mean(&keys, &values),
            vec![("a".to_owned(), 1.0), ("b".to_owned(), 2.0)]
        );
    }

    #[test]
    fn test_grouped_mean_reaggregates_to_overall_mean() {
        let keys = labels(&["a", "b", "a", "c", "b", "a"]);
        let values = vec![
            Some(0.1),
            Some(0.2),
            Some(0.3),
            Some(0.05),
            Some(0.0),
            Some(0.25),
        ];
        let means = group_mean(&keys, &values);
        let counts = value_counts(&keys);

        let weighted: f64 = means
            .iter()
            .map(|(label, m)| {
                let size = counts.iter().find(|(l, _)| l == label).map_or(0.0, |c| c.1);
                m * size
            })
            .sum::<f64>()
            / keys.len() as f64;
        let overall = mean(&values.iter().flatten().copied().collect::<Vec<_>>());
        assert!((weighted - overall).abs() < 1e-12);
    }

    #[test]
    fn test_sort_descending_is_stable() {
        let mut groups = vec![
            ("x".to_owned(), 1.0),
            ("y".to_owned(), f64::NAN),
            ("z".to_owned(), 3.0),
            ("w".to_owned(), 1.0),
        ];
        sort_descending(&mut groups);
        let order: Vec<&str> = groups.iter().map(|g| g.0.as_str()).collect();
        assert_eq!(order, vec!["z", "x", "w", "y"]);
    }

    #[test]
    fn test_monthly_sum_fills_gaps() {
        let stamps = vec![stamp(2024, 1, 5), stamp(2024, 3, 31), None, stamp(2024, 1, 20)];
        let values = vec![Some(18.0), Some(5.0), Some(99.0), Some(2.0)];
        let months = monthly_sum(&stamps, &values);

        let rendered: Vec<(String, f64)> =
            months.iter().map(|(m, v)| (m.to_string(), *v)).collect();
        assert_eq!(
            rendered,
            vec![
                ("2024-01".to_owned(), 20.0),
                ("2024-02".to_owned(), 0.0),
                ("2024-03".to_owned(), 5.0)
            ]
        );
    }

    #[test]
    fn test_month_range_crosses_year() {
        let months = month_range(
            MonthKey { year: 2023, month: 11 },
            MonthKey { year: 2024, month: 2 },
        );
        let rendered: Vec<String> = months.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, vec!["2023-11", "2023-12", "2024-01", "2024-02"]);
    }

    #[test]
    fn test_monthly_counts_skip_empty_combinations() {
        let stamps = vec![stamp(2024, 1, 1), stamp(2024, 1, 2), stamp(2024, 3, 1)];
        let methods = labels(&["card", "cash", "card"]);
        let rows = monthly_counts_by(&stamps, &methods);

        let rendered: Vec<(String, &str, usize)> = rows
            .iter()
            .map(|(m, l, c)| (m.to_string(), l.as_str(), *c))
            .collect();
        assert_eq!(
            rendered,
            vec![
                ("2024-01".to_owned(), "card", 1),
                ("2024-01".to_owned(), "cash", 1),
                ("2024-03".to_owned(), "card", 1)
            ]
        );
    }

    #[test]
    fn test_descriptive_helpers() {
        let sorted = vec![1.0, 2.0, 3.0, 4.0];
        assert_eq!(mean(&sorted), 2.5);
        assert_eq!(quantile(&sorted, 0.25), 1.75);
        assert_eq!(quantile(&sorted, 0.5), 2.5);
        assert!((std_dev(&sorted) - 1.2909944487358056).abs() < 1e-12);
        assert!(mean(&[]).is_nan());
        assert!(std_dev(&[1.0]).is_nan());
    }

    #[test]
    fn test_pearson() {
        let x = vec![Some(1.0), Some(2.0), Some(3.0), None];
        let y = vec![Some(2.0), Some(4.0), Some(6.0), Some(1.0)];
        let z = vec![Some(3.0), Some(2.0), Some(1.0), Some(0.0)];
        assert!((pearson(&x, &y) - 1.0).abs() < 1e-12);
        assert!((pearson(&x, &z) + 1.0).abs() < 1e-12);

        let flat = vec![Some(1.0); 4];
        assert!(pearson(&x, &flat).is_nan());
    }

    #[test]
    fn test_histogram_bins_cover_all_values() {
        let values: Vec<f64> = (0..50).map(|i| (i % 7) as f64).collect();
        let bins = histogram_bins(&values);
        assert!(!bins.is_empty());
        assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), values.len());
        assert_eq!(bins[0].start, 0.0);
        assert_eq!(bins[bins.len() - 1].end, 6.0);

        let constant = histogram_bins(&[2.0, 2.0]);
        assert_eq!(
            constant,
            vec![Bin {
                start: 1.5,
                end: 2.5,
                count: 2
            }]
        );
        assert!(histogram_bins(&[]).is_empty());
    }

    #[test]
    fn test_histogram_bins_outlier_and_infinity() {
        let mut values: Vec<f64> = (1..=100).map(f64::from).collect();
        values.push(1e12);
        let bins = histogram_bins(&values);
        assert!(bins.len() <= MAX_BINS);
        assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), values.len());
        assert_eq!(bins[bins.len() - 1].end, 1e12);

        let bins = histogram_bins(&[1.0, 2.0, 3.0, 4.0, f64::INFINITY, f64::NAN]);
        assert!(!bins.is_empty());
        assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), 4);
        assert_eq!(bins[bins.len() - 1].end, 4.0);

        assert!(histogram_bins(&[f64::INFINITY, f64::NEG_INFINITY]).is_empty());
    }

    #[test]
    fn test_density_curve_shape() {
        let values = vec![1.0, 2.0, 2.0, 3.0, 3.0, 3.0, 4.0];
        let curve = density_curve(&values, 1.0);
        assert_eq!(curve.len(), 200);
        assert_eq!(curve[0].0, 1.0);
        assert!(curve.iter().all(|(_, y)| *y > 0.0));
        assert!(density_curve(&[5.0, 5.0], 1.0).is_empty());
    }
}
