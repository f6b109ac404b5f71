//! Measures of central tendency, dispersion and position.
//!
//! Numeric measures are only produced when every observation parses as a
//! number; categorical data gets its mode and nothing else.
//!
//! ```
//! use estad_core::descriptive::compute;
//! use estad_core::Value;
//!
//! let values: Vec<Value> = [1, 2, 3, 4].into_iter().map(Value::from).collect();
//! let stats = compute(&values);
//! assert_eq!(stats.median(), Some(2.5));
//! assert_eq!(stats.percentile(50.0), Some(2.5));
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::value::{all_numeric, sort_keys, Value};

/// Most frequent value(s) of a variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "values", rename_all = "snake_case")]
pub enum Mode {
    /// The variable has no observations.
    NoData,
    /// Numeric data where every observation is distinct.
    NoMode,
    /// One or more values sharing the highest frequency, in table order.
    Values(Vec<String>),
}

impl Mode {
    pub fn values(&self) -> &[String] {
        match self {
            Self::Values(v) => v,
            Self::NoData | Self::NoMode => &[],
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoData => write!(f, "sin datos"),
            Self::NoMode => write!(f, "sin moda"),
            Self::Values(v) => write!(f, "{}", v.join(", ")),
        }
    }
}

/// Numeric measures of a fully numeric variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NumericSummary {
    pub mean: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
    pub range: f64,
    pub variance_population: f64,
    /// `None` for a single observation.
    pub variance_sample: Option<f64>,
    pub std_dev_population: f64,
    pub std_dev_sample: Option<f64>,
    /// Population standard deviation as a percentage of the mean. `None` when
    /// the mean is zero.
    pub coefficient_of_variation: Option<f64>,
    /// Standard error of the mean, `s / sqrt(n)` with the sample deviation.
    pub standard_error: Option<f64>,
    /// Q1, Q2, Q3.
    pub quartiles: [f64; 3],
    /// D1 through D9.
    pub deciles: Vec<f64>,
    #[serde(skip)]
    sorted: Vec<f64>,
}

impl NumericSummary {
    pub fn interquartile_range(&self) -> f64 {
        self.quartiles[2] - self.quartiles[0]
    }

    /// False when a measure overflowed. JSON has no encoding for infinities,
    /// so such a summary cannot be stored.
    pub fn is_finite(&self) -> bool {
        let scalars = [
            self.mean,
            self.median,
            self.min,
            self.max,
            self.range,
            self.variance_population,
            self.std_dev_population,
        ];
        let optional = [
            self.variance_sample,
            self.std_dev_sample,
            self.coefficient_of_variation,
            self.standard_error,
        ];
        scalars
            .iter()
            .chain(&self.quartiles)
            .chain(&self.deciles)
            .chain(optional.iter().flatten())
            .all(|x| x.is_finite())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DescriptiveStats {
    pub n: usize,
    pub mode: Mode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub numeric: Option<NumericSummary>,
}

impl DescriptiveStats {
    /// The explicit "no data" result for an empty variable.
    pub fn no_data() -> Self {
        Self {
            n: 0,
            mode: Mode::NoData,
            numeric: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    pub fn is_numeric(&self) -> bool {
        self.numeric.is_some()
    }

    pub fn mean(&self) -> Option<f64> {
        self.numeric.as_ref().map(|s| s.mean)
    }

    pub fn median(&self) -> Option<f64> {
        self.numeric.as_ref().map(|s| s.median)
    }

    /// Percentile `p` in `[0, 100]` by linear interpolation between ranks.
    ///
    /// Only available on freshly computed statistics; a summary read back
    /// from storage keeps its quartiles and deciles but not the raw data.
    pub fn percentile(&self, p: f64) -> Option<f64> {
        self.rank_value(p / 100.0)
    }

    /// Decile `d` in `[0, 10]`.
    pub fn decile(&self, d: f64) -> Option<f64> {
        self.rank_value(d / 10.0)
    }

    /// Quartile `q` in `[0, 4]`.
    pub fn quartile(&self, q: f64) -> Option<f64> {
        self.rank_value(q / 4.0)
    }

    fn rank_value(&self, fraction: f64) -> Option<f64> {
        self.numeric
            .as_ref()
            .and_then(|s| quantile_sorted(&s.sorted, fraction))
    }
}

/// Computes the descriptive statistics of a list of observations.
pub fn compute(values: &[Value]) -> DescriptiveStats {
    if values.is_empty() {
        return DescriptiveStats::no_data();
    }

    let numbers = all_numeric(values);
    debug!(
        n = values.len(),
        numeric = numbers.is_some(),
        "computing descriptive statistics"
    );

    let modes = modal_keys(values);
    // Numeric data where every value is distinct has no mode.
    let mode = if numbers.is_some() && values.len() > 1 && modes.len() == values.len() {
        Mode::NoMode
    } else {
        Mode::Values(modes)
    };

    let numeric = numbers.map(|mut sorted| {
        sorted.sort_by(f64::total_cmp);
        summarize_sorted(sorted)
    });

    DescriptiveStats {
        n: values.len(),
        mode,
        numeric,
    }
}

/// Value at `fraction` of the way through `sorted`, interpolating linearly
/// between the two surrounding ranks. The rank index is clamped to the data.
pub fn quantile_sorted(sorted: &[f64], fraction: f64) -> Option<f64> {
    let last = sorted.len().checked_sub(1)?;
    let index = (fraction * last as f64).clamp(0.0, last as f64);
    if index.is_nan() {
        return None;
    }
    let lower = index.floor() as usize;
    let upper = (lower + 1).min(last);
    let frac = index - lower as f64;
    let (lo, hi) = (sorted[lower], sorted[upper]);
    if frac == 0.0 {
        return Some(lo);
    }
    let gap = hi - lo;
    if gap.is_finite() {
        Some(lo + frac * gap)
    } else {
        Some(lo * (1.0 - frac) + hi * frac)
    }
}

/// Midpoint of `a` and `b` that does not overflow for large magnitudes.
pub fn midpoint(a: f64, b: f64) -> f64 {
    let sum = a + b;
    if sum.is_finite() {
        sum / 2.0
    } else {
        a / 2.0 + b / 2.0
    }
}

/// Arithmetic mean, falling back to summing `x / n` when the plain sum
/// overflows.
fn mean_of(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let sum = values.iter().sum::<f64>();
    if sum.is_finite() {
        sum / n
    } else {
        values.iter().map(|x| x / n).sum()
    }
}

fn summarize_sorted(sorted: Vec<f64>) -> NumericSummary {
    let n = sorted.len() as f64;
    let min = sorted[0];
    let max = sorted[sorted.len() - 1];
    let mean = mean_of(&sorted);

    let mid = sorted.len() / 2;
    let median = if sorted.len() % 2 == 0 {
        midpoint(sorted[mid - 1], sorted[mid])
    } else {
        sorted[mid]
    };

    let squares = sorted.iter().map(|x| (x - mean).powi(2)).sum::<f64>();
    let variance_population = squares / n;
    let variance_sample = (sorted.len() > 1).then(|| squares / (n - 1.0));
    let std_dev_population = variance_population.sqrt();
    let std_dev_sample = variance_sample.map(f64::sqrt);
    let coefficient_of_variation = (mean != 0.0).then(|| std_dev_population / mean * 100.0);
    let standard_error = std_dev_sample.map(|s| s / n.sqrt());

    let at = |fraction: f64| quantile_sorted(&sorted, fraction).unwrap_or(median);
    let quartiles = [at(0.25), at(0.5), at(0.75)];
    let deciles = (1..10).map(|d| at(f64::from(d) / 10.0)).collect();

    NumericSummary {
        mean,
        median,
        min,
        max,
        range: max - min,
        variance_population,
        variance_sample,
        std_dev_population,
        std_dev_sample,
        coefficient_of_variation,
        standard_error,
        quartiles,
        deciles,
        sorted,
    }
}

/// Keys sharing the maximum frequency, ordered like a simple frequency table.
fn modal_keys(values: &[Value]) -> Vec<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for v in values {
        *counts.entry(v.key()).or_insert(0) += 1;
    }
    let max = counts.values().copied().max().unwrap_or(0);
    let mut modal: Vec<(String, usize)> = counts.into_iter().filter(|(_, c)| *c == max).collect();
    sort_keys(&mut modal);
    modal.into_iter().map(|(k, _)| k).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbers(items: &[f64]) -> Vec<Value> {
        items.iter().map(|&x| Value::Number(x)).collect()
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_empty_is_no_data() {
        let stats = compute(&[]);
        assert!(stats.is_empty());
        assert_eq!(stats.mode, Mode::NoData);
        assert!(stats.numeric.is_none());
        assert_eq!(stats.percentile(50.0), None);
    }

    #[test]
    fn test_median_even_and_odd() {
        assert_eq!(compute(&numbers(&[4.0, 1.0, 3.0, 2.0])).median(), Some(2.5));
        assert_eq!(compute(&numbers(&[3.0, 1.0, 2.0])).median(), Some(2.0));
    }

    #[test]
    fn test_variance_population_and_sample() {
        let stats = compute(&numbers(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]));
        let s = stats.numeric.unwrap();
        assert_eq!(s.mean, 5.0);
        assert_eq!(s.variance_population, 4.0);
        assert_eq!(s.std_dev_population, 2.0);
        assert!(approx(s.variance_sample.unwrap(), 32.0 / 7.0));
        assert!(approx(s.coefficient_of_variation.unwrap(), 40.0));
        assert_eq!(s.range, 7.0);
        assert_eq!(s.min, 2.0);
        assert_eq!(s.max, 9.0);
    }

    #[test]
    fn test_mode_numeric() {
        let stats = compute(&numbers(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]));
        assert_eq!(stats.mode, Mode::Values(vec!["4".into()]));

        let stats = compute(&numbers(&[1.0, 1.0, 3.0, 3.0, 2.0]));
        assert_eq!(stats.mode, Mode::Values(vec!["1".into(), "3".into()]));
    }

    #[test]
    fn test_all_distinct_numeric_has_no_mode() {
        let stats = compute(&numbers(&[1.0, 2.0, 3.0]));
        assert_eq!(stats.mode, Mode::NoMode);
        assert_eq!(stats.mode.to_string(), "sin moda");
    }

    #[test]
    fn test_single_value_is_its_own_mode() {
        let stats = compute(&numbers(&[7.0]));
        assert_eq!(stats.mode, Mode::Values(vec!["7".into()]));
        let s = stats.numeric.unwrap();
        assert_eq!(s.variance_sample, None);
        assert_eq!(s.standard_error, None);
        assert_eq!(s.variance_population, 0.0);
    }

    #[test]
    fn test_categorical_only_mode() {
        let values: Vec<Value> = ["Perro", "Gato", "Perro", "Conejo", "Perro"]
            .into_iter()
            .map(Value::from)
            .collect();
        let stats = compute(&values);
        assert_eq!(stats.n, 5);
        assert_eq!(stats.mode, Mode::Values(vec!["Perro".into()]));
        assert!(stats.numeric.is_none());
        assert_eq!(stats.mean(), None);
        assert_eq!(stats.percentile(50.0), None);
    }

    #[test]
    fn test_categorical_all_distinct_keeps_modes() {
        let values: Vec<Value> = ["b", "a"].into_iter().map(Value::from).collect();
        assert_eq!(
            compute(&values).mode,
            Mode::Values(vec!["a".into(), "b".into()])
        );
    }

    #[test]
    fn test_coefficient_of_variation_zero_mean() {
        let stats = compute(&numbers(&[-1.0, 1.0]));
        let s = stats.numeric.unwrap();
        assert_eq!(s.mean, 0.0);
        assert_eq!(s.coefficient_of_variation, None);
    }

    #[test]
    fn test_percentiles_interpolate() {
        let stats = compute(&numbers(&[10.0, 20.0, 30.0, 40.0, 50.0]));
        assert_eq!(stats.percentile(25.0), Some(20.0));
        assert_eq!(stats.percentile(90.0), Some(46.0));
        assert_eq!(stats.decile(5.0), Some(30.0));
        assert_eq!(stats.quartile(3.0), Some(40.0));
        assert_eq!(stats.percentile(0.0), Some(10.0));
        assert_eq!(stats.percentile(100.0), Some(50.0));
    }

    #[test]
    fn test_percentile_index_is_clamped() {
        let stats = compute(&numbers(&[1.0, 2.0, 3.0]));
        assert_eq!(stats.percentile(150.0), Some(3.0));
        assert_eq!(stats.percentile(-10.0), Some(1.0));
    }

    #[test]
    fn test_quartiles_and_deciles_precomputed() {
        let values = numbers(&(1..=11).map(f64::from).collect::<Vec<_>>());
        let s = compute(&values).numeric.unwrap();
        assert_eq!(s.quartiles, [3.5, 6.0, 8.5]);
        assert_eq!(s.interquartile_range(), 5.0);
        assert_eq!(s.deciles.len(), 9);
        assert_eq!(s.deciles[0], 2.0);
        assert_eq!(s.deciles[8], 10.0);
    }

    #[test]
    fn test_numeric_text_counts_as_numeric() {
        let stats = compute(&[Value::from("1"), Value::from(3)]);
        assert_eq!(stats.mean(), Some(2.0));
    }

    #[test]
    fn test_stats_roundtrip_json_keeps_summary() {
        let stats = compute(&numbers(&[1.0, 2.0, 2.0, 5.0]));
        let json = serde_json::to_string(&stats).unwrap();
        let back: DescriptiveStats = serde_json::from_str(&json).unwrap();
        assert_eq!(back.mean(), stats.mean());
        assert_eq!(back.mode, stats.mode);
        assert_eq!(back.numeric.unwrap().quartiles, stats.numeric.unwrap().quartiles);
    }

    #[test]
    fn test_huge_equal_values_stay_finite() {
        let s = compute(&numbers(&[1e308, 1e308])).numeric.unwrap();
        assert_eq!(s.mean, 1e308);
        assert_eq!(s.median, 1e308);
        assert_eq!(s.variance_population, 0.0);
        assert_eq!(s.coefficient_of_variation, Some(0.0));
        assert_eq!(s.quartiles, [1e308, 1e308, 1e308]);
        assert!(s.is_finite());
    }

    #[test]
    fn test_overflowing_spread_is_not_finite() {
        let s = compute(&numbers(&[-1e308, 1e308])).numeric.unwrap();
        assert_eq!(s.mean, 0.0);
        assert_eq!(s.median, 0.0);
        assert!(s.range.is_infinite());
        assert!(!s.is_finite());
    }

    #[test]
    fn test_midpoint_large_magnitudes() {
        assert_eq!(midpoint(1.0, 2.0), 1.5);
        assert_eq!(midpoint(f64::MAX, f64::MAX), f64::MAX);
        assert_eq!(midpoint(-f64::MAX, f64::MAX), 0.0);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn percentile_50_equals_median(data in proptest::collection::vec(-1.0e6f64..1.0e6, 1..150)) {
                let stats = compute(&numbers(&data));
                let median = stats.median().unwrap();
                let p50 = stats.percentile(50.0).unwrap();
                prop_assert!((median - p50).abs() <= 1e-9 * median.abs().max(1.0));
            }

            #[test]
            fn population_variance_not_above_sample(data in proptest::collection::vec(-1.0e3f64..1.0e3, 2..100)) {
                let s = compute(&numbers(&data)).numeric.unwrap();
                prop_assert!(s.variance_population >= 0.0);
                prop_assert!(s.variance_population <= s.variance_sample.unwrap() + 1e-9);
            }
        }
    }
}
