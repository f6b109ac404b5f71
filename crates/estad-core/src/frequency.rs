//! Simple and grouped frequency tables.
//!
//! A simple table has one row per distinct observation. A grouped table bins
//! numeric observations into `k` equal-width classes, where `k` is either
//! chosen by the user or derived from the sample size with Sturges' rule.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::descriptive::midpoint;
use crate::error::{EstadError, EstadResult};
use crate::value::{numeric_only, sort_keys, Value};

/// Minimum number of numeric observations a grouped table needs.
pub const MIN_GROUPED_VALUES: usize = 2;

/// Largest class count a grouped table accepts.
pub const MAX_BINS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableKind {
    Simple,
    Grouped,
}

/// How many classes a grouped table should have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinCount {
    Fixed(usize),
    Sturges,
}

impl BinCount {
    pub fn resolve(self, n: usize) -> usize {
        match self {
            Self::Fixed(k) => k,
            Self::Sturges => sturges_bins(n),
        }
    }
}

/// Class bounds of a grouped row. Every class is `[lower, upper)` except the
/// last one, which also contains its upper bound.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassInterval {
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub class_mark: f64,
    pub closed_upper: bool,
}

impl ClassInterval {
    pub fn contains(&self, x: f64) -> bool {
        if self.closed_upper {
            x >= self.lower_bound && x <= self.upper_bound
        } else {
            x >= self.lower_bound && x < self.upper_bound
        }
    }

    pub fn label(&self) -> String {
        let close = if self.closed_upper { ']' } else { ')' };
        format!("[{:.2} - {:.2}{close}", self.lower_bound, self.upper_bound)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrequencyRow {
    pub value: String,
    pub absolute_freq: usize,
    pub relative_freq: f64,
    pub percent: f64,
    pub cumulative_absolute: usize,
    pub cumulative_relative: f64,
    pub cumulative_percent: f64,
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub class: Option<ClassInterval>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrequencyTable {
    pub kind: TableKind,
    pub n: usize,
    pub rows: Vec<FrequencyRow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bin_width: Option<f64>,
}

impl FrequencyTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row(s) with the highest absolute frequency.
    pub fn modal_rows(&self) -> Vec<&FrequencyRow> {
        let max = self.rows.iter().map(|r| r.absolute_freq).max().unwrap_or(0);
        self.rows
            .iter()
            .filter(|r| max > 0 && r.absolute_freq == max)
            .collect()
    }
}

/// `k = ceil(1 + 3.322 * log10(n))`. Zero observations still yield one class.
pub fn sturges_bins(n: usize) -> usize {
    if n <= 1 {
        return 1;
    }
    (1.0 + 3.322 * (n as f64).log10()).ceil() as usize
}

/// One row per distinct value. Rows are ordered numerically when every value
/// is a number, otherwise lexicographically.
pub fn build_simple(values: &[Value]) -> FrequencyTable {
    debug!(n = values.len(), "building simple frequency table");

    let mut counts: HashMap<String, usize> = HashMap::new();
    for v in values {
        *counts.entry(v.key()).or_insert(0) += 1;
    }

    let mut entries: Vec<(String, usize)> = counts.into_iter().collect();
    sort_keys(&mut entries);

    let rows = accumulate(
        entries.into_iter().map(|(value, freq)| (value, freq, None)),
        values.len(),
    );

    FrequencyTable {
        kind: TableKind::Simple,
        n: values.len(),
        rows,
        bin_width: None,
    }
}

/// Bins the numeric observations into equal-width classes. Non-numeric
/// entries are dropped before binning.
pub fn build_grouped(values: &[Value], bins: BinCount) -> EstadResult<FrequencyTable> {
    let numbers = numeric_only(values);
    let n = numbers.len();
    if n < MIN_GROUPED_VALUES {
        return Err(EstadError::InsufficientData {
            required: MIN_GROUPED_VALUES,
            found: n,
        });
    }

    let k = bins.resolve(n);
    if k == 0 || k > MAX_BINS {
        return Err(EstadError::InvalidBinCount(k));
    }
    debug!(n, k, "building grouped frequency table");

    let min = numbers.iter().copied().fold(f64::INFINITY, f64::min);
    let max = numbers.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let span = max - min;
    if !span.is_finite() {
        return Err(EstadError::InvalidInput(format!(
            "range from {min} to {max} is too wide to split into classes"
        )));
    }
    let width = span / k as f64;

    let intervals: Vec<ClassInterval> = (0..k)
        .map(|i| {
            let last = i + 1 == k;
            let lower_bound = min + i as f64 * width;
            // The last class ends exactly at the maximum.
            let upper_bound = if last { max } else { min + (i + 1) as f64 * width };
            ClassInterval {
                lower_bound,
                upper_bound,
                class_mark: midpoint(lower_bound, upper_bound),
                closed_upper: last,
            }
        })
        .collect();

    let mut counts = vec![0usize; k];
    for &x in &numbers {
        if let Some(idx) = intervals.iter().position(|c| c.contains(x)) {
            counts[idx] += 1;
        }
    }

    let rows = accumulate(
        intervals
            .into_iter()
            .zip(counts)
            .map(|(class, freq)| (class.label(), freq, Some(class))),
        n,
    );

    Ok(FrequencyTable {
        kind: TableKind::Grouped,
        n,
        rows,
        bin_width: Some(width),
    })
}

fn accumulate<I>(entries: I, n: usize) -> Vec<FrequencyRow>
where
    I: IntoIterator<Item = (String, usize, Option<ClassInterval>)>,
{
    let total = n as f64;
    let mut cumulative = 0usize;
    entries
        .into_iter()
        .map(|(value, freq, class)| {
            cumulative += freq;
            FrequencyRow {
                value,
                absolute_freq: freq,
                relative_freq: freq as f64 / total,
                percent: freq as f64 * 100.0 / total,
                cumulative_absolute: cumulative,
                cumulative_relative: cumulative as f64 / total,
                cumulative_percent: cumulative as f64 * 100.0 / total,
                class,
            }
        })
        .collect()
}
