//! Bivariate and inferential measures offered at the tertiary level.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{EstadError, EstadResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Correlation {
    pub n: usize,
    pub r: f64,
    pub r2: f64,
    /// Significance statistic `r * sqrt((n - 2) / (1 - r^2))`.
    pub t: f64,
    pub strength: CorrelationStrength,
}

impl Correlation {
    pub fn describe(&self) -> String {
        let sign = if self.r > 0.0 { "positiva" } else { "negativa" };
        format!("{} {sign}", self.strength)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorrelationStrength {
    Weak,
    Moderate,
    Strong,
}

impl CorrelationStrength {
    fn classify(r: f64) -> Self {
        let abs = r.abs();
        if abs < 0.3 {
            Self::Weak
        } else if abs < 0.7 {
            Self::Moderate
        } else {
            Self::Strong
        }
    }
}

impl std::fmt::Display for CorrelationStrength {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Weak => write!(f, "Correlación débil"),
            Self::Moderate => write!(f, "Correlación moderada"),
            Self::Strong => write!(f, "Correlación fuerte"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Regression {
    pub n: usize,
    pub intercept: f64,
    pub slope: f64,
    pub r2: f64,
    pub r: f64,
    /// Standard error of the estimate; needs at least three pairs.
    pub standard_error: Option<f64>,
}

impl Regression {
    pub fn predict(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }

    pub fn equation(&self) -> String {
        format!("ŷ = {:.4} + {:.4}x", self.intercept, self.slope)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfidenceInterval {
    pub mean: f64,
    pub standard_error: f64,
    pub level: u8,
    pub margin: f64,
    pub lower: f64,
    pub upper: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HypothesisTest {
    pub observed_mean: f64,
    pub hypothesized_mean: f64,
    pub t: f64,
    pub degrees_of_freedom: usize,
    /// Coarse step approximation, not an exact Student-t tail.
    pub p_value: f64,
    pub alpha: f64,
    pub reject_null: bool,
}

impl HypothesisTest {
    pub fn conclusion(&self) -> String {
        if self.reject_null {
            format!(
                "Se rechaza H₀: la media es significativamente diferente de {}",
                self.hypothesized_mean
            )
        } else {
            format!(
                "No se rechaza H₀: no hay evidencia suficiente para afirmar que la media difiere de {}",
                self.hypothesized_mean
            )
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributionShape {
    pub mean: f64,
    pub std_dev: f64,
    pub skewness: f64,
    /// Excess kurtosis (0 for a normal distribution).
    pub kurtosis: f64,
    pub jarque_bera: f64,
    pub approximately_normal: bool,
}

/// Chi-square critical value with 2 degrees of freedom at alpha = 0.05.
const JARQUE_BERA_CRITICAL: f64 = 5.99;

/// Two-sided z critical value for a confidence level in percent.
pub fn z_critical(level: u8) -> EstadResult<f64> {
    match level {
        90 => Ok(1.645),
        95 => Ok(1.96),
        99 => Ok(2.576),
        other => Err(EstadError::InvalidInput(format!(
            "unsupported confidence level {other}% (use 90, 95 or 99)"
        ))),
    }
}

/// Pearson correlation over paired observations. Unequal lengths are
/// truncated to the shorter series.
pub fn pearson_correlation(xs: &[f64], ys: &[f64]) -> EstadResult<Correlation> {
    let (xs, ys) = paired(xs, ys)?;
    let n = xs.len();
    let nf = n as f64;
    let mean_x = xs.iter().sum::<f64>() / nf;
    let mean_y = ys.iter().sum::<f64>() / nf;

    let (mut num, mut den_x, mut den_y) = (0.0, 0.0, 0.0);
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        num += dx * dy;
        den_x += dx * dx;
        den_y += dy * dy;
    }
    if den_x == 0.0 || den_y == 0.0 {
        return Err(EstadError::InvalidInput(
            "correlation is undefined when a series is constant".into(),
        ));
    }

    let r = num / (den_x * den_y).sqrt();
    let r2 = r * r;
    let t = if r2 < 1.0 {
        r * ((nf - 2.0) / (1.0 - r2)).sqrt()
    } else {
        f64::INFINITY.copysign(r)
    };
    debug!(n, r, "pearson correlation");

    Ok(Correlation {
        n,
        r,
        r2,
        t,
        strength: CorrelationStrength::classify(r),
    })
}

/// Least-squares line `y = b0 + b1 x`.
pub fn linear_regression(xs: &[f64], ys: &[f64]) -> EstadResult<Regression> {
    let (xs, ys) = paired(xs, ys)?;
    let n = xs.len();
    let nf = n as f64;

    let sum_x: f64 = xs.iter().sum();
    let sum_y: f64 = ys.iter().sum();
    let sum_xy: f64 = xs.iter().zip(ys).map(|(x, y)| x * y).sum();
    let sum_x2: f64 = xs.iter().map(|x| x * x).sum();

    let denominator = nf * sum_x2 - sum_x * sum_x;
    if denominator == 0.0 {
        return Err(EstadError::InvalidInput(
            "regression is undefined when x is constant".into(),
        ));
    }

    let slope = (nf * sum_xy - sum_x * sum_y) / denominator;
    let mean_x = sum_x / nf;
    let mean_y = sum_y / nf;
    let intercept = mean_y - slope * mean_x;

    let ss_total: f64 = ys.iter().map(|y| (y - mean_y).powi(2)).sum();
    let ss_residual: f64 = xs
        .iter()
        .zip(ys)
        .map(|(x, y)| (y - (intercept + slope * x)).powi(2))
        .sum();
    let r2 = if ss_total == 0.0 {
        1.0
    } else {
        1.0 - ss_residual / ss_total
    };
    let r = r2.max(0.0).sqrt().copysign(if slope >= 0.0 { 1.0 } else { -1.0 });
    let standard_error = (n > 2).then(|| (ss_residual / (nf - 2.0)).sqrt());
    debug!(n, slope, intercept, "linear regression");

    Ok(Regression {
        n,
        intercept,
        slope,
        r2,
        r,
        standard_error,
    })
}

/// Normal-approximation interval for the mean at 90, 95 or 99 percent.
pub fn confidence_interval(values: &[f64], level: u8) -> EstadResult<ConfidenceInterval> {
    let z = z_critical(level)?;
    let (mean, s) = mean_and_sample_sd(values)?;
    let standard_error = s / (values.len() as f64).sqrt();
    let margin = z * standard_error;
    Ok(ConfidenceInterval {
        mean,
        standard_error,
        level,
        margin,
        lower: mean - margin,
        upper: mean + margin,
    })
}

/// One-sample t test of `H0: mean = hypothesized`.
pub fn mean_hypothesis_test(
    values: &[f64],
    hypothesized: f64,
    level: u8,
) -> EstadResult<HypothesisTest> {
    z_critical(level)?;
    let (mean, s) = mean_and_sample_sd(values)?;
    let standard_error = s / (values.len() as f64).sqrt();
    if standard_error == 0.0 {
        return Err(EstadError::InvalidInput(
            "t statistic is undefined for constant data".into(),
        ));
    }
    let t = (mean - hypothesized) / standard_error;
    let p_value = approximate_p_value(t);
    let alpha = f64::from(100 - level) / 100.0;

    Ok(HypothesisTest {
        observed_mean: mean,
        hypothesized_mean: hypothesized,
        t,
        degrees_of_freedom: values.len() - 1,
        p_value,
        alpha,
        reject_null: p_value < alpha,
    })
}

/// Skewness, excess kurtosis and the Jarque-Bera normality statistic.
pub fn distribution_shape(values: &[f64]) -> EstadResult<DistributionShape> {
    if values.len() < 3 {
        return Err(EstadError::InsufficientData {
            required: 3,
            found: values.len(),
        });
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
    let std_dev = variance.sqrt();
    if std_dev == 0.0 {
        return Err(EstadError::InvalidInput(
            "shape is undefined for constant data".into(),
        ));
    }

    let skewness = values
        .iter()
        .map(|x| ((x - mean) / std_dev).powi(3))
        .sum::<f64>()
        / n;
    let kurtosis = values
        .iter()
        .map(|x| ((x - mean) / std_dev).powi(4))
        .sum::<f64>()
        / n
        - 3.0;
    let jarque_bera = n / 6.0 * (skewness.powi(2) + kurtosis.powi(2) / 4.0);

    Ok(DistributionShape {
        mean,
        std_dev,
        skewness,
        kurtosis,
        jarque_bera,
        approximately_normal: jarque_bera < JARQUE_BERA_CRITICAL,
    })
}

fn approximate_p_value(t: f64) -> f64 {
    let abs = t.abs();
    if abs > 3.5 {
        0.001
    } else if abs > 2.5 {
        0.02
    } else if abs > 2.0 {
        0.05
    } else if abs > 1.5 {
        0.15
    } else {
        0.5
    }
}

fn paired<'a>(xs: &'a [f64], ys: &'a [f64]) -> EstadResult<(&'a [f64], &'a [f64])> {
    let n = xs.len().min(ys.len());
    if n < 2 {
        return Err(EstadError::InsufficientData {
            required: 2,
            found: n,
        });
    }
    Ok((&xs[..n], &ys[..n]))
}

fn mean_and_sample_sd(values: &[f64]) -> EstadResult<(f64, f64)> {
    if values.len() < 2 {
        return Err(EstadError::InsufficientData {
            required: 2,
            found: values.len(),
        });
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0);
    Ok((mean, variance.sqrt()))
}
