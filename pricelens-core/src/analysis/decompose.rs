//! Classical seasonal decomposition.
//!
//! The trend is a centred moving average over one season, with half
//! weights on the two end points when the period is even. Detrended values are averaged per
//! position in the season and normalised so a full season sums to zero
//! (additive) or averages to one (multiplicative). Trend values the moving
//! average cannot reach are NaN, and so are the residuals beside them.
//! `with_trend_extrapolation(true)` fills them instead with a line fitted to
//! the nearest season of defined trend points.

use crate::render::{Canvas, RenderError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Trading days in a year.
pub const DEFAULT_SEASONAL_PERIOD: usize = 252;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecompositionModel {
    /// observed = trend + seasonal + residual
    Additive,
    /// observed = trend × seasonal × residual
    #[default]
    Multiplicative,
}

impl fmt::Display for DecompositionModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Additive => write!(f, "additive"),
            Self::Multiplicative => write!(f, "multiplicative"),
        }
    }
}

impl FromStr for DecompositionModel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "additive" | "add" => Ok(Self::Additive),
            "multiplicative" | "mul" => Ok(Self::Multiplicative),
            other => Err(format!("unknown decomposition model '{other}'")),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum DecompositionError {
    #[error("seasonal period must be at least 2, got {0}")]
    InvalidPeriod(usize),

    #[error("need at least {required} observations for period {period}, got {actual}")]
    InsufficientData {
        required: usize,
        actual: usize,
        period: usize,
    },

    #[error("multiplicative model needs positive values; found {value} at position {position}")]
    NonPositive { position: usize, value: f64 },

    #[error("multiplicative model produced a non-positive trend at position {position}")]
    NonPositiveTrend { position: usize },

    #[error("non-finite value at position {position}")]
    NonFinite { position: usize },

    #[error("{dates} dates for {values} values")]
    LengthMismatch { dates: usize, values: usize },
}

#[derive(Debug, Clone)]
pub struct SeasonalDecomposer {
    model: DecompositionModel,
    period: usize,
    extrapolate_trend: bool,
}

impl Default for SeasonalDecomposer {
    fn default() -> Self {
        Self::new(DecompositionModel::Multiplicative, DEFAULT_SEASONAL_PERIOD)
    }
}

impl SeasonalDecomposer {
    pub fn new(model: DecompositionModel, period: usize) -> Self {
        Self {
            model,
            period,
            extrapolate_trend: false,
        }
    }

    pub fn with_trend_extrapolation(mut self, enabled: bool) -> Self {
        self.extrapolate_trend = enabled;
        self
    }

    pub fn model(&self) -> DecompositionModel {
        self.model
    }

    pub fn period(&self) -> usize {
        self.period
    }

    /// Width of the centred moving average.
    fn filter_width(&self) -> usize {
        if self.period % 2 == 0 {
            self.period + 1
        } else {
            self.period
        }
    }

    /// Fewest observations that leave two defined trend points.
    pub fn min_observations(&self) -> usize {
        self.filter_width() + 1
    }

    pub fn decompose(&self, dates: &[NaiveDate], values: &[f64]) -> Result<Decomposition, DecompositionError> {
        let period = self.period;
        if period < 2 {
            return Err(DecompositionError::InvalidPeriod(period));
        }
        if dates.len() != values.len() {
            return Err(DecompositionError::LengthMismatch {
                dates: dates.len(),
                values: values.len(),
            });
        }
        if let Some(position) = values.iter().position(|v| !v.is_finite()) {
            return Err(DecompositionError::NonFinite { position });
        }
        if self.model == DecompositionModel::Multiplicative {
            if let Some(position) = values.iter().position(|v| *v <= 0.0) {
                return Err(DecompositionError::NonPositive {
                    position,
                    value: values[position],
                });
            }
        }
        let required = self.min_observations();
        if values.len() < required {
            return Err(DecompositionError::InsufficientData {
                required,
                actual: values.len(),
                period,
            });
        }

        let mut trend = centred_moving_average(values, period);
        if self.extrapolate_trend {
            extrapolate(&mut trend, period - 1);
        }
        if self.model == DecompositionModel::Multiplicative {
            if let Some(position) = trend.iter().position(|t| t.is_finite() && *t <= 0.0) {
                return Err(DecompositionError::NonPositiveTrend { position });
            }
        }

        let detrended: Vec<f64> = values
            .iter()
            .zip(&trend)
            .map(|(x, t)| match self.model {
                DecompositionModel::Additive => x - t,
                DecompositionModel::Multiplicative => x / t,
            })
            .collect();

        let profile = self.seasonal_profile(&detrended);
        let seasonal: Vec<f64> = (0..values.len()).map(|i| profile[i % period]).collect();

        let residual: Vec<f64> = values
            .iter()
            .zip(&trend)
            .zip(&seasonal)
            .map(|((x, t), s)| match self.model {
                DecompositionModel::Additive => x - t - s,
                DecompositionModel::Multiplicative => x / (t * s),
            })
            .collect();

        Ok(Decomposition {
            dates: dates.to_vec(),
            observed: values.to_vec(),
            trend,
            seasonal,
            residual,
            model: self.model,
            period,
        })
    }

    /// Mean detrended value per season position, normalised.
    fn seasonal_profile(&self, detrended: &[f64]) -> Vec<f64> {
        let mut profile: Vec<f64> = (0..self.period)
            .map(|pos| {
                let finite: Vec<f64> = detrended
                    .iter()
                    .skip(pos)
                    .step_by(self.period)
                    .copied()
                    .filter(|v| v.is_finite())
                    .collect();
                if finite.is_empty() {
                    f64::NAN
                } else {
                    finite.iter().sum::<f64>() / finite.len() as f64
                }
            })
            .collect();

        let defined: Vec<f64> = profile.iter().copied().filter(|v| v.is_finite()).collect();
        if defined.is_empty() {
            return profile;
        }
        let centre = defined.iter().sum::<f64>() / defined.len() as f64;
        for p in &mut profile {
            match self.model {
                DecompositionModel::Additive => *p -= centre,
                DecompositionModel::Multiplicative => *p /= centre,
            }
        }
        profile
    }
}

/// Centred moving average over one season; NaN where the window does not fit.
fn centred_moving_average(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let half = period / 2;
    let mut trend = vec![f64::NAN; n];
    if n <= 2 * half {
        return trend;
    }

    for (i, slot) in trend.iter_mut().enumerate().take(n - half).skip(half) {
        let window = &values[i - half..=i + half];
        *slot = if period % 2 == 0 {
            let inner: f64 = window[1..window.len() - 1].iter().sum();
            (inner + 0.5 * (window[0] + window[window.len() - 1])) / period as f64
        } else {
            window.iter().sum::<f64>() / period as f64
        };
    }
    trend
}

/// Fill NaN ends of `trend` with a least-squares line through the nearest
/// `points` defined values on each side.
fn extrapolate(trend: &mut [f64], points: usize) {
    let Some(first) = trend.iter().position(|t| t.is_finite()) else {
        return;
    };
    let Some(last) = trend.iter().rposition(|t| t.is_finite()) else {
        return;
    };
    let points = points.max(1);

    let head_end = (first + points).min(last + 1);
    let (slope, intercept) = fit_line(trend, first, head_end);
    for (i, t) in trend.iter_mut().enumerate().take(first) {
        *t = intercept + slope * i as f64;
    }

    let tail_start = (last + 1).saturating_sub(points).max(first);
    let (slope, intercept) = fit_line(trend, tail_start, last + 1);
    for (i, t) in trend.iter_mut().enumerate().skip(last + 1) {
        *t = intercept + slope * i as f64;
    }
}

/// Ordinary least squares of `trend[start..end]` against position.
fn fit_line(trend: &[f64], start: usize, end: usize) -> (f64, f64) {
    let n = (end - start) as f64;
    let xs = (start..end).map(|i| i as f64);
    let mean_x = xs.clone().sum::<f64>() / n;
    let mean_y = trend[start..end].iter().sum::<f64>() / n;

    let (mut sxy, mut sxx) = (0.0, 0.0);
    for (x, y) in xs.zip(&trend[start..end]) {
        sxy += (x - mean_x) * (y - mean_y);
        sxx += (x - mean_x).powi(2);
    }
    let slope = if sxx > 0.0 { sxy / sxx } else { 0.0 };
    (slope, mean_y - slope * mean_x)
}

/// Components of a decomposed series, aligned with `dates`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Decomposition {
    pub dates: Vec<NaiveDate>,
    pub observed: Vec<f64>,
    pub trend: Vec<f64>,
    pub seasonal: Vec<f64>,
    pub residual: Vec<f64>,
    pub model: DecompositionModel,
    pub period: usize,
}

impl Decomposition {
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Draw one panel per component into a new figure. Does not show it.
    pub fn plot(&self, canvas: &mut dyn Canvas) -> Result<(), RenderError> {
        let components = [
            ("Observed", &self.observed),
            ("Trend", &self.trend),
            ("Seasonal", &self.seasonal),
            ("Resid", &self.residual),
        ];
        canvas.figure(components.len());
        for (i, (label, values)) in components.into_iter().enumerate() {
            canvas.panel(i);
            canvas.line(&self.dates, values, None)?;
            canvas.y_label(label);
        }
        canvas.x_label("Date");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::RecordingCanvas;

    fn dates(n: usize) -> Vec<NaiveDate> {
        let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        (0..n).map(|i| start + chrono::Duration::days(i as i64)).collect()
    }

    fn seasonal_series(n: usize, period: usize) -> Vec<f64> {
        (0..n)
            .map(|i| {
                let level = 100.0 + i as f64;
                let season = 1.0 + 0.1 * ((i % period) as f64 - (period as f64 - 1.0) / 2.0);
                level * season
            })
            .collect()
    }

    #[test]
    fn odd_period_moving_average() {
        let trend = centred_moving_average(&[1.0, 2.0, 3.0, 4.0, 5.0], 3);
        assert!(trend[0].is_nan());
        assert_eq!(&trend[1..4], &[2.0, 3.0, 4.0]);
        assert!(trend[4].is_nan());
    }

    #[test]
    fn even_period_uses_half_weights_at_ends() {
        let trend = centred_moving_average(&[4.0, 0.0, 0.0, 8.0, 0.0], 4);
        // (0.5 * 4 + 0 + 0 + 8 + 0.5 * 0) / 4
        assert_eq!(trend[2], 2.5);
        assert!(trend[1].is_nan() && trend[3].is_nan());
    }

    #[test]
    fn linear_series_has_flat_multiplicative_season() {
        let n = 300;
        let values: Vec<f64> = (0..n).map(|i| 100.0 + 300.0 * i as f64 / (n - 1) as f64).collect();
        let result = SeasonalDecomposer::default()
            .with_trend_extrapolation(true)
            .decompose(&dates(n), &values)
            .unwrap();

        assert_eq!(result.len(), n);
        assert!(result.trend.windows(2).all(|w| w[1] > w[0]));
        assert!(result.seasonal.iter().all(|s| (s - 1.0).abs() < 1e-9));
        assert!(result.residual.iter().all(|r| (r - 1.0).abs() < 1e-9));
    }

    #[test]
    fn recovers_repeating_additive_pattern() {
        let period = 4;
        let pattern = [2.0, -1.0, 0.5, -1.5];
        let n = 40;
        let values: Vec<f64> = (0..n).map(|i| 10.0 + 0.5 * i as f64 + pattern[i % period]).collect();
        let result = SeasonalDecomposer::new(DecompositionModel::Additive, period)
            .with_trend_extrapolation(true)
            .decompose(&dates(n), &values)
            .unwrap();

        for (i, s) in result.seasonal.iter().enumerate() {
            assert!((s - pattern[i % period]).abs() < 1e-9, "position {i}: {s}");
        }
        for i in 0..n {
            let rebuilt = result.trend[i] + result.seasonal[i] + result.residual[i];
            assert!((rebuilt - values[i]).abs() < 1e-9);
        }
    }

    #[test]
    fn multiplicative_components_multiply_back() {
        let period = 5;
        let n = 60;
        let values = seasonal_series(n, period);
        let result = SeasonalDecomposer::new(DecompositionModel::Multiplicative, period)
            .with_trend_extrapolation(true)
            .decompose(&dates(n), &values)
            .unwrap();

        let mean_season: f64 = result.seasonal[..period].iter().sum::<f64>() / period as f64;
        assert!((mean_season - 1.0).abs() < 1e-9);
        for i in 0..n {
            let rebuilt = result.trend[i] * result.seasonal[i] * result.residual[i];
            assert!((rebuilt - values[i]).abs() < 1e-6);
        }
    }

    #[test]
    fn trend_edges_are_nan_by_default() {
        let n = 30;
        let values = seasonal_series(n, 4);
        let result = SeasonalDecomposer::new(DecompositionModel::Multiplicative, 4)
            .decompose(&dates(n), &values)
            .unwrap();

        assert!(result.trend[0].is_nan() && result.trend[1].is_nan());
        assert!(result.trend[2].is_finite());
        assert!(result.trend[n - 1].is_nan());
        assert!(result.residual[0].is_nan());
        assert!(result.seasonal.iter().all(|s| s.is_finite()));
    }

    #[test]
    fn short_series_is_insufficient() {
        let err = SeasonalDecomposer::default()
            .decompose(&dates(10), &[100.0; 10])
            .unwrap_err();
        assert_eq!(
            err,
            DecompositionError::InsufficientData {
                required: 254,
                actual: 10,
                period: 252
            }
        );
    }

    #[test]
    fn rejects_bad_input() {
        let d = dates(20);
        let mul = SeasonalDecomposer::new(DecompositionModel::Multiplicative, 4);

        let mut zero = vec![1.0; 20];
        zero[3] = 0.0;
        assert!(matches!(
            mul.decompose(&d, &zero),
            Err(DecompositionError::NonPositive { position: 3, .. })
        ));

        let mut nan = vec![1.0; 20];
        nan[7] = f64::NAN;
        assert_eq!(mul.decompose(&d, &nan), Err(DecompositionError::NonFinite { position: 7 }));

        assert_eq!(
            mul.decompose(&d[..5], &[1.0; 6]),
            Err(DecompositionError::LengthMismatch { dates: 5, values: 6 })
        );

        let one = SeasonalDecomposer::new(DecompositionModel::Additive, 1);
        assert_eq!(one.decompose(&d, &[1.0; 20]), Err(DecompositionError::InvalidPeriod(1)));
    }

    #[test]
    fn steep_decline_gives_non_positive_trend() {
        let n = 12;
        // falls fast enough that the extrapolated tail crosses zero
        let values: Vec<f64> = (0..n).map(|i| if i < 10 { 100.0 - 10.0 * i as f64 } else { 0.5 }).collect();
        let err = SeasonalDecomposer::new(DecompositionModel::Multiplicative, 4)
            .with_trend_extrapolation(true)
            .decompose(&dates(n), &values)
            .unwrap_err();
        assert!(matches!(err, DecompositionError::NonPositiveTrend { .. }));
    }

    #[test]
    fn decaying_series_decomposes_with_default_settings() {
        let n = 600;
        let values: Vec<f64> = (0..n).map(|i| 400.0 * 0.993_f64.powi(i as i32)).collect();
        let result = SeasonalDecomposer::default().decompose(&dates(n), &values).unwrap();

        let finite: Vec<f64> = result.trend.iter().copied().filter(|t| t.is_finite()).collect();
        assert_eq!(finite.len(), n - 252);
        assert!(finite.iter().all(|t| *t > 0.0));
        assert!(result.trend[125].is_nan() && result.trend[126].is_finite());
        assert!(result.trend[n - 127].is_finite() && result.trend[n - 126].is_nan());
        assert!(result.residual[0].is_nan());

        // the same series with the edges extrapolated dips below zero
        let extrapolated = SeasonalDecomposer::default()
            .with_trend_extrapolation(true)
            .decompose(&dates(n), &values);
        assert!(matches!(extrapolated, Err(DecompositionError::NonPositiveTrend { .. })));
    }

    #[test]
    fn model_parses_from_text() {
        assert_eq!("mul".parse::<DecompositionModel>(), Ok(DecompositionModel::Multiplicative));
        assert_eq!("Additive".parse::<DecompositionModel>(), Ok(DecompositionModel::Additive));
        assert!("log".parse::<DecompositionModel>().is_err());
        assert_eq!(DecompositionModel::Additive.to_string(), "additive");
    }

    #[test]
    fn plot_draws_four_labelled_panels() {
        let n = 30;
        let result = SeasonalDecomposer::new(DecompositionModel::Additive, 4)
            .decompose(&dates(n), &seasonal_series(n, 4))
            .unwrap();
        let mut canvas = RecordingCanvas::new();
        result.plot(&mut canvas).unwrap();
        canvas.show().unwrap();

        let figure = &canvas.shown()[0];
        let labels: Vec<_> = figure.panels.iter().map(|p| p.y_label.as_deref()).collect();
        assert_eq!(labels, vec![Some("Observed"), Some("Trend"), Some("Seasonal"), Some("Resid")]);
        assert!(figure.panels.iter().all(|p| p.lines[0].y.len() == n));
    }
}
