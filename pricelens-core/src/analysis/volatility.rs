//! Daily returns and trailing volatility.
//!
//! Lookback: the first return is undefined, so the first window may hold
//! `window - 1` returns. Every later window needs all `window` returns, which
//! makes rows `0..window - 1` undefined and row `window - 1` the first value
//! of a gap-free series. A window holding any other undefined return is
//! undefined.

/// Trading rows in the rolling volatility window.
pub const DEFAULT_VOLATILITY_WINDOW: usize = 20;

/// Fractional change from the previous row.
///
/// Undefined at row 0, where either close is missing, or where the previous
/// close is zero.
pub fn pct_change(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(values.len());
    out.extend(values.first().map(|_| None));
    for pair in values.windows(2) {
        out.push(match (pair[0], pair[1]) {
            (Some(prev), Some(cur)) if prev != 0.0 => Some(cur / prev - 1.0),
            _ => None,
        });
    }
    out
}

/// Sample standard deviation (ddof = 1) over a trailing window.
///
/// Every value in the window must be defined, except row 0 of the series,
/// which is allowed to be the undefined first return.
pub fn rolling_std(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if window == 0 {
        return out;
    }

    for i in (window - 1)..values.len() {
        let start = i + 1 - window;
        let required = if start == 0 && values[0].is_none() {
            window - 1
        } else {
            window
        };
        let defined: Vec<f64> = values[start..=i].iter().flatten().copied().collect();
        if defined.len() < required.max(2) {
            continue;
        }
        let n = defined.len() as f64;
        let mean = defined.iter().sum::<f64>() / n;
        let variance = defined.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
        out[i] = Some(variance.sqrt());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn pct_change_first_row_undefined() {
        let r = pct_change(&[Some(100.0), Some(110.0), Some(99.0)]);
        assert_eq!(r[0], None);
        assert!(approx(r[1].unwrap(), 0.1));
        assert!(approx(r[2].unwrap(), -0.1));
    }

    #[test]
    fn pct_change_gaps_and_zero() {
        let r = pct_change(&[Some(0.0), Some(1.0), None, Some(2.0)]);
        assert_eq!(r, vec![None, None, None, None]);
        assert!(pct_change(&[]).is_empty());
    }

    #[test]
    fn rolling_std_lookback() {
        let closes: Vec<Option<f64>> = (0..30).map(|i| Some(100.0 + (i % 3) as f64)).collect();
        let returns = pct_change(&closes);
        let vol = rolling_std(&returns, 20);

        assert!(vol[..19].iter().all(Option::is_none));
        assert!(vol[19..].iter().all(Option::is_some));
    }

    #[test]
    fn rolling_std_matches_sample_formula() {
        let values = vec![Some(1.0), Some(2.0), Some(3.0), Some(4.0)];
        let vol = rolling_std(&values, 4);
        // sample variance of 1..4 is 5/3
        assert!(approx(vol[3].unwrap(), (5.0_f64 / 3.0).sqrt()));
        assert_eq!(vol[2], None);
    }

    #[test]
    fn constant_returns_have_zero_volatility() {
        let values = vec![Some(0.01); 25];
        let vol = rolling_std(&values, 20);
        assert!(approx(vol[24].unwrap(), 0.0));
    }

    #[test]
    fn interior_gap_blanks_every_window_holding_it() {
        let mut values = vec![Some(0.01); 35];
        values[0] = None;
        values[10] = None;
        let vol = rolling_std(&values, 20);
        // windows ending at rows 19..=29 hold row 10
        assert!(vol[19..=29].iter().all(Option::is_none));
        assert!(vol[30..].iter().all(Option::is_some));
    }

    #[test]
    fn zero_close_blanks_the_following_windows() {
        let mut closes: Vec<Option<f64>> = (0..50).map(|i| Some(100.0 + (i % 3) as f64)).collect();
        closes[25] = Some(0.0);
        let returns = pct_change(&closes);
        assert!(returns[25].is_some());
        assert_eq!(returns[26], None);

        let vol = rolling_std(&returns, 20);
        assert!(vol[19].is_some());
        assert!(vol[25].is_some());
        assert!(vol[26..=45].iter().all(Option::is_none));
        assert!(vol[46..].iter().all(Option::is_some));
    }

    #[test]
    fn missing_row_zero_is_only_forgiven_in_the_first_window() {
        let mut values = vec![Some(0.01); 25];
        values[0] = None;
        values[1] = None;
        let vol = rolling_std(&values, 20);
        assert_eq!(vol[19], None);
        assert_eq!(vol[20], None);
        assert!(vol[21].is_some());
    }
}
