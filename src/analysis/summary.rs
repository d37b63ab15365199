//! Fear score summary module
//!
//! Descriptive statistics over the fear scores of an emotion table, laid out
//! like a `describe()` table: count, mean, standard deviation, min, quartiles,
//! max. Also ranks images by descending fear score.
//!
//! # Example
//!
//! ```
//! use visual_fear_index::analysis::summary::FearSummary;
//!
//! let summary = FearSummary::from_scores(&[10.0, 20.0, 30.0, 40.0]).unwrap();
//!
//! assert_eq!(summary.count, 4);
//! assert_eq!(summary.mean, 25.0);
//! assert_eq!(summary.median, 25.0);
//! ```

use std::cmp::Ordering;
use std::fmt;

use serde::Serialize;

/// Descriptive statistics of a set of fear scores
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FearSummary {
    /// Number of scores
    pub count: usize,

    /// Arithmetic mean
    pub mean: f64,

    /// Sample standard deviation (n - 1 denominator)
    ///
    /// `None` when fewer than two scores are available.
    pub std: Option<f64>,

    /// Smallest score
    pub min: f64,

    /// First quartile
    pub p25: f64,

    /// Median
    pub median: f64,

    /// Third quartile
    pub p75: f64,

    /// Largest score
    pub max: f64,
}

impl FearSummary {
    /// Compute the summary of a set of scores
    ///
    /// Quantiles use linear interpolation between the closest ranks.
    ///
    /// # Returns
    ///
    /// `None` when `scores` is empty
    pub fn from_scores(scores: &[f64]) -> Option<Self> {
        if scores.is_empty() {
            return None;
        }

        let mut sorted = scores.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

        let n = sorted.len() as f64;
        let mean = sorted.iter().sum::<f64>() / n;
        let std = if sorted.len() > 1 {
            let var = sorted.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0);
            Some(var.sqrt())
        } else {
            None
        };

        log::debug!("Summarizing {} fear scores (mean={:.2})", sorted.len(), mean);

        Some(Self {
            count: sorted.len(),
            mean,
            std,
            min: sorted[0],
            p25: quantile(&sorted, 0.25),
            median: quantile(&sorted, 0.50),
            p75: quantile(&sorted, 0.75),
            max: sorted[sorted.len() - 1],
        })
    }
}

impl fmt::Display for FearSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "count {:>10}", self.count)?;
        writeln!(f, "mean  {:>10.2}", self.mean)?;
        match self.std {
            Some(std) => writeln!(f, "std   {:>10.2}", std)?,
            None => writeln!(f, "std   {:>10}", "NaN")?,
        }
        writeln!(f, "min   {:>10.2}", self.min)?;
        writeln!(f, "25%   {:>10.2}", self.p25)?;
        writeln!(f, "50%   {:>10.2}", self.median)?;
        writeln!(f, "75%   {:>10.2}", self.p75)?;
        write!(f, "max   {:>10.2}", self.max)
    }
}

/// Linear-interpolated quantile of an ascending, non-empty slice
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = (sorted.len() - 1) as f64 * q.clamp(0.0, 1.0);
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

/// Images ordered by descending fear score
///
/// Equal scores keep their input order.
pub fn ranked_by_fear<'a, I>(rows: I) -> Vec<(&'a str, f64)>
where
    I: IntoIterator<Item = (&'a str, f64)>,
{
    let mut ranked: Vec<(&'a str, f64)> = rows.into_iter().collect();
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_scores_have_no_summary() {
        assert!(FearSummary::from_scores(&[]).is_none());
    }

    #[test]
    fn test_single_score_has_no_std() {
        let summary = FearSummary::from_scores(&[42.1]).unwrap();
        assert_eq!(summary.count, 1);
        assert_eq!(summary.std, None);
        assert_eq!(summary.min, 42.1);
        assert_eq!(summary.median, 42.1);
        assert_eq!(summary.max, 42.1);
    }

    #[test]
    fn test_quartiles_interpolate() {
        let summary = FearSummary::from_scores(&[40.0, 10.0, 30.0, 20.0, 50.0]).unwrap();
        assert_eq!(summary.min, 10.0);
        assert_eq!(summary.p25, 20.0);
        assert_eq!(summary.median, 30.0);
        assert_eq!(summary.p75, 40.0);
        assert_eq!(summary.max, 50.0);

        let summary = FearSummary::from_scores(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert!((summary.p25 - 1.75).abs() < 1e-12);
        assert!((summary.p75 - 3.25).abs() < 1e-12);
    }

    #[test]
    fn test_sample_standard_deviation() {
        let summary = FearSummary::from_scores(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        // population std is 2.0; sample std uses n - 1
        let expected = (32.0f64 / 7.0).sqrt();
        assert!((summary.std.unwrap() - expected).abs() < 1e-12);
    }

    #[test]
    fn test_ranked_by_fear_is_descending_and_stable() {
        let rows = vec![("a.jpg", 10.0), ("b.jpg", 42.1), ("c.jpg", 10.0), ("d.jpg", 55.0)];
        let ranked = ranked_by_fear(rows.iter().map(|(i, s)| (*i, *s)));
        let order: Vec<&str> = ranked.iter().map(|(i, _)| *i).collect();
        assert_eq!(order, vec!["d.jpg", "b.jpg", "a.jpg", "c.jpg"]);
    }

    #[test]
    fn test_display_lists_every_statistic() {
        let text = FearSummary::from_scores(&[1.0, 3.0]).unwrap().to_string();
        for label in ["count", "mean", "std", "min", "25%", "50%", "75%", "max"] {
            assert!(text.contains(label), "missing {} in {}", label, text);
        }
    }
}
