//! Variance-based balance arithmetic, shared by group-level teams and the
//! merged roster. A roster's spread is measured over its own point list, so
//! population statistics (divide by k, not k - 1) are the right choice.

use serde::Serialize;

/// Mean, population standard deviation and coefficient of variation of a
/// point list. Lower variation means a more evenly matched roster.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PointsSpread {
    pub mean: f64,
    pub std_dev: f64,
    pub coefficient_of_variation: f64,
}

/// Compute the spread of `points`. The coefficient of variation is infinite
/// when the mean is zero.
pub fn points_spread(points: &[f64]) -> PointsSpread {
    if points.is_empty() {
        return PointsSpread {
            mean: 0.0,
            std_dev: 0.0,
            coefficient_of_variation: f64::INFINITY,
        };
    }
    let count = points.len() as f64;
    let mean = points.iter().sum::<f64>() / count;
    let variance = points.iter().map(|p| (p - mean).powi(2)).sum::<f64>() / count;
    let std_dev = variance.sqrt();
    let coefficient_of_variation = if mean > 0.0 {
        std_dev / mean
    } else {
        f64::INFINITY
    };
    PointsSpread {
        mean,
        std_dev,
        coefficient_of_variation,
    }
}

/// Penalize a raw score by point spread: `score - std_dev / balance_factor`.
/// A larger factor weakens the penalty.
pub fn balanced_score(score: f64, std_dev: f64, balance_factor: f64) -> f64 {
    score - std_dev / balance_factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_points_have_zero_spread() {
        let spread = points_spread(&[40.0, 40.0, 40.0]);
        assert_eq!(spread.mean, 40.0);
        assert_eq!(spread.std_dev, 0.0);
        assert_eq!(spread.coefficient_of_variation, 0.0);
    }

    #[test]
    fn spread_uses_population_standard_deviation() {
        // mean 30, squared deviations 400 + 0 + 400, variance 800/3
        let spread = points_spread(&[10.0, 30.0, 50.0]);
        assert!((spread.mean - 30.0).abs() < 1e-12);
        assert!((spread.std_dev - (800.0f64 / 3.0).sqrt()).abs() < 1e-12);
        assert!((spread.coefficient_of_variation - spread.std_dev / 30.0).abs() < 1e-12);
    }

    #[test]
    fn zero_mean_yields_infinite_variation() {
        let spread = points_spread(&[0.0, 0.0]);
        assert!(spread.coefficient_of_variation.is_infinite());
    }

    #[test]
    fn higher_variance_scores_strictly_lower() {
        let even = points_spread(&[50.0, 50.0]);
        let skewed = points_spread(&[90.0, 10.0]);
        let factor = 1.5;
        assert!(
            balanced_score(100.0, skewed.std_dev, factor)
                < balanced_score(100.0, even.std_dev, factor)
        );
    }

    #[test]
    fn larger_factor_weakens_the_penalty() {
        let spread = points_spread(&[90.0, 10.0]);
        assert!(
            balanced_score(100.0, spread.std_dev, 30.0)
                > balanced_score(100.0, spread.std_dev, 1.5)
        );
    }
}
