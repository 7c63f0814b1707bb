/// Values paired with non-negative weights, kept sorted by value.
///
/// Sorting is stable, so equal values keep their input order.
#[derive(Debug, Clone, Default)]
pub struct WeightedSample {
    points: Vec<(f64, f64)>,
    total_weight: f64,
}

impl WeightedSample {
    pub fn new(points: impl IntoIterator<Item = (f64, f64)>) -> Self {
        let mut points: Vec<(f64, f64)> = points.into_iter().collect();
        points.sort_by(|a, b| a.0.total_cmp(&b.0));
        let total_weight = points.iter().map(|(_, w)| w).sum();
        Self {
            points,
            total_weight,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn total_weight(&self) -> f64 {
        self.total_weight
    }

    /// Smallest value whose cumulative weight strictly exceeds
    /// `q * total_weight`. No interpolation: the result is always one of
    /// the sample values.
    ///
    /// With equal weights on `{800, 1200}` the median is 1200, since 800
    /// alone only reaches the threshold. When no value exceeds it (`q >= 1`)
    /// the largest value is returned. A non-positive total weight is treated
    /// as 1. Returns 0.0 for an empty sample.
    pub fn quantile(&self, q: f64) -> f64 {
        let Some(&(last, _)) = self.points.last() else {
            return 0.0;
        };

        let total = if self.total_weight > 0.0 {
            self.total_weight
        } else {
            1.0
        };
        let threshold = q * total;

        let mut cumulative = 0.0;
        for &(value, weight) in &self.points {
            cumulative += weight;
            if cumulative > threshold {
                return value;
            }
        }
        last
    }
}

/// One-shot weighted quantile over parallel `values` / `weights` slices.
pub fn weighted_quantile(values: &[f64], weights: &[f64], q: f64) -> f64 {
    WeightedSample::new(values.iter().copied().zip(weights.iter().copied())).quantile(q)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_sample_is_zero() {
        let sample = WeightedSample::new([]);
        assert!(sample.is_empty());
        assert_eq!(sample.quantile(0.5), 0.0);
    }

    #[test]
    fn test_single_value() {
        let sample = WeightedSample::new([(1000.0, 0.37)]);
        for q in [0.0, 0.25, 0.5, 0.75, 1.0] {
            assert_eq!(sample.quantile(q), 1000.0);
        }
    }

    #[test]
    fn test_equal_weight_median_takes_upper_value() {
        assert_eq!(weighted_quantile(&[800.0, 1200.0], &[1.0, 1.0], 0.5), 1200.0);
        assert_eq!(weighted_quantile(&[1200.0, 800.0], &[0.4, 0.4], 0.5), 1200.0);
        assert_eq!(weighted_quantile(&[800.0, 1200.0], &[1.0, 1.0], 0.25), 800.0);
        assert_eq!(weighted_quantile(&[800.0, 1200.0], &[1.0, 1.0], 0.75), 1200.0);
    }

    #[test]
    fn test_weight_pulls_quantile() {
        let values = [10.0, 20.0, 30.0];
        assert_eq!(weighted_quantile(&values, &[8.0, 1.0, 1.0], 0.5), 10.0);
        assert_eq!(weighted_quantile(&values, &[1.0, 1.0, 8.0], 0.5), 30.0);
        assert_eq!(weighted_quantile(&values, &[1.0, 8.0, 1.0], 0.5), 20.0);
    }

    #[test]
    fn test_input_order_is_irrelevant_to_value_order() {
        let a = weighted_quantile(&[30.0, 10.0, 20.0], &[1.0, 1.0, 1.0], 0.5);
        let b = weighted_quantile(&[10.0, 20.0, 30.0], &[1.0, 1.0, 1.0], 0.5);
        assert_eq!(a, 20.0);
        assert_eq!(a, b);
    }

    #[test]
    fn test_full_quantile_returns_max() {
        assert_eq!(weighted_quantile(&[5.0, 7.0, 9.0], &[1.0, 1.0, 1.0], 1.0), 9.0);
    }

    #[test]
    fn test_zero_total_weight() {
        // Treated as a total of 1, which no cumulative sum of zeros exceeds.
        assert_eq!(weighted_quantile(&[5.0, 7.0], &[0.0, 0.0], 0.5), 7.0);
    }

    #[test]
    fn test_quartiles_are_monotonic() {
        let values = [812.0, 1040.0, 660.0, 975.0, 1320.0, 700.0, 1101.0];
        let weights = [0.9, 0.2, 0.55, 0.31, 0.05, 0.73, 0.6];
        let sample = WeightedSample::new(values.into_iter().zip(weights));

        assert_eq!(sample.len(), 7);
        let low = sample.quantile(0.25);
        let median = sample.quantile(0.5);
        let high = sample.quantile(0.75);
        assert!(low <= median && median <= high, "{low} {median} {high}");
    }
}
