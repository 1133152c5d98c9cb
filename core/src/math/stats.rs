pub struct StatsHelper;

impl StatsHelper {
    /// Mean of the finite entries, `None` when there are none.
    pub fn finite_mean(samples: &[f64]) -> Option<f64> {
        let (sum, count) = samples
            .iter()
            .filter(|v| v.is_finite())
            .fold((0.0, 0usize), |(sum, count), &v| (sum + v, count + 1));
        if count == 0 {
            None
        } else {
            Some(sum / count as f64)
        }
    }

    /// Median of the finite entries; even-length inputs average the middle pair.
    pub fn median(samples: &[f64]) -> Option<f64> {
        let mut sorted: Vec<f64> = samples.iter().copied().filter(|v| v.is_finite()).collect();
        if sorted.is_empty() {
            return None;
        }
        sorted.sort_by(f64::total_cmp);
        let mid = sorted.len() / 2;
        if sorted.len() % 2 == 0 {
            Some((sorted[mid - 1] + sorted[mid]) / 2.0)
        } else {
            Some(sorted[mid])
        }
    }

    /// Index of the first maximum, skipping NaN.
    pub fn argmax(samples: &[f64]) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (idx, &value) in samples.iter().enumerate() {
            if value.is_nan() {
                continue;
            }
            match best {
                Some((_, current)) if value <= current => {}
                _ => best = Some((idx, value)),
            }
        }
        best.map(|(idx, _)| idx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn median_ignores_nan_and_averages_even_counts() {
        assert_eq!(StatsHelper::median(&[]), None);
        assert_eq!(StatsHelper::median(&[f64::NAN, 3.0, 1.0]), Some(2.0));
        assert_eq!(StatsHelper::median(&[5.0, 1.0, 3.0]), Some(3.0));
    }

    #[test]
    fn finite_mean_skips_missing_values() {
        assert_eq!(StatsHelper::finite_mean(&[f64::NAN]), None);
        assert_eq!(StatsHelper::finite_mean(&[1.0, f64::NAN, 3.0]), Some(2.0));
    }

    #[test]
    fn argmax_returns_first_maximum() {
        assert_eq!(StatsHelper::argmax(&[1.0, 4.0, 4.0, 2.0]), Some(1));
        assert_eq!(StatsHelper::argmax(&[f64::NAN, f64::NAN]), None);
    }
}
