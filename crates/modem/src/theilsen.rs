//! Theil-Sen line estimator
//!
//! Robust regression for residual phase across payload subcarriers: the
//! slope is the median of all pairwise slopes, the intercept the median of
//! the per-point residuals against that slope. Quick-select keeps the
//! medians linear in the number of pairs.

#[derive(Debug, Clone, Copy, Default)]
pub struct TheilSen {
    slope: f32,
    intercept: f32,
}

fn median(values: &mut [f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let mid = values.len() / 2;
    let (_, m, _) = values.select_nth_unstable_by(mid, |a, b| a.total_cmp(b));
    *m
}

impl TheilSen {
    pub fn fit(points: &[(f32, f32)]) -> Self {
        if points.len() < 2 {
            return Self {
                slope: 0.0,
                intercept: points.first().map_or(0.0, |p| p.1),
            };
        }
        let mut slopes = Vec::with_capacity(points.len() * (points.len() - 1) / 2);
        for (i, &(xi, yi)) in points.iter().enumerate() {
            for &(xj, yj) in points.iter().skip(i + 1) {
                if xj != xi {
                    slopes.push((yj - yi) / (xj - xi));
                }
            }
        }
        let slope = median(&mut slopes);
        let mut residuals: Vec<f32> = points.iter().map(|&(x, y)| y - slope * x).collect();
        let intercept = median(&mut residuals);
        Self { slope, intercept }
    }

    pub fn slope(&self) -> f32 {
        self.slope
    }

    pub fn evaluate(&self, x: f32) -> f32 {
        self.intercept + self.slope * x
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_line() {
        let points: Vec<(f32, f32)> = (0..32).map(|i| (i as f32, 3.0 + 0.5 * i as f32)).collect();
        let fit = TheilSen::fit(&points);
        assert!((fit.slope() - 0.5).abs() < 1e-6);
        assert!((fit.evaluate(0.0) - 3.0).abs() < 1e-5);
    }

    #[test]
    fn test_resists_outliers() {
        let mut points: Vec<(f32, f32)> =
            (0..40).map(|i| (i as f32, 1.0 + 0.25 * i as f32)).collect();
        // corrupt a quarter of the points badly
        for i in 0..10 {
            points[4 * i].1 = 100.0;
        }
        let fit = TheilSen::fit(&points);
        assert!((fit.slope() - 0.25).abs() < 0.05, "slope {}", fit.slope());
    }

    #[test]
    fn test_degenerate_inputs() {
        assert_eq!(TheilSen::fit(&[]).evaluate(5.0), 0.0);
        let one = TheilSen::fit(&[(2.0, 7.0)]);
        assert_eq!(one.evaluate(0.0), 7.0);
    }
}
