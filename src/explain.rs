//! Explain
//!
//! Model agnostic Kernel SHAP attributions of a single prediction, and a text
//! force plot of the result. The explainer is only compiled with the
//! `explain` feature.
use serde::{Deserialize, Serialize};
use std::fmt;

#[cfg(feature = "explain")]
use crate::data::{FeatureMatrix, Matrix};
#[cfg(feature = "explain")]
use crate::errors::CausalError;
#[cfg(feature = "explain")]
use crate::utils::{mean, solve_linear_system};
#[cfg(feature = "explain")]
use rand::{rngs::StdRng, seq::index::sample, Rng, SeedableRng};

const PLOT_WIDTH: usize = 30;

/// Attribution of one prediction to its features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Explanation {
    pub row_num: usize,
    pub features: Vec<String>,
    /// Feature values of the explained row.
    pub values: Vec<f64>,
    pub shap_values: Vec<f64>,
    /// Mean prediction over the background data.
    pub expected_value: f64,
    pub prediction: f64,
}

impl Explanation {
    /// Features with a non zero attribution, largest magnitude first.
    pub fn ranked(&self) -> Vec<(&str, f64, f64)> {
        let mut out: Vec<(&str, f64, f64)> = self
            .features
            .iter()
            .zip(self.values.iter().zip(&self.shap_values))
            .filter(|(_, (_, s))| **s != 0.0)
            .map(|(f, (v, s))| (f.as_str(), *v, *s))
            .collect();
        out.sort_by(|a, b| b.2.abs().total_cmp(&a.2.abs()));
        out
    }

    /// Text force plot, features pushing the prediction up are drawn with `+`,
    /// features pushing it down with `-`.
    pub fn force_plot(&self) -> String {
        let ranked = self.ranked();
        let max = ranked.iter().map(|r| r.2.abs()).fold(0.0, f64::max);
        let width = ranked.iter().map(|r| r.0.len()).max().unwrap_or(0);
        let mut out = format!(
            "base value: {:.4}  ->  prediction: {:.4} (row {})\n",
            self.expected_value, self.prediction, self.row_num
        );
        for (name, value, shap) in ranked {
            let len = if max > 0.0 {
                ((shap.abs() / max) * PLOT_WIDTH as f64).round().max(1.0) as usize
            } else {
                0
            };
            let bar = if shap > 0.0 { "+" } else { "-" }.repeat(len);
            out.push_str(&format!(
                "{:>width$} = {:<10.4} {:<pw$} {:+.4}\n",
                name,
                value,
                bar,
                shap,
                pw = PLOT_WIDTH
            ));
        }
        out
    }
}

impl fmt::Display for Explanation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.force_plot())
    }
}

#[cfg(feature = "explain")]
fn same_value(a: f64, b: f64) -> bool {
    a == b || (a.is_nan() && b.is_nan())
}

#[cfg(feature = "explain")]
fn binomial(n: usize, k: usize) -> f64 {
    (0..k).fold(1.0, |acc, i| acc * (n - i) as f64 / (i + 1) as f64)
}

/// Kernel SHAP explainer over a batch prediction function.
#[cfg(feature = "explain")]
pub struct KernelExplainer<F>
where
    F: Fn(&Matrix<f64>) -> Result<Vec<f64>, CausalError>,
{
    f: F,
    background: FeatureMatrix,
    pub expected_value: f64,
}

#[cfg(feature = "explain")]
impl<F> KernelExplainer<F>
where
    F: Fn(&Matrix<f64>) -> Result<Vec<f64>, CausalError>,
{
    /// * `f` - Batch prediction function.
    /// * `background` - Rows integrated over to represent a missing feature.
    pub fn new(f: F, background: FeatureMatrix) -> Result<Self, CausalError> {
        if background.rows == 0 {
            return Err(CausalError::EmptySelection);
        }
        let expected_value = mean(&f(&background.view())?);
        Ok(KernelExplainer {
            f,
            background,
            expected_value,
        })
    }

    /// Coalitions over the varying features with their kernel weights.
    fn coalitions(&self, m: usize, nsamples: usize, seed: u64) -> Vec<(Vec<bool>, f64)> {
        if m < usize::BITS as usize - 1 && (1usize << m) - 2 <= nsamples {
            return (1..(1usize << m) - 1)
                .map(|bits| {
                    let mask: Vec<bool> = (0..m).map(|j| (bits >> j) & 1 == 1).collect();
                    let s = mask.iter().filter(|b| **b).count();
                    let w = (m - 1) as f64 / (binomial(m, s) * s as f64 * (m - s) as f64);
                    (mask, w)
                })
                .collect();
        }
        // Sizes drawn proportionally to the total kernel weight of each size.
        let size_weights: Vec<f64> = (1..m).map(|s| (m - 1) as f64 / (s * (m - s)) as f64).collect();
        let total: f64 = size_weights.iter().sum();
        let mut rng = StdRng::seed_from_u64(seed);
        (0..nsamples)
            .map(|_| {
                let mut u = rng.gen::<f64>() * total;
                let mut size = m - 1;
                for (i, w) in size_weights.iter().enumerate() {
                    if u < *w {
                        size = i + 1;
                        break;
                    }
                    u -= w;
                }
                let mut mask = vec![false; m];
                for j in sample(&mut rng, m, size) {
                    mask[j] = true;
                }
                (mask, 1.0)
            })
            .collect()
    }

    /// SHAP values of `row`, one per feature, summing to `f(row) - expected_value`.
    ///
    /// Features equal to every background value get a zero attribution.
    pub fn shap_values(&self, row: &[f64], nsamples: usize, seed: u64) -> Result<Vec<f64>, CausalError> {
        let cols = self.background.cols;
        if row.len() != cols {
            return Err(CausalError::ShapeMismatch(cols, row.len()));
        }
        let fx = (self.f)(&Matrix::new(row, 1, cols))?[0];
        let varying: Vec<usize> = (0..cols)
            .filter(|&j| self.background.get_col(j).iter().any(|b| !same_value(*b, row[j])))
            .collect();
        let mut phi = vec![0.0; cols];
        let m = varying.len();
        let delta = fx - self.expected_value;
        match m {
            0 => return Ok(phi),
            1 => {
                phi[varying[0]] = delta;
                return Ok(phi);
            }
            _ => (),
        }

        let coalitions = self.coalitions(m, nsamples.max(1), seed);
        let nbg = self.background.rows;
        let mut data = Vec::with_capacity(coalitions.len() * nbg * cols);
        for j in 0..cols {
            let bg = self.background.get_col(j);
            let position = varying.iter().position(|v| *v == j);
            for (mask, _) in coalitions.iter() {
                match position {
                    Some(p) if mask[p] => data.extend(std::iter::repeat(row[j]).take(nbg)),
                    _ => data.extend_from_slice(bg),
                }
            }
        }
        let preds = (self.f)(&Matrix::new(&data, coalitions.len() * nbg, cols))?;
        let ey: Vec<f64> = preds.chunks(nbg).map(mean).collect();

        // Weighted least squares with sum(phi) = delta, eliminating the last feature.
        let k = m - 1;
        let mut xtwx = vec![vec![0.0; k]; k];
        let mut xtwy = vec![0.0; k];
        for ((mask, w), e) in coalitions.iter().zip(&ey) {
            let z_last = if mask[k] { 1.0 } else { 0.0 };
            let target = e - self.expected_value - z_last * delta;
            let z: Vec<f64> = (0..k).map(|j| (mask[j] as u8 as f64) - z_last).collect();
            for a in 0..k {
                xtwy[a] += w * z[a] * target;
                for b in 0..k {
                    xtwx[a][b] += w * z[a] * z[b];
                }
            }
        }
        for (a, row) in xtwx.iter_mut().enumerate() {
            row[a] += 1e-10;
        }
        let beta = solve_linear_system(xtwx, xtwy).ok_or_else(|| {
            CausalError::InvalidParameter(
                "nsamples".to_string(),
                "enough coalitions to identify every attribution".to_string(),
                nsamples.to_string(),
            )
        })?;
        for (j, b) in beta.iter().enumerate() {
            phi[varying[j]] = *b;
        }
        phi[varying[k]] = delta - beta.iter().sum::<f64>();
        Ok(phi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn explanation() -> Explanation {
        Explanation {
            row_num: 3,
            features: vec!["a".to_string(), "b".to_string(), "c".to_string()],
            values: vec![1.0, 2.0, 3.0],
            shap_values: vec![0.5, -1.0, 0.0],
            expected_value: 0.2,
            prediction: -0.3,
        }
    }

    #[test]
    fn test_force_plot() {
        let e = explanation();
        let ranked = e.ranked();
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].0, "b");
        let plot = e.force_plot();
        let lines: Vec<&str> = plot.lines().collect();
        assert!(lines[0].contains("prediction: -0.3000"));
        assert_eq!(lines[1].matches('-').count(), PLOT_WIDTH + 1);
        assert_eq!(lines[2].matches('+').count(), PLOT_WIDTH / 2 + 1);
        assert_eq!(e.to_string(), plot);
    }

    #[cfg(feature = "explain")]
    fn linear(x: &Matrix<f64>) -> Result<Vec<f64>, CausalError> {
        Ok((0..x.rows)
            .map(|i| 2.0 * x.get(i, 0) + 3.0 * x.get(i, 1) - x.get(i, 2) + 0.5 * x.get(i, 3))
            .collect())
    }

    #[cfg(feature = "explain")]
    fn background() -> FeatureMatrix {
        FeatureMatrix::from_columns(
            vec![
                ("a".to_string(), vec![0.0, 1.0, 2.0]),
                ("b".to_string(), vec![1.0, 1.0, 4.0]),
                ("c".to_string(), vec![5.0, 5.0, 5.0]),
                ("d".to_string(), vec![0.0, 2.0, 1.0]),
            ],
            3,
        )
    }

    #[cfg(feature = "explain")]
    #[test]
    fn test_kernel_shap_exact_for_linear_model() {
        let explainer = KernelExplainer::new(linear, background()).unwrap();
        approx::assert_relative_eq!(explainer.expected_value, 2.0 * 1.0 + 3.0 * 2.0 - 5.0 + 0.5 * 1.0);
        let row = vec![3.0, 0.0, 5.0, 1.0];
        let phi = explainer.shap_values(&row, 500, 0).unwrap();
        approx::assert_relative_eq!(phi[0], 2.0 * (3.0 - 1.0), epsilon = 1e-6);
        approx::assert_relative_eq!(phi[1], 3.0 * (0.0 - 2.0), epsilon = 1e-6);
        // Constant against the background.
        assert_eq!(phi[2], 0.0);
        approx::assert_relative_eq!(phi[3], 0.0, epsilon = 1e-6);
        let fx = linear(&Matrix::new(&row, 1, 4)).unwrap()[0];
        approx::assert_relative_eq!(phi.iter().sum::<f64>(), fx - explainer.expected_value, epsilon = 1e-9);
    }

    #[cfg(feature = "explain")]
    #[test]
    fn test_kernel_shap_sampled_local_accuracy() {
        let n = 12;
        let f = |x: &Matrix<f64>| -> Result<Vec<f64>, CausalError> {
            Ok((0..x.rows)
                .map(|i| (0..x.cols).map(|j| (j as f64 + 1.0) * x.get(i, j)).sum::<f64>() + x.get(i, 0) * x.get(i, 1))
                .collect())
        };
        let columns = (0..n)
            .map(|j| (format!("f{}", j), vec![0.0, 1.0]))
            .collect::<Vec<_>>();
        let explainer = KernelExplainer::new(f, FeatureMatrix::from_columns(columns, 2)).unwrap();
        let row = vec![2.0; n];
        let phi = explainer.shap_values(&row, 200, 7).unwrap();
        let fx = f(&Matrix::new(&row, 1, n)).unwrap()[0];
        approx::assert_relative_eq!(phi.iter().sum::<f64>(), fx - explainer.expected_value, epsilon = 1e-6);
        assert!(explainer.shap_values(&row[..3], 200, 7).is_err());
    }
}
