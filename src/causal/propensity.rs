//! Propensity
//!
//! Elastic net logistic regression estimating the probability of treatment
//! given covariates. Features are standardized, the penalty strength and the
//! l1 ratio are chosen by k-fold cross validated log loss.
use crate::constants::{PROPENSITY_CLIP, PROPENSITY_FOLDS, PROPENSITY_MAX_ITER, PROPENSITY_SEED, PROPENSITY_TOL};
use crate::data::Matrix;
use crate::errors::CausalError;
use crate::utils::{complement, kfold_indices, mean, std_dev, validate_length};
use log::warn;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

fn soft_threshold(v: f64, t: f64) -> f64 {
    if v > t {
        v - t
    } else if v < -t {
        v + t
    } else {
        0.0
    }
}

/// Coefficients of a fitted logistic model on standardized features.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct LogisticFit {
    intercept: f64,
    coef: Vec<f64>,
    converged: bool,
}

impl LogisticFit {
    fn decision(&self, z: &[Vec<f64>], row: usize) -> f64 {
        self.intercept + self.coef.iter().zip(z).map(|(b, col)| b * col[row]).sum::<f64>()
    }
}

/// Proximal gradient descent on the penalized mean log loss.
///
/// `z` holds standardized columns, only `rows` are used.
fn fit_logistic(z: &[Vec<f64>], w: &[f64], rows: &[usize], lambda: f64, l1_ratio: f64) -> LogisticFit {
    let p = z.len();
    let n = rows.len() as f64;
    let l2 = lambda * (1.0 - l1_ratio);
    let l1 = lambda * l1_ratio;
    // Lipschitz bound of the smooth part for unit variance columns plus intercept.
    let step = 1.0 / (0.25 * (p as f64 + 1.0) + l2);
    let mut fit = LogisticFit {
        intercept: 0.0,
        coef: vec![0.0; p],
        converged: false,
    };
    for _ in 0..PROPENSITY_MAX_ITER {
        let resid: Vec<f64> = rows.iter().map(|&i| sigmoid(fit.decision(z, i)) - w[i]).collect();
        let g0 = resid.iter().sum::<f64>() / n;
        let mut max_delta = (step * g0).abs();
        fit.intercept -= step * g0;
        for (j, col) in z.iter().enumerate() {
            let g = rows.iter().zip(&resid).map(|(&i, r)| col[i] * r).sum::<f64>() / n + l2 * fit.coef[j];
            let updated = soft_threshold(fit.coef[j] - step * g, step * l1);
            max_delta = max_delta.max((updated - fit.coef[j]).abs());
            fit.coef[j] = updated;
        }
        if max_delta < PROPENSITY_TOL {
            fit.converged = true;
            break;
        }
    }
    fit
}

fn mean_log_loss(fit: &LogisticFit, z: &[Vec<f64>], w: &[f64], rows: &[usize]) -> f64 {
    rows.iter()
        .map(|&i| {
            let p = sigmoid(fit.decision(z, i)).clamp(1e-15, 1.0 - 1e-15);
            -(w[i] * p.ln() + (1.0 - w[i]) * (1.0 - p).ln())
        })
        .sum::<f64>()
        / rows.len() as f64
}

/// Propensity model, P(treatment = 1 | x).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElasticNetPropensityModel {
    pub n_fold: usize,
    pub seed: u64,
    /// Scores are clipped to `[clip, 1 - clip]`.
    pub clip: f64,
    pub lambdas: Vec<f64>,
    pub l1_ratios: Vec<f64>,
    means: Vec<f64>,
    scales: Vec<f64>,
    fit: Option<LogisticFit>,
    /// Selected (lambda, l1_ratio).
    pub best_params: Option<(f64, f64)>,
}

impl Default for ElasticNetPropensityModel {
    fn default() -> Self {
        ElasticNetPropensityModel::new(PROPENSITY_FOLDS, PROPENSITY_SEED)
    }
}

impl ElasticNetPropensityModel {
    pub fn new(n_fold: usize, seed: u64) -> Self {
        ElasticNetPropensityModel {
            n_fold,
            seed,
            clip: PROPENSITY_CLIP,
            lambdas: vec![1e-1, 1e-2, 1e-3, 1e-4],
            l1_ratios: vec![0.001, 0.334, 0.667, 0.999],
            means: Vec::new(),
            scales: Vec::new(),
            fit: None,
            best_params: None,
        }
    }

    pub fn is_fitted(&self) -> bool {
        self.fit.is_some()
    }

    fn standardize(&self, x: &Matrix<f64>) -> Vec<Vec<f64>> {
        (0..x.cols)
            .map(|j| {
                x.get_col(j)
                    .iter()
                    .map(|v| {
                        let v = if v.is_nan() { self.means[j] } else { *v };
                        (v - self.means[j]) / self.scales[j]
                    })
                    .collect()
            })
            .collect()
    }

    /// Fit the model, selecting the penalty by cross validation.
    pub fn fit(&mut self, x: &Matrix<f64>, treatment: &[f64]) -> Result<(), CausalError> {
        validate_length("treatment", x.rows, treatment.len())?;
        if treatment.iter().any(|t| *t != 0.0 && *t != 1.0) {
            return Err(CausalError::InvalidTreatment("treatment must only contain 0 and 1".to_string()));
        }
        let n_treated = treatment.iter().filter(|t| **t == 1.0).count();
        if n_treated == 0 || n_treated == treatment.len() {
            return Err(CausalError::InvalidTreatment(
                "both treated and control units are required to estimate propensity".to_string(),
            ));
        }
        self.means.clear();
        self.scales.clear();
        for j in 0..x.cols {
            let present: Vec<f64> = x.get_col(j).iter().copied().filter(|v| !v.is_nan()).collect();
            let (m, s) = if present.is_empty() {
                (0.0, 1.0)
            } else {
                (mean(&present), std_dev(&present, 0))
            };
            self.means.push(m);
            self.scales.push(if s > 0.0 { s } else { 1.0 });
        }
        let z = self.standardize(x);

        let mut rng = StdRng::seed_from_u64(self.seed);
        let n_fold = self.n_fold.clamp(2, x.rows.max(2));
        let folds = kfold_indices(x.rows, n_fold, &mut rng);
        let grid: Vec<(f64, f64)> = self
            .lambdas
            .iter()
            .flat_map(|l| self.l1_ratios.iter().map(move |r| (*l, *r)))
            .collect();
        let scores: Vec<f64> = grid
            .par_iter()
            .map(|(lambda, ratio)| {
                folds
                    .iter()
                    .filter(|f| !f.is_empty())
                    .map(|test| {
                        let train = complement(x.rows, test);
                        let fit = fit_logistic(&z, treatment, &train, *lambda, *ratio);
                        mean_log_loss(&fit, &z, treatment, test)
                    })
                    .sum::<f64>()
            })
            .collect();
        let best = scores
            .iter()
            .enumerate()
            .fold(None, |acc: Option<(usize, f64)>, (i, s)| match acc {
                Some((_, b)) if b <= *s || s.is_nan() => acc,
                _ => Some((i, *s)),
            })
            .map_or(grid[0], |(i, _)| grid[i]);

        let all: Vec<usize> = (0..x.rows).collect();
        let fit = fit_logistic(&z, treatment, &all, best.0, best.1);
        if !fit.converged {
            warn!("Propensity model reached the iteration limit of {} before converging.", PROPENSITY_MAX_ITER);
        }
        self.best_params = Some(best);
        self.fit = Some(fit);
        Ok(())
    }

    /// Clipped propensity scores.
    pub fn predict(&self, x: &Matrix<f64>) -> Result<Vec<f64>, CausalError> {
        let fit = self
            .fit
            .as_ref()
            .ok_or_else(|| CausalError::NotFitted("ElasticNetPropensityModel".to_string()))?;
        if x.cols != self.means.len() {
            return Err(CausalError::ShapeMismatch(self.means.len(), x.cols));
        }
        let z = self.standardize(x);
        Ok((0..x.rows)
            .map(|i| sigmoid(fit.decision(&z, i)).clamp(self.clip, 1.0 - self.clip))
            .collect())
    }

    pub fn fit_predict(&mut self, x: &Matrix<f64>, treatment: &[f64]) -> Result<Vec<f64>, CausalError> {
        self.fit(x, treatment)?;
        self.predict(x)
    }
}
