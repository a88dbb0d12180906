//! Tuning
//!
//! Randomized hyperparameter search for the default gradient boosted learner,
//! with k-fold cross validated scoring and early stopping on a held out split.
use crate::booster::GradientBooster;
use crate::causal::metalearners::TaskType;
use crate::constants::{
    TUNING_CV_FOLDS, TUNING_EARLY_STOPPING_ROUNDS, TUNING_N_ESTIMATORS, TUNING_N_ITER, TUNING_SEED,
    TUNING_SPLIT_PCT,
};
use crate::data::Matrix;
use crate::errors::CausalError;
use crate::metric::{is_comparison_better, log_loss, mean_squared_error, roc_auc_score, Metric};
use crate::utils::{complement, items_to_strings, kfold_indices, logit, validate_float_parameter, validate_length};
use log::info;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Scoring rule of a search, larger is always better.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scoring {
    RocAuc,
    NegMeanSquaredError,
    NegLogLoss,
}

impl FromStr for Scoring {
    type Err = CausalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "roc_auc" => Ok(Scoring::RocAuc),
            "neg_mean_squared_error" => Ok(Scoring::NegMeanSquaredError),
            "neg_log_loss" => Ok(Scoring::NegLogLoss),
            _ => Err(CausalError::InvalidConfiguration(
                s.to_string(),
                "scoring".to_string(),
                items_to_strings(vec!["roc_auc", "neg_mean_squared_error", "neg_log_loss"]),
            )),
        }
    }
}

impl Scoring {
    pub fn default_for(task: TaskType) -> Self {
        match task {
            TaskType::Classification => Scoring::RocAuc,
            TaskType::Regression => Scoring::NegMeanSquaredError,
        }
    }

    /// Score response scale predictions, probabilities for classifiers.
    pub fn score(&self, y: &[f64], yhat: &[f64]) -> f64 {
        let w = vec![1.0; y.len()];
        match self {
            Scoring::RocAuc => roc_auc_score(y, yhat, &w),
            Scoring::NegMeanSquaredError => -mean_squared_error(y, yhat, &w),
            Scoring::NegLogLoss => {
                let raw: Vec<f64> = yhat.iter().map(|p| logit(*p)).collect();
                -log_loss(y, &raw, &w)
            }
        }
    }
}

/// One point of the search space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchParams {
    pub num_leaves: usize,
    pub min_child_samples: usize,
    pub min_child_weight: f64,
    pub subsample: f64,
    pub colsample_bytree: f64,
    pub reg_alpha: f64,
    pub reg_lambda: f64,
}

impl SearchParams {
    /// Copy the parameters onto a booster.
    pub fn apply(&self, booster: GradientBooster) -> GradientBooster {
        booster
            .set_num_leaves(self.num_leaves)
            .set_min_child_samples(self.min_child_samples)
            .set_min_child_weight(self.min_child_weight)
            .set_subsample(self.subsample)
            .set_colsample_bytree(self.colsample_bytree)
            .set_reg_alpha(self.reg_alpha)
            .set_reg_lambda(self.reg_lambda)
    }
}

impl fmt::Display for SearchParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{num_leaves: {}, min_child_samples: {}, min_child_weight: {}, subsample: {:.4}, colsample_bytree: {:.4}, reg_alpha: {}, reg_lambda: {}}}",
            self.num_leaves,
            self.min_child_samples,
            self.min_child_weight,
            self.subsample,
            self.colsample_bytree,
            self.reg_alpha,
            self.reg_lambda
        )
    }
}

/// Distributions sampled by the search. Integer and float ranges are half open.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchSpace {
    pub num_leaves: (usize, usize),
    pub min_child_samples: (usize, usize),
    pub min_child_weight: Vec<f64>,
    pub subsample: (f64, f64),
    pub colsample_bytree: (f64, f64),
    pub reg_alpha: Vec<f64>,
    pub reg_lambda: Vec<f64>,
}

impl Default for SearchSpace {
    fn default() -> Self {
        SearchSpace {
            num_leaves: (6, 750),
            min_child_samples: (20, 500),
            min_child_weight: vec![1e-5, 1e-3, 1e-2, 1e-1, 1.0, 1e1, 1e2, 1e3, 1e4],
            subsample: (0.2, 1.0),
            colsample_bytree: (0.4, 1.0),
            reg_alpha: vec![0.0, 1e-1, 1.0, 2.0, 5.0, 7.0, 10.0, 50.0, 100.0],
            reg_lambda: vec![0.0, 1e-1, 1.0, 5.0, 10.0, 20.0, 50.0, 100.0],
        }
    }
}

impl SearchSpace {
    pub fn sample(&self, rng: &mut StdRng) -> SearchParams {
        let pick = |values: &[f64], rng: &mut StdRng| values.choose(rng).copied().unwrap_or(0.0);
        SearchParams {
            num_leaves: rng.gen_range(self.num_leaves.0..self.num_leaves.1),
            min_child_samples: rng.gen_range(self.min_child_samples.0..self.min_child_samples.1),
            min_child_weight: pick(&self.min_child_weight, rng),
            subsample: rng.gen_range(self.subsample.0..self.subsample.1),
            colsample_bytree: rng.gen_range(self.colsample_bytree.0..self.colsample_bytree.1),
            reg_alpha: pick(&self.reg_alpha, rng),
            reg_lambda: pick(&self.reg_lambda, rng),
        }
    }
}

/// Options of [`crate::model::CausalInferenceModel::tune_and_use_default_learner`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TuningOptions {
    /// Fraction of rows held out for early stopping.
    pub split_pct: f64,
    pub random_state: u64,
    /// Defaults to ROC-AUC for classification and negative MSE for regression.
    pub scoring: Option<Scoring>,
    pub n_iter: usize,
    pub cv: usize,
    pub early_stopping_rounds: usize,
    pub n_estimators: usize,
}

impl Default for TuningOptions {
    fn default() -> Self {
        TuningOptions {
            split_pct: TUNING_SPLIT_PCT,
            random_state: TUNING_SEED,
            scoring: None,
            n_iter: TUNING_N_ITER,
            cv: TUNING_CV_FOLDS,
            early_stopping_rounds: TUNING_EARLY_STOPPING_ROUNDS,
            n_estimators: TUNING_N_ESTIMATORS,
        }
    }
}

impl TuningOptions {
    pub fn validate(&self) -> Result<(), CausalError> {
        validate_float_parameter(self.split_pct, f64::MIN_POSITIVE, 0.9, "split_pct")?;
        if self.n_iter == 0 {
            return Err(CausalError::InvalidParameter(
                "n_iter".to_string(),
                "positive integer".to_string(),
                "0".to_string(),
            ));
        }
        if self.cv < 2 {
            return Err(CausalError::InvalidParameter(
                "cv".to_string(),
                "at least 2 folds".to_string(),
                self.cv.to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub best_params: SearchParams,
    pub best_score: f64,
    /// Every sampled configuration with its mean cross validated score.
    pub trials: Vec<(SearchParams, f64)>,
    /// Estimator with the best parameters refitted on all training rows.
    pub best_estimator: GradientBooster,
}

pub struct RandomizedSearch {
    pub estimator: GradientBooster,
    pub space: SearchSpace,
    pub n_iter: usize,
    pub cv: usize,
    pub scoring: Scoring,
    pub seed: u64,
}

impl RandomizedSearch {
    pub fn new(estimator: GradientBooster, space: SearchSpace, n_iter: usize, cv: usize, scoring: Scoring, seed: u64) -> Self {
        RandomizedSearch {
            estimator,
            space,
            n_iter,
            cv,
            scoring,
            seed,
        }
    }

    /// Parameter draws, the same for a given seed.
    pub fn candidates(&self) -> Vec<SearchParams> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        (0..self.n_iter).map(|_| self.space.sample(&mut rng)).collect()
    }

    fn cross_validate(
        &self,
        params: &SearchParams,
        x: &Matrix<f64>,
        y: &[f64],
        folds: &[Vec<usize>],
        eval: Option<(&Matrix<f64>, &[f64])>,
    ) -> Result<f64, CausalError> {
        let mut total = 0.0;
        for valid in folds {
            let train = complement(x.rows, valid);
            let xt = x.select_rows(&train);
            let yt: Vec<f64> = train.iter().map(|&i| y[i]).collect();
            let mut model = params.apply(self.estimator.clone());
            model.fit_with_eval(&Matrix::new(&xt, train.len(), x.cols), &yt, None, eval)?;
            let xv = x.select_rows(valid);
            let yv: Vec<f64> = valid.iter().map(|&i| y[i]).collect();
            let pred = model.predict(&Matrix::new(&xv, valid.len(), x.cols))?;
            total += self.scoring.score(&yv, &pred);
        }
        Ok(total / folds.len() as f64)
    }

    /// Evaluate every candidate in parallel and refit the best one.
    ///
    /// * `eval` - Held out rows used for early stopping of every fit.
    pub fn fit(
        &self,
        x: &Matrix<f64>,
        y: &[f64],
        eval: Option<(&Matrix<f64>, &[f64])>,
    ) -> Result<SearchResult, CausalError> {
        validate_length("target", x.rows, y.len())?;
        let mut rng = StdRng::seed_from_u64(self.seed);
        let folds: Vec<Vec<usize>> = kfold_indices(x.rows, self.cv, &mut rng)
            .into_iter()
            .filter(|f| !f.is_empty())
            .collect();
        let trials = self
            .candidates()
            .into_par_iter()
            .map(|params| {
                let score = self.cross_validate(&params, x, y, &folds, eval)?;
                Ok((params, score))
            })
            .collect::<Result<Vec<_>, CausalError>>()?;

        let mut best: Option<&(SearchParams, f64)> = None;
        for trial in trials.iter() {
            match best {
                Some(b) if !is_comparison_better(b.1, trial.1, true) => (),
                _ => best = Some(trial),
            }
        }
        let (best_params, best_score) = best
            .cloned()
            .ok_or_else(|| CausalError::InvalidParameter("n_iter".to_string(), "positive integer".to_string(), "0".to_string()))?;
        let mut best_estimator = best_params.apply(self.estimator.clone());
        best_estimator.fit_with_eval(x, y, None, eval)?;
        info!("Best score reached: {} with params: {}", best_score, best_params);
        Ok(SearchResult {
            best_params,
            best_score,
            trials,
            best_estimator,
        })
    }
}

/// Search estimator used for tuning: many rounds stopped early on the held out split.
pub fn tuning_estimator(task: TaskType, options: &TuningOptions) -> GradientBooster {
    let base = crate::learner::default_learner(task)
        .set_n_estimators(options.n_estimators)
        .set_early_stopping_rounds(Some(options.early_stopping_rounds))
        .set_seed(options.random_state);
    match task {
        TaskType::Classification => base.set_eval_metric(Some(Metric::AUC)),
        TaskType::Regression => base,
    }
}
