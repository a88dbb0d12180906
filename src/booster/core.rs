use crate::binning::bin_matrix;
use crate::booster::config::*;
use crate::data::Matrix;
use crate::errors::CausalError;
use crate::metric::{is_comparison_better, metric_callables};
use crate::objective::{Objective, ObjectiveFunction};
use crate::sampler::{sample_columns, RandomSampler, Sampler};
use crate::splitter::Splitter;
use crate::tree::tree::{Tree, TreeData, TreeLimits};
use crate::utils::validate_length;
use hashbrown::HashMap;
use log::{info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::time::Instant;

type ImportanceFn = fn(&Tree, &mut HashMap<usize, (f64, usize)>);

/// Histogram based gradient boosted decision trees.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GradientBooster {
    pub cfg: BoosterConfig,
    #[serde(deserialize_with = "parse_missing")]
    pub base_score: f64,
    pub trees: Vec<Tree>,
    /// Number of features seen at fit time.
    pub n_features: usize,
    /// Best round found by early stopping.
    pub best_iteration: Option<usize>,
    /// Evaluation metric per round, when an evaluation set was provided.
    pub evaluation_history: Vec<f64>,
}

impl Default for GradientBooster {
    fn default() -> Self {
        GradientBooster::from_config(BoosterConfig::default())
    }
}

impl BoosterIO for GradientBooster {}

impl GradientBooster {
    /// Gradient Booster object
    ///
    /// * `objective` - `LogLoss` for binary classification or `SquaredLoss` for regression.
    /// * `n_estimators` - Number of boosting rounds.
    /// * `learning_rate` - Step size applied to each leaf weight.
    /// * `num_leaves` - Maximum number of leaves of a tree.
    /// * `seed` - Integer value used to seed any randomness used in the algorithm.
    pub fn new(
        objective: Objective,
        n_estimators: usize,
        learning_rate: f64,
        num_leaves: usize,
        seed: u64,
    ) -> Result<Self, CausalError> {
        let cfg = BoosterConfig {
            objective,
            n_estimators,
            learning_rate,
            num_leaves,
            seed,
            ..BoosterConfig::default()
        };
        cfg.validate_parameters()?;
        Ok(GradientBooster::from_config(cfg))
    }

    /// Unfitted booster with the given configuration.
    pub fn from_config(cfg: BoosterConfig) -> Self {
        GradientBooster {
            cfg,
            base_score: f64::NAN,
            trees: Vec::new(),
            n_features: 0,
            best_iteration: None,
            evaluation_history: Vec::new(),
        }
    }

    pub fn reset(&mut self) {
        self.trees = Vec::new();
        self.base_score = f64::NAN;
        self.n_features = 0;
        self.best_iteration = None;
        self.evaluation_history = Vec::new();
    }

    pub fn is_fitted(&self) -> bool {
        !self.base_score.is_nan()
    }

    /// Fit the gradient booster on a provided dataset.
    ///
    /// * `data` - Column major feature matrix.
    /// * `y` - Target values, 0 or 1 for `LogLoss`.
    /// * `sample_weight` - Instance weights to use when training the model.
    pub fn fit(&mut self, data: &Matrix<f64>, y: &[f64], sample_weight: Option<&[f64]>) -> Result<(), CausalError> {
        self.fit_with_eval(data, y, sample_weight, None)
    }

    /// Fit, tracking a held out evaluation set used for early stopping.
    pub fn fit_with_eval(
        &mut self,
        data: &Matrix<f64>,
        y: &[f64],
        sample_weight: Option<&[f64]>,
        eval: Option<(&Matrix<f64>, &[f64])>,
    ) -> Result<(), CausalError> {
        self.cfg.validate_parameters()?;
        self.validate_data(data, y, sample_weight)?;
        if let Some((eval_data, eval_y)) = eval {
            if eval_data.cols != data.cols {
                return Err(CausalError::ShapeMismatch(data.cols, eval_data.cols));
            }
            validate_length("evaluation target", eval_data.rows, eval_y.len())?;
        }

        match self.cfg.num_threads {
            Some(num_threads) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(num_threads)
                    .build()
                    .map_err(|e| {
                        CausalError::InvalidParameter("num_threads".to_string(), "a usable thread count".to_string(), e.to_string())
                    })?;
                pool.install(|| self.fit_trees(data, y, sample_weight, eval))
            }
            None => self.fit_trees(data, y, sample_weight, eval),
        }
    }

    fn validate_data(&self, data: &Matrix<f64>, y: &[f64], sample_weight: Option<&[f64]>) -> Result<(), CausalError> {
        if data.rows == 0 || data.cols == 0 {
            return Err(CausalError::InvalidParameter(
                "data".to_string(),
                "at least one row and one column".to_string(),
                format!("{} rows and {} columns", data.rows, data.cols),
            ));
        }
        validate_length("target", data.rows, y.len())?;
        if let Some(w) = sample_weight {
            validate_length("sample weight", data.rows, w.len())?;
            if w.iter().any(|v| !v.is_finite() || *v < 0.0) {
                return Err(CausalError::InvalidParameter(
                    "sample_weight".to_string(),
                    "finite non negative values".to_string(),
                    "negative or non finite weight".to_string(),
                ));
            }
        }
        if y.iter().any(|v| !v.is_finite()) {
            return Err(CausalError::InvalidOutcome("target contains missing or infinite values".to_string()));
        }
        if self.cfg.objective == Objective::LogLoss && y.iter().any(|v| *v != 0.0 && *v != 1.0) {
            return Err(CausalError::InvalidOutcome(
                "LogLoss objective requires targets equal to 0 or 1".to_string(),
            ));
        }
        Ok(())
    }

    fn fit_trees(
        &mut self,
        data: &Matrix<f64>,
        y: &[f64],
        sample_weight: Option<&[f64]>,
        eval: Option<(&Matrix<f64>, &[f64])>,
    ) -> Result<(), CausalError> {
        let start = Instant::now();
        self.reset();

        let objective_fn = self.cfg.objective;
        self.base_score = objective_fn.initial_value(y, sample_weight);
        self.n_features = data.cols;
        let mut yhat = vec![self.base_score; y.len()];

        let binned_data = bin_matrix(data, self.cfg.max_bin)?;
        let bdata = Matrix::new(&binned_data.binned_data, data.rows, data.cols);
        let tree_data = TreeData {
            bdata: &bdata,
            cuts: &binned_data.cuts,
            nbins: &binned_data.nbins,
        };

        let splitter = Splitter {
            learning_rate: self.cfg.learning_rate,
            reg_alpha: self.cfg.reg_alpha,
            reg_lambda: self.cfg.reg_lambda,
            min_child_samples: self.cfg.min_child_samples,
            min_child_weight: self.cfg.min_child_weight,
            min_split_gain: self.cfg.min_split_gain,
        };
        let limits = TreeLimits {
            num_leaves: self.cfg.num_leaves,
            max_depth: self.cfg.max_depth,
        };

        let mut rng = StdRng::seed_from_u64(self.cfg.seed);
        let mut sampler = RandomSampler::new(self.cfg.subsample);

        let metric = self.cfg.eval_metric.unwrap_or_else(|| objective_fn.default_metric());
        let (metric_fn, maximize) = metric_callables(&metric);
        let mut eval_yhat = eval.map(|(d, _)| vec![self.base_score; d.rows]);
        let eval_weight = eval.map(|(d, _)| vec![1.0; d.rows]);
        let mut best_score = f64::NAN;
        let mut best_iteration = 0;

        for i in 0..self.cfg.n_estimators {
            let (grad, hess) = objective_fn.gradient(y, &yhat, sample_weight);
            let (chosen, _) = sampler.sample(&mut rng, &data.index);
            let col_index = sample_columns(&mut rng, data.cols, self.cfg.colsample_bytree);

            let mut tree = Tree::new();
            tree.fit(&tree_data, chosen, &col_index, &grad, &hess, &splitter, limits);
            yhat.iter_mut()
                .zip(tree.predict(data, true))
                .for_each(|(p, t)| *p += t);

            let mut eval_score = f64::NAN;
            if let (Some((eval_data, eval_y)), Some(ey), Some(ew)) = (eval, eval_yhat.as_mut(), eval_weight.as_ref()) {
                ey.iter_mut()
                    .zip(tree.predict(eval_data, true))
                    .for_each(|(p, t)| *p += t);
                eval_score = metric_fn(eval_y, ey, ew);
                self.evaluation_history.push(eval_score);
                if i == 0 || is_comparison_better(best_score, eval_score, maximize) {
                    best_score = eval_score;
                    best_iteration = i;
                }
            }

            if self.cfg.log_iterations > 0 && i % self.cfg.log_iterations == 0 {
                let loss = objective_fn.loss(y, &yhat, sample_weight);
                info!(
                    "round {:0?}, tree.nodes: {:1?}, tree.depth: {:2?}, loss: {:3?}, eval: {:4?}",
                    i,
                    tree.nodes.len(),
                    tree.depth,
                    loss.iter().sum::<f64>() / loss.len() as f64,
                    eval_score,
                );
            }

            self.trees.push(tree);

            if let (Some(rounds), true) = (self.cfg.early_stopping_rounds, eval.is_some()) {
                if i - best_iteration >= rounds {
                    info!(
                        "Early stopping at round {}, best round {} with {:?} {}.",
                        i, best_iteration, metric, best_score
                    );
                    break;
                }
            }
        }

        if eval.is_some() && self.cfg.early_stopping_rounds.is_some() {
            self.trees.truncate(best_iteration + 1);
            self.best_iteration = Some(best_iteration);
        } else if self.cfg.early_stopping_rounds.is_some() {
            warn!("Early stopping rounds were set but no evaluation data was provided, all rounds were kept.");
        }

        if self.cfg.log_iterations > 0 {
            info!(
                "Finished training a booster with {0} trees in {1} seconds.",
                self.trees.len(),
                start.elapsed().as_secs()
            );
        }
        Ok(())
    }

    /// Get reference to the trees
    pub fn get_prediction_trees(&self) -> &[Tree] {
        &self.trees
    }

    /// Calculate feature importance measure for the features
    /// in the model.
    /// - `method`: variable importance method to use.
    /// - `normalize`: whether to normalize the importance values with the sum.
    pub fn calculate_feature_importance(&self, method: ImportanceMethod, normalize: bool) -> HashMap<usize, f64> {
        let (average, importance_fn): (bool, ImportanceFn) = match method {
            ImportanceMethod::Weight => (false, Tree::calculate_importance_weight),
            ImportanceMethod::Gain => (true, Tree::calculate_importance_gain),
            ImportanceMethod::TotalGain => (false, Tree::calculate_importance_gain),
            ImportanceMethod::Cover => (true, Tree::calculate_importance_cover),
            ImportanceMethod::TotalCover => (false, Tree::calculate_importance_cover),
        };
        let mut stats = HashMap::new();
        for tree in self.trees.iter() {
            importance_fn(tree, &mut stats)
        }

        let importance = stats
            .iter()
            .map(|(k, (v, c))| if average { (*k, v / (*c as f64)) } else { (*k, *v) })
            .collect::<HashMap<usize, f64>>();

        if normalize {
            // Sort before summing so the total does not depend on hash order.
            let mut values: Vec<f64> = importance.values().copied().collect();
            values.sort_by(|a, b| a.total_cmp(b));
            let total: f64 = values.iter().sum();
            if total > 0.0 {
                return importance.iter().map(|(k, v)| (*k, v / total)).collect();
            }
        }
        importance
    }
}
