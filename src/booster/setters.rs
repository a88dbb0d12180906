use crate::booster::core::GradientBooster;
use crate::metric::Metric;
use crate::objective::Objective;

impl GradientBooster {
    // Set methods for paramters

    /// Set the objective on the booster.
    /// * `objective` - The objective type of the booster.
    pub fn set_objective(mut self, objective: Objective) -> Self {
        self.cfg.objective = objective;
        self
    }

    /// Set the number of boosting rounds.
    pub fn set_n_estimators(mut self, n_estimators: usize) -> Self {
        self.cfg.n_estimators = n_estimators;
        self
    }

    /// Set the learning rate.
    /// * `learning_rate` - Shrinkage applied to every leaf weight.
    pub fn set_learning_rate(mut self, learning_rate: f64) -> Self {
        self.cfg.learning_rate = learning_rate;
        self
    }

    /// Set the maximum number of leaves per tree.
    pub fn set_num_leaves(mut self, num_leaves: usize) -> Self {
        self.cfg.num_leaves = num_leaves;
        self
    }

    /// Set the maximum depth of the trees, `None` for unlimited depth.
    pub fn set_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.cfg.max_depth = max_depth;
        self
    }

    /// Set the minimum number of rows in a leaf.
    pub fn set_min_child_samples(mut self, min_child_samples: usize) -> Self {
        self.cfg.min_child_samples = min_child_samples;
        self
    }

    /// Set the minimum hessian sum in a leaf.
    pub fn set_min_child_weight(mut self, min_child_weight: f64) -> Self {
        self.cfg.min_child_weight = min_child_weight;
        self
    }

    pub fn set_min_split_gain(mut self, min_split_gain: f64) -> Self {
        self.cfg.min_split_gain = min_split_gain;
        self
    }

    /// Set the L1 regularization term.
    pub fn set_reg_alpha(mut self, reg_alpha: f64) -> Self {
        self.cfg.reg_alpha = reg_alpha;
        self
    }

    /// Set the L2 regularization term.
    pub fn set_reg_lambda(mut self, reg_lambda: f64) -> Self {
        self.cfg.reg_lambda = reg_lambda;
        self
    }

    /// Set the fraction of rows sampled for every tree.
    pub fn set_subsample(mut self, subsample: f64) -> Self {
        self.cfg.subsample = subsample;
        self
    }

    /// Set the fraction of columns sampled for every tree.
    pub fn set_colsample_bytree(mut self, colsample_bytree: f64) -> Self {
        self.cfg.colsample_bytree = colsample_bytree;
        self
    }

    /// Set the number of bins on the booster.
    /// * `max_bin` - Number of bins to calculate to partition the data. Setting this to
    ///   a smaller number, will result in faster training time, while potentially sacrificing
    ///   accuracy. If there are more bins, than unique values in a column, all unique values
    ///   will be used.
    pub fn set_max_bin(mut self, max_bin: u16) -> Self {
        self.cfg.max_bin = max_bin;
        self
    }

    /// Set early stopping, used only when `fit_with_eval` receives evaluation data.
    pub fn set_early_stopping_rounds(mut self, early_stopping_rounds: Option<usize>) -> Self {
        self.cfg.early_stopping_rounds = early_stopping_rounds;
        self
    }

    pub fn set_eval_metric(mut self, eval_metric: Option<Metric>) -> Self {
        self.cfg.eval_metric = eval_metric;
        self
    }

    /// Set the number of threads on the booster.
    /// * `num_threads` - Set the number of threads to be used during training.
    pub fn set_num_threads(mut self, num_threads: Option<usize>) -> Self {
        self.cfg.num_threads = num_threads;
        self
    }

    /// Set log iterations on the booster.
    /// * `log_iterations` - The number of log iterations.
    pub fn set_log_iterations(mut self, log_iterations: usize) -> Self {
        self.cfg.log_iterations = log_iterations;
        self
    }

    /// Set the seed on the booster.
    /// * `seed` - Integer value used to see any randomness used in the algorithm.
    pub fn set_seed(mut self, seed: u64) -> Self {
        self.cfg.seed = seed;
        self
    }
}
