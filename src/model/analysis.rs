use crate::causal::interpret::{InterpretMethod, Interpretation};
use crate::causal::matching::{BalanceTable, NearestNeighborMatch};
use crate::causal::propensity::ElasticNetPropensityModel;
use crate::causal::sensitivity::{Sensitivity, SensitivityMethod, SensitivityReport};
use crate::constants::{MATCHING_SEED, PROPENSITY_FOLDS, PROPENSITY_SEED, SENSITIVITY_SEED};
use crate::data::{FeatureMatrix, Matrix};
use crate::errors::CausalError;
use crate::explain::Explanation;
use crate::frame::DataFrame;
use crate::learner::default_learner;
use crate::model::core::CausalInferenceModel;
use crate::tuning::{tuning_estimator, RandomizedSearch, Scoring, SearchResult, SearchSpace, TuningOptions};
use crate::utils::{mean, train_test_split_indices, validate_length};
use log::info;
use serde::{Deserialize, Serialize};
use std::fmt;

#[cfg(feature = "explain")]
use crate::constants::EXPLAIN_SEED;
#[cfg(feature = "explain")]
use crate::explain::KernelExplainer;

/// Average treatment effect over a selection of rows.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AteEstimate {
    pub ate: f64,
}

impl fmt::Display for AteEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ate: {}", self.ate)
    }
}

/// Rows kept by propensity score matching.
///
/// Matched treated rows come first, followed by their controls.
#[derive(Debug, Clone)]
pub struct MatchedSample {
    pub x: FeatureMatrix,
    pub treatment: Vec<f64>,
    pub y: Vec<f64>,
    /// Positions of the matched rows in the training data.
    pub indices: Vec<usize>,
    /// Propensity score of every training row.
    pub scores: Vec<f64>,
    /// Treated rows left out because no control was within the caliper.
    pub n_unmatched: usize,
    /// Control rows left out because no treated row was matched to them.
    pub n_unmatched_control: usize,
    pub before: BalanceTable,
    pub after: BalanceTable,
}

impl CausalInferenceModel {
    /// Mean estimated effect, over all rows or the rows where `mask` is true.
    pub fn estimate_ate(&self, mask: Option<&[bool]>) -> Result<AteEstimate, CausalError> {
        let tau = self.treatment_effects()?;
        let selected: Vec<f64> = match mask {
            Some(mask) => {
                validate_length("mask", tau.len(), mask.len())?;
                tau.iter().zip(mask).filter(|(_, m)| **m).map(|(t, _)| *t).collect()
            }
            None => tau.to_vec(),
        };
        if selected.is_empty() {
            return Err(CausalError::EmptySelection);
        }
        Ok(AteEstimate { ate: mean(&selected) })
    }

    /// Which features drive the estimated effects.
    pub fn interpret(&self, method: InterpretMethod) -> Result<Interpretation, CausalError> {
        let tau = self.treatment_effects()?;
        match method {
            InterpretMethod::FeatureImportance => self.model.get_importance(&self.x, tau),
            InterpretMethod::ShapValues => self.model.get_shap_values(&self.x, tau),
        }
    }

    /// Kernel SHAP explanation of the effect predicted for a single row.
    ///
    /// * `df` - Frame holding the row, preprocessed with the fitted pipeline.
    /// * `row_num` - Position of the row in `df`.
    /// * `background_size` - Number of leading training rows used as background.
    /// * `nsamples` - Number of coalitions evaluated.
    #[cfg(feature = "explain")]
    pub fn explain(
        &self,
        df: &DataFrame,
        row_num: usize,
        background_size: usize,
        nsamples: usize,
    ) -> Result<Explanation, CausalError> {
        if row_num >= df.height() {
            return Err(CausalError::RowOutOfRange(row_num, df.height()));
        }
        if !self.is_fitted() {
            return Err(CausalError::NotFitted("CausalInferenceModel".to_string()));
        }
        let processed = self.pp.transform_features(&df.take(&[row_num])?)?;
        let row = processed.x.get_row(0);
        let explainer = KernelExplainer::new(|m: &Matrix<f64>| self.predict_matrix(m), self.x.head(background_size))?;
        let shap_values = explainer.shap_values(&row, nsamples, EXPLAIN_SEED)?;
        let prediction = self.predict_matrix(&Matrix::new(&row, 1, row.len()))?[0];
        Ok(Explanation {
            row_num,
            features: processed.x.names,
            values: row,
            shap_values,
            expected_value: explainer.expected_value,
            prediction,
        })
    }

    /// Without the `explain` feature there is no explainer to run.
    #[cfg(not(feature = "explain"))]
    pub fn explain(
        &self,
        _df: &DataFrame,
        _row_num: usize,
        _background_size: usize,
        _nsamples: usize,
    ) -> Result<Explanation, CausalError> {
        Err(CausalError::MissingOptionalDependency(
            "explain".to_string(),
            "enable the \"explain\" feature of metacausal".to_string(),
        ))
    }

    /// Experimental. Match treated and control rows on the propensity score.
    ///
    /// * `caliper` - Largest allowed score distance, in standard deviations of the score.
    pub fn minimize_bias(&self, caliper: Option<f64>) -> Result<MatchedSample, CausalError> {
        let mut propensity = ElasticNetPropensityModel::new(PROPENSITY_FOLDS, PROPENSITY_SEED);
        let scores = propensity.fit_predict(&self.x.view(), &self.treatment)?;
        let matcher = NearestNeighborMatch::new(caliper, false, 1, MATCHING_SEED);
        let matched = matcher.match_units(&scores, &self.treatment)?;
        let indices = matched.indices();

        let x = self.x.select_rows(&indices);
        let treatment: Vec<f64> = indices.iter().map(|&i| self.treatment[i]).collect();
        let y: Vec<f64> = indices.iter().map(|&i| self.y[i]).collect();
        let covariates = self.pp.feature_names_one_hot();
        let before = BalanceTable::new(&self.x, &self.treatment, covariates)?;
        let after = BalanceTable::new(&x, &treatment, covariates)?;
        if self.cfg.verbose {
            info!("Balance before matching:\n{}", before);
            info!("Balance after matching:\n{}", after);
        }
        Ok(MatchedSample {
            x,
            treatment,
            y,
            indices,
            scores,
            n_unmatched: matched.n_unmatched,
            n_unmatched_control: matched.n_unmatched_control,
            before,
            after,
        })
    }

    /// Search hyperparameters of the default learner and rebuild the
    /// metalearner from the best configuration. Call before `fit`.
    pub fn tune_and_use_default_learner(&mut self, options: TuningOptions) -> Result<SearchResult, CausalError> {
        options.validate()?;
        let (train, test) = train_test_split_indices(self.x.rows, options.split_pct, options.random_state);
        let view = self.x.view();
        let x_train = view.select_rows(&train);
        let x_test = view.select_rows(&test);
        let y_train: Vec<f64> = train.iter().map(|&i| self.y[i]).collect();
        let y_test: Vec<f64> = test.iter().map(|&i| self.y[i]).collect();
        let train_data = Matrix::new(&x_train, train.len(), self.x.cols);
        let test_data = Matrix::new(&x_test, test.len(), self.x.cols);

        let scoring = options.scoring.unwrap_or_else(|| Scoring::default_for(self.task));
        let search = RandomizedSearch::new(
            tuning_estimator(self.task, &options),
            SearchSpace::default(),
            options.n_iter,
            options.cv,
            scoring,
            options.random_state,
        );
        let result = search.fit(&train_data, &y_train, Some((&test_data, &y_test)))?;

        self.learner = Box::new(result.best_params.apply(default_learner(self.task)));
        self.model = self.plan.build(&*self.learner, &*self.effect_learner);
        if self.cfg.verbose {
            info!("rebuilt {} with tuned parameters: {}", self.plan, result.best_params);
        }
        Ok(result)
    }

    /// Refit fresh metalearners on perturbed data and compare their ATE
    /// with the fitted one.
    ///
    /// * `sample_size` - Fraction of rows kept by the subset data check, in (0, 1].
    pub fn evaluate_robustness(&self, sample_size: f64) -> Result<SensitivityReport, CausalError> {
        let ate = self.estimate_ate(None)?.ate;
        let report = self.sensitivity()?.sensitivity_analysis(&SensitivityMethod::ALL, ate, sample_size)?;
        if self.cfg.verbose {
            info!("Robustness checks:\n{}", report);
        }
        Ok(report)
    }

    pub(crate) fn sensitivity(&self) -> Result<Sensitivity<'_>, CausalError> {
        Ok(Sensitivity::new(
            self.plan,
            &*self.learner,
            &*self.effect_learner,
            &self.x,
            &self.treatment,
            &self.y,
            SENSITIVITY_SEED,
        )?
        .set_verbose(self.cfg.verbose))
    }
}
