use crate::causal::metalearners::{select_metalearner, Metalearner, MetalearnerPlan, TaskType};
use crate::data::{FeatureMatrix, Matrix};
use crate::errors::CausalError;
use crate::frame::DataFrame;
use crate::learner::{default_effect_learner, default_learner, Learner};
use crate::model::config::CausalConfig;
use crate::preprocessing::DataframePreprocessor;
use log::info;
use std::time::Instant;

/// Causal Inference Model
///
/// Estimates per-observation treatment effects of a binary treatment on an
/// outcome with a metalearner. The dataframe is copied and preprocessed at
/// construction, `fit` writes the estimated effects into the copy.
#[derive(Clone)]
pub struct CausalInferenceModel {
    pub cfg: CausalConfig,
    pub(crate) df: DataFrame,
    pub(crate) pp: DataframePreprocessor,
    pub(crate) x: FeatureMatrix,
    pub(crate) y: Vec<f64>,
    pub(crate) treatment: Vec<f64>,
    pub(crate) task: TaskType,
    pub(crate) plan: MetalearnerPlan,
    pub(crate) learner: Box<dyn Learner>,
    pub(crate) effect_learner: Box<dyn Learner>,
    pub(crate) model: Metalearner,
}

impl CausalInferenceModel {
    /// Create a model with the default gradient boosted learners.
    ///
    /// * `df` - Training data, copied and never modified.
    /// * `cfg` - Column roles and metalearner options.
    pub fn new(df: &DataFrame, cfg: CausalConfig) -> Result<Self, CausalError> {
        CausalInferenceModel::with_learners(df, cfg, None, None)
    }

    /// Create a model with custom base and effect learners.
    ///
    /// * `learner` - Outcome learner, defaults to a gradient booster matching the task.
    /// * `effect_learner` - Effect learner of the X and R learners, defaults to a
    ///   gradient boosted regressor.
    pub fn with_learners(
        df: &DataFrame,
        cfg: CausalConfig,
        learner: Option<Box<dyn Learner>>,
        effect_learner: Option<Box<dyn Learner>>,
    ) -> Result<Self, CausalError> {
        cfg.validate_parameters()?;
        let mut ignore_cols = cfg.ignore_cols.clone();
        if !ignore_cols.contains(&cfg.treatment_effect_col) {
            ignore_cols.push(cfg.treatment_effect_col.clone());
        }
        let mut pp = DataframePreprocessor::new(
            &cfg.treatment_col,
            &cfg.outcome_col,
            cfg.text_col.as_deref(),
            &cfg.include_cols,
            &ignore_cols,
            cfg.text_options.clone(),
            cfg.verbose,
        );
        let processed = pp.preprocess(df, true)?;
        let y = processed
            .y
            .ok_or_else(|| CausalError::MissingColumn(cfg.outcome_col.clone()))?;
        let treatment = cfg.align_treatment(processed.treatment);

        let task = TaskType::from_is_classification(pp.is_classification());
        let plan = select_metalearner(cfg.metalearner_type, task);
        let learner = learner.unwrap_or_else(|| Box::new(default_learner(task)));
        let effect_learner = effect_learner.unwrap_or_else(|| Box::new(default_effect_learner()));
        let model = plan.build(&*learner, &*effect_learner);
        if cfg.verbose {
            info!("using metalearner {}", plan);
        }

        Ok(CausalInferenceModel {
            cfg,
            df: df.clone(),
            pp,
            x: processed.x,
            y,
            treatment,
            task,
            plan,
            learner,
            effect_learner,
            model,
        })
    }

    /// Fit the metalearner and store the effect of every training row
    /// in the treatment effect column.
    pub fn fit(&mut self) -> Result<(), CausalError> {
        let start = Instant::now();
        let tau = self.model.fit_predict(&self.x.view(), &self.treatment, &self.y)?;
        self.df.set_column(&self.cfg.treatment_effect_col, tau)?;
        if self.cfg.verbose {
            info!("fit {} in {:.3} seconds", self.plan, start.elapsed().as_secs_f64());
        }
        Ok(())
    }

    /// Treatment effects of new rows, preprocessed with the fitted pipeline.
    pub fn predict(&self, df: &DataFrame) -> Result<Vec<f64>, CausalError> {
        let processed = self.pp.transform_features(df)?;
        self.predict_matrix(&processed.x.view())
    }

    /// Treatment effects of already preprocessed rows.
    pub fn predict_matrix(&self, x: &Matrix<f64>) -> Result<Vec<f64>, CausalError> {
        self.model.predict(x)
    }

    /// Columns a frame passed to `predict` must carry.
    pub fn get_required_columns(&self) -> Vec<String> {
        let mut cols = vec![self.cfg.treatment_col.clone()];
        cols.extend(self.pp.feature_names());
        if let Some(text) = &self.cfg.text_col {
            cols.push(text.clone());
        }
        cols
    }

    pub fn is_fitted(&self) -> bool {
        self.model.is_fitted()
    }

    /// Copy of the training data, with the treatment effect column once fitted.
    pub fn df(&self) -> &DataFrame {
        &self.df
    }

    pub fn x(&self) -> &FeatureMatrix {
        &self.x
    }

    pub fn y(&self) -> &[f64] {
        &self.y
    }

    /// Treatment with 1 marking the treated group.
    pub fn treatment(&self) -> &[f64] {
        &self.treatment
    }

    pub fn task(&self) -> TaskType {
        self.task
    }

    pub fn plan(&self) -> MetalearnerPlan {
        self.plan
    }

    pub fn metalearner(&self) -> &Metalearner {
        &self.model
    }

    pub fn preprocessor(&self) -> &DataframePreprocessor {
        &self.pp
    }

    /// Estimated effects of the training rows.
    pub(crate) fn treatment_effects(&self) -> Result<&[f64], CausalError> {
        if !self.is_fitted() {
            return Err(CausalError::NotFitted("CausalInferenceModel".to_string()));
        }
        self.df.float_column(&self.cfg.treatment_effect_col)
    }
}

impl CausalConfig {
    /// Recode the treatment so that 0 is the control group.
    pub(crate) fn align_treatment(&self, treatment: Vec<f64>) -> Vec<f64> {
        if self.control_value == 1.0 {
            treatment.into_iter().map(|t| 1.0 - t).collect()
        } else {
            treatment
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::causal::metalearners::MetalearnerType;
    use crate::utils::mean;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn frame(n: usize, effect: f64, seed: u64) -> DataFrame {
        let mut rng = StdRng::seed_from_u64(seed);
        let age: Vec<f64> = (0..n).map(|_| rng.gen_range(20.0..60.0)).collect();
        let region: Vec<&str> = (0..n).map(|i| if i % 3 == 0 { "north" } else { "south" }).collect();
        let t: Vec<f64> = (0..n).map(|_| if rng.gen_bool(0.5) { 1.0 } else { 0.0 }).collect();
        let y: Vec<f64> = (0..n)
            .map(|i| age[i] / 20.0 + effect * t[i] + rng.gen_range(-0.1..0.1))
            .collect();
        DataFrame::new()
            .with_column("age", age)
            .and_then(|df| df.with_column("region", region))
            .and_then(|df| df.with_column("t", t))
            .and_then(|df| df.with_column("y", y))
            .unwrap()
    }

    fn config() -> CausalConfig {
        CausalConfig::new("t", "y").set_verbose(false)
    }

    #[test]
    fn test_fit_writes_effect_column() {
        let df = frame(400, 1.0, 0);
        let mut model = CausalInferenceModel::new(&df, config()).unwrap();
        assert_eq!(model.task(), TaskType::Regression);
        assert!(!model.df().contains("treatment_effect"));
        model.fit().unwrap();
        let tau = model.df().float_column("treatment_effect").unwrap();
        assert_eq!(tau.len(), 400);
        assert!((mean(tau) - 1.0).abs() < 0.3);
        // The caller's frame is untouched.
        assert!(!df.contains("treatment_effect"));
        assert_eq!(df.width(), 4);
    }

    #[test]
    fn test_predict_matches_fitted_effects() {
        let df = frame(300, 1.0, 1);
        let mut model = CausalInferenceModel::new(&df, config()).unwrap();
        model.fit().unwrap();
        let fitted = model.df().float_column("treatment_effect").unwrap().to_vec();
        // The effect column of the stored frame is ignored as a covariate.
        let pred = model.predict(model.df()).unwrap();
        assert_eq!(pred, fitted);
        let pred = model.predict_matrix(&model.x().view()).unwrap();
        assert_eq!(pred, fitted);
        let head = df.head(7);
        assert_eq!(model.predict(&head).unwrap(), fitted[..7].to_vec());
        assert_eq!(model.df().float_column("treatment_effect").unwrap(), &fitted[..]);
    }

    #[test]
    fn test_predict_before_fit() {
        let df = frame(100, 1.0, 2);
        let model = CausalInferenceModel::new(&df, config()).unwrap();
        assert!(matches!(model.predict(&df), Err(CausalError::NotFitted(_))));
    }

    #[test]
    fn test_predict_ignores_unknown_outcome() {
        let mut df = frame(300, 1.0, 9);
        let y = df.float_column("y").unwrap();
        let labels: Vec<f64> = y.iter().map(|v| if *v > 2.0 { 1.0 } else { 0.0 }).collect();
        df.set_column("y", labels).unwrap();
        let mut model = CausalInferenceModel::new(&df, config()).unwrap();
        assert_eq!(model.task(), TaskType::Classification);
        model.fit().unwrap();
        let fitted = model.df().float_column("treatment_effect").unwrap().to_vec();

        let mut fresh = df.head(5);
        fresh.set_column("y", vec![f64::NAN; 5]).unwrap();
        assert_eq!(model.predict(&fresh).unwrap(), fitted[..5].to_vec());
        fresh.set_column("y", vec!["pending"; 5]).unwrap();
        assert_eq!(model.predict(&fresh).unwrap(), fitted[..5].to_vec());
    }

    #[test]
    fn test_required_columns() {
        let df = frame(100, 1.0, 3);
        let model = CausalInferenceModel::new(&df, config()).unwrap();
        assert_eq!(model.get_required_columns(), vec!["t", "age", "region"]);
        let cfg = config().set_ignore_cols(vec!["region".to_string()]);
        let model = CausalInferenceModel::new(&df, cfg).unwrap();
        assert_eq!(model.get_required_columns(), vec!["t", "age"]);
        assert_eq!(model.x().cols, 1);
    }

    #[test]
    fn test_control_value_flips_treatment() {
        let df = frame(300, 1.0, 4);
        let original = df.float_column("t").unwrap().to_vec();
        let mut model = CausalInferenceModel::new(&df, config().set_control_value(1.0)).unwrap();
        for (a, b) in model.treatment().iter().zip(original.iter()) {
            assert_eq!(*a, 1.0 - b);
        }
        model.fit().unwrap();
        let tau = model.df().float_column("treatment_effect").unwrap();
        assert!((mean(tau) + 1.0).abs() < 0.3);
    }

    #[test]
    fn test_invalid_construction() {
        let df = frame(50, 1.0, 5);
        assert!(matches!(
            CausalInferenceModel::new(&df, CausalConfig::new("missing", "y")),
            Err(CausalError::MissingColumn(_))
        ));
        assert!(matches!(
            CausalInferenceModel::new(&df, config().set_control_value(0.5)),
            Err(CausalError::InvalidParameter(..))
        ));
    }

    #[test]
    fn test_custom_learner_and_variant() {
        let df = frame(300, 2.0, 6);
        let learner: Box<dyn Learner> = Box::new(default_effect_learner().set_n_estimators(50));
        let cfg = config().set_metalearner_type(MetalearnerType::SLearner);
        let mut model = CausalInferenceModel::with_learners(&df, cfg, Some(learner), None).unwrap();
        assert_eq!(model.plan().implementation(), "BaseSRegressor");
        model.fit().unwrap();
        let tau = model.df().float_column("treatment_effect").unwrap();
        assert!((mean(tau) - 2.0).abs() < 0.5);
    }
}
