//! Meta-learners for Heterogeneous Treatment Effect (HTE) estimation.
//!
//! Implements the T-, S-, X- and R-learner meta-algorithms on top of any
//! [`Learner`]. Each variant owns its own copies of the base and effect
//! learners, so fitting one sub-model never touches another.
use crate::causal::propensity::ElasticNetPropensityModel;
use crate::constants::{METALEARNER_SEED, R_LEARNER_FOLDS};
use crate::data::Matrix;
use crate::errors::CausalError;
use crate::learner::Learner;
use crate::utils::{complement, items_to_strings, kfold_indices, validate_length};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The metalearner strategy, serialized as its tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum MetalearnerType {
    TLearner,
    SLearner,
    XLearner,
    RLearner,
}

impl MetalearnerType {
    pub fn tag(&self) -> &'static str {
        match self {
            MetalearnerType::TLearner => "t-learner",
            MetalearnerType::SLearner => "s-learner",
            MetalearnerType::XLearner => "x-learner",
            MetalearnerType::RLearner => "r-learner",
        }
    }
}

impl FromStr for MetalearnerType {
    type Err = CausalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "t-learner" => Ok(MetalearnerType::TLearner),
            "s-learner" => Ok(MetalearnerType::SLearner),
            "x-learner" => Ok(MetalearnerType::XLearner),
            "r-learner" => Ok(MetalearnerType::RLearner),
            _ => Err(CausalError::InvalidConfiguration(
                s.to_string(),
                "metalearner_type".to_string(),
                items_to_strings(vec!["t-learner", "s-learner", "x-learner", "r-learner"]),
            )),
        }
    }
}

impl TryFrom<String> for MetalearnerType {
    type Error = CausalError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<MetalearnerType> for String {
    fn from(kind: MetalearnerType) -> Self {
        kind.tag().to_string()
    }
}

impl fmt::Display for MetalearnerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// Whether the outcome is binary or continuous.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskType {
    Classification,
    Regression,
}

impl TaskType {
    pub fn from_is_classification(is_classification: bool) -> Self {
        if is_classification {
            TaskType::Classification
        } else {
            TaskType::Regression
        }
    }
}

/// Unfitted construction recipe of a metalearner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetalearnerPlan {
    pub kind: MetalearnerType,
    pub task: TaskType,
}

/// Pick the metalearner implementation for a strategy and a task.
pub fn select_metalearner(kind: MetalearnerType, task: TaskType) -> MetalearnerPlan {
    MetalearnerPlan { kind, task }
}

impl MetalearnerPlan {
    /// Name of the concrete implementation.
    pub fn implementation(&self) -> &'static str {
        match (self.kind, self.task) {
            (MetalearnerType::TLearner, TaskType::Classification) => "BaseTClassifier",
            (MetalearnerType::TLearner, TaskType::Regression) => "BaseTRegressor",
            (MetalearnerType::SLearner, TaskType::Classification) => "BaseSClassifier",
            (MetalearnerType::SLearner, TaskType::Regression) => "BaseSRegressor",
            (MetalearnerType::XLearner, TaskType::Classification) => "BaseXClassifier",
            (MetalearnerType::XLearner, TaskType::Regression) => "BaseXRegressor",
            (MetalearnerType::RLearner, TaskType::Classification) => "BaseRClassifier",
            (MetalearnerType::RLearner, TaskType::Regression) => "BaseRRegressor",
        }
    }

    /// Build the metalearner from independent copies of the learners.
    pub fn build(&self, learner: &dyn Learner, effect_learner: &dyn Learner) -> Metalearner {
        match self.kind {
            MetalearnerType::TLearner => Metalearner::T(TLearner {
                mu0: learner.box_clone(),
                mu1: learner.box_clone(),
                task: self.task,
                fitted: false,
            }),
            MetalearnerType::SLearner => Metalearner::S(SLearner {
                model: learner.box_clone(),
                task: self.task,
                fitted: false,
            }),
            MetalearnerType::XLearner => Metalearner::X(XLearner {
                mu0: learner.box_clone(),
                mu1: learner.box_clone(),
                tau0: effect_learner.box_clone(),
                tau1: effect_learner.box_clone(),
                propensity: ElasticNetPropensityModel::default(),
                task: self.task,
                fitted: false,
            }),
            MetalearnerType::RLearner => Metalearner::R(RLearner {
                outcome: learner.box_clone(),
                effect: effect_learner.box_clone(),
                propensity: ElasticNetPropensityModel::default(),
                n_fold: R_LEARNER_FOLDS,
                seed: METALEARNER_SEED,
                task: self.task,
                fitted: false,
            }),
        }
    }
}

impl fmt::Display for MetalearnerPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.kind, self.implementation())
    }
}

/// Control and treated row indices, after validating the inputs.
fn split_arms(
    x: &Matrix<f64>,
    treatment: &[f64],
    y: &[f64],
    task: TaskType,
) -> Result<(Vec<usize>, Vec<usize>), CausalError> {
    validate_length("treatment", x.rows, treatment.len())?;
    validate_length("outcome", x.rows, y.len())?;
    let mut control = Vec::new();
    let mut treated = Vec::new();
    for (i, t) in treatment.iter().enumerate() {
        if *t == 0.0 {
            control.push(i);
        } else if *t == 1.0 {
            treated.push(i);
        } else {
            return Err(CausalError::InvalidTreatment(format!(
                "treatment must only contain 0 and 1, found {} at row {}",
                t, i
            )));
        }
    }
    if control.is_empty() || treated.is_empty() {
        return Err(CausalError::InvalidTreatment(format!(
            "both arms must be non-empty, found {} control and {} treated rows",
            control.len(),
            treated.len()
        )));
    }
    if task == TaskType::Classification {
        if let Some(bad) = y.iter().find(|v| **v != 0.0 && **v != 1.0) {
            return Err(CausalError::InvalidOutcome(format!(
                "classification outcomes must be 0 or 1, found {}",
                bad
            )));
        }
    }
    Ok((control, treated))
}

fn subset(x: &Matrix<f64>, y: &[f64], rows: &[usize]) -> (Vec<f64>, Vec<f64>) {
    (x.select_rows(rows), rows.iter().map(|&i| y[i]).collect())
}

fn not_fitted<T>(name: &str) -> Result<T, CausalError> {
    Err(CausalError::NotFitted(name.to_string()))
}

/// T-Learner (Two Learners).
///
/// Fits $\mu_0$ on control rows and $\mu_1$ on treated rows,
/// CATE(x) = $\mu_1(x) - \mu_0(x)$.
#[derive(Clone)]
pub struct TLearner {
    pub mu0: Box<dyn Learner>,
    pub mu1: Box<dyn Learner>,
    pub task: TaskType,
    fitted: bool,
}

impl TLearner {
    pub fn fit(&mut self, x: &Matrix<f64>, treatment: &[f64], y: &[f64]) -> Result<(), CausalError> {
        self.fitted = false;
        let (control, treated) = split_arms(x, treatment, y, self.task)?;
        let (x0, y0) = subset(x, y, &control);
        let (x1, y1) = subset(x, y, &treated);
        self.mu0.fit(&Matrix::new(&x0, control.len(), x.cols), &y0, None)?;
        self.mu1.fit(&Matrix::new(&x1, treated.len(), x.cols), &y1, None)?;
        self.fitted = true;
        Ok(())
    }

    pub fn predict(&self, x: &Matrix<f64>) -> Result<Vec<f64>, CausalError> {
        if !self.fitted {
            return not_fitted("TLearner");
        }
        let p1 = self.mu1.predict(x)?;
        let p0 = self.mu0.predict(x)?;
        Ok(p1.iter().zip(p0.iter()).map(|(a, b)| a - b).collect())
    }
}

/// S-Learner (Single Learner).
///
/// Fits $\mu(X, W)$ with the treatment as the last feature,
/// CATE(x) = $\mu(x, 1) - \mu(x, 0)$.
#[derive(Clone)]
pub struct SLearner {
    pub model: Box<dyn Learner>,
    pub task: TaskType,
    fitted: bool,
}

impl SLearner {
    pub fn fit(&mut self, x: &Matrix<f64>, treatment: &[f64], y: &[f64]) -> Result<(), CausalError> {
        self.fitted = false;
        split_arms(x, treatment, y, self.task)?;
        let data = x.append_col(treatment);
        self.model.fit(&Matrix::new(&data, x.rows, x.cols + 1), y, None)?;
        self.fitted = true;
        Ok(())
    }

    pub fn predict(&self, x: &Matrix<f64>) -> Result<Vec<f64>, CausalError> {
        if !self.fitted {
            return not_fitted("SLearner");
        }
        let data_1 = x.append_col(&vec![1.0; x.rows]);
        let mu1 = self.model.predict(&Matrix::new(&data_1, x.rows, x.cols + 1))?;
        let data_0 = x.append_col(&vec![0.0; x.rows]);
        let mu0 = self.model.predict(&Matrix::new(&data_0, x.rows, x.cols + 1))?;
        Ok(mu1.iter().zip(mu0.iter()).map(|(m1, m0)| m1 - m0).collect())
    }
}

/// X-Learner.
///
/// 1. Outcome models $\mu_0$, $\mu_1$ per arm.
/// 2. Imputed effects $D_1 = Y_1 - \mu_0(X_1)$ and $D_0 = \mu_1(X_0) - Y_0$.
/// 3. Effect models $\tau_1$ on $(X_1, D_1)$ and $\tau_0$ on $(X_0, D_0)$.
/// 4. CATE(x) = $p(x)\tau_0(x) + (1 - p(x))\tau_1(x)$ with propensity $p$.
#[derive(Clone)]
pub struct XLearner {
    pub mu0: Box<dyn Learner>,
    pub mu1: Box<dyn Learner>,
    pub tau0: Box<dyn Learner>,
    pub tau1: Box<dyn Learner>,
    pub propensity: ElasticNetPropensityModel,
    pub task: TaskType,
    fitted: bool,
}

impl XLearner {
    pub fn fit(&mut self, x: &Matrix<f64>, treatment: &[f64], y: &[f64]) -> Result<(), CausalError> {
        self.fitted = false;
        let (control, treated) = split_arms(x, treatment, y, self.task)?;
        let (x0_data, y0) = subset(x, y, &control);
        let (x1_data, y1) = subset(x, y, &treated);
        let matrix0 = Matrix::new(&x0_data, control.len(), x.cols);
        let matrix1 = Matrix::new(&x1_data, treated.len(), x.cols);

        self.mu0.fit(&matrix0, &y0, None)?;
        self.mu1.fit(&matrix1, &y1, None)?;

        let mu0_on_1 = self.mu0.predict(&matrix1)?;
        let d1: Vec<f64> = y1.iter().zip(mu0_on_1.iter()).map(|(yi, m)| yi - m).collect();
        let mu1_on_0 = self.mu1.predict(&matrix0)?;
        let d0: Vec<f64> = mu1_on_0.iter().zip(y0.iter()).map(|(m, yi)| m - yi).collect();

        self.tau1.fit(&matrix1, &d1, None)?;
        self.tau0.fit(&matrix0, &d0, None)?;
        self.propensity.fit(x, treatment)?;
        self.fitted = true;
        Ok(())
    }

    pub fn predict(&self, x: &Matrix<f64>) -> Result<Vec<f64>, CausalError> {
        if !self.fitted {
            return not_fitted("XLearner");
        }
        let t0 = self.tau0.predict(x)?;
        let t1 = self.tau1.predict(x)?;
        let p = self.propensity.predict(x)?;
        Ok(t0
            .iter()
            .zip(t1.iter())
            .zip(p.iter())
            .map(|((t0_i, t1_i), p_i)| p_i * t0_i + (1.0 - p_i) * t1_i)
            .collect())
    }
}

/// R-Learner.
///
/// 1. Outcome model $m(x) = E[Y|X]$, predicted out of fold.
/// 2. Propensity model $p(x) = P(W=1|X)$.
/// 3. Effect model fitted on $(Y - m)/(W - p)$ with weights $(W - p)^2$,
///    which minimizes $((Y - m(x)) - \tau(x)(W - p(x)))^2$.
#[derive(Clone)]
pub struct RLearner {
    /// Template copied for every cross fitting fold.
    pub outcome: Box<dyn Learner>,
    pub effect: Box<dyn Learner>,
    pub propensity: ElasticNetPropensityModel,
    pub n_fold: usize,
    pub seed: u64,
    pub task: TaskType,
    fitted: bool,
}

impl RLearner {
    /// Out of fold predictions of the outcome model.
    fn cross_fit_outcome(&self, x: &Matrix<f64>, y: &[f64]) -> Result<Vec<f64>, CausalError> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let folds = kfold_indices(x.rows, self.n_fold.max(2), &mut rng);
        let mut m = vec![0.0; x.rows];
        for test in folds.iter().filter(|f| !f.is_empty()) {
            let train = complement(x.rows, test);
            let (xt, yt) = subset(x, y, &train);
            let mut model = self.outcome.box_clone();
            model.fit(&Matrix::new(&xt, train.len(), x.cols), &yt, None)?;
            let xv = x.select_rows(test);
            let pred = model.predict(&Matrix::new(&xv, test.len(), x.cols))?;
            for (i, p) in test.iter().zip(pred) {
                m[*i] = p;
            }
        }
        Ok(m)
    }

    pub fn fit(&mut self, x: &Matrix<f64>, treatment: &[f64], y: &[f64]) -> Result<(), CausalError> {
        self.fitted = false;
        split_arms(x, treatment, y, self.task)?;
        let p = self.propensity.fit_predict(x, treatment)?;
        let m = self.cross_fit_outcome(x, y)?;
        let (target, weights): (Vec<f64>, Vec<f64>) = y
            .iter()
            .zip(&m)
            .zip(treatment.iter().zip(&p))
            .map(|((yi, mi), (wi, pi))| {
                let r = wi - pi;
                ((yi - mi) / r, r * r)
            })
            .unzip();
        self.effect.fit(x, &target, Some(&weights))?;
        self.fitted = true;
        Ok(())
    }

    pub fn predict(&self, x: &Matrix<f64>) -> Result<Vec<f64>, CausalError> {
        if !self.fitted {
            return not_fitted("RLearner");
        }
        self.effect.predict(x)
    }
}

/// A metalearner of any strategy.
#[derive(Clone)]
pub enum Metalearner {
    T(TLearner),
    S(SLearner),
    X(XLearner),
    R(RLearner),
}

impl Metalearner {
    pub fn plan(&self) -> MetalearnerPlan {
        match self {
            Metalearner::T(m) => select_metalearner(MetalearnerType::TLearner, m.task),
            Metalearner::S(m) => select_metalearner(MetalearnerType::SLearner, m.task),
            Metalearner::X(m) => select_metalearner(MetalearnerType::XLearner, m.task),
            Metalearner::R(m) => select_metalearner(MetalearnerType::RLearner, m.task),
        }
    }

    pub fn is_fitted(&self) -> bool {
        match self {
            Metalearner::T(m) => m.fitted,
            Metalearner::S(m) => m.fitted,
            Metalearner::X(m) => m.fitted,
            Metalearner::R(m) => m.fitted,
        }
    }

    /// Fit all sub-models, replacing any previous state.
    pub fn fit(&mut self, x: &Matrix<f64>, treatment: &[f64], y: &[f64]) -> Result<(), CausalError> {
        match self {
            Metalearner::T(m) => m.fit(x, treatment, y),
            Metalearner::S(m) => m.fit(x, treatment, y),
            Metalearner::X(m) => m.fit(x, treatment, y),
            Metalearner::R(m) => m.fit(x, treatment, y),
        }
    }

    /// One treatment effect estimate per row.
    pub fn predict(&self, x: &Matrix<f64>) -> Result<Vec<f64>, CausalError> {
        match self {
            Metalearner::T(m) => m.predict(x),
            Metalearner::S(m) => m.predict(x),
            Metalearner::X(m) => m.predict(x),
            Metalearner::R(m) => m.predict(x),
        }
    }

    pub fn fit_predict(&mut self, x: &Matrix<f64>, treatment: &[f64], y: &[f64]) -> Result<Vec<f64>, CausalError> {
        self.fit(x, treatment, y)?;
        self.predict(x)
    }
}

impl fmt::Display for Metalearner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.plan())
    }
}
