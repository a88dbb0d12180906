//! Sensitivity
//!
//! Robustness checks of an estimated average treatment effect. Every method
//! perturbs the data, refits a fresh metalearner from the same plan and
//! compares the new ATE to what it should be.
use crate::causal::metalearners::MetalearnerPlan;
use crate::constants::CONFIDENCE_Z;
use crate::data::{FeatureMatrix, Matrix};
use crate::errors::CausalError;
use crate::learner::Learner;
use crate::utils::{items_to_strings, mean, standard_normal, std_dev, validate_float_parameter, validate_length};
use log::info;
use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SensitivityMethod {
    /// Replace the treatment with a random assignment, the ATE should vanish.
    PlaceboTreatment,
    /// Add an irrelevant random covariate, the ATE should not change.
    RandomCause,
    /// Refit on a random subset of the rows, the ATE should not change.
    SubsetData,
    /// Replace a random covariate with noise, the ATE should not change.
    RandomReplace,
}

impl SensitivityMethod {
    pub const ALL: [SensitivityMethod; 4] = [
        SensitivityMethod::PlaceboTreatment,
        SensitivityMethod::RandomCause,
        SensitivityMethod::SubsetData,
        SensitivityMethod::RandomReplace,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SensitivityMethod::PlaceboTreatment => "Placebo Treatment",
            SensitivityMethod::RandomCause => "Random Cause",
            SensitivityMethod::SubsetData => "Subset Data",
            SensitivityMethod::RandomReplace => "Random Replace",
        }
    }

    /// The ATE a robust estimate should reproduce.
    pub fn desired_ate(&self, ate: f64) -> f64 {
        match self {
            SensitivityMethod::PlaceboTreatment => 0.0,
            _ => ate,
        }
    }
}

impl FromStr for SensitivityMethod {
    type Err = CausalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SensitivityMethod::ALL.into_iter().find(|m| m.name() == s).ok_or_else(|| {
            CausalError::InvalidConfiguration(
                s.to_string(),
                "SensitivityMethod".to_string(),
                items_to_strings(SensitivityMethod::ALL.iter().map(|m| m.name()).collect()),
            )
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityRow {
    pub method: SensitivityMethod,
    pub ate: f64,
    pub new_ate: f64,
    pub new_ate_lb: f64,
    pub new_ate_ub: f64,
    /// Distance from desired, `new_ate - 0` for the placebo and `new_ate - ate` otherwise.
    pub distance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityReport {
    pub rows: Vec<SensitivityRow>,
}

impl SensitivityReport {
    pub fn get(&self, method: SensitivityMethod) -> Option<&SensitivityRow> {
        self.rows.iter().find(|r| r.method == method)
    }
}

impl fmt::Display for SensitivityReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<18} {:>10} {:>10} {:>10} {:>10} {:>12}",
            "Method", "ATE", "New ATE", "New ATE LB", "New ATE UB", "Distance"
        )?;
        for r in &self.rows {
            writeln!(
                f,
                "{:<18} {:>10.4} {:>10.4} {:>10.4} {:>10.4} {:>12.4}",
                r.method.name(),
                r.ate,
                r.new_ate,
                r.new_ate_lb,
                r.new_ate_ub,
                r.distance
            )?;
        }
        Ok(())
    }
}

/// Mean effect and its normal confidence bounds.
pub fn ate_with_interval(tau: &[f64]) -> (f64, f64, f64) {
    let ate = mean(tau);
    let se = std_dev(tau, 1) / (tau.len() as f64).sqrt();
    (ate, ate - CONFIDENCE_Z * se, ate + CONFIDENCE_Z * se)
}

pub struct Sensitivity<'a> {
    pub plan: MetalearnerPlan,
    pub learner: &'a dyn Learner,
    pub effect_learner: &'a dyn Learner,
    pub x: &'a FeatureMatrix,
    pub treatment: &'a [f64],
    pub y: &'a [f64],
    pub seed: u64,
    /// Log which column the random replace check overwrites.
    pub verbose: bool,
}

impl<'a> Sensitivity<'a> {
    pub fn new(
        plan: MetalearnerPlan,
        learner: &'a dyn Learner,
        effect_learner: &'a dyn Learner,
        x: &'a FeatureMatrix,
        treatment: &'a [f64],
        y: &'a [f64],
        seed: u64,
    ) -> Result<Self, CausalError> {
        validate_length("treatment", x.rows, treatment.len())?;
        validate_length("outcome", x.rows, y.len())?;
        Ok(Sensitivity {
            plan,
            learner,
            effect_learner,
            x,
            treatment,
            y,
            seed,
            verbose: false,
        })
    }

    pub fn set_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Fit a fresh metalearner and estimate the ATE with its interval.
    fn estimate(&self, x: &Matrix<f64>, treatment: &[f64], y: &[f64]) -> Result<(f64, f64, f64), CausalError> {
        let mut model = self.plan.build(self.learner, self.effect_learner);
        let tau = model.fit_predict(x, treatment, y)?;
        Ok(ate_with_interval(&tau))
    }

    fn run(&self, method: SensitivityMethod, sample_size: f64, seed: u64) -> Result<(f64, f64, f64), CausalError> {
        let mut rng = StdRng::seed_from_u64(seed);
        let n = self.x.rows;
        match method {
            SensitivityMethod::PlaceboTreatment => {
                let placebo: Vec<f64> = (0..n).map(|_| if rng.gen_bool(0.5) { 1.0 } else { 0.0 }).collect();
                self.estimate(&self.x.view(), &placebo, self.y)
            }
            SensitivityMethod::RandomCause => {
                let noise: Vec<f64> = (0..n).map(|_| standard_normal(&mut rng)).collect();
                let data = self.x.view().append_col(&noise);
                self.estimate(&Matrix::new(&data, n, self.x.cols + 1), self.treatment, self.y)
            }
            SensitivityMethod::SubsetData => {
                let size = ((n as f64) * sample_size).round().max(1.0) as usize;
                let mut rows = sample(&mut rng, n, size.min(n)).into_vec();
                rows.sort_unstable();
                let sub = self.x.select_rows(&rows);
                let t: Vec<f64> = rows.iter().map(|&i| self.treatment[i]).collect();
                let y: Vec<f64> = rows.iter().map(|&i| self.y[i]).collect();
                self.estimate(&sub.view(), &t, &y)
            }
            SensitivityMethod::RandomReplace => {
                let mut replaced = self.x.clone();
                if replaced.cols > 0 {
                    let col = rng.gen_range(0..replaced.cols);
                    if self.verbose {
                        info!("Random Replace: replacing {} with noise", replaced.names[col]);
                    }
                    for v in replaced.get_col_mut(col) {
                        *v = standard_normal(&mut rng);
                    }
                }
                self.estimate(&replaced.view(), self.treatment, self.y)
            }
        }
    }

    /// Run the methods in order and compare with the reference `ate`.
    ///
    /// * `sample_size` - Fraction of rows kept by `SubsetData`, in (0, 1].
    pub fn sensitivity_analysis(
        &self,
        methods: &[SensitivityMethod],
        ate: f64,
        sample_size: f64,
    ) -> Result<SensitivityReport, CausalError> {
        validate_float_parameter(sample_size, f64::MIN_POSITIVE, 1.0, "sample_size")?;
        let rows = methods
            .par_iter()
            .enumerate()
            .map(|(i, method)| {
                let (new_ate, new_ate_lb, new_ate_ub) = self.run(*method, sample_size, self.seed + i as u64)?;
                Ok(SensitivityRow {
                    method: *method,
                    ate,
                    new_ate,
                    new_ate_lb,
                    new_ate_ub,
                    distance: new_ate - method.desired_ate(ate),
                })
            })
            .collect::<Result<Vec<_>, CausalError>>()?;
        Ok(SensitivityReport { rows })
    }
}
