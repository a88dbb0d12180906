//! Learner
//!
//! The contract every base and effect learner of a metalearner satisfies,
//! and the default gradient boosted learners.
use crate::booster::GradientBooster;
use crate::data::Matrix;
use crate::errors::CausalError;
use crate::objective::Objective;
use crate::TaskType;

/// A supervised model that metalearners fit on subsets of the data.
///
/// For classifiers `predict` must return the probability of the positive class,
/// so that metalearners produce probability differences.
pub trait Learner: Send + Sync {
    fn fit(&mut self, x: &Matrix<f64>, y: &[f64], sample_weight: Option<&[f64]>) -> Result<(), CausalError>;

    fn predict(&self, x: &Matrix<f64>) -> Result<Vec<f64>, CausalError>;

    /// Independent copy, fitting the copy never touches `self`.
    fn box_clone(&self) -> Box<dyn Learner>;

    fn is_classifier(&self) -> bool;
}

impl Clone for Box<dyn Learner> {
    fn clone(&self) -> Self {
        self.box_clone()
    }
}

impl Learner for GradientBooster {
    fn fit(&mut self, x: &Matrix<f64>, y: &[f64], sample_weight: Option<&[f64]>) -> Result<(), CausalError> {
        GradientBooster::fit(self, x, y, sample_weight)
    }

    fn predict(&self, x: &Matrix<f64>) -> Result<Vec<f64>, CausalError> {
        GradientBooster::predict(self, x)
    }

    fn box_clone(&self) -> Box<dyn Learner> {
        Box::new(self.clone())
    }

    fn is_classifier(&self) -> bool {
        self.cfg.objective == Objective::LogLoss
    }
}

/// Default outcome learner for a task.
pub fn default_learner(task: TaskType) -> GradientBooster {
    match task {
        TaskType::Classification => GradientBooster::default().set_objective(Objective::LogLoss),
        TaskType::Regression => GradientBooster::default().set_objective(Objective::SquaredLoss),
    }
}

/// Default effect learner, effects are always regressed.
pub fn default_effect_learner() -> GradientBooster {
    GradientBooster::default().set_objective(Objective::SquaredLoss)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_learners() {
        assert!(default_learner(TaskType::Classification).is_classifier());
        assert!(!default_learner(TaskType::Regression).is_classifier());
        assert!(!default_effect_learner().is_classifier());
    }

    #[test]
    fn test_box_clone_is_independent() {
        let x = vec![0.0, 1.0, 2.0, 3.0];
        let data = Matrix::new(&x, 4, 1);
        let base: Box<dyn Learner> = Box::new(default_effect_learner().set_min_child_samples(1));
        let mut copy = base.clone();
        copy.fit(&data, &[0.0, 0.0, 1.0, 1.0], None).unwrap();
        assert!(copy.predict(&data).is_ok());
        assert!(matches!(base.predict(&data), Err(CausalError::NotFitted(_))));
    }
}
