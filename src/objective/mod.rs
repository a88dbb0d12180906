//! Objective functions minimized by the gradient booster.
mod log_loss;
mod squared_loss;

pub use log_loss::LogLoss;
pub use squared_loss::SquaredLoss;

use crate::errors::CausalError;
use crate::metric::Metric;
use crate::utils::items_to_strings;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Loss, gradient and hessian of a twice differentiable objective.
///
/// Only [`loss`](ObjectiveFunction::loss) and [`gradient`](ObjectiveFunction::gradient)
/// are required, `initial_value` defaults to the weighted mean of `y` and
/// `default_metric` to `Metric::RootMeanSquaredError`.
pub trait ObjectiveFunction: Send + Sync {
    /// Per-sample loss.
    fn loss(&self, y: &[f64], yhat: &[f64], sample_weight: Option<&[f64]>) -> Vec<f64>;

    /// Per-sample gradient and hessian, with respect to the raw prediction.
    fn gradient(&self, y: &[f64], yhat: &[f64], sample_weight: Option<&[f64]>) -> (Vec<f64>, Vec<f64>);

    /// Initial prediction before any trees are added.
    fn initial_value(&self, y: &[f64], sample_weight: Option<&[f64]>) -> f64 {
        match sample_weight {
            Some(w) => {
                let sw: f64 = w.iter().sum();
                y.iter().zip(w).map(|(yi, wi)| yi * wi).sum::<f64>() / sw
            }
            None => y.iter().sum::<f64>() / y.len() as f64,
        }
    }

    fn default_metric(&self) -> Metric {
        Metric::RootMeanSquaredError
    }
}

/// The objective to minimize during training.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum Objective {
    /// Binary cross entropy on log odds, target `y` must be 0 or 1.
    LogLoss,
    /// Squared error, gradient `yhat - y` and unit hessian.
    SquaredLoss,
}

impl FromStr for Objective {
    type Err = CausalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LogLoss" => Ok(Objective::LogLoss),
            "SquaredLoss" => Ok(Objective::SquaredLoss),
            _ => Err(CausalError::InvalidConfiguration(
                s.to_string(),
                "Objective".to_string(),
                items_to_strings(vec!["LogLoss", "SquaredLoss"]),
            )),
        }
    }
}

macro_rules! dispatch {
    ($self:expr, $method:ident ( $($arg:expr),* )) => {
        match $self {
            Objective::LogLoss => LogLoss::default().$method($($arg),*),
            Objective::SquaredLoss => SquaredLoss::default().$method($($arg),*),
        }
    };
}

impl ObjectiveFunction for Objective {
    fn loss(&self, y: &[f64], yhat: &[f64], sample_weight: Option<&[f64]>) -> Vec<f64> {
        dispatch!(self, loss(y, yhat, sample_weight))
    }

    fn gradient(&self, y: &[f64], yhat: &[f64], sample_weight: Option<&[f64]>) -> (Vec<f64>, Vec<f64>) {
        dispatch!(self, gradient(y, yhat, sample_weight))
    }

    fn initial_value(&self, y: &[f64], sample_weight: Option<&[f64]>) -> f64 {
        dispatch!(self, initial_value(y, sample_weight))
    }

    fn default_metric(&self) -> Metric {
        dispatch!(self, default_metric())
    }
}
