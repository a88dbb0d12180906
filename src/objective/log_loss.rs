//! Log Loss (negative log-likelihood) for binary classification.
use crate::constants::LOGLOSS_HESSIAN_FLOOR;
use crate::metric::Metric;
use crate::objective::ObjectiveFunction;
use crate::utils::odds;
use serde::{Deserialize, Serialize};

#[derive(Default, Debug, Deserialize, Serialize, Clone)]
/// Log Loss (binary cross-entropy) objective.
pub struct LogLoss {}

impl ObjectiveFunction for LogLoss {
    #[inline]
    fn loss(&self, y: &[f64], yhat: &[f64], sample_weight: Option<&[f64]>) -> Vec<f64> {
        y.iter()
            .zip(yhat)
            .enumerate()
            .map(|(i, (y_, yhat_))| {
                let p = odds(*yhat_).clamp(1e-15, 1.0 - 1e-15);
                let l = -(*y_ * p.ln() + (1.0 - *y_) * (1.0 - p).ln());
                sample_weight.map_or(l, |w| l * w[i])
            })
            .collect()
    }

    #[inline]
    fn initial_value(&self, y: &[f64], sample_weight: Option<&[f64]>) -> f64 {
        let (ytot, ntot) = match sample_weight {
            Some(w) => y
                .iter()
                .zip(w)
                .fold((0.0, 0.0), |(yt, nt), (y_, w_)| (yt + y_ * w_, nt + w_)),
            None => (y.iter().sum::<f64>(), y.len() as f64),
        };
        // Keep the base score finite when only one class is present.
        let ytot = ytot.clamp(1e-6 * ntot, ntot - 1e-6 * ntot);
        f64::ln(ytot / (ntot - ytot))
    }

    #[inline]
    fn gradient(&self, y: &[f64], yhat: &[f64], sample_weight: Option<&[f64]>) -> (Vec<f64>, Vec<f64>) {
        let len = y.len();
        let mut g = Vec::with_capacity(len);
        let mut h = Vec::with_capacity(len);
        for i in 0..len {
            let p = odds(yhat[i]);
            let w = sample_weight.map_or(1.0, |w| w[i]);
            g.push((p - y[i]) * w);
            h.push((p * (1.0 - p)).max(LOGLOSS_HESSIAN_FLOOR) * w);
        }
        (g, h)
    }

    fn default_metric(&self) -> Metric {
        Metric::LogLoss
    }
}
