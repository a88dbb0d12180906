//! Squared Loss function for regression.
use crate::objective::ObjectiveFunction;
use serde::{Deserialize, Serialize};

#[derive(Default, Debug, Deserialize, Serialize, Clone)]
/// Squared Error loss, minimizes `(y - ŷ)²`.
pub struct SquaredLoss {}

impl ObjectiveFunction for SquaredLoss {
    #[inline]
    fn loss(&self, y: &[f64], yhat: &[f64], sample_weight: Option<&[f64]>) -> Vec<f64> {
        match sample_weight {
            Some(sample_weight) => y
                .iter()
                .zip(yhat)
                .zip(sample_weight)
                .map(|((y_, yhat_), w_)| {
                    let s = *y_ - *yhat_;
                    s * s * *w_
                })
                .collect(),
            None => y
                .iter()
                .zip(yhat)
                .map(|(y_, yhat_)| {
                    let s = *y_ - *yhat_;
                    s * s
                })
                .collect(),
        }
    }

    #[inline]
    fn gradient(&self, y: &[f64], yhat: &[f64], sample_weight: Option<&[f64]>) -> (Vec<f64>, Vec<f64>) {
        match sample_weight {
            Some(w) => {
                let g = (0..y.len()).map(|i| (yhat[i] - y[i]) * w[i]).collect();
                (g, w.to_vec())
            }
            None => {
                let g = (0..y.len()).map(|i| yhat[i] - y[i]).collect();
                (g, vec![1.0; y.len()])
            }
        }
    }
}
