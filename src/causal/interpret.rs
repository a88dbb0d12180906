//! Interpret
//!
//! Feature importance and SHAP values of estimated treatment effects. A
//! gradient boosted surrogate is fitted on (X, tau) and explained in place of
//! the metalearner.
use crate::booster::config::ImportanceMethod;
use crate::booster::GradientBooster;
use crate::causal::metalearners::Metalearner;
use crate::data::FeatureMatrix;
use crate::errors::CausalError;
use crate::learner::default_effect_learner;
use crate::utils::{items_to_strings, validate_length};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const BAR_WIDTH: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InterpretMethod {
    FeatureImportance,
    ShapValues,
}

impl FromStr for InterpretMethod {
    type Err = CausalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "feature_importance" => Ok(InterpretMethod::FeatureImportance),
            "shap_values" => Ok(InterpretMethod::ShapValues),
            _ => Err(CausalError::InvalidConfiguration(
                s.to_string(),
                "method".to_string(),
                items_to_strings(vec!["feature_importance", "shap_values"]),
            )),
        }
    }
}

/// Result of [`Metalearner::get_importance`] or [`Metalearner::get_shap_values`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Interpretation {
    /// Normalized importances, sorted in descending order.
    Importance(Vec<(String, f64)>),
    /// Row major SHAP values, one row per observation and one column per feature.
    ShapValues {
        features: Vec<String>,
        values: Vec<Vec<f64>>,
        expected_value: f64,
    },
}

impl Interpretation {
    /// Mean absolute SHAP value per feature, in feature order.
    pub fn mean_abs_shap(&self) -> Option<Vec<(String, f64)>> {
        match self {
            Interpretation::Importance(_) => None,
            Interpretation::ShapValues { features, values, .. } => {
                let n = values.len().max(1) as f64;
                Some(
                    features
                        .iter()
                        .enumerate()
                        .map(|(j, f)| (f.clone(), values.iter().map(|r| r[j].abs()).sum::<f64>() / n))
                        .collect(),
                )
            }
        }
    }

    /// Text bar chart of importances, or of mean absolute SHAP values.
    pub fn plot(&self) -> String {
        let (title, mut bars) = match self {
            Interpretation::Importance(v) => ("feature importance", v.clone()),
            Interpretation::ShapValues { .. } => ("mean(|SHAP value|)", self.mean_abs_shap().unwrap_or_default()),
        };
        bars.sort_by(|a, b| b.1.total_cmp(&a.1));
        let name_width = bars.iter().map(|(n, _)| n.len()).max().unwrap_or(0);
        let max = bars.iter().map(|(_, v)| *v).fold(0.0, f64::max);
        let mut out = format!("{}\n", title);
        for (name, v) in bars {
            let len = if max > 0.0 {
                ((v / max) * BAR_WIDTH as f64).round() as usize
            } else {
                0
            };
            out.push_str(&format!("{:>name_width$} | {} {:.4}\n", name, "#".repeat(len), v));
        }
        out
    }
}

impl fmt::Display for Interpretation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Interpretation::Importance(v) => {
                for (name, value) in v {
                    writeln!(f, "{}: {:.6}", name, value)?;
                }
                Ok(())
            }
            Interpretation::ShapValues {
                features,
                values,
                expected_value,
            } => {
                writeln!(f, "expected value: {:.6}", expected_value)?;
                writeln!(f, "{}", features.join(", "))?;
                for row in values {
                    writeln!(f, "{}", crate::utils::fmt_vec_output(row))?;
                }
                Ok(())
            }
        }
    }
}

fn fit_surrogate(x: &FeatureMatrix, tau: &[f64]) -> Result<GradientBooster, CausalError> {
    validate_length("treatment effect", x.rows, tau.len())?;
    let mut surrogate = default_effect_learner();
    surrogate.fit(&x.view(), tau, None)?;
    Ok(surrogate)
}

impl Metalearner {
    /// Total gain importances of the effect surrogate, normalized to sum to one.
    pub fn get_importance(&self, x: &FeatureMatrix, tau: &[f64]) -> Result<Interpretation, CausalError> {
        let surrogate = fit_surrogate(x, tau)?;
        let importance = surrogate.calculate_feature_importance(ImportanceMethod::TotalGain, true);
        let mut ranked: Vec<(String, f64)> = x
            .names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.clone(), importance.get(&i).copied().unwrap_or(0.0)))
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        Ok(Interpretation::Importance(ranked))
    }

    /// Tree SHAP values of the effect surrogate for every row of `x`.
    pub fn get_shap_values(&self, x: &FeatureMatrix, tau: &[f64]) -> Result<Interpretation, CausalError> {
        let surrogate = fit_surrogate(x, tau)?;
        let contribs = surrogate.predict_contributions(&x.view())?;
        let width = x.cols + 1;
        let expected_value = contribs.get(width - 1).copied().unwrap_or(0.0);
        let values = contribs.chunks(width).map(|c| c[..x.cols].to_vec()).collect();
        Ok(Interpretation::ShapValues {
            features: x.names.clone(),
            values,
            expected_value,
        })
    }
}
