//! Causal Inference Configuration
//!
//! Configuration of the [`CausalInferenceModel`](crate::model::CausalInferenceModel),
//! fixed once the model is constructed.
use crate::booster::config::BoosterIO;
use crate::causal::metalearners::MetalearnerType;
use crate::constants::TREATMENT_EFFECT_COL;
use crate::errors::CausalError;
use crate::preprocessing::TextOptions;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CausalConfig {
    /// Binary treatment column.
    pub treatment_col: String,
    /// Outcome column, binary outcomes make a classification task.
    pub outcome_col: String,
    /// Optional free text column, vectorized with TF-IDF.
    pub text_col: Option<String>,
    /// Restrict covariates to these columns when non-empty.
    pub include_cols: Vec<String>,
    /// Columns never used as covariates.
    pub ignore_cols: Vec<String>,
    /// Name of the column the estimated effects are written to.
    pub treatment_effect_col: String,
    pub metalearner_type: MetalearnerType,
    /// Treatment value of the control group, 0 or 1.
    pub control_value: f64,
    pub text_options: TextOptions,
    /// Log progress and timings.
    pub verbose: bool,
}

impl BoosterIO for CausalConfig {}

impl CausalConfig {
    pub fn new(treatment_col: &str, outcome_col: &str) -> Self {
        CausalConfig {
            treatment_col: treatment_col.to_string(),
            outcome_col: outcome_col.to_string(),
            text_col: None,
            include_cols: Vec::new(),
            ignore_cols: Vec::new(),
            treatment_effect_col: TREATMENT_EFFECT_COL.to_string(),
            metalearner_type: MetalearnerType::TLearner,
            control_value: 0.0,
            text_options: TextOptions::default(),
            verbose: true,
        }
    }

    pub fn validate_parameters(&self) -> Result<(), CausalError> {
        if self.control_value != 0.0 && self.control_value != 1.0 {
            return Err(CausalError::InvalidParameter(
                "control_value".to_string(),
                "0 or 1".to_string(),
                self.control_value.to_string(),
            ));
        }
        let reserved = [Some(&self.treatment_col), Some(&self.outcome_col), self.text_col.as_ref()];
        if reserved.iter().flatten().any(|c| **c == self.treatment_effect_col) {
            return Err(CausalError::InvalidParameter(
                "treatment_effect_col".to_string(),
                "a name different from the treatment, outcome and text columns".to_string(),
                self.treatment_effect_col.clone(),
            ));
        }
        self.text_options.validate()
    }
}
