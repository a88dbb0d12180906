//! Booster Configuration
//!
//! Configuration structures and enums used by the [`GradientBooster`](crate::booster::GradientBooster),
//! and the JSON persistence trait shared by boosters and configs.
use crate::constants::{LEARNING_RATE, MAX_BIN, MIN_CHILD_SAMPLES, MIN_CHILD_WEIGHT, NUM_LEAVES, N_ESTIMATORS};
use crate::errors::CausalError;
use crate::metric::Metric;
use crate::objective::Objective;
use crate::utils::{items_to_strings, validate_float_parameter, validate_positive_float_parameter};
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Method to calculate variable importance.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug)]
pub enum ImportanceMethod {
    /// The number of times a feature is used to split the data across all trees.
    Weight,
    /// The average split gain across all splits the feature is used in.
    Gain,
    /// The average coverage across all splits the feature is used in.
    Cover,
    /// The total gain across all splits the feature is used in.
    TotalGain,
    /// The total coverage across all splits the feature is used in.
    TotalCover,
}

impl FromStr for ImportanceMethod {
    type Err = CausalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Weight" => Ok(ImportanceMethod::Weight),
            "Gain" => Ok(ImportanceMethod::Gain),
            "Cover" => Ok(ImportanceMethod::Cover),
            "TotalGain" => Ok(ImportanceMethod::TotalGain),
            "TotalCover" => Ok(ImportanceMethod::TotalCover),
            _ => Err(CausalError::InvalidConfiguration(
                s.to_string(),
                "ImportanceMethod".to_string(),
                items_to_strings(vec!["Weight", "Gain", "Cover", "TotalGain", "TotalCover"]),
            )),
        }
    }
}

/// Deserialize `null` as NaN, serde_json writes NaN as `null`.
pub(crate) fn parse_missing<'de, D>(d: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Deserialize::deserialize(d).map(|x: Option<_>| x.unwrap_or(f64::NAN))
}

fn default_log_iterations() -> usize {
    0
}

/// Configuration for the `GradientBooster`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct BoosterConfig {
    /// Learning objective.
    pub objective: Objective,
    /// Number of boosting rounds.
    pub n_estimators: usize,
    /// Shrinkage applied to every leaf weight.
    pub learning_rate: f64,
    /// Maximum number of leaves per tree.
    pub num_leaves: usize,
    /// Maximum tree depth, unlimited when `None`.
    pub max_depth: Option<usize>,
    /// Minimum number of rows in a leaf.
    pub min_child_samples: usize,
    /// Minimum hessian sum in a leaf.
    pub min_child_weight: f64,
    /// Minimum gain needed to split a node.
    pub min_split_gain: f64,
    /// L1 regularization on leaf weights.
    pub reg_alpha: f64,
    /// L2 regularization on leaf weights.
    pub reg_lambda: f64,
    /// Fraction of rows sampled for every tree.
    pub subsample: f64,
    /// Fraction of columns sampled for every tree.
    pub colsample_bytree: f64,
    /// Maximum number of bins for discretization.
    pub max_bin: u16,
    /// Stop when the evaluation metric has not improved for this many rounds.
    pub early_stopping_rounds: Option<usize>,
    /// Metric used for early stopping, the objective's default when `None`.
    pub eval_metric: Option<Metric>,
    /// Number of threads for parallel tasks.
    pub num_threads: Option<usize>,
    /// Logging frequency (every N iterations).
    #[serde(default = "default_log_iterations")]
    pub log_iterations: usize,
    /// Seed for random number generation.
    pub seed: u64,
}

impl Default for BoosterConfig {
    fn default() -> Self {
        BoosterConfig {
            objective: Objective::SquaredLoss,
            n_estimators: N_ESTIMATORS,
            learning_rate: LEARNING_RATE,
            num_leaves: NUM_LEAVES,
            max_depth: None,
            min_child_samples: MIN_CHILD_SAMPLES,
            min_child_weight: MIN_CHILD_WEIGHT,
            min_split_gain: 0.0,
            reg_alpha: 0.0,
            reg_lambda: 0.0,
            subsample: 1.0,
            colsample_bytree: 1.0,
            max_bin: MAX_BIN,
            early_stopping_rounds: None,
            eval_metric: None,
            num_threads: None,
            log_iterations: 0,
            seed: 0,
        }
    }
}

impl BoosterConfig {
    pub fn validate_parameters(&self) -> Result<(), CausalError> {
        if self.n_estimators == 0 {
            return Err(CausalError::InvalidParameter(
                "n_estimators".to_string(),
                "positive integer".to_string(),
                "0".to_string(),
            ));
        }
        if self.num_leaves < 2 {
            return Err(CausalError::InvalidParameter(
                "num_leaves".to_string(),
                "integer of at least 2".to_string(),
                self.num_leaves.to_string(),
            ));
        }
        validate_float_parameter(self.learning_rate, f64::MIN_POSITIVE, f64::INFINITY, "learning_rate")?;
        validate_positive_float_parameter(self.min_child_weight, "min_child_weight")?;
        validate_positive_float_parameter(self.min_split_gain, "min_split_gain")?;
        validate_positive_float_parameter(self.reg_alpha, "reg_alpha")?;
        validate_positive_float_parameter(self.reg_lambda, "reg_lambda")?;
        validate_float_parameter(self.subsample, f64::MIN_POSITIVE, 1.0, "subsample")?;
        validate_float_parameter(self.colsample_bytree, f64::MIN_POSITIVE, 1.0, "colsample_bytree")?;
        Ok(())
    }
}

/// IO
pub trait BoosterIO: Serialize + DeserializeOwned + Sized {
    /// Save a booster as a json object to a file.
    ///
    /// * `path` - Path to save booster.
    fn save_booster<P: AsRef<Path>>(&self, path: P) -> Result<(), CausalError> {
        fs::write(path, self.json_dump()?).map_err(|e| CausalError::UnableToWrite(e.to_string()))
    }

    /// Dump a booster as a json object
    fn json_dump(&self) -> Result<String, CausalError> {
        serde_json::to_string(self).map_err(|e| CausalError::UnableToWrite(e.to_string()))
    }

    /// Load a booster from Json string
    ///
    /// * `json_str` - String object, which can be serialized to json.
    fn from_json(json_str: &str) -> Result<Self, CausalError> {
        serde_json::from_str::<Self>(json_str).map_err(|e| CausalError::UnableToRead(e.to_string()))
    }

    /// Load a booster from a path to a json booster object.
    ///
    /// * `path` - Path to load booster from.
    fn load_booster<P: AsRef<Path>>(path: P) -> Result<Self, CausalError> {
        let json_str = fs::read_to_string(path).map_err(|e| CausalError::UnableToRead(e.to_string()))?;
        Self::from_json(&json_str)
    }
}

impl BoosterIO for BoosterConfig {}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_booster_config_default() {
        let config = BoosterConfig::default();
        assert_eq!(config.n_estimators, 100);
        assert_eq!(config.num_leaves, 31);
        assert_eq!(config.max_bin, 255);
        assert!(config.validate_parameters().is_ok());
    }

    #[test]
    fn test_booster_config_validation() {
        let config = BoosterConfig {
            subsample: 1.5,
            ..BoosterConfig::default()
        };
        assert!(matches!(config.validate_parameters(), Err(CausalError::InvalidParameter(..))));
        let config = BoosterConfig {
            num_leaves: 1,
            ..BoosterConfig::default()
        };
        assert!(config.validate_parameters().is_err());
    }

    #[test]
    fn test_booster_io_json() {
        let config = BoosterConfig {
            early_stopping_rounds: Some(30),
            eval_metric: Some(Metric::AUC),
            ..BoosterConfig::default()
        };
        let json = config.json_dump().unwrap();
        let config2 = BoosterConfig::from_json(&json).unwrap();
        assert_eq!(config, config2);
    }

    #[test]
    fn test_booster_io_file() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("booster.json");
        let config = BoosterConfig::default();
        config.save_booster(&file_path).unwrap();
        let config2 = BoosterConfig::load_booster(&file_path).unwrap();
        assert_eq!(config, config2);
        assert!(matches!(
            BoosterConfig::load_booster(dir.path().join("missing.json")),
            Err(CausalError::UnableToRead(_))
        ));
    }

    #[test]
    fn test_importance_method_parse() {
        assert_eq!("TotalGain".parse::<ImportanceMethod>().unwrap(), ImportanceMethod::TotalGain);
        assert!("gain".parse::<ImportanceMethod>().is_err());
    }
}
