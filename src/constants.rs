// Booster defaults
pub const N_ESTIMATORS: usize = 100;
pub const LEARNING_RATE: f64 = 0.1;
pub const NUM_LEAVES: usize = 31;
pub const MIN_CHILD_SAMPLES: usize = 20;
pub const MIN_CHILD_WEIGHT: f64 = 1e-3;
pub const MAX_BIN: u16 = 255;
pub const LOGLOSS_HESSIAN_FLOOR: f64 = 1e-16;

// Propensity and matching
pub const PROPENSITY_CLIP: f64 = 1e-3;
pub const PROPENSITY_FOLDS: usize = 3;
pub const PROPENSITY_SEED: u64 = 42;
pub const PROPENSITY_MAX_ITER: usize = 500;
pub const PROPENSITY_TOL: f64 = 1e-6;
pub const MATCHING_SEED: u64 = 423;

// Metalearners
pub const R_LEARNER_FOLDS: usize = 5;
pub const METALEARNER_SEED: u64 = 42;

// Explain
pub const BACKGROUND_SIZE: usize = 50;
pub const N_SAMPLES: usize = 500;
pub const EXPLAIN_SEED: u64 = 42;

// Tuning
pub const TUNING_SEED: u64 = 314;
pub const TUNING_SPLIT_PCT: f64 = 0.2;
pub const TUNING_N_ITER: usize = 100;
pub const TUNING_CV_FOLDS: usize = 3;
pub const TUNING_EARLY_STOPPING_ROUNDS: usize = 30;
pub const TUNING_N_ESTIMATORS: usize = 5000;

// Sensitivity
pub const CONFIDENCE_Z: f64 = 1.959963984540054;
pub const SENSITIVITY_SEED: u64 = 42;

pub const TREATMENT_EFFECT_COL: &str = "treatment_effect";
pub const TEXT_FEATURE_PREFIX: &str = "v_";
