//! Causal Inference Model
//!
//! Orchestrates preprocessing, metalearner selection and the analyses run on a
//! fitted model.
pub mod analysis;
pub mod config;
pub mod core;

mod setters;

pub use self::analysis::{AteEstimate, MatchedSample};
pub use self::config::CausalConfig;
pub use self::core::CausalInferenceModel;
