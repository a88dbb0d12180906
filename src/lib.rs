mod node;
mod shapley;

// Modules
pub mod binning;
pub mod booster;
pub mod causal;
pub mod constants;
pub mod data;
pub mod errors;
pub mod explain;
pub mod frame;
pub mod histogram;
pub mod learner;
pub mod metric;
pub mod model;
pub mod objective;
pub mod preprocessing;
pub mod sampler;
pub mod splitter;
pub mod tree;
pub mod tuning;
pub mod utils;

// Individual classes, and functions
pub use booster::GradientBooster;
pub use causal::interpret::{InterpretMethod, Interpretation};
pub use causal::metalearners::{select_metalearner, Metalearner, MetalearnerPlan, MetalearnerType, TaskType};
pub use causal::sensitivity::{SensitivityMethod, SensitivityReport};
pub use data::{FeatureMatrix, Matrix};
pub use errors::CausalError;
pub use explain::Explanation;
pub use frame::{Column, DataFrame};
pub use learner::Learner;
pub use model::{AteEstimate, CausalConfig, CausalInferenceModel, MatchedSample};
pub use preprocessing::{DataframePreprocessor, TextOptions};
pub use tuning::{Scoring, SearchResult, TuningOptions};
