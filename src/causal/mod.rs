//! Causal
//!
//! Treatment effect estimation with metalearners (T-, S-, X- and R-learner),
//! together with the propensity model, nearest neighbour matching, sensitivity
//! analysis and interpretation built around them.
pub mod interpret;
pub mod matching;
pub mod metalearners;
pub mod propensity;
pub mod sensitivity;

mod tests;
