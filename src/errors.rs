//! Errors
//!
//! Custom error types used throughout the `metacausal` crate.
use thiserror::Error;

/// Errors that can occur while preprocessing data, fitting learners
/// or estimating treatment effects.
#[derive(Debug, Error)]
pub enum CausalError {
    /// Unrecognized value for an enumerated option.
    /// First value is what was passed, second is the option name, third is the recognized set.
    #[error("Invalid value {0} passed for {1}, expected one of {2}.")]
    InvalidConfiguration(String, String, String),
    /// First value is the name of the parameter, second is expected, third is what was passed.
    #[error("Invalid parameter value passed for {0}, expected {1} but {2} provided.")]
    InvalidParameter(String, String, String),
    /// A capability was requested that this build does not provide.
    #[error("The {0} capability is not available in this build. {1}")]
    MissingOptionalDependency(String, String),
    /// The number of feature columns differs from what the model was fitted on.
    #[error("Feature matrix has {1} columns, but the model was fitted on {0} columns.")]
    ShapeMismatch(usize, usize),
    /// Two collections that must be aligned row by row have different lengths.
    #[error("Length mismatch for {0}: expected {1}, found {2}.")]
    LengthMismatch(String, usize, usize),
    /// Nearest neighbour matching ran out of candidates.
    #[error("Matching exhausted: {0}")]
    MatchingExhausted(String),
    /// An average was requested over an empty selection of rows.
    #[error("The selection is empty, the average treatment effect is undefined.")]
    EmptySelection,
    /// Column not present in a data frame.
    #[error("Column {0} not found in data frame.")]
    MissingColumn(String),
    /// Column present but of the wrong type.
    #[error("Column {0} has type {1}, expected {2}.")]
    InvalidColumnType(String, String, String),
    /// Column name used twice.
    #[error("Column {0} already exists in data frame.")]
    DuplicateColumn(String),
    /// Treatment vector does not satisfy the binary treatment contract.
    #[error("Invalid treatment: {0}")]
    InvalidTreatment(String),
    /// Outcome vector cannot be used for the requested task.
    #[error("Invalid outcome: {0}")]
    InvalidOutcome(String),
    /// Row index beyond the available rows.
    #[error("Row {0} is out of range for data with {1} rows.")]
    RowOutOfRange(usize, usize),
    /// A model was used before it was fitted.
    #[error("The {0} has not been fitted yet.")]
    NotFitted(String),
    /// Unable to write model to file.
    #[error("Unable to write model to file: {0}")]
    UnableToWrite(String),
    /// Unable to read model from file.
    #[error("Unable to read model from a file {0}")]
    UnableToRead(String),
    /// Failure reported by a user supplied learner.
    #[error("Learner failed: {0}")]
    Learner(String),
}
