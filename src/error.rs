//! Error types for condition compilation and interning

use thiserror::Error;

/// Condition operation result type
pub type Result<T> = std::result::Result<T, ConditionError>;

/// Condition compilation and interning errors
///
/// Evaluation never produces one of these: a clause that cannot be resolved
/// at match time simply fails.
#[derive(Error, Debug)]
pub enum ConditionError {
    /// Expression contains no clauses
    #[error("Empty condition expression")]
    EmptyExpression,

    /// Clause lacks a usable `=` / `!=` operator
    #[error("Missing operator in clause: {clause:?}")]
    MissingOperator { clause: String },

    /// Clause uses `==`
    #[error("Invalid operator '==' in clause: {clause:?}")]
    DoubleEquals { clause: String },

    /// Group reference used as the left-hand operand
    #[error("Group reference not allowed on the left-hand side: {operand}")]
    GroupOnLeft { operand: String },

    /// Operand is neither a keyword nor a number literal
    #[error("Invalid numeric operand: {operand:?}")]
    InvalidNumber { operand: String },

    /// Range literal with min greater than max
    #[error("Invalid numeric range (min > max): {operand}")]
    InvalidRange { operand: String },

    /// `@name` does not resolve to a known number group
    #[error("Unknown number group: {name}")]
    UnknownGroup { name: String },

    /// Group name contains characters outside printable ASCII
    #[error("Invalid group name: {name:?}")]
    InvalidGroupName { name: String },

    /// More clauses than the 16-bit clause counter can hold
    #[error("Too many clauses in condition expression")]
    TooManyClauses,

    /// More number literals than the 16-bit operand counter can hold
    #[error("Too many numeric operands in condition expression")]
    TooManyNumbers,

    /// Policy memory quota would be exceeded
    #[error("Policy memory quota exceeded: requested {requested} bytes, limit {limit} bytes")]
    QuotaExceeded { requested: usize, limit: usize },

    /// Waiting for the policy lock was interrupted
    #[error("Interrupted while waiting for the policy lock")]
    Interrupted,

    /// Invalid configuration value
    #[error("Configuration error: {0}")]
    Config(String),

    /// TOML decoding error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConditionError {
    pub(crate) fn missing_operator(clause: &str) -> Self {
        ConditionError::MissingOperator {
            clause: clause.to_string(),
        }
    }

    pub(crate) fn invalid_number(operand: &str) -> Self {
        ConditionError::InvalidNumber {
            operand: operand.to_string(),
        }
    }

    /// True for errors caused by malformed expression text
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            ConditionError::EmptyExpression
                | ConditionError::MissingOperator { .. }
                | ConditionError::DoubleEquals { .. }
                | ConditionError::GroupOnLeft { .. }
                | ConditionError::InvalidNumber { .. }
                | ConditionError::InvalidRange { .. }
                | ConditionError::UnknownGroup { .. }
                | ConditionError::InvalidGroupName { .. }
                | ConditionError::TooManyClauses
                | ConditionError::TooManyNumbers
        )
    }
}
