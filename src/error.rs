use std::fmt;

/// Abstract error kinds from the propagation policy: the SQL parser, the
/// parenthetical parser, and the expression parser fail fast; the schema
/// validator never returns one of these (it aggregates into
/// [`crate::validator::ValidationReport`] instead).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CrateError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("syntax error: {0}")]
    Syntax(String),

    #[error("invalid argument: {0}")]
    Argument(String),
}

impl CrateError {
    pub fn invalid_input(context: impl fmt::Display) -> Self {
        CrateError::InvalidInput(context.to_string())
    }

    pub fn syntax(context: impl fmt::Display) -> Self {
        CrateError::Syntax(context.to_string())
    }

    pub fn argument(context: impl fmt::Display) -> Self {
        CrateError::Argument(context.to_string())
    }
}

pub type CrateResult<T> = Result<T, CrateError>;
