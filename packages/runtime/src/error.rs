use thiserror::Error;

pub type EvalResult<T> = Result<T, EvalError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("Syntax error at {pos}: {message}")]
    Syntax { pos: usize, message: String },

    #[error("Unterminated tag starting at {pos}")]
    UnterminatedTag { pos: usize },

    #[error("Block `{keyword}` opened at {pos} is never closed")]
    UnclosedBlock { keyword: String, pos: usize },

    #[error("Variable '{name}' not found")]
    VariableNotFound { name: String },

    #[error("Unknown function '{name}'")]
    UnknownFunction { name: String },

    #[error("Invalid operands for operator {operator}: {details}")]
    InvalidOperands { operator: String, details: String },

    #[error("Type error: {message}")]
    TypeError { message: String },

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Loop exceeded {limit} iterations")]
    LoopLimit { limit: usize },
}

impl EvalError {
    pub fn syntax(pos: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            pos,
            message: message.into(),
        }
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        Self::TypeError {
            message: message.into(),
        }
    }

    pub fn invalid_operands(operator: impl Into<String>, details: impl Into<String>) -> Self {
        Self::InvalidOperands {
            operator: operator.into(),
            details: details.into(),
        }
    }
}
