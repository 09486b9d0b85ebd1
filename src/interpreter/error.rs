use thiserror::Error;

/// Failures raised while a program runs. Every variant aborts the run.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("Division by zero")]
    DivisionByZero,
    #[error("Execution budget of {budget} steps exceeded")]
    ExecutionBudgetExceeded { budget: u64 },
    #[error("Function '{name}' expected {expected} arguments, got {found}")]
    FunctionArityMismatch {
        name: String,
        expected: usize,
        found: usize,
    },
    #[error("Maximum call depth of {max_depth} exceeded")]
    CallDepthExceeded { max_depth: usize },
    #[error("Operation '{operation}' expected an integer, got {got}")]
    ExpectedInteger { operation: String, got: String },
    #[error("Indexing expected an array, got {got}")]
    ExpectedArray { got: String },
    #[error("Array index must be non-negative, got {index}")]
    NegativeIndex { index: i64 },
    #[error("Array index {index} exceeds the maximum of {max}")]
    IndexOutOfRange { index: i64, max: usize },
    #[error("Array nesting exceeds maximum of {max_depth} levels")]
    ArrayNestingExceeded { max_depth: usize },
    #[error("Undefined function '{name}'")]
    UndefinedFunction { name: String },
    #[error("Function '{name}' can only be called, not used as a value")]
    FunctionNotAValue { name: String },
    #[error("Internal interpreter error: {message}")]
    Internal { message: String },
}

pub type RuntimeResult<T> = Result<T, RuntimeError>;
