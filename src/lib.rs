//! An embeddable scripting language over integers and arrays.
//!
//! Source is compiled once into a [`Program`] with a fixed [`FeatureSet`] and
//! can then be run any number of times against a caller supplied [`State`].
//! Runs are bounded by a step budget and never touch the program itself.

use thiserror::Error;

pub mod ast;
pub mod feature;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod program;
pub mod state;

pub use feature::{Feature, FeatureSet};
pub use interpreter::{RandomSource, RunOptions, RuntimeError, SeededRandom, ThreadRandom};
pub use lexer::LexError;
pub use parser::ParseError;
pub use program::{Program, compile, compile_with_features};
pub use state::{State, StateValue};

/// Any failure from compiling or running a program.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Compiles `source` with every feature and runs it once.
pub fn run_source(source: &str, initial: &State, step_budget: i64) -> Result<State> {
    let program = compile(source)?;
    Ok(program.run(initial, step_budget)?)
}

/// Test utilities for enabling logging in tests
#[cfg(test)]
pub(crate) mod test_utils {
    /// Installs a test-writer subscriber. Safe to call from several tests.
    pub fn init_test_logging() {
        use tracing_subscriber::{EnvFilter, fmt};

        let _ = fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
            )
            .with_test_writer()
            .try_init();
    }
}
