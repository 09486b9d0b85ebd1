//! Tree-walking evaluator.
//!
//! Execution pipeline:
//! execute -> exec_block (top-level statements) -> exec_statement
//! -> eval_expression -> call_function -> exec_block (function body).
//!
//! Every piece of mutable state (scopes, step counter, random source) lives in
//! an [`InterpreterRuntime`] built for one run, so a compiled program can be
//! run from several threads at once.

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::ast::Block;
use crate::feature::FeatureSet;
use crate::state::State;

mod error;
mod random;
mod runtime;
mod scope;
mod value;

pub use error::{RuntimeError, RuntimeResult};
pub use random::{RANDOM_VARIABLE, RandomSource, SeededRandom, ThreadRandom};
use runtime::{ExecResult, InterpreterRuntime};
use scope::Scopes;
use value::Value;

pub const DEFAULT_MAX_CALL_DEPTH: usize = 1000;
pub const DEFAULT_MAX_ARRAY_INDEX: usize = 1 << 20;

/// Limits applied to a single run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Maximum number of node evaluations; `None` is unbounded.
    pub max_steps: Option<u64>,
    pub max_call_depth: usize,
    /// Largest index an array write may use. Reads are never bounded.
    pub max_array_index: usize,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            max_steps: None,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            max_array_index: DEFAULT_MAX_ARRAY_INDEX,
        }
    }
}

impl RunOptions {
    /// A non-positive budget means unbounded.
    pub fn with_step_budget(budget: i64) -> Self {
        Self {
            max_steps: u64::try_from(budget).ok().filter(|steps| *steps > 0),
            ..Self::default()
        }
    }
}

/// Runs `body` against `initial` and returns the final global mapping.
pub(crate) fn execute<'r>(
    body: &Block,
    features: FeatureSet,
    initial: &State,
    options: &'r RunOptions,
    random: &'r mut dyn RandomSource,
) -> RuntimeResult<State> {
    let globals = initial
        .iter()
        .map(|(name, value)| (name.clone(), Value::from_state(value)))
        .collect::<FxHashMap<_, _>>();
    let random = features.contains(FeatureSet::RANDOM_VAR).then_some(random);

    let mut runtime = InterpreterRuntime {
        scopes: Scopes::new(globals),
        options,
        random,
        steps: 0,
    };
    // A top-level `return` ends the program early; its value stays in `return`.
    let outcome = runtime.exec_block(body)?;
    debug!(
        steps = runtime.steps,
        returned = outcome == ExecResult::Returned,
        "program finished"
    );

    let state = runtime
        .scopes
        .into_globals()
        .into_iter()
        .filter_map(|(name, value)| value.to_state().map(|value| (name, value)))
        .collect();
    Ok(state)
}
