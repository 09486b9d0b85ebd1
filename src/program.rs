use std::fmt;

use tracing::debug;

use crate::ast::Block;
use crate::feature::FeatureSet;
use crate::interpreter::{self, RandomSource, RunOptions, RuntimeResult, ThreadRandom};
use crate::parser::{ParseResult, parse_with_features};
use crate::state::State;

/// A compiled program: an immutable syntax tree plus the features it was
/// compiled with. Runs never mutate it, so one `Program` can be shared freely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    body: Block,
    features: FeatureSet,
}

/// Compiles `source` with every optional feature enabled.
pub fn compile(source: &str) -> ParseResult<Program> {
    compile_with_features(source, FeatureSet::ALL)
}

pub fn compile_with_features(source: &str, features: FeatureSet) -> ParseResult<Program> {
    let body = parse_with_features(source, features)?;
    debug!(
        statements = body.statements.len(),
        features = %features,
        "compiled program"
    );
    Ok(Program { body, features })
}

impl Program {
    pub fn body(&self) -> &Block {
        &self.body
    }

    pub fn features(&self) -> FeatureSet {
        self.features
    }

    /// Runs with a step budget; a non-positive budget means unbounded.
    pub fn run(&self, initial: &State, step_budget: i64) -> RuntimeResult<State> {
        self.run_with(
            initial,
            &RunOptions::with_step_budget(step_budget),
            &mut ThreadRandom,
        )
    }

    pub fn run_with(
        &self,
        initial: &State,
        options: &RunOptions,
        random: &mut dyn RandomSource,
    ) -> RuntimeResult<State> {
        debug!(
            variables = initial.len(),
            max_steps = ?options.max_steps,
            "running program"
        );
        let state = interpreter::execute(&self.body, self.features, initial, options, random)?;
        debug!(variables = state.len(), "run complete");
        Ok(state)
    }
}

/// Canonical source text; compiling it again yields an equal program.
impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.body.to_source())
    }
}
