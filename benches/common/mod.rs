#![allow(dead_code)]
use std::path::Path;

use littlelang::{State, StateValue, compile};
use littlelang::program::Program;
use test_support::{FixtureValue, bench_cases};

/// A fixture case that opted into benchmarking.
pub struct Workload {
    pub label: String,
    pub source: String,
    pub initial: State,
}

impl Workload {
    pub fn program(&self) -> Program {
        compile(&self.source).unwrap_or_else(|err| panic!("compile {}: {err}", self.label))
    }
}

fn to_state_value(value: &FixtureValue) -> StateValue {
    match value {
        FixtureValue::Int(value) => StateValue::Int(*value),
        FixtureValue::List(items) => StateValue::List(items.iter().map(to_state_value).collect()),
    }
}

pub fn workloads() -> Vec<Workload> {
    let cases = bench_cases(Path::new("tests/programs"))
        .unwrap_or_else(|err| panic!("load bench cases: {err:#}"));
    cases
        .into_iter()
        .map(|case| {
            let source = case
                .read_source()
                .unwrap_or_else(|err| panic!("read {}: {err:#}", case.name));
            let initial = case
                .spec
                .initial
                .iter()
                .map(|(name, value)| (name.clone(), to_state_value(value)))
                .collect();
            Workload {
                label: format!("{}_{}", case.name, case.spec.bench.tags.join("_")),
                source,
                initial,
            }
        })
        .collect()
}
