use std::fs;
use std::io::{self, Read};

use anyhow::{Context, Result, bail};
use littlelang::{RunOptions, State, ThreadRandom, compile};
use tracing_subscriber::{EnvFilter, fmt};

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("warn"))?;
    fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    let mut args = std::env::args().skip(1);
    let mut options = RunOptions::default();
    let mut input_path: Option<String> = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--max-steps" => {
                let value = args
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("Missing step count after {arg}"))?;
                let budget = value
                    .parse::<i64>()
                    .with_context(|| format!("Invalid step count '{value}'"))?;
                options = RunOptions::with_step_budget(budget);
            }
            _ => {
                input_path = Some(arg);
                if args.next().is_some() {
                    bail!("Only one input file is supported");
                }
                break;
            }
        }
    }

    let source = if let Some(path) = input_path {
        fs::read_to_string(&path).with_context(|| format!("Reading {path}"))?
    } else {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("Reading stdin")?;
        buffer
    };

    let program = compile(&source).context("Compiling program")?;
    let state = program
        .run_with(&State::new(), &options, &mut ThreadRandom)
        .context("Running program")?;
    print!("{}", render_table(&state));
    Ok(())
}

/// Two-column table of the final state, sorted by name.
fn render_table(state: &State) -> String {
    let rows = state
        .iter()
        .map(|(name, value)| (name.as_str(), value.to_string()))
        .collect::<Vec<_>>();
    let width = rows
        .iter()
        .map(|(name, _)| name.len())
        .chain(["Name".len()])
        .max()
        .unwrap_or(0);

    let mut out = format!("{:<width$} | Value\n", "Name");
    for (name, value) in rows {
        out.push_str(&format!("{name:<width$} | {value}\n"));
    }
    out
}
