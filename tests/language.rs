use std::thread;

use indoc::indoc;
use littlelang::state::state;
use littlelang::{
    Error, Feature, FeatureSet, ParseError, RunOptions, RuntimeError, SeededRandom, State,
    StateValue, compile, compile_with_features, run_source,
};
use pretty_assertions::assert_eq;

fn ints(entries: &[(&str, i64)]) -> State {
    state(entries.iter().map(|(name, value)| (*name, *value)))
}

fn run(source: &str, initial: State) -> State {
    run_source(source, &initial, 0).unwrap_or_else(|err| panic!("{source:?} failed: {err}"))
}

#[test]
fn modulo_by_zero_fails() {
    let err = run_source("a = 6\nb = 0\nc = a % b", &State::new(), 0).expect_err("expected failure");
    assert_eq!(err, Error::Runtime(RuntimeError::DivisionByZero));
}

#[test]
fn multiplies_globals() {
    assert_eq!(
        run("a = 50\nb = 43\nc = a * b", State::new()),
        ints(&[("a", 50), ("b", 43), ("c", 2150)])
    );
}

#[test]
fn fills_an_array_in_a_loop() {
    let output = run(
        "for i=0; i<10; i=i+1 {a[i]=i}",
        state([("a", StateValue::List(vec![]))]),
    );
    assert_eq!(
        output,
        state([
            ("a", StateValue::from((0..10).collect::<Vec<i64>>())),
            ("i", StateValue::Int(10)),
        ])
    );
}

#[test]
fn computes_fibonacci_recursively() {
    let source = "func fib(n){ if n is 0 { return 0 } if n is 1 { return 1 } return fib(n-1)+fib(n-2) } d = fib(13)";
    assert_eq!(run(source, State::new()), ints(&[("d", 233)]));
}

#[test]
fn empty_blocks_are_no_ops() {
    assert_eq!(
        run("if a is 1 { } else { }", ints(&[("a", 2)])),
        ints(&[("a", 2)])
    );
}

#[test]
fn parameter_writes_alias_existing_globals() {
    assert_eq!(
        run("func f(a){ a = a + 1 } f(10)", ints(&[("a", 4)])),
        ints(&[("a", 11)])
    );
    assert_eq!(
        run("x=0 func test(x) { x = x + 1} test(2)", State::new()),
        ints(&[("x", 3)])
    );
}

#[test]
fn function_temporaries_do_not_leak() {
    assert_eq!(
        run("func f(){ return 5 } d = f()", State::new()),
        ints(&[("d", 5)])
    );
}

#[test]
fn nested_calls_see_caller_locals() {
    let source = indoc! {"
        func leaf(n) { return n + depth }
        func branch(depth) { return leaf(1) }
        a = branch(10)
        b = leaf(1)
    "};
    assert_eq!(run(source, State::new()), ints(&[("a", 11), ("b", 1)]));
}

#[test]
fn loops_with_omitted_parts() {
    assert_eq!(
        run("x = 0 for ;x < 10; {x = x + 1}", State::new()),
        ints(&[("x", 10)])
    );
}

#[test]
fn step_budget_stops_runaway_programs() {
    let program = compile("x = 0 for ; 1 ; { x = x + 1 }").expect("compile failed");
    for budget in [1_i64, 10, 1000] {
        let err = program.run(&State::new(), budget).expect_err("expected budget failure");
        assert_eq!(
            err,
            RuntimeError::ExecutionBudgetExceeded {
                budget: budget as u64
            }
        );
    }
}

#[test]
fn step_budget_counts_every_node() {
    // One block, one statement and one literal.
    let program = compile("x = 1").expect("compile failed");
    assert!(program.run(&State::new(), 3).is_ok());
    assert!(program.run(&State::new(), 2).is_err());
}

#[test]
fn overlong_expressions_fail_to_compile_cleanly() {
    let source = format!("x = 1{}", " + 1".repeat(99_999));
    let err = compile(&source).expect_err("expected nesting failure");
    assert!(matches!(err, ParseError::Syntax { .. }));
    assert!(err.to_string().contains("Nesting depth exceeds"), "{err}");

    let source = format!("x = 1{}", " + 1".repeat(199));
    let program = compile(&source).expect("compile failed");
    assert_eq!(
        program.run(&State::new(), 0).expect("run failed"),
        ints(&[("x", 200)])
    );
    drop(program);
}

#[test]
fn recursion_deeper_than_a_few_hundred_calls_succeeds() {
    let source = indoc! {"
        func sum(n) { if n is 0 { return 0 } return n + sum(n - 1) }
        total = sum(500)
    "};
    assert_eq!(run(source, State::new()), ints(&[("total", 125_250)]));
}

#[test]
fn reads_past_the_written_slots_yield_zero() {
    let output = run(
        "a = [5]\nx = a[3]\ny = a[5000000]",
        State::new(),
    );
    assert_eq!(
        output,
        state([
            ("a", StateValue::from(vec![5_i64])),
            ("x", StateValue::Int(0)),
            ("y", StateValue::Int(0)),
        ])
    );
}

#[test]
fn floor_division_laws_hold_over_a_grid() {
    let program = compile("q = a / b\nr = a % b").expect("compile failed");
    let values = [-17_i64, -9, -4, -1, 0, 1, 3, 8, 25, i64::MAX, i64::MIN];
    for a in values {
        for b in values {
            let initial = ints(&[("a", a), ("b", b)]);
            let result = program.run(&initial, 0);
            if b == 0 {
                assert_eq!(result, Err(RuntimeError::DivisionByZero));
                continue;
            }
            let output = result.expect("run failed");
            let q = output["q"].as_int().expect("integer quotient");
            let r = output["r"].as_int().expect("integer remainder");
            assert_eq!(q.wrapping_mul(b).wrapping_add(r), a, "law failed for {a} / {b}");
            assert!(r == 0 || (r < 0) == (b < 0), "remainder sign for {a} % {b}");
            let euclid = (a as i128).div_euclid(b as i128);
            let floor = if (a as i128).rem_euclid(b as i128) != 0 && b < 0 {
                euclid - 1
            } else {
                euclid
            };
            if let Ok(expected) = i64::try_from(floor) {
                assert_eq!(q, expected, "floor failed for {a} / {b}");
            }
        }
    }
}

#[test]
fn runs_are_deterministic_without_rand() {
    let program = compile(indoc! {"
        func step(v) { return (v * 1103515245 + 12345) % 2147483648 }
        seed = 42
        for i = 0; i < 50; i = i + 1 { seed = step(seed) }
    "})
    .expect("compile failed");
    let first = program.run(&State::new(), 0).expect("run failed");
    for _ in 0..5 {
        assert_eq!(program.run(&State::new(), 0).expect("run failed"), first);
    }
}

#[test]
fn seeded_rand_is_reproducible() {
    let program = compile("a = rand\nb = rand").expect("compile failed");
    let run_seeded = |seed| {
        program
            .run_with(&State::new(), &RunOptions::default(), &mut SeededRandom::new(seed))
            .expect("run failed")
    };
    assert_eq!(run_seeded(9), run_seeded(9));

    let output = run_seeded(9);
    for name in ["a", "b"] {
        let value = output[name].as_int().expect("integer");
        assert!((i64::from(i32::MIN)..=i64::from(i32::MAX)).contains(&value));
    }
}

#[test]
fn rendering_round_trips() {
    let sources = [
        "a = 6\nb = 0\nc = a % b",
        "for i=0; i<10; i=i+1 {a[i]=i}",
        "func fib(n){ if n is 0 { return 0 } if n is 1 { return 1 } return fib(n-1)+fib(n-2) } d = fib(13)",
        "if a is 1 { } elif not a { b = [1, [2, 3]] } else { b[0][1] = -(a - 1) * +2 }",
        "x = a or b and c is not d\ny = (a or b) and (c < d) >= e",
    ];
    for source in sources {
        let program = compile(source).expect("compile failed");
        let rendered = program.to_string();
        assert_eq!(
            compile(&rendered).expect("recompile failed"),
            program,
            "rendered:\n{rendered}"
        );
    }
}

#[test]
fn compile_errors_carry_context() {
    let err = compile("x = 1 $ 2").expect_err("expected lex failure");
    assert_eq!(err.to_string(), "Invalid character '$' at position 6");

    let err = compile("x = (1 + 2").expect_err("expected syntax failure");
    assert!(matches!(err, ParseError::Syntax { .. }));
    assert!(err.to_string().contains("Expected ')'"), "{err}");

    let err = compile_with_features("a = [1]", FeatureSet::ALL - Feature::Array)
        .expect_err("expected lex failure");
    assert!(err.to_string().contains("Invalid character '['"), "{err}");
}

#[test]
fn one_program_runs_on_many_threads() {
    let program = compile(indoc! {"
        func fib(n) { if n < 2 { return n } return fib(n - 1) + fib(n - 2) }
        out = fib(start)
    "})
    .expect("compile failed");

    let results = thread::scope(|scope| {
        let handles = (0..8_i64)
            .map(|start| {
                let program = &program;
                scope.spawn(move || program.run(&ints(&[("start", start)]), 0))
            })
            .collect::<Vec<_>>();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("thread panicked"))
            .collect::<Vec<_>>()
    });

    let expected = [0_i64, 1, 1, 2, 3, 5, 8, 13];
    for (start, (result, fib)) in results.into_iter().zip(expected).enumerate() {
        let output = result.expect("run failed");
        assert_eq!(
            output,
            ints(&[("out", fib), ("start", start as i64)])
        );
    }
}
