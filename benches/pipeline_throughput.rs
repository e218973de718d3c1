//! Criterion benchmarks for lexing, compilation, and execution throughput.

use criterion::{criterion_group, criterion_main, Criterion};

use machine_dialect::compile::{compile_source, run_source, CompileOptions};
use machine_dialect::lexer::Lexer;
use machine_dialect::opt::OptLevel;
use machine_dialect::vm::VmOptions;

fn generate_straight_line(statements: usize) -> String {
    let mut source = String::new();
    for index in 0..statements {
        source.push_str(&format!("Set `v{index}` to _{index}_ + _{index}_ * _2_.\n"));
    }
    source.push_str("Give back `v0`.\n");
    source
}

fn generate_branchy(statements: usize) -> String {
    let mut source = String::from("Set `x` to _1_.\n");
    for index in 0..statements {
        source.push_str(&format!(
            "If `x` is greater than _{index}_ then:\n> Set `x` to `x` + _1_.\nelse:\n> Set `x` to `x` + _2_.\n"
        ));
    }
    source.push_str("Give back `x`.\n");
    source
}

fn bench_lexing(c: &mut Criterion) {
    let source = generate_straight_line(200);
    c.bench_function("lex_200_statements", |b| {
        b.iter(|| Lexer::tokenize(std::hint::black_box(&source)))
    });
}

fn bench_compilation(c: &mut Criterion) {
    let source = generate_branchy(50);
    for (name, level) in [
        ("compile_branchy_none", OptLevel::None),
        ("compile_branchy_aggressive", OptLevel::Aggressive),
    ] {
        c.bench_function(name, |b| {
            b.iter(|| {
                compile_source(
                    std::hint::black_box(&source),
                    &CompileOptions::with_opt_level(level),
                )
                .expect("compiles")
            })
        });
    }
}

fn bench_execution(c: &mut Criterion) {
    let fib = concat!(
        "### **Interaction**: `fib`\n",
        "<details>\n",
        "#### Inputs:\n",
        "- `n`\n",
        "If `n` is less than _2_ then:\n",
        "> Give back `n`.\n",
        "Give back `fib`(`n` - _1_) + `fib`(`n` - _2_).\n",
        "</details>\n",
        "Give back `fib`(_15_).\n",
    );
    c.bench_function("run_fib_15", |b| {
        b.iter(|| {
            run_source(
                std::hint::black_box(fib),
                &CompileOptions::default(),
                VmOptions::default(),
            )
            .expect("runs")
        })
    });
}

criterion_group!(benches, bench_lexing, bench_compilation, bench_execution);
criterion_main!(benches);
