use std::hint::black_box;

use casm_assembler::assemble;
use casm_runtime::{parse_args, run_program, VmConfig};
use criterion::{criterion_group, criterion_main, BatchSize, Criterion, Throughput};

/// Counts down from the argument, two steps per iteration
const COUNTDOWN: &str = r#"
    [ap] = [fp - 3], ap++;
    [ap] = [ap - 1] + -1, ap++;
    jmp rel -2 if [ap - 1] != 0;
    ret;
"#;

fn step_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("step_throughput");
    let program = assemble(COUNTDOWN).expect("benchmark program assembles");

    for iterations in [1_000u64, 10_000] {
        let args = parse_args(&iterations.to_string()).expect("valid arguments");
        let steps = run_program(&program, &args, VmConfig::default())
            .expect("benchmark program runs")
            .steps;
        group.throughput(Throughput::Elements(steps));
        group.bench_function(format!("countdown_{iterations}"), |bench| {
            bench.iter_batched(
                || args.clone(),
                |args| black_box(run_program(&program, &args, VmConfig::default())),
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

criterion_group!(benches, step_throughput);
criterion_main!(benches);
