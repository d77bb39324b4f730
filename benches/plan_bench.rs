//! Benchmark: plan generation
//!
//! Measures planning over growing module sets and the step sorter alone.
//! Run: cargo bench --bench plan_bench

use cidflow::prelude::*;
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use std::collections::BTreeMap;
use std::path::Path;

const BUILD_SYSTEMS: &[&str] = &["gomod", "cargo", "npm", "maven"];

fn catalog() -> Catalog {
    let mut build = WorkflowStage::new("build").with_action("cid/generate".into());
    let mut builder = Catalog::builder()
        .action(Action::new("cid/generate", "generate").with_output("source", "proto"));

    for system in BUILD_SYSTEMS {
        let id = format!("cid/{system}-build");
        builder = builder.action(
            Action::new(id.as_str(), format!("{system}-build"))
                .with_scope(ActionScope::Module)
                .with_rule(format!(r#"MODULE_BUILD_SYSTEM == "{system}""#))
                .with_input("source", "proto"),
        );
        build = build.with_action(WorkflowAction::new(id));
    }

    builder
        .action(Action::new("cid/sast", "sast").with_output("report", "sarif"))
        .action(Action::new("cid/publish", "publish").with_input("report", "sarif"))
        .workflow(
            Workflow::new("main").with_stage(build).with_stage(
                WorkflowStage::new("scan")
                    .with_action("cid/sast".into())
                    .with_action("cid/publish".into()),
            ),
        )
        .build()
        .unwrap()
}

fn modules(count: usize) -> Vec<ProjectModule> {
    (0..count)
        .map(|i| {
            ProjectModule::new(
                format!("m{i}"),
                format!("module {i}"),
                BUILD_SYSTEMS[i % BUILD_SYSTEMS.len()],
            )
        })
        .collect()
}

fn bench_generate_plan(c: &mut Criterion) {
    let catalog = catalog();
    let env = BTreeMap::new();
    let mut group = c.benchmark_group("generate_plan");

    for count in [10, 100, 1000] {
        let modules = modules(count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &modules, |b, modules| {
            b.iter(|| generate_plan(black_box(modules), &catalog, Path::new("/repo"), &env).unwrap());
        });
    }
    group.finish();
}

fn bench_sort_steps(c: &mut Criterion) {
    let plan = generate_plan(&modules(1000), &catalog(), Path::new("/repo"), &BTreeMap::new())
        .unwrap();
    let mut steps = plan.steps;
    steps.sort_by_key(|step| step.id.parse::<usize>().unwrap_or(usize::MAX));

    c.bench_function("sort_steps/1000_modules", |b| {
        b.iter(|| sort_steps(black_box(steps.clone())).unwrap());
    });
}

criterion_group!(benches, bench_generate_plan, bench_sort_steps);
criterion_main!(benches);
