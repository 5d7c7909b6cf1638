use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use workflow_layout::config::Config;
use workflow_layout::graph::build_graph;
use workflow_layout::layout::{FixedMeasure, NodeSize, compute_layout};
use workflow_layout::model::{Outcome, TaskDefinition};
use workflow_layout::render::{ConnectorRenderer, StaticHost};
use workflow_layout::svg::{SvgCanvas, render_svg};
use workflow_layout::theme::Theme;

/// Layered pipeline: `width` tasks per stage, each depending on two tasks of
/// the previous stage through varying outcomes.
fn pipeline(stages: usize, width: usize) -> Vec<TaskDefinition> {
    let mut tasks = Vec::with_capacity(stages * width);
    for stage in 0..stages {
        for slot in 0..width {
            let mut task = TaskDefinition::new(&format!("s{stage}-t{slot}"));
            if stage > 0 {
                let outcome = Outcome::ALL[(stage + slot) % 3];
                task = task
                    .after(Outcome::Success, &format!("s{}-t{}", stage - 1, slot))
                    .after(outcome, &format!("s{}-t{}", stage - 1, (slot + 1) % width));
            }
            tasks.push(task);
        }
    }
    tasks
}

fn measure() -> FixedMeasure {
    FixedMeasure(NodeSize {
        width: 220.0,
        height: 150.0,
        header_height: 44.0,
    })
}

const SIZES: [(usize, usize); 4] = [(3, 2), (6, 4), (10, 8), (20, 12)];

fn bench_layout(c: &mut Criterion) {
    let mut group = c.benchmark_group("layout");
    let theme = Theme::nord();
    let config = Config::default();
    for (stages, width) in SIZES {
        let tasks = pipeline(stages, width);
        let graph = build_graph(&tasks, &theme).expect("graph build failed");
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{stages}x{width}")),
            &graph,
            |b, graph| {
                b.iter(|| {
                    let layout = compute_layout(black_box(graph), &measure(), &config.layout)
                        .expect("layout failed");
                    black_box(layout.width);
                });
            },
        );
    }
    group.finish();
}

fn bench_connector_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("connector_tick");
    let theme = Theme::nord();
    let config = Config::default();
    let renderer = ConnectorRenderer::from_config(&config);
    for (stages, width) in SIZES {
        let graph = build_graph(&pipeline(stages, width), &theme).expect("graph build failed");
        let mut layout = compute_layout(&graph, &measure(), &config.layout).expect("layout failed");
        let host = StaticHost::from_layout(&layout);
        group.bench_function(BenchmarkId::from_parameter(format!("{stages}x{width}")), |b| {
            b.iter(|| {
                let mut canvas = SvgCanvas::new();
                black_box(renderer.tick(&mut layout, &host, &mut canvas));
            });
        });
    }
    group.finish();
}

fn bench_end_to_end(c: &mut Criterion) {
    let mut group = c.benchmark_group("end_to_end");
    let theme = Theme::nord();
    let config = Config::default();
    for (stages, width) in SIZES {
        let tasks = pipeline(stages, width);
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{stages}x{width}")),
            &tasks,
            |b, tasks| {
                b.iter(|| {
                    let graph = build_graph(black_box(tasks), &theme).expect("graph build failed");
                    let layout =
                        compute_layout(&graph, &measure(), &config.layout).expect("layout failed");
                    let svg = render_svg(&graph, &layout, &theme, &config);
                    black_box(svg.len());
                });
            },
        );
    }
    group.finish();
}

criterion_group!(
    name = benches;
    config = Criterion::default();
    targets = bench_layout, bench_connector_tick, bench_end_to_end
);
criterion_main!(benches);
