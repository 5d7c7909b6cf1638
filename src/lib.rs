#[cfg(feature = "live")]
pub mod api;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod controller;
pub mod graph;
pub mod layout;
pub mod layout_dump;
#[cfg(feature = "live")]
pub mod live;
pub mod model;
pub mod pins;
pub mod render;
pub mod svg;
pub mod text_metrics;
pub mod theme;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{Config, LayoutConfig, load_config, parse_config};
pub use controller::{EngineError, Rebuild, WorkflowController};
pub use graph::{GraphError, WorkflowGraph, build_graph};
pub use layout::{FixedMeasure, Layout, NodeMeasure, TextMeasure, compute_layout};
pub use model::{Datastore, Outcome, StateRecord, TaskDefinition, TaskStatus};
pub use pins::{Pin, PinResolver};
pub use render::{Canvas, ConnectorRenderer, NodeHost, StaticHost};
pub use svg::{SvgCanvas, render_svg};
pub use theme::Theme;

/// Lay out `tasks` with `states` applied and render the result as SVG.
pub fn render_workflow(
    tasks: Vec<TaskDefinition>,
    states: Vec<StateRecord>,
    config: Config,
) -> Result<String, EngineError> {
    let mut controller = WorkflowController::with_text_metrics(config);
    controller.apply_tasks(tasks)?;
    controller.apply_states(states);
    Ok(controller.to_svg().unwrap_or_default())
}

/// Layout dump for `tasks`, as pretty JSON.
pub fn layout_workflow(tasks: Vec<TaskDefinition>, config: Config) -> anyhow::Result<String> {
    let mut controller = WorkflowController::with_text_metrics(config);
    controller.apply_tasks(tasks)?;
    let dump = controller
        .dump()
        .ok_or_else(|| anyhow::anyhow!("No workflow loaded"))?;
    Ok(dump.to_json()?)
}
