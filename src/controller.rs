use crate::config::Config;
use crate::graph::{GraphError, WorkflowGraph, build_graph};
use crate::layout::{Layout, LayoutError, NodeMeasure, Point, TextMeasure, compute_layout};
use crate::layout_dump::LayoutDump;
use crate::model::{Datastore, StateRecord, TaskDefinition, TaskStatus};
use crate::render::{Canvas, ConnectorRenderer, NodeHost};
use crate::svg::render_svg;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error(transparent)]
    Layout(#[from] LayoutError),
}

/// What `apply_tasks` did with a new task list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rebuild {
    /// Same shape: titles refreshed, node positions kept.
    Refreshed,
    /// Shape changed: every node was placed again.
    Relaid,
}

/// Owns the current graph, layout, states and environment of one workflow.
pub struct WorkflowController {
    config: Config,
    measure: Box<dyn NodeMeasure + Send + Sync>,
    renderer: ConnectorRenderer,
    graph: Option<WorkflowGraph>,
    layout: Layout,
    states: Vec<StateRecord>,
    environment: Option<Datastore>,
}

impl WorkflowController {
    pub fn new(config: Config, measure: impl NodeMeasure + Send + Sync + 'static) -> Self {
        let renderer = ConnectorRenderer::from_config(&config);
        Self {
            config,
            measure: Box::new(measure),
            renderer,
            graph: None,
            layout: Layout::empty(),
            states: Vec::new(),
            environment: None,
        }
    }

    /// Controller measuring cards with the configured font.
    pub fn with_text_metrics(config: Config) -> Self {
        let measure = TextMeasure::new(&config.theme, &config.layout, &config.pins);
        Self::new(config, measure)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn apply_tasks(&mut self, tasks: Vec<TaskDefinition>) -> Result<Rebuild, EngineError> {
        let theme = &self.config.theme;
        let mut graph = build_graph(&tasks, theme).inspect_err(|err| {
            tracing::warn!(error = %err, "rejected task list");
        })?;
        graph.apply_states(&self.states, theme);

        let same_shape = self
            .graph
            .as_ref()
            .is_some_and(|current| current.shape_signature() == graph.shape_signature());
        if same_shape {
            tracing::debug!(tasks = tasks.len(), "task list refreshed in place");
            self.graph = Some(graph);
            return Ok(Rebuild::Refreshed);
        }

        let layout = compute_layout(&graph, self.measure.as_ref(), &self.config.layout)?;
        tracing::debug!(
            tasks = tasks.len(),
            width = layout.width,
            height = layout.height,
            "task list laid out"
        );
        self.graph = Some(graph);
        self.layout = layout;
        Ok(Rebuild::Relaid)
    }

    /// Store the latest run states. Returns the tasks whose title changed.
    pub fn apply_states(&mut self, states: Vec<StateRecord>) -> Vec<String> {
        let changed = match self.graph.as_mut() {
            Some(graph) => graph.apply_states(&states, &self.config.theme),
            None => Vec::new(),
        };
        self.states = states;
        changed
    }

    pub fn apply_environment(&mut self, datastore: Datastore) {
        if self.environment.as_ref() != Some(&datastore) {
            tracing::debug!(name = %datastore.name, vars = datastore.env.len(), "environment updated");
        }
        self.environment = Some(datastore);
    }

    pub fn environment(&self) -> Option<&Datastore> {
        self.environment.as_ref()
    }

    /// One connector frame. Does nothing until a task list has been applied.
    pub fn tick(&mut self, host: &dyn NodeHost, canvas: &mut dyn Canvas) -> usize {
        if self.graph.is_none() {
            return 0;
        }
        self.renderer.tick(&mut self.layout, host, canvas)
    }

    pub fn move_node(&mut self, name: &str, to: Point) -> bool {
        self.layout.move_node(name, to)
    }

    pub fn status_of(&self, name: &str) -> Option<TaskStatus> {
        self.graph.as_ref()?.status_of(name)
    }

    pub fn graph(&self) -> Option<&WorkflowGraph> {
        self.graph.as_ref()
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn to_svg(&self) -> Option<String> {
        let graph = self.graph.as_ref()?;
        Some(render_svg(graph, &self.layout, &self.config.theme, &self.config))
    }

    pub fn dump(&self) -> Option<LayoutDump> {
        let graph = self.graph.as_ref()?;
        Some(LayoutDump::from_layout(&self.layout, graph, &self.config.pins))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{FixedMeasure, NodeSize};
    use crate::model::Outcome;
    use crate::render::StaticHost;
    use crate::svg::SvgCanvas;

    fn controller() -> WorkflowController {
        WorkflowController::new(
            Config::default(),
            FixedMeasure(NodeSize {
                width: 200.0,
                height: 100.0,
                header_height: 40.0,
            }),
        )
    }

    fn tasks() -> Vec<TaskDefinition> {
        vec![
            TaskDefinition::new("A"),
            TaskDefinition::new("B").after(Outcome::Success, "A"),
        ]
    }

    #[test]
    fn tick_is_a_no_op_before_tasks_arrive() {
        let mut controller = controller();
        let mut canvas = SvgCanvas::new();
        assert_eq!(controller.tick(&StaticHost::new(), &mut canvas), 0);
        assert!(controller.to_svg().is_none());
        assert!(controller.apply_states(vec![StateRecord::new("A", TaskStatus::Running)]).is_empty());
    }

    #[test]
    fn keeps_positions_when_shape_is_unchanged() {
        let mut controller = controller();
        assert_eq!(controller.apply_tasks(tasks()).unwrap(), Rebuild::Relaid);
        assert!(controller.move_node("B", Point::new(900.0, 400.0)));

        let mut refreshed = tasks();
        refreshed[1].auto_execute = true;
        assert_eq!(controller.apply_tasks(refreshed).unwrap(), Rebuild::Refreshed);
        assert_eq!(
            controller.layout().node("B").unwrap().position(),
            Point::new(900.0, 400.0)
        );
        assert!(
            controller.graph().unwrap().node("B").unwrap().title.badges.len() == 1,
            "badge should follow the refreshed task"
        );

        let mut grown = tasks();
        grown.push(TaskDefinition::new("C").after(Outcome::Error, "B"));
        assert_eq!(controller.apply_tasks(grown).unwrap(), Rebuild::Relaid);
        assert_eq!(controller.layout().node("B").unwrap().x, 300.0);
    }

    #[test]
    fn invalid_task_list_keeps_previous_graph() {
        let mut controller = controller();
        controller.apply_tasks(tasks()).unwrap();
        let broken = vec![TaskDefinition::new("X").after(Outcome::Success, "missing")];
        let err = controller.apply_tasks(broken).unwrap_err();
        assert!(matches!(err, EngineError::Graph(GraphError::UnknownTask { .. })));
        assert!(controller.graph().unwrap().node("A").is_some());
        assert!(controller.layout().node("B").is_some());
    }

    #[test]
    fn states_survive_a_relayout() {
        let mut controller = controller();
        controller.apply_tasks(tasks()).unwrap();
        let changed = controller.apply_states(vec![StateRecord::new("A", TaskStatus::Error)]);
        assert_eq!(changed, vec!["A".to_string()]);

        let mut grown = tasks();
        grown.push(TaskDefinition::new("C"));
        controller.apply_tasks(grown).unwrap();
        assert_eq!(controller.status_of("A"), Some(TaskStatus::Error));
        assert_eq!(controller.status_of("C"), Some(TaskStatus::NotStarted));
    }

    #[test]
    fn environment_is_replaced_wholesale() {
        let mut controller = controller();
        assert!(controller.environment().is_none());
        let mut datastore = Datastore {
            name: "deploy".to_string(),
            ..Default::default()
        };
        datastore.env.insert("REGION".to_string(), "eu-west-1".to_string());
        controller.apply_environment(datastore.clone());
        assert_eq!(controller.environment(), Some(&datastore));
    }

    #[test]
    fn ticks_draw_current_edges() {
        let mut controller = controller();
        controller.apply_tasks(tasks()).unwrap();
        let mut canvas = SvgCanvas::new();
        assert_eq!(controller.tick(&StaticHost::new(), &mut canvas), 1);
        // Path plus two pin markers.
        assert_eq!(canvas.elements().len(), 3);
        let svg = controller.to_svg().unwrap();
        assert_eq!(svg.matches("<path").count(), 1);
    }
}
