use std::collections::BTreeMap;

use serde::Serialize;

use crate::layout::grid::frontier_tiers;
use crate::model::{Outcome, StateRecord, TaskDefinition, TaskStatus};
use crate::theme::{Theme, status_glyph};

/// Bookkeeping states the backend keeps next to real task states.
const BOOKKEEPING_PREFIXES: [&str; 2] = ["SCAFFOLD_CHECK-", "SCAFFOLD_PREVIOUS-"];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    #[error("unknown task reference: '{task}' depends on '{dependency}', which is not defined")]
    UnknownTask { task: String, dependency: String },
    #[error("task '{0}' is defined more than once")]
    DuplicateTask(String),
    #[error("dependency cycle between tasks: {}", remaining.join(", "))]
    Cycle { remaining: Vec<String> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Badge {
    AutoExecute,
    Scheduled,
}

impl Badge {
    pub fn glyph(self) -> &'static str {
        match self {
            Badge::AutoExecute => "\u{23E9}",
            Badge::Scheduled => "\u{23F0}",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeTitle {
    pub background: String,
    pub foreground: String,
    pub text: String,
    pub status: TaskStatus,
    pub badges: Vec<Badge>,
}

impl NodeTitle {
    fn derive(name: &str, status: TaskStatus, badges: Vec<Badge>, theme: &Theme) -> Self {
        Self {
            background: theme.status_colors.get(status).to_string(),
            foreground: theme.title_text_color.clone(),
            text: format!("{}  {}", status_glyph(status), name),
            status,
            badges,
        }
    }

    /// Title text followed by badge glyphs, as shown in the header.
    pub fn display_text(&self) -> String {
        let mut text = self.text.clone();
        for badge in &self.badges {
            text.push(' ');
            text.push_str(badge.glyph());
        }
        text
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    pub name: String,
    pub title: NodeTitle,
    pub outputs: BTreeMap<Outcome, Vec<String>>,
    pub parents: Vec<String>,
    pub disabled: bool,
    #[serde(skip)]
    task_disabled: bool,
}

impl Node {
    /// Position of `outcome` among this node's declared output pins.
    pub fn pin_index(&self, outcome: Outcome) -> Option<usize> {
        self.outputs.keys().position(|kind| *kind == outcome)
    }

    pub fn has_input(&self) -> bool {
        !self.parents.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Edge {
    pub from: String,
    pub to: String,
    pub pin: Outcome,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowGraph {
    nodes: BTreeMap<String, Node>,
    order: Vec<String>,
    edges: Vec<Edge>,
}

/// Names and dependency lists; equal signatures lay out identically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeSignature(Vec<(String, Vec<(Outcome, Vec<String>)>)>);

pub fn build_graph(tasks: &[TaskDefinition], theme: &Theme) -> Result<WorkflowGraph, GraphError> {
    let mut nodes = BTreeMap::new();
    let mut order = Vec::with_capacity(tasks.len());
    for task in tasks {
        if nodes.contains_key(&task.name) {
            return Err(GraphError::DuplicateTask(task.name.clone()));
        }
        nodes.insert(
            task.name.clone(),
            Node {
                name: task.name.clone(),
                title: NodeTitle::derive(&task.name, TaskStatus::NotStarted, badges_for(task), theme),
                outputs: BTreeMap::new(),
                parents: Vec::new(),
                disabled: task.disabled,
                task_disabled: task.disabled,
            },
        );
        order.push(task.name.clone());
    }

    let mut edges = Vec::new();
    for task in tasks {
        for outcome in Outcome::ALL {
            for dependency in task.depends_on.for_outcome(outcome) {
                let Some(parent) = nodes.get_mut(dependency) else {
                    return Err(GraphError::UnknownTask {
                        task: task.name.clone(),
                        dependency: dependency.clone(),
                    });
                };
                parent
                    .outputs
                    .entry(outcome)
                    .or_default()
                    .push(task.name.clone());
                edges.push(Edge {
                    from: dependency.clone(),
                    to: task.name.clone(),
                    pin: outcome,
                    color: theme.pin_colors.get(outcome).to_string(),
                });
                if let Some(child) = nodes.get_mut(&task.name)
                    && !child.parents.contains(dependency)
                {
                    child.parents.push(dependency.clone());
                }
            }
        }
    }

    let graph = WorkflowGraph {
        nodes,
        order,
        edges,
    };
    if let Err(remaining) = frontier_tiers(&graph) {
        return Err(GraphError::Cycle { remaining });
    }
    tracing::debug!(
        nodes = graph.nodes.len(),
        edges = graph.edges.len(),
        "built workflow graph"
    );
    Ok(graph)
}

fn badges_for(task: &TaskDefinition) -> Vec<Badge> {
    let mut badges = Vec::new();
    if task.auto_execute {
        badges.push(Badge::AutoExecute);
    }
    if task.is_scheduled() {
        badges.push(Badge::Scheduled);
    }
    badges
}

impl WorkflowGraph {
    pub fn node(&self, name: &str) -> Option<&Node> {
        self.nodes.get(name)
    }

    pub fn nodes(&self) -> &BTreeMap<String, Node> {
        &self.nodes
    }

    /// Node names in the order the tasks were supplied.
    pub fn order(&self) -> &[String] {
        &self.order
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn shape_signature(&self) -> ShapeSignature {
        ShapeSignature(
            self.order
                .iter()
                .filter_map(|name| self.nodes.get(name))
                .map(|node| {
                    let outputs = node
                        .outputs
                        .iter()
                        .map(|(kind, targets)| (*kind, targets.clone()))
                        .collect();
                    (node.name.clone(), outputs)
                })
                .collect(),
        )
    }

    /// Refresh status-derived titles. Returns the names whose title changed.
    pub fn apply_states(&mut self, states: &[StateRecord], theme: &Theme) -> Vec<String> {
        let mut latest: BTreeMap<&str, &StateRecord> = BTreeMap::new();
        for record in states {
            if BOOKKEEPING_PREFIXES
                .iter()
                .any(|prefix| record.task.starts_with(prefix))
            {
                continue;
            }
            latest.insert(record.task.as_str(), record);
        }

        let mut changed = Vec::new();
        for name in &self.order {
            let Some(node) = self.nodes.get_mut(name) else {
                continue;
            };
            let (status, disabled) = match latest.get(name.as_str()) {
                Some(record) => (record.status, record.disabled || node.task_disabled),
                None => (TaskStatus::NotStarted, node.task_disabled),
            };
            let title = NodeTitle::derive(name, status, node.title.badges.clone(), theme);
            if title != node.title || disabled != node.disabled {
                node.title = title;
                node.disabled = disabled;
                changed.push(name.clone());
            }
        }
        changed
    }

    pub fn status_of(&self, name: &str) -> Option<TaskStatus> {
        self.nodes.get(name).map(|node| node.title.status)
    }
}
