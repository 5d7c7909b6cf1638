use crate::config::PinConfig;
use crate::graph::WorkflowGraph;
use crate::layout::Layout;
use crate::model::TaskStatus;
use crate::pins::{Pin, PinResolver};
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

#[derive(Debug, Serialize)]
pub struct LayoutDump {
    pub width: f32,
    pub height: f32,
    pub column_widths: Vec<f32>,
    pub row_heights: Vec<f32>,
    pub nodes: Vec<NodeDump>,
    pub edges: Vec<EdgeDump>,
}

#[derive(Debug, Serialize)]
pub struct NodeDump {
    pub id: String,
    pub title: String,
    pub status: TaskStatus,
    pub disabled: bool,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub header_height: f32,
    pub column: usize,
    pub row: usize,
    pub outputs: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct EdgeDump {
    pub from: String,
    pub to: String,
    pub pin: String,
    pub color: String,
    pub start: [f32; 2],
    pub end: [f32; 2],
}

impl LayoutDump {
    pub fn from_layout(layout: &Layout, graph: &WorkflowGraph, pins: &PinConfig) -> Self {
        let nodes = graph
            .order()
            .iter()
            .filter_map(|name| Some((graph.node(name)?, layout.node(name)?)))
            .map(|(node, placed)| NodeDump {
                id: node.name.clone(),
                title: node.title.display_text(),
                status: node.title.status,
                disabled: node.disabled,
                x: placed.x,
                y: placed.y,
                width: placed.width,
                height: placed.height,
                header_height: placed.header_height,
                column: placed.column,
                row: placed.row,
                outputs: placed
                    .outputs
                    .iter()
                    .map(|kind| kind.display_name().to_string())
                    .collect(),
            })
            .collect();

        let resolver = PinResolver::new(layout, pins);
        let edges = layout
            .edges
            .iter()
            .map(|edge| {
                let start = resolver.resolve(&edge.from, Pin::Output(edge.pin));
                let end = resolver.resolve(&edge.to, Pin::Input);
                EdgeDump {
                    from: edge.from.clone(),
                    to: edge.to.clone(),
                    pin: edge.pin.display_name().to_string(),
                    color: edge.color.clone(),
                    start: [start.x, start.y],
                    end: [end.x, end.y],
                }
            })
            .collect();

        LayoutDump {
            width: layout.width,
            height: layout.height,
            column_widths: layout.column_widths.clone(),
            row_heights: layout.row_heights.clone(),
            nodes,
            edges,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

pub fn write_layout_dump(
    path: &Path,
    layout: &Layout,
    graph: &WorkflowGraph,
    pins: &PinConfig,
) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    let dump = LayoutDump::from_layout(layout, graph, pins);
    serde_json::to_writer_pretty(writer, &dump)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayoutConfig;
    use crate::graph::build_graph;
    use crate::layout::{FixedMeasure, NodeSize, compute_layout};
    use crate::model::{Outcome, TaskDefinition};
    use crate::theme::Theme;

    #[test]
    fn dump_lists_nodes_in_source_order_with_endpoints() {
        let tasks = vec![
            TaskDefinition::new("z-first"),
            TaskDefinition::new("a-second").after(Outcome::Always, "z-first"),
        ];
        let graph = build_graph(&tasks, &Theme::nord()).unwrap();
        let measure = FixedMeasure(NodeSize {
            width: 200.0,
            height: 100.0,
            header_height: 40.0,
        });
        let layout = compute_layout(&graph, &measure, &LayoutConfig::default()).unwrap();
        let dump = LayoutDump::from_layout(&layout, &graph, &PinConfig::default());

        let ids: Vec<&str> = dump.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["z-first", "a-second"]);
        assert_eq!(dump.nodes[0].outputs, vec!["Always".to_string()]);
        assert_eq!(dump.edges.len(), 1);
        assert_eq!(dump.edges[0].start, [204.0, 110.0]);
        assert_eq!(dump.edges[0].end, [292.0, 110.0]);

        let json: serde_json::Value = serde_json::from_str(&dump.to_json().unwrap()).unwrap();
        assert_eq!(json["nodes"][1]["status"], "not_started");
        assert_eq!(json["edges"][0]["color"], "#5E81AC");
    }
}
