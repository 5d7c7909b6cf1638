pub(crate) mod grid;
mod measure;
mod types;

pub use measure::{FixedMeasure, NodeMeasure, TextMeasure};
pub use types::*;

use std::collections::BTreeMap;

use crate::config::LayoutConfig;
use crate::graph::{Node, WorkflowGraph};
use grid::{Grid, frontier_tiers};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LayoutError {
    #[error("cannot layer tasks caught in a dependency cycle: {}", remaining.join(", "))]
    Cycle { remaining: Vec<String> },
}

/// Place every node of `graph` on a grid whose columns are dependency depth.
///
/// Column `k` holds the nodes whose parents all sit in columns `< k`; rows are
/// the slots within a tier, in source order. Each column is as wide as its
/// widest node and each row as tall as its tallest; nodes are centered
/// horizontally within their column.
pub fn compute_layout(
    graph: &WorkflowGraph,
    measure: &dyn NodeMeasure,
    config: &LayoutConfig,
) -> Result<Layout, LayoutError> {
    let tiers = frontier_tiers(graph).map_err(|remaining| LayoutError::Cycle { remaining })?;

    let mut grid = Grid::from_tiers(&tiers);
    grid.dedupe();
    let grid = grid.transpose();
    tracing::trace!(grid = %grid.render_ascii(), "layered grid");

    let mut sizes: BTreeMap<&str, (NodeSize, &Node)> = BTreeMap::new();
    let mut column_widths = vec![0.0f32; grid.columns()];
    let mut row_heights = vec![0.0f32; grid.rows()];
    for row in 0..grid.rows() {
        for column in 0..grid.columns() {
            let Some(name) = grid.cell(row, column) else {
                continue;
            };
            let Some(node) = graph.node(name) else {
                continue;
            };
            let size = measure.measure(node);
            column_widths[column] = column_widths[column].max(size.width);
            row_heights[row] = row_heights[row].max(size.height);
            sizes.insert(name, (size, node));
        }
    }

    let padding = config.padding;
    let mut nodes = BTreeMap::new();
    let mut y = padding;
    for (row, row_height) in row_heights.iter().enumerate() {
        let mut x = padding;
        for (column, column_width) in column_widths.iter().enumerate() {
            if let Some(name) = grid.cell(row, column)
                && let Some((size, node)) = sizes.get(name)
            {
                nodes.insert(
                    name.to_string(),
                    PositionedNode {
                        name: name.to_string(),
                        x: x + (column_width - size.width) / 2.0,
                        y,
                        width: size.width,
                        height: size.height,
                        header_height: size.header_height,
                        column,
                        row,
                        outputs: node.outputs.keys().copied().collect(),
                        has_input: node.has_input(),
                    },
                );
            }
            x += column_width + padding;
        }
        y += row_height + padding;
    }

    let width = padding + column_widths.iter().map(|w| w + padding).sum::<f32>();
    let height = padding + row_heights.iter().map(|h| h + padding).sum::<f32>();
    tracing::debug!(
        nodes = nodes.len(),
        columns = column_widths.len(),
        rows = row_heights.len(),
        width,
        height,
        "computed workflow layout"
    );

    Ok(Layout {
        nodes,
        edges: graph.edges().to_vec(),
        column_widths,
        row_heights,
        width,
        height,
    })
}
