use std::collections::{HashSet, VecDeque};

use crate::graph::WorkflowGraph;

/// Split the graph into dependency tiers: tier `k` holds every node whose
/// parents all sit in tiers `< k`. Nodes keep source order within a tier.
///
/// Returns the names that could never be placed when the graph has a cycle.
pub(crate) fn frontier_tiers(graph: &WorkflowGraph) -> Result<Vec<Vec<String>>, Vec<String>> {
    let mut remaining: VecDeque<(String, HashSet<String>)> = graph
        .order()
        .iter()
        .filter_map(|name| graph.node(name))
        .map(|node| (node.name.clone(), node.parents.iter().cloned().collect()))
        .collect();

    let mut tiers = Vec::new();
    while !remaining.is_empty() {
        let mut frontier = Vec::new();
        let mut blocked = VecDeque::with_capacity(remaining.len());
        for (name, parents) in remaining.drain(..) {
            if parents.is_empty() {
                frontier.push(name);
            } else {
                blocked.push_back((name, parents));
            }
        }
        if frontier.is_empty() {
            return Err(blocked.into_iter().map(|(name, _)| name).collect());
        }
        for (_, parents) in blocked.iter_mut() {
            for placed in &frontier {
                parents.remove(placed);
            }
        }
        tiers.push(frontier);
        remaining = blocked;
    }
    Ok(tiers)
}

/// Sparse grid of node names used while placing nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Grid {
    cells: Vec<Vec<Option<String>>>,
}

impl Grid {
    /// One grid row per tier, padded to a rectangle with empty cells.
    pub(crate) fn from_tiers(tiers: &[Vec<String>]) -> Self {
        let width = tiers.iter().map(Vec::len).max().unwrap_or(0);
        let cells = tiers
            .iter()
            .map(|tier| {
                let mut row: Vec<Option<String>> = tier.iter().cloned().map(Some).collect();
                row.resize(width, None);
                row
            })
            .collect();
        Self { cells }
    }

    pub(crate) fn rows(&self) -> usize {
        self.cells.len()
    }

    pub(crate) fn columns(&self) -> usize {
        self.cells.first().map(Vec::len).unwrap_or(0)
    }

    pub(crate) fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.cells.get(row)?.get(column)?.as_deref()
    }

    /// Blank every placement of a name after its first, row-major.
    pub(crate) fn dedupe(&mut self) {
        let mut seen = HashSet::new();
        for row in &mut self.cells {
            for cell in row.iter_mut() {
                let duplicate = cell
                    .as_ref()
                    .is_some_and(|name| !seen.insert(name.clone()));
                if duplicate {
                    *cell = None;
                }
            }
        }
    }

    pub(crate) fn transpose(&self) -> Self {
        let cells = (0..self.columns())
            .map(|column| {
                self.cells
                    .iter()
                    .map(|row| row[column].clone())
                    .collect()
            })
            .collect();
        Self { cells }
    }

    /// Box-drawn dump for trace logging.
    pub(crate) fn render_ascii(&self) -> String {
        let mut widths = vec![0usize; self.columns()];
        for row in &self.cells {
            for (idx, cell) in row.iter().enumerate() {
                let len = cell.as_deref().map(|s| s.chars().count()).unwrap_or(0);
                widths[idx] = widths[idx].max(len);
            }
        }
        let rule: String = std::iter::once("+".to_string())
            .chain(widths.iter().map(|w| format!("{}+", "-".repeat(w + 2))))
            .collect();
        let mut out = rule.clone();
        for row in &self.cells {
            out.push_str("\n|");
            for (idx, cell) in row.iter().enumerate() {
                let text = cell.as_deref().unwrap_or("");
                out.push_str(&format!(" {text:<width$} |", width = widths[idx]));
            }
        }
        out.push('\n');
        out.push_str(&rule);
        out
    }
}
