use std::collections::BTreeMap;

use serde::Serialize;

use crate::graph::Edge;
use crate::model::Outcome;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Replace non-finite coordinates with zero.
    pub fn sanitized(self) -> Self {
        let clean = |v: f32| if v.is_finite() { v } else { 0.0 };
        Self {
            x: clean(self.x),
            y: clean(self.y),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn centered(center: Point, size: f32) -> Self {
        Self {
            x: center.x - size / 2.0,
            y: center.y - size / 2.0,
            width: size,
            height: size,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct NodeSize {
    pub width: f32,
    pub height: f32,
    pub header_height: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionedNode {
    pub name: String,
    /// Top-left corner. Follows the host's on-screen position after layout.
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub header_height: f32,
    pub column: usize,
    pub row: usize,
    /// Declared output pins, top to bottom.
    pub outputs: Vec<Outcome>,
    /// Root tasks have no input pin.
    pub has_input: bool,
}

impl PositionedNode {
    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn pin_index(&self, outcome: Outcome) -> Option<usize> {
        self.outputs.iter().position(|kind| *kind == outcome)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub nodes: BTreeMap<String, PositionedNode>,
    pub edges: Vec<Edge>,
    /// Width of each grid column, left to right.
    pub column_widths: Vec<f32>,
    /// Height of each grid row, top to bottom.
    pub row_heights: Vec<f32>,
    pub width: f32,
    pub height: f32,
}

impl Layout {
    pub fn empty() -> Self {
        Self {
            nodes: BTreeMap::new(),
            edges: Vec::new(),
            column_widths: Vec::new(),
            row_heights: Vec::new(),
            width: 0.0,
            height: 0.0,
        }
    }

    pub fn node(&self, name: &str) -> Option<&PositionedNode> {
        self.nodes.get(name)
    }

    /// Move a node, e.g. after the user dragged it. Returns false for unknown names.
    pub fn move_node(&mut self, name: &str, to: Point) -> bool {
        match self.nodes.get_mut(name) {
            Some(node) => {
                node.x = to.x;
                node.y = to.y;
                true
            }
            None => false,
        }
    }
}
