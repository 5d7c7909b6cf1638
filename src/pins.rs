use std::fmt;
use std::str::FromStr;

use crate::config::PinConfig;
use crate::layout::{Layout, Point};
use crate::model::Outcome;

/// Anchor on a node card: the single input, or one output per outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pin {
    Input,
    Output(Outcome),
}

impl FromStr for Pin {
    type Err = ();

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        if token == "Input" {
            return Ok(Pin::Input);
        }
        token.parse::<Outcome>().map(Pin::Output)
    }
}

impl fmt::Display for Pin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pin::Input => f.write_str("Input"),
            Pin::Output(outcome) => write!(f, "{outcome}"),
        }
    }
}

/// Resolves pin anchors in canvas-local coordinates.
///
/// Inputs sit just left of the card's left edge on the first pin row; root
/// tasks have none. Outputs sit near the right edge, one row per declared
/// outcome. Anything that cannot be resolved collapses to the origin instead
/// of failing, so a half-rendered frame still draws.
pub struct PinResolver<'a> {
    layout: &'a Layout,
    config: &'a PinConfig,
    canvas_offset: Point,
}

impl<'a> PinResolver<'a> {
    pub fn new(layout: &'a Layout, config: &'a PinConfig) -> Self {
        Self {
            layout,
            config,
            canvas_offset: Point::ORIGIN,
        }
    }

    /// Offset of the canvas relative to the node coordinate space.
    pub fn with_canvas_offset(mut self, offset: Point) -> Self {
        self.canvas_offset = offset;
        self
    }

    pub fn resolve(&self, node_name: &str, pin: Pin) -> Point {
        let Some(node) = self.layout.node(node_name) else {
            return Point::ORIGIN;
        };
        let first_row = node.y + node.header_height + self.config.row_offset;
        let anchor = match pin {
            Pin::Input if !node.has_input => return Point::ORIGIN,
            Pin::Input => Point::new(node.x - self.config.input_inset, first_row),
            Pin::Output(outcome) => {
                let Some(index) = node.pin_index(outcome) else {
                    return Point::ORIGIN;
                };
                Point::new(
                    node.x + node.width - self.config.output_inset,
                    first_row + self.config.pin_spacing * index as f32,
                )
            }
        };
        Point::new(
            anchor.x - self.canvas_offset.x,
            anchor.y - self.canvas_offset.y,
        )
        .sanitized()
    }

    /// Resolve by pin name ("Input", "Success", ...). Unknown names give the origin.
    pub fn resolve_named(&self, node_name: &str, pin_name: &str) -> Point {
        match pin_name.parse::<Pin>() {
            Ok(pin) => self.resolve(node_name, pin),
            Err(()) => Point::ORIGIN,
        }
    }
}
