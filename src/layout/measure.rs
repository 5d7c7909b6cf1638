use crate::config::{LayoutConfig, PinConfig};
use crate::graph::Node;
use crate::text_metrics;
use crate::theme::Theme;

use super::NodeSize;

/// Reports the rendered size of a node card before it is placed.
pub trait NodeMeasure {
    fn measure(&self, node: &Node) -> NodeSize;
}

impl<F> NodeMeasure for F
where
    F: Fn(&Node) -> NodeSize,
{
    fn measure(&self, node: &Node) -> NodeSize {
        self(node)
    }
}

/// Same size for every node.
#[derive(Debug, Clone, Copy)]
pub struct FixedMeasure(pub NodeSize);

impl NodeMeasure for FixedMeasure {
    fn measure(&self, _node: &Node) -> NodeSize {
        self.0
    }
}

/// Measures node cards from their title text and pin rows using font metrics.
#[derive(Debug, Clone)]
pub struct TextMeasure {
    font_family: String,
    font_size: f32,
    layout: LayoutConfig,
    pin_spacing: f32,
}

impl TextMeasure {
    pub fn new(theme: &Theme, layout: &LayoutConfig, pins: &PinConfig) -> Self {
        Self {
            font_family: theme.font_family.clone(),
            font_size: theme.font_size,
            layout: layout.clone(),
            pin_spacing: pins.pin_spacing,
        }
    }

    fn text_width(&self, text: &str, font_size: f32) -> f32 {
        if self.layout.fast_text_metrics {
            return text_metrics::estimate_text_width(text, font_size);
        }
        text_metrics::measure_text_width(text, font_size, &self.font_family)
            .unwrap_or_else(|| text_metrics::estimate_text_width(text, font_size))
    }
}

impl NodeMeasure for TextMeasure {
    fn measure(&self, node: &Node) -> NodeSize {
        let title_size = self.font_size * self.layout.title_scale;
        let title_width = self.text_width(&node.title.display_text(), title_size);
        let header_height =
            title_size * self.layout.label_line_height + 2.0 * self.layout.header_padding_y;

        // Pin rows: "Input" on the left, outcome labels on the right.
        let longest_pin = node
            .outputs
            .keys()
            .map(|kind| self.text_width(kind.display_name(), self.font_size))
            .fold(0.0, f32::max);
        let input = if node.has_input() {
            self.text_width("Input", self.font_size)
        } else {
            0.0
        };
        let rows_width = input + longest_pin + 4.0 * self.layout.header_padding_x;

        let body_width = (title_width + 2.0 * self.layout.header_padding_x)
            .max(rows_width)
            .max(self.layout.min_body_width);
        let rows = node.outputs.len().max(1) as f32;

        NodeSize {
            width: body_width + 2.0 * self.layout.margin,
            height: header_height + rows * self.pin_spacing + 2.0 * self.layout.margin,
            header_height,
        }
    }
}
