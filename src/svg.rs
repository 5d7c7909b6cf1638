use std::fmt::Write as _;
use std::path::Path;

use anyhow::Result;

use crate::config::Config;
#[cfg(feature = "png")]
use crate::config::RenderConfig;
use crate::graph::WorkflowGraph;
use crate::layout::{Layout, Point, PositionedNode, Rect};
use crate::render::{Canvas, ConnectorRenderer, CurvePath, StaticHost, Stroke};
use crate::theme::{Theme, dim_color};

/// Brightness applied to disabled task cards.
const DISABLED_BRIGHTNESS: f32 = 0.33;

/// Canvas that collects SVG elements.
#[derive(Debug, Clone, Default)]
pub struct SvgCanvas {
    elements: Vec<String>,
    offset: Point,
}

impl SvgCanvas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_offset(offset: Point) -> Self {
        Self {
            elements: Vec::new(),
            offset,
        }
    }

    pub fn elements(&self) -> &[String] {
        &self.elements
    }

    pub fn into_markup(self) -> String {
        self.elements.concat()
    }
}

impl Canvas for SvgCanvas {
    fn clear(&mut self) {
        self.elements.clear();
    }

    fn stroke_path(&mut self, path: &CurvePath, stroke: &Stroke) {
        self.elements.push(format!(
            "<path d=\"{}\" fill=\"none\" stroke=\"{}\" stroke-width=\"{}\" stroke-linecap=\"{}\"/>",
            path.to_svg_data(),
            stroke.color,
            stroke.width,
            stroke.cap.as_str()
        ));
    }

    fn fill_rect(&mut self, rect: Rect, color: &str) {
        self.elements.push(format!(
            "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" fill=\"{}\"/>",
            rect.x, rect.y, rect.width, rect.height, color
        ));
    }

    fn offset(&self) -> Point {
        self.offset
    }
}

/// Full static picture of a workflow: node cards first, connectors on top.
pub fn render_svg(graph: &WorkflowGraph, layout: &Layout, theme: &Theme, config: &Config) -> String {
    let mut svg = String::new();
    let width = layout.width.max(200.0);
    let height = layout.height.max(200.0);

    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" viewBox=\"0 0 {width} {height}\">",
    ));
    svg.push_str(&format!(
        "<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>",
        theme.background
    ));

    for positioned in layout.nodes.values() {
        let Some(node) = graph.node(&positioned.name) else {
            continue;
        };
        let paint = |color: &str| {
            if node.disabled {
                dim_color(color, DISABLED_BRIGHTNESS)
            } else {
                color.to_string()
            }
        };
        let _ = write!(
            svg,
            "<g class=\"task\" data-task=\"{}\">",
            escape_xml(&node.name)
        );
        let _ = write!(
            svg,
            "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" rx=\"8\" ry=\"8\" fill=\"{}\" stroke=\"{}\" stroke-width=\"1.4\"/>",
            positioned.x,
            positioned.y,
            positioned.width,
            positioned.height,
            paint(&theme.node_fill),
            paint(&theme.node_border)
        );
        card_title(
            &mut svg,
            positioned,
            &node.title.display_text(),
            &paint(&node.title.background),
            &paint(&node.title.foreground),
            theme,
            config,
        );
        if node.has_input() {
            let color = paint(&theme.text_color);
            pin_label(&mut svg, positioned, theme, config, 0, "Input", &color, false);
        }
        for (row, outcome) in positioned.outputs.iter().enumerate() {
            let color = paint(theme.pin_colors.get(*outcome));
            pin_label(&mut svg, positioned, theme, config, row, outcome.display_name(), &color, true);
        }
        svg.push_str("</g>");
    }

    let mut connectors = layout.clone();
    let mut canvas = SvgCanvas::new();
    ConnectorRenderer::new(
        config.pins.clone(),
        config.connector.clone(),
        theme.input_color.clone(),
    )
    .tick(&mut connectors, &StaticHost::new(), &mut canvas);
    svg.push_str(&canvas.into_markup());

    svg.push_str("</svg>");
    svg
}

fn card_title(
    svg: &mut String,
    node: &PositionedNode,
    text: &str,
    background: &str,
    foreground: &str,
    theme: &Theme,
    config: &Config,
) {
    let _ = write!(
        svg,
        "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" rx=\"8\" ry=\"8\" fill=\"{}\"/>",
        node.x, node.y, node.width, node.header_height, background
    );
    let font_size = theme.font_size * config.layout.title_scale;
    let x = node.x + config.layout.margin + config.layout.header_padding_x;
    let y = node.y + node.header_height / 2.0 + font_size * 0.35;
    let _ = write!(
        svg,
        "<text x=\"{x:.2}\" y=\"{y:.2}\" font-family=\"{}\" font-size=\"{font_size:.2}\" font-weight=\"600\" fill=\"{foreground}\">{}</text>",
        escape_xml(&theme.font_family),
        escape_xml(text)
    );
}

#[allow(clippy::too_many_arguments)]
fn pin_label(
    svg: &mut String,
    node: &PositionedNode,
    theme: &Theme,
    config: &Config,
    row: usize,
    label: &str,
    color: &str,
    output: bool,
) {
    let y = node.y
        + node.header_height
        + config.pins.row_offset
        + config.pins.pin_spacing * row as f32
        + theme.font_size * 0.35;
    let (x, anchor) = if output {
        (node.x + node.width - config.pins.output_inset - config.layout.header_padding_x, "end")
    } else {
        (node.x + config.pins.input_inset + config.layout.header_padding_x, "start")
    };
    let _ = write!(
        svg,
        "<text x=\"{x:.2}\" y=\"{y:.2}\" text-anchor=\"{anchor}\" font-family=\"{}\" font-size=\"{}\" fill=\"{color}\">{}</text>",
        escape_xml(&theme.font_family),
        theme.font_size,
        escape_xml(label)
    );
}

pub fn write_output_svg(svg: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, svg)?;
        }
        None => {
            print!("{}", svg);
        }
    }
    Ok(())
}

#[cfg(feature = "png")]
pub fn write_output_png(svg: &str, output: &Path, render_cfg: &RenderConfig, theme: &Theme) -> Result<()> {
    let mut opt = usvg::Options::default();
    if let Some(family) = theme.font_family.split(',').next() {
        opt.font_family = family.trim().trim_matches(['"', '\'']).to_string();
    }
    opt.default_size = usvg::Size::from_wh(render_cfg.width, render_cfg.height)
        .or_else(|| usvg::Size::from_wh(800.0, 600.0))
        .ok_or_else(|| anyhow::anyhow!("invalid render size"))?;

    let tree = usvg::Tree::from_str(svg, &opt)?;
    let size = tree.size().to_int_size();
    let mut pixmap = resvg::tiny_skia::Pixmap::new(size.width(), size.height())
        .ok_or_else(|| anyhow::anyhow!("Failed to allocate pixmap"))?;

    let mut pixmap_mut = pixmap.as_mut();
    resvg::render(&tree, resvg::tiny_skia::Transform::default(), &mut pixmap_mut);
    pixmap.save_png(output)?;
    Ok(())
}

fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
