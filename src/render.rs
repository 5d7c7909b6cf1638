use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::config::{Config, ConnectorConfig, PinConfig};
use crate::layout::{Layout, Point, Rect};
use crate::pins::{Pin, PinResolver};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CubicSegment {
    pub c1: Point,
    pub c2: Point,
    pub end: Point,
}

/// A path made of cubic bezier segments, starting at `start`.
#[derive(Debug, Clone, PartialEq)]
pub struct CurvePath {
    pub start: Point,
    pub segments: Vec<CubicSegment>,
}

impl CurvePath {
    pub fn end(&self) -> Point {
        self.segments.last().map(|s| s.end).unwrap_or(self.start)
    }

    /// SVG path data (`M … C …`).
    pub fn to_svg_data(&self) -> String {
        let mut d = format!("M {:.2} {:.2}", self.start.x, self.start.y);
        for seg in &self.segments {
            let _ = write!(
                d,
                " C {:.2} {:.2} {:.2} {:.2} {:.2} {:.2}",
                seg.c1.x, seg.c1.y, seg.c2.x, seg.c2.y, seg.end.x, seg.end.y
            );
        }
        d
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineCap {
    Butt,
    Round,
}

impl LineCap {
    pub fn as_str(self) -> &'static str {
        match self {
            LineCap::Butt => "butt",
            LineCap::Round => "round",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stroke {
    pub color: String,
    pub width: f32,
    pub cap: LineCap,
}

/// Drawing surface the connectors are painted on.
pub trait Canvas {
    fn clear(&mut self);
    fn stroke_path(&mut self, path: &CurvePath, stroke: &Stroke);
    fn fill_rect(&mut self, rect: Rect, color: &str);

    /// Position of the canvas in node coordinates.
    fn offset(&self) -> Point {
        Point::ORIGIN
    }
}

/// Reports where the host currently shows each node card.
pub trait NodeHost {
    fn node_position(&self, name: &str) -> Option<Point>;
}

/// Host with fixed, explicitly set positions. Unknown nodes keep their
/// computed layout position.
#[derive(Debug, Clone, Default)]
pub struct StaticHost {
    positions: BTreeMap<String, Point>,
}

impl StaticHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_layout(layout: &Layout) -> Self {
        Self {
            positions: layout
                .nodes
                .values()
                .map(|node| (node.name.clone(), node.position()))
                .collect(),
        }
    }

    pub fn set(&mut self, name: &str, position: Point) {
        self.positions.insert(name.to_string(), position);
    }
}

impl NodeHost for StaticHost {
    fn node_position(&self, name: &str) -> Option<Point> {
        self.positions.get(name).copied()
    }
}

/// Control polygon and smoothed curve for one connector.
///
/// The inner control points sit 3/16 of the way along the run and an eighth
/// of the rise, with their vertical offset from the nearest endpoint capped
/// at `max_deflection` so that steep connectors still leave and enter pins
/// horizontally.
pub fn connector_path(start: Point, end: Point, config: &ConnectorConfig) -> CurvePath {
    let dx = end.x - start.x;
    let dy = end.y - start.y;
    let limit = config.max_deflection.max(0.0);

    let c1 = Point::new(
        start.x + dx * 3.0 / 16.0,
        (start.y + dy / 8.0).clamp(start.y - limit, start.y + limit),
    );
    let c2 = Point::new(
        end.x - dx * 3.0 / 16.0,
        (end.y - dy / 8.0).clamp(end.y - limit, end.y + limit),
    );
    let mid = Point::new(start.x + dx / 2.0, start.y + dy / 2.0);

    catmull_rom(&[start, c1, mid, c2, end], config.tension)
}

/// Catmull-Rom spline through `points`, as cubic bezier segments.
pub fn catmull_rom(points: &[Point], tension: f32) -> CurvePath {
    let Some(&start) = points.first() else {
        return CurvePath {
            start: Point::ORIGIN,
            segments: Vec::new(),
        };
    };
    let segments = (0..points.len().saturating_sub(1))
        .map(|i| {
            let p0 = points[i.saturating_sub(1)];
            let p1 = points[i];
            let p2 = points[i + 1];
            let p3 = *points.get(i + 2).unwrap_or(&p2);
            CubicSegment {
                c1: Point::new(
                    p1.x + (p2.x - p0.x) / 6.0 * tension,
                    p1.y + (p2.y - p0.y) / 6.0 * tension,
                ),
                c2: Point::new(
                    p2.x - (p3.x - p1.x) / 6.0 * tension,
                    p2.y - (p3.y - p1.y) / 6.0 * tension,
                ),
                end: p2,
            }
        })
        .collect();
    CurvePath { start, segments }
}

/// Redraws every connector from the current node positions.
#[derive(Debug, Clone)]
pub struct ConnectorRenderer {
    pins: PinConfig,
    connector: ConnectorConfig,
    input_color: String,
}

impl ConnectorRenderer {
    pub fn new(pins: PinConfig, connector: ConnectorConfig, input_color: String) -> Self {
        Self {
            pins,
            connector,
            input_color,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.pins.clone(),
            config.connector.clone(),
            config.theme.input_color.clone(),
        )
    }

    /// One frame: pull node positions from `host`, clear `canvas`, then draw
    /// each edge with a marker on both pins. Returns the number of connectors.
    pub fn tick(&self, layout: &mut Layout, host: &dyn NodeHost, canvas: &mut dyn Canvas) -> usize {
        for node in layout.nodes.values_mut() {
            if let Some(position) = host.node_position(&node.name) {
                node.x = position.x;
                node.y = position.y;
            }
        }

        canvas.clear();
        if layout.edges.is_empty() {
            return 0;
        }

        let resolver = PinResolver::new(layout, &self.pins).with_canvas_offset(canvas.offset());
        let marker = self.connector.marker_size;
        for edge in &layout.edges {
            let start = resolver.resolve(&edge.from, Pin::Output(edge.pin));
            let end = resolver.resolve(&edge.to, Pin::Input);
            let path = connector_path(start, end, &self.connector);
            canvas.stroke_path(
                &path,
                &Stroke {
                    color: edge.color.clone(),
                    width: self.connector.line_width,
                    cap: LineCap::Round,
                },
            );
            canvas.fill_rect(Rect::centered(start, marker), &edge.color);
            canvas.fill_rect(Rect::centered(end, marker), &self.input_color);
        }
        tracing::trace!(connectors = layout.edges.len(), "redrew connectors");
        layout.edges.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayoutConfig;
    use crate::graph::build_graph;
    use crate::layout::{FixedMeasure, NodeSize, compute_layout};
    use crate::model::{Outcome, TaskDefinition};
    use crate::theme::Theme;

    #[derive(Debug, Clone, PartialEq)]
    enum Op {
        Clear,
        Stroke(CurvePath, Stroke),
        Fill(Rect, String),
    }

    #[derive(Default)]
    struct Recorder {
        ops: Vec<Op>,
        offset: Point,
    }

    impl Canvas for Recorder {
        fn clear(&mut self) {
            self.ops.push(Op::Clear);
        }

        fn stroke_path(&mut self, path: &CurvePath, stroke: &Stroke) {
            self.ops.push(Op::Stroke(path.clone(), stroke.clone()));
        }

        fn fill_rect(&mut self, rect: Rect, color: &str) {
            self.ops.push(Op::Fill(rect, color.to_string()));
        }

        fn offset(&self) -> Point {
            self.offset
        }
    }

    fn layout_for(tasks: &[TaskDefinition]) -> Layout {
        let graph = build_graph(tasks, &Theme::nord()).unwrap();
        let measure = FixedMeasure(NodeSize {
            width: 200.0,
            height: 100.0,
            header_height: 40.0,
        });
        compute_layout(&graph, &measure, &LayoutConfig::default()).unwrap()
    }

    fn renderer() -> ConnectorRenderer {
        ConnectorRenderer::from_config(&Config::default())
    }

    #[test]
    fn no_edges_only_clears() {
        let mut layout = layout_for(&[TaskDefinition::new("solo")]);
        let mut canvas = Recorder::default();
        let drawn = renderer().tick(&mut layout, &StaticHost::new(), &mut canvas);
        assert_eq!(drawn, 0);
        assert_eq!(canvas.ops, vec![Op::Clear]);
    }

    #[test]
    fn level_connector_stays_flat() {
        let path = connector_path(
            Point::new(0.0, 0.0),
            Point::new(160.0, 0.0),
            &ConnectorConfig::default(),
        );
        assert_eq!(path.start, Point::new(0.0, 0.0));
        assert_eq!(path.segments.len(), 4);
        assert_eq!(path.segments[0].end, Point::new(30.0, 0.0));
        assert_eq!(path.segments[1].end, Point::new(80.0, 0.0));
        assert_eq!(path.segments[2].end, Point::new(130.0, 0.0));
        assert_eq!(path.end(), Point::new(160.0, 0.0));
        assert!(path.segments.iter().all(|s| s.c1.y == 0.0 && s.c2.y == 0.0));
    }

    #[test]
    fn steep_connector_deflection_is_capped() {
        let config = ConnectorConfig::default();
        let path = connector_path(Point::new(0.0, 0.0), Point::new(160.0, 400.0), &config);
        let c1 = path.segments[0].end;
        let mid = path.segments[1].end;
        let c2 = path.segments[2].end;
        assert_eq!(c1, Point::new(30.0, 10.0));
        assert_eq!(mid, Point::new(80.0, 200.0));
        assert_eq!(c2, Point::new(130.0, 390.0));

        let upward = connector_path(Point::new(0.0, 400.0), Point::new(160.0, 0.0), &config);
        assert_eq!(upward.segments[0].end.y, 390.0);
        assert_eq!(upward.segments[2].end.y, 10.0);
    }

    #[test]
    fn spline_tangents_follow_neighbours() {
        let points = [
            Point::new(0.0, 0.0),
            Point::new(60.0, 0.0),
            Point::new(120.0, 60.0),
        ];
        let path = catmull_rom(&points, 1.0);
        assert_eq!(path.segments.len(), 2);
        // First segment reuses p1 as p0.
        assert_eq!(path.segments[0].c1, Point::new(10.0, 0.0));
        assert_eq!(path.segments[0].c2, Point::new(40.0, -10.0));
        // Last segment reuses p2 as p3.
        assert_eq!(path.segments[1].c2, Point::new(110.0, 50.0));
        assert!(catmull_rom(&[], 1.0).segments.is_empty());
    }

    #[test]
    fn draws_connector_and_markers_per_edge() {
        let mut layout = layout_for(&[
            TaskDefinition::new("A"),
            TaskDefinition::new("B").after(Outcome::Error, "A"),
        ]);
        let mut canvas = Recorder::default();
        let drawn = renderer().tick(&mut layout, &StaticHost::new(), &mut canvas);
        assert_eq!(drawn, 1);
        assert_eq!(canvas.ops.len(), 4);
        assert_eq!(canvas.ops[0], Op::Clear);

        let Op::Stroke(path, stroke) = &canvas.ops[1] else {
            panic!("expected a stroke, got {:?}", canvas.ops[1]);
        };
        assert_eq!(stroke.color, "#BF616A");
        assert_eq!(stroke.width, 10.0);
        assert_eq!(stroke.cap, LineCap::Round);
        // A: x 50, width 200, inset 46; y 50 + header 40 + offset 20.
        assert_eq!(path.start, Point::new(204.0, 110.0));
        // B: x 300, inset 8.
        assert_eq!(path.end(), Point::new(292.0, 110.0));

        assert_eq!(
            canvas.ops[2],
            Op::Fill(Rect::centered(Point::new(204.0, 110.0), 8.0), "#BF616A".to_string())
        );
        assert_eq!(
            canvas.ops[3],
            Op::Fill(Rect::centered(Point::new(292.0, 110.0), 8.0), "#888888".to_string())
        );
    }

    #[test]
    fn follows_dragged_nodes() {
        let mut layout = layout_for(&[
            TaskDefinition::new("A"),
            TaskDefinition::new("B").after(Outcome::Success, "A"),
        ]);
        let mut host = StaticHost::from_layout(&layout);
        host.set("B", Point::new(500.0, 300.0));
        let mut canvas = Recorder {
            offset: Point::new(100.0, 100.0),
            ..Default::default()
        };
        renderer().tick(&mut layout, &host, &mut canvas);
        assert_eq!(layout.node("B").unwrap().position(), Point::new(500.0, 300.0));

        let Op::Stroke(path, _) = &canvas.ops[1] else {
            panic!("expected a stroke");
        };
        assert_eq!(path.start, Point::new(104.0, 10.0));
        assert_eq!(path.end(), Point::new(392.0, 260.0));
    }
}
