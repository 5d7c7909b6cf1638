use crate::theme::Theme;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Gap between grid columns and rows, and around the whole grid.
    pub padding: f32,
    /// Outer margin added on every side of a measured node.
    pub margin: f32,
    pub header_padding_x: f32,
    pub header_padding_y: f32,
    /// Title font size relative to the theme font size.
    pub title_scale: f32,
    pub label_line_height: f32,
    pub min_body_width: f32,
    /// Estimate text widths from an average glyph width instead of loading fonts.
    pub fast_text_metrics: bool,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            padding: 50.0,
            margin: 10.0,
            header_padding_x: 16.0,
            header_padding_y: 8.0,
            title_scale: 1.17,
            label_line_height: 1.5,
            min_body_width: 160.0,
            fast_text_metrics: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PinConfig {
    /// Distance from the bottom of the header to the first pin row.
    pub row_offset: f32,
    /// Vertical distance between consecutive output pin rows.
    pub pin_spacing: f32,
    /// Output anchors sit this far left of the node's right edge.
    pub output_inset: f32,
    /// Input anchors sit this far left of the node's left edge.
    pub input_inset: f32,
}

impl Default for PinConfig {
    fn default() -> Self {
        Self {
            row_offset: 20.0,
            pin_spacing: 39.0,
            output_inset: 46.0,
            input_inset: 8.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectorConfig {
    pub line_width: f32,
    /// Largest vertical distance a control point may sit from its endpoint.
    pub max_deflection: f32,
    pub marker_size: f32,
    pub tension: f32,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            line_width: 10.0,
            max_deflection: 10.0,
            marker_size: 8.0,
            tension: 1.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub render_interval_ms: u64,
    pub state_interval_ms: u64,
    pub task_interval_ms: u64,
    pub datastore_interval_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            render_interval_ms: 50,
            state_interval_ms: 500,
            task_interval_ms: 500,
            datastore_interval_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub workflow: String,
    pub token: Option<String>,
    pub auth_scheme: String,
    pub timeout_ms: u64,
    /// Where the host should send the user after a 401.
    pub login_path: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:2997".to_string(),
            workflow: String::new(),
            token: None,
            auth_scheme: "Bearer".to_string(),
            timeout_ms: 10_000,
            login_path: "/ui/login".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub width: f32,
    pub height: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 1200.0,
            height: 800.0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub theme: Theme,
    pub layout: LayoutConfig,
    pub pins: PinConfig,
    pub connector: ConnectorConfig,
    pub sync: SyncConfig,
    pub api: ApiConfig,
    pub render: RenderConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThemeVariables {
    font_family: Option<String>,
    font_size: Option<f32>,
    success_color: Option<String>,
    error_color: Option<String>,
    always_color: Option<String>,
    input_color: Option<String>,
    not_started_color: Option<String>,
    running_color: Option<String>,
    waiting_color: Option<String>,
    killed_color: Option<String>,
    title_text_color: Option<String>,
    node_fill: Option<String>,
    node_border: Option<String>,
    text_color: Option<String>,
    background: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    theme: Option<String>,
    theme_variables: Option<ThemeVariables>,
    layout: Option<LayoutConfig>,
    pins: Option<PinConfig>,
    connector: Option<ConnectorConfig>,
    sync: Option<SyncConfig>,
    api: Option<ApiConfig>,
    render: Option<RenderConfig>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

/// Parse a JSON or JSON5 config document on top of the defaults.
pub fn parse_config(contents: &str) -> anyhow::Result<Config> {
    let parsed: ConfigFile = json5::from_str(contents)?;
    let mut config = Config::default();

    if let Some(theme_name) = parsed.theme.as_deref() {
        config.theme = Theme::by_name(theme_name)
            .ok_or_else(|| anyhow::anyhow!("unknown theme '{theme_name}'"))?;
    }
    if let Some(vars) = parsed.theme_variables {
        apply_theme_variables(&mut config, vars);
    }
    if let Some(layout) = parsed.layout {
        config.layout = layout;
    }
    if let Some(pins) = parsed.pins {
        config.pins = pins;
    }
    if let Some(connector) = parsed.connector {
        config.connector = connector;
    }
    if let Some(sync) = parsed.sync {
        config.sync = sync;
    }
    if let Some(api) = parsed.api {
        config.api = api;
    }
    if let Some(render) = parsed.render {
        config.render = render;
    }
    Ok(config)
}

fn apply_theme_variables(config: &mut Config, vars: ThemeVariables) {
    let theme = &mut config.theme;
    if let Some(v) = vars.font_family {
        theme.font_family = v;
    }
    if let Some(v) = vars.font_size {
        theme.font_size = v;
    }
    if let Some(v) = vars.success_color {
        theme.pin_colors.success = v.clone();
        theme.status_colors.success = v;
    }
    if let Some(v) = vars.error_color {
        theme.pin_colors.error = v.clone();
        theme.status_colors.error = v;
    }
    if let Some(v) = vars.always_color {
        theme.pin_colors.always = v;
    }
    if let Some(v) = vars.input_color {
        theme.input_color = v;
    }
    if let Some(v) = vars.not_started_color {
        theme.status_colors.not_started = v;
    }
    if let Some(v) = vars.running_color {
        theme.status_colors.running = v;
    }
    if let Some(v) = vars.waiting_color {
        theme.status_colors.waiting = v;
    }
    if let Some(v) = vars.killed_color {
        theme.status_colors.killed = v;
    }
    if let Some(v) = vars.title_text_color {
        theme.title_text_color = v;
    }
    if let Some(v) = vars.node_fill {
        theme.node_fill = v;
    }
    if let Some(v) = vars.node_border {
        theme.node_border = v;
    }
    if let Some(v) = vars.text_color {
        theme.text_color = v;
    }
    if let Some(v) = vars.background {
        theme.background = v;
    }
}
