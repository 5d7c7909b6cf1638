use serde::Deserialize;
use wasm_bindgen::prelude::*;
use workflow_layout::model::{StateRecord, parse_states, parse_task_list};
use workflow_layout::{Config, Theme, layout_workflow as layout_tasks, render_workflow};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WorkflowRenderOptions {
    theme: Option<String>,
    font_family: Option<String>,
    font_size: Option<f32>,
    fast_text: Option<bool>,
    padding: Option<f32>,
}

fn parse_options(options_json: Option<String>) -> Result<WorkflowRenderOptions, JsValue> {
    match options_json {
        Some(raw_options) => serde_json::from_str::<WorkflowRenderOptions>(&raw_options)
            .map_err(|error| JsValue::from_str(&error.to_string())),
        None => Ok(WorkflowRenderOptions::default()),
    }
}

fn build_config(options: WorkflowRenderOptions) -> Config {
    let mut config = Config::default();
    if let Some(theme) = options.theme.as_deref().and_then(Theme::by_name) {
        config.theme = theme;
    }
    if let Some(font_family) = options.font_family {
        config.theme.font_family = font_family;
    }
    if let Some(font_size) = options.font_size {
        config.theme.font_size = font_size;
    }
    if let Some(padding) = options.padding {
        config.layout.padding = padding;
    }
    // No system fonts in the browser sandbox.
    config.layout.fast_text_metrics = options.fast_text.unwrap_or(true);
    config
}

fn js_error(error: impl ToString) -> JsValue {
    JsValue::from_str(&error.to_string())
}

/// Layout dump (JSON) for a task list.
#[wasm_bindgen]
pub fn layout_workflow(tasks_json: &str, options_json: Option<String>) -> Result<String, JsValue> {
    let tasks = parse_task_list(tasks_json).map_err(js_error)?;
    let config = build_config(parse_options(options_json)?);
    layout_tasks(tasks, config).map_err(js_error)
}

#[wasm_bindgen]
pub fn render_workflow_svg(
    tasks_json: &str,
    states_json: Option<String>,
    options_json: Option<String>,
) -> Result<String, JsValue> {
    let tasks = parse_task_list(tasks_json).map_err(js_error)?;
    let states: Vec<StateRecord> = match states_json {
        Some(raw) => parse_states(&raw).map_err(js_error)?,
        None => Vec::new(),
    };
    let config = build_config(parse_options(options_json)?);
    render_workflow(tasks, states, config).map_err(js_error)
}

#[cfg(test)]
mod tests {
    use workflow_layout::model::parse_task_list;
    use workflow_layout::render_workflow;

    use crate::{WorkflowRenderOptions, build_config};

    #[test]
    fn renders_task_list_with_states() {
        let tasks = parse_task_list(
            r#"[
                {"name": "fetch", "depends_on": {"success": [], "error": [], "always": []}},
                {"name": "build", "depends_on": {"success": ["fetch"], "error": [], "always": []}},
                {"name": "page", "depends_on": {"success": [], "error": ["build"], "always": []}}
            ]"#,
        )
        .expect("task list should parse");

        let svg = render_workflow(tasks, Vec::new(), build_config(WorkflowRenderOptions::default()))
            .expect("workflow should render");

        assert!(svg.contains("<svg"));
        assert!(svg.contains("fetch"));
        assert_eq!(svg.matches("<path").count(), 2);
    }

    #[test]
    fn options_default_to_fast_text() {
        let config = build_config(WorkflowRenderOptions {
            theme: Some("light".to_string()),
            ..Default::default()
        });
        assert!(config.layout.fast_text_metrics);
        assert_eq!(config.theme.background, workflow_layout::Theme::light().background);
    }
}
