use crate::config::{Config, load_config};
use crate::controller::WorkflowController;
use crate::layout_dump::write_layout_dump;
use crate::model::{StateRecord, TaskDefinition, parse_states, parse_task_list};
use crate::svg::write_output_svg;
#[cfg(feature = "png")]
use crate::svg::write_output_png;
use crate::theme::Theme;
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "wfl", version, about = "Lay out and render workflow task graphs")]
pub struct Args {
    /// Task list JSON file or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Task state JSON file (as returned by the state endpoint)
    #[arg(short = 's', long = "states")]
    pub states: Option<PathBuf>,

    /// Output file. Defaults to stdout for SVG and JSON.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short = 'e', long = "outputFormat", value_enum, default_value = "svg")]
    pub output_format: OutputFormat,

    /// Config JSON/JSON5 file
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Theme name (nord, light)
    #[arg(short = 't', long = "theme")]
    pub theme: Option<String>,

    /// Estimate text widths instead of loading system fonts
    #[arg(long = "fastText")]
    pub fast_text: bool,

    /// Backend base URL; fetch tasks and states instead of reading files
    #[arg(long = "server")]
    pub server: Option<String>,

    /// Workflow name on the backend
    #[arg(long = "workflow")]
    pub workflow: Option<String>,

    /// Backend access token
    #[arg(long = "token", env = "WFL_TOKEN")]
    pub token: Option<String>,

    /// Width
    #[arg(short = 'w', long = "width", default_value_t = 1200.0)]
    pub width: f32,

    /// Height
    #[arg(short = 'H', long = "height", default_value_t = 800.0)]
    pub height: f32,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Svg,
    Png,
    /// Layout dump
    Json,
}

pub fn run() -> Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .try_init();

    let args = Args::parse();
    let config = build_config(&args)?;

    let (tasks, states) = match args.server.as_deref() {
        Some(_) => fetch_remote(&config)?,
        None => {
            let tasks = parse_task_list(&read_input(args.input.as_deref())?)
                .context("task list is not valid JSON")?;
            let states = match args.states.as_deref() {
                Some(path) => parse_states(&std::fs::read_to_string(path)?)
                    .context("state list is not valid JSON")?,
                None => Vec::new(),
            };
            (tasks, states)
        }
    };
    tracing::info!(tasks = tasks.len(), states = states.len(), "loaded workflow");

    let mut controller = WorkflowController::with_text_metrics(config.clone());
    controller.apply_tasks(tasks)?;
    controller.apply_states(states);

    match args.output_format {
        OutputFormat::Svg => {
            let svg = controller.to_svg().unwrap_or_default();
            write_output_svg(&svg, args.output.as_deref())?;
        }
        OutputFormat::Png => {
            let output = ensure_output(&args.output, "png")?;
            write_png(&controller, &output, &config)?;
        }
        OutputFormat::Json => match (args.output.as_deref(), controller.graph()) {
            (Some(path), Some(graph)) => {
                write_layout_dump(path, controller.layout(), graph, &config.pins)?;
            }
            _ => {
                let dump = controller
                    .dump()
                    .ok_or_else(|| anyhow::anyhow!("No workflow loaded"))?;
                println!("{}", dump.to_json()?);
            }
        },
    }

    Ok(())
}

fn build_config(args: &Args) -> Result<Config> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(name) = args.theme.as_deref() {
        config.theme =
            Theme::by_name(name).ok_or_else(|| anyhow::anyhow!("Unknown theme '{name}'"))?;
    }
    config.layout.fast_text_metrics |= args.fast_text;
    config.render.width = args.width;
    config.render.height = args.height;
    if let Some(server) = args.server.as_deref() {
        config.api.base_url = server.to_string();
    }
    if let Some(workflow) = args.workflow.as_deref() {
        config.api.workflow = workflow.to_string();
    }
    if args.token.is_some() {
        config.api.token = args.token.clone();
    }
    Ok(config)
}

#[cfg(feature = "png")]
fn write_png(controller: &WorkflowController, output: &Path, config: &Config) -> Result<()> {
    let svg = controller.to_svg().unwrap_or_default();
    write_output_png(&svg, output, &config.render, &config.theme)
}

#[cfg(not(feature = "png"))]
fn write_png(_controller: &WorkflowController, _output: &Path, _config: &Config) -> Result<()> {
    Err(anyhow::anyhow!("PNG output requires the 'png' feature"))
}

#[cfg(feature = "live")]
fn fetch_remote(config: &Config) -> Result<(Vec<TaskDefinition>, Vec<StateRecord>)> {
    use crate::api::{ApiClient, ApiError};

    if config.api.workflow.is_empty() {
        return Err(anyhow::anyhow!("--workflow is required with --server"));
    }
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(async {
        let client = ApiClient::new(&config.api)?;
        let fetched = async { Ok::<_, ApiError>((client.tasks().await?, client.states().await?)) };
        match fetched.await {
            Ok(pair) => Ok(pair),
            Err(ApiError::Unauthorized) => Err(anyhow::anyhow!(
                "Not authorized; log in at {}{}",
                config.api.base_url.trim_end_matches('/'),
                config.api.login_path
            )),
            Err(err) => Err(err.into()),
        }
    })
}

#[cfg(not(feature = "live"))]
fn fetch_remote(_config: &Config) -> Result<(Vec<TaskDefinition>, Vec<StateRecord>)> {
    Err(anyhow::anyhow!("--server requires the 'live' feature"))
}

fn read_input(path: Option<&Path>) -> Result<String> {
    if let Some(path) = path
        && path != Path::new("-")
    {
        return std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()));
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

fn ensure_output(output: &Option<PathBuf>, ext: &str) -> Result<PathBuf> {
    if let Some(path) = output {
        return Ok(path.clone());
    }
    Err(anyhow::anyhow!(
        "Output path required for {} output",
        ext
    ))
}
