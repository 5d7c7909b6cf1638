use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

/// Condition under which a dependency edge is active. Also names the output
/// pin the edge leaves from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Success,
    Error,
    Always,
}

impl Outcome {
    /// All outcomes in declaration order.
    pub const ALL: [Outcome; 3] = [Outcome::Success, Outcome::Error, Outcome::Always];

    pub fn display_name(self) -> &'static str {
        match self {
            Outcome::Success => "Success",
            Outcome::Error => "Error",
            Outcome::Always => "Always",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for Outcome {
    type Err = ();

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        match token {
            "Success" | "success" => Ok(Outcome::Success),
            "Error" | "error" => Ok(Outcome::Error),
            "Always" | "always" => Ok(Outcome::Always),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependsOn {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub success: Vec<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub error: Vec<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub always: Vec<String>,
}

impl DependsOn {
    pub fn for_outcome(&self, outcome: Outcome) -> &[String] {
        match outcome {
            Outcome::Success => &self.success,
            Outcome::Error => &self.error,
            Outcome::Always => &self.always,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.success.is_empty() && self.error.is_empty() && self.always.is_empty()
    }
}

/// Task definition as served by `GET /api/v1/task/{workflow}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDefinition {
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub depends_on: DependsOn,
    #[serde(default)]
    pub auto_execute: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub cron: String,
    #[serde(default)]
    pub disabled: bool,
}

impl TaskDefinition {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Builder-style helper used by tests and fixtures.
    pub fn after(mut self, outcome: Outcome, parent: &str) -> Self {
        let list = match outcome {
            Outcome::Success => &mut self.depends_on.success,
            Outcome::Error => &mut self.depends_on.error,
            Outcome::Always => &mut self.depends_on.always,
        };
        list.push(parent.to_string());
        self
    }

    pub fn is_scheduled(&self) -> bool {
        !self.cron.trim().is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    NotStarted,
    Success,
    Error,
    Running,
    Waiting,
    Killed,
}

impl TaskStatus {
    pub fn from_token(token: &str) -> Self {
        match token {
            "success" => TaskStatus::Success,
            "error" => TaskStatus::Error,
            "running" => TaskStatus::Running,
            "waiting" => TaskStatus::Waiting,
            "killed" => TaskStatus::Killed,
            _ => TaskStatus::NotStarted,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::NotStarted => "not_started",
            TaskStatus::Success => "success",
            TaskStatus::Error => "error",
            TaskStatus::Running => "running",
            TaskStatus::Waiting => "waiting",
            TaskStatus::Killed => "killed",
        }
    }
}

impl<'de> Deserialize<'de> for TaskStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().map(TaskStatus::from_token).unwrap_or_default())
    }
}

/// One record of `GET /api/v1/state/{workflow}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateRecord {
    pub task: String,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub number: Option<i64>,
    #[serde(default)]
    pub started: Option<String>,
    #[serde(default)]
    pub finished: Option<String>,
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default)]
    pub context: Option<serde_json::Value>,
    #[serde(default)]
    pub display: Option<serde_json::Value>,
    #[serde(default)]
    pub disabled: bool,
}

impl StateRecord {
    pub fn new(task: &str, status: TaskStatus) -> Self {
        Self {
            task: task.to_string(),
            status,
            ..Default::default()
        }
    }
}

/// Environment key/value store attached to a workflow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Datastore {
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub env: BTreeMap<String, String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub files: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputDescriptor {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub default: String,
}

/// Mutable task fields accepted by `PUT /api/v1/task/{workflow}/{task}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TaskUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_execute: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TaskListDocument {
    Bare(Vec<TaskDefinition>),
    Wrapped { tasks: Vec<TaskDefinition> },
}

/// Parse a task list given either as a bare array or as `{"tasks": [...]}`.
pub fn parse_task_list(input: &str) -> serde_json::Result<Vec<TaskDefinition>> {
    Ok(match serde_json::from_str(input)? {
        TaskListDocument::Bare(tasks) | TaskListDocument::Wrapped { tasks } => tasks,
    })
}

pub fn parse_states(input: &str) -> serde_json::Result<Vec<StateRecord>> {
    serde_json::from_str(input)
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
