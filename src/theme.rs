use serde::{Deserialize, Serialize};

use crate::model::{Outcome, TaskStatus};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusColors {
    pub not_started: String,
    pub success: String,
    pub error: String,
    pub running: String,
    pub waiting: String,
    pub killed: String,
}

impl StatusColors {
    pub fn get(&self, status: TaskStatus) -> &str {
        match status {
            TaskStatus::NotStarted => &self.not_started,
            TaskStatus::Success => &self.success,
            TaskStatus::Error => &self.error,
            TaskStatus::Running => &self.running,
            TaskStatus::Waiting => &self.waiting,
            TaskStatus::Killed => &self.killed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PinColors {
    pub success: String,
    pub error: String,
    pub always: String,
}

impl PinColors {
    pub fn get(&self, outcome: Outcome) -> &str {
        match outcome {
            Outcome::Success => &self.success,
            Outcome::Error => &self.error,
            Outcome::Always => &self.always,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Theme {
    pub font_family: String,
    pub font_size: f32,
    pub pin_colors: PinColors,
    pub input_color: String,
    pub status_colors: StatusColors,
    pub title_text_color: String,
    pub node_fill: String,
    pub node_border: String,
    pub text_color: String,
    pub background: String,
}

impl Theme {
    /// Nord palette; the status and pin colors the console has always used.
    pub fn nord() -> Self {
        Self {
            font_family: "Inter, Segoe UI, system-ui, -apple-system, sans-serif".to_string(),
            font_size: 16.0,
            pin_colors: PinColors {
                success: "#A3BE8C".to_string(),
                error: "#BF616A".to_string(),
                always: "#5E81AC".to_string(),
            },
            input_color: "#888888".to_string(),
            status_colors: StatusColors {
                not_started: "#373F51".to_string(),
                success: "#A3BE8C".to_string(),
                error: "#BF616A".to_string(),
                running: "#5E81AC".to_string(),
                waiting: "#EBCB8B".to_string(),
                killed: "#D08770".to_string(),
            },
            title_text_color: "#FFFFFF".to_string(),
            node_fill: "#2E3440".to_string(),
            node_border: "#4C566A".to_string(),
            text_color: "#ECEFF4".to_string(),
            background: "#242933".to_string(),
        }
    }

    pub fn light() -> Self {
        Self {
            node_fill: "#FFFFFF".to_string(),
            node_border: "#C7D2E5".to_string(),
            text_color: "#1C2430".to_string(),
            background: "#F7FAFF".to_string(),
            ..Self::nord()
        }
    }

    pub fn by_name(name: &str) -> Option<Self> {
        match name {
            "nord" | "dark" | "default" => Some(Self::nord()),
            "light" => Some(Self::light()),
            _ => None,
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::nord()
    }
}

/// Short glyph shown in front of a task title for each status.
pub fn status_glyph(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::NotStarted => "\u{25CB}",
        TaskStatus::Success => "\u{2714}",
        TaskStatus::Error => "\u{2757}",
        TaskStatus::Running => "\u{21BB}",
        TaskStatus::Waiting => "\u{23F2}",
        TaskStatus::Killed => "\u{2620}",
    }
}

/// Scale `color`'s brightness, mirroring a CSS `brightness()` filter.
pub fn dim_color(color: &str, factor: f32) -> String {
    let Some((r, g, b)) = parse_hex(color) else {
        return color.to_string();
    };
    let scale = |c: u8| ((c as f32 * factor).round().clamp(0.0, 255.0)) as u8;
    format!("#{:02X}{:02X}{:02X}", scale(r), scale(g), scale(b))
}

fn parse_hex(color: &str) -> Option<(u8, u8, u8)> {
    let hex = color.trim().strip_prefix('#')?;
    let expanded: String = match hex.len() {
        3 => hex.chars().flat_map(|c| [c, c]).collect(),
        6 => hex.to_string(),
        _ => return None,
    };
    let r = u8::from_str_radix(&expanded[0..2], 16).ok()?;
    let g = u8::from_str_radix(&expanded[2..4], 16).ok()?;
    let b = u8::from_str_radix(&expanded[4..6], 16).ok()?;
    Some((r, g, b))
}
