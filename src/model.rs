use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};

pub type TaskId = String;

pub const MIN_TASK_HOURS: f64 = 0.1;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Plan {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduler_url: Option<String>,
    pub tasks: Vec<Task>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Task {
    pub id: TaskId,
    pub name: String,
    pub length: f64,
    pub location: String,
    pub kind: TaskKind,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TaskKind {
    Fixed {
        start: i32,
        intensity: FixedIntensity,
    },
    Flexible {
        intensity: FlexIntensity,
    },
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum FlexIntensity {
    Light,
    Medium,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum FixedIntensity {
    Medium,
    Deep,
}

/// Intensity as the scheduler reports it back; the union of both input enums.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum Intensity {
    Light,
    Medium,
    Deep,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ScheduleEntry {
    pub name: String,
    pub start: i32,
    pub end: i32,
    pub flexible: bool,
    pub length: Option<f64>,
    pub intensity: Option<Intensity>,
    pub location: Option<String>,
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum PlanError {
    #[error("task name is required")]
    EmptyName,
    #[error("task length must be a number of at least 0.1 hours")]
    LengthTooShort,
    #[error("fixed tasks need a start time")]
    MissingStart,
    #[error("invalid time (use HH:MM): {0}")]
    BadTime(String),
    #[error("unknown intensity: {0}")]
    BadIntensity(String),
    #[error("task not found: {0}")]
    TaskNotFound(String),
}

impl Plan {
    pub fn default_named(name: impl Into<String>) -> Self {
        Plan {
            name: name.into(),
            scheduler_url: None,
            tasks: Vec::new(),
        }
    }

    pub fn find_task_index(&self, id: &str) -> Option<usize> {
        self.tasks.iter().position(|t| t.id == id)
    }

    pub fn add_task(&mut self, task: Task) {
        self.tasks.push(task);
    }

    pub fn remove_task(&mut self, id: &str) -> Result<Task, PlanError> {
        let idx = self
            .find_task_index(id)
            .ok_or_else(|| PlanError::TaskNotFound(id.to_string()))?;
        Ok(self.tasks.remove(idx))
    }
}

impl Task {
    pub fn fixed(
        id: TaskId,
        name: String,
        length: f64,
        location: String,
        start: i32,
        intensity: FixedIntensity,
    ) -> Result<Self, PlanError> {
        validate_common(&name, length)?;
        Ok(Task {
            id,
            name,
            length,
            location,
            kind: TaskKind::Fixed { start, intensity },
        })
    }

    pub fn flexible(
        id: TaskId,
        name: String,
        length: f64,
        location: String,
        intensity: FlexIntensity,
    ) -> Result<Self, PlanError> {
        validate_common(&name, length)?;
        Ok(Task {
            id,
            name,
            length,
            location,
            kind: TaskKind::Flexible { intensity },
        })
    }

    pub fn is_flexible(&self) -> bool {
        matches!(self.kind, TaskKind::Flexible { .. })
    }

    pub fn start(&self) -> Option<i32> {
        match self.kind {
            TaskKind::Fixed { start, .. } => Some(start),
            TaskKind::Flexible { .. } => None,
        }
    }

    pub fn intensity_label(&self) -> &'static str {
        match self.kind {
            TaskKind::Fixed { intensity, .. } => intensity.as_str(),
            TaskKind::Flexible { intensity } => intensity.as_str(),
        }
    }
}

fn validate_common(name: &str, length: f64) -> Result<(), PlanError> {
    if name.trim().is_empty() {
        return Err(PlanError::EmptyName);
    }
    if !length.is_finite() || length < MIN_TASK_HOURS {
        return Err(PlanError::LengthTooShort);
    }
    Ok(())
}

impl ScheduleEntry {
    pub fn duration(&self) -> i32 {
        self.end - self.start
    }
}

impl FlexIntensity {
    pub fn as_str(self) -> &'static str {
        match self {
            FlexIntensity::Light => "Light",
            FlexIntensity::Medium => "Medium",
        }
    }
}

impl FixedIntensity {
    pub fn as_str(self) -> &'static str {
        match self {
            FixedIntensity::Medium => "Medium",
            FixedIntensity::Deep => "Deep",
        }
    }
}

impl Intensity {
    pub fn as_str(self) -> &'static str {
        match self {
            Intensity::Light => "Light",
            Intensity::Medium => "Medium",
            Intensity::Deep => "Deep",
        }
    }
}

/// Parse a wall-clock `"HH:MM"` into minutes since midnight.
pub fn parse_time(input: &str) -> Result<i32, PlanError> {
    let trimmed = input.trim();
    let (h, m) = trimmed
        .split_once(':')
        .ok_or_else(|| PlanError::BadTime(trimmed.to_string()))?;
    let hours: i32 = h
        .parse()
        .map_err(|_| PlanError::BadTime(trimmed.to_string()))?;
    let minutes: i32 = m
        .parse()
        .map_err(|_| PlanError::BadTime(trimmed.to_string()))?;
    if !(0..24).contains(&hours) || !(0..60).contains(&minutes) {
        return Err(PlanError::BadTime(trimmed.to_string()));
    }
    Ok(hours * 60 + minutes)
}

/// Inverse of [`parse_time`]; exact round-trip for all minutes in `[0, 1440)`.
pub fn format_time(minutes: i32) -> String {
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

pub fn generate_id() -> TaskId {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_round_trips_for_every_valid_minute() {
        for minutes in 0..1440 {
            let text = format_time(minutes);
            assert_eq!(parse_time(&text), Ok(minutes), "{}", text);
        }
    }

    #[test]
    fn parse_time_rejects_garbage() {
        for bad in ["", "9", "9:5:3", "24:00", "12:60", "-1:00", "ab:cd"] {
            assert!(parse_time(bad).is_err(), "{:?} should not parse", bad);
        }
    }

    #[test]
    fn parse_time_accepts_padded_and_unpadded_hours() {
        assert_eq!(parse_time("09:30"), Ok(570));
        assert_eq!(parse_time("9:30"), Ok(570));
        assert_eq!(parse_time(" 23:59 "), Ok(1439));
    }

    #[test]
    fn fixed_task_requires_name_and_length() {
        let err = Task::fixed(
            "a1b2c3".into(),
            "  ".into(),
            1.0,
            String::new(),
            540,
            FixedIntensity::Medium,
        )
        .unwrap_err();
        assert_eq!(err, PlanError::EmptyName);

        let err = Task::fixed(
            "a1b2c3".into(),
            "Meeting".into(),
            0.05,
            String::new(),
            540,
            FixedIntensity::Deep,
        )
        .unwrap_err();
        assert_eq!(err, PlanError::LengthTooShort);
    }

    #[test]
    fn flexible_task_has_no_start() {
        let task = Task::flexible(
            "a1b2c3".into(),
            "Essay".into(),
            2.0,
            "Home".into(),
            FlexIntensity::Light,
        )
        .unwrap();
        assert!(task.is_flexible());
        assert_eq!(task.start(), None);
        assert_eq!(task.intensity_label(), "Light");
    }

    #[test]
    fn plan_removes_tasks_by_id() {
        let mut plan = Plan::default_named("today");
        let task = Task::fixed(
            "x9y8z7".into(),
            "Meeting".into(),
            1.0,
            "Office".into(),
            930,
            FixedIntensity::Medium,
        )
        .unwrap();
        plan.add_task(task);
        assert_eq!(plan.tasks.len(), 1);
        assert!(plan.remove_task("x9y8z7").is_ok());
        assert!(plan.tasks.is_empty());
        assert_eq!(
            plan.remove_task("x9y8z7"),
            Err(PlanError::TaskNotFound("x9y8z7".into()))
        );
    }

    #[test]
    fn plan_survives_yaml_round_trip() {
        let mut plan = Plan::default_named("today");
        plan.add_task(
            Task::flexible(
                "q1w2e3".into(),
                "Essay".into(),
                1.5,
                "Library".into(),
                FlexIntensity::Medium,
            )
            .unwrap(),
        );
        plan.add_task(
            Task::fixed(
                "r5t6y7".into(),
                "Standup".into(),
                0.5,
                "Office".into(),
                570,
                FixedIntensity::Deep,
            )
            .unwrap(),
        );
        let text = serde_yaml::to_string(&plan).unwrap();
        let back: Plan = serde_yaml::from_str(&text).unwrap();
        assert_eq!(back.tasks, plan.tasks);
    }
}
