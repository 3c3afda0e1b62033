use crate::model::{format_time, parse_time, Intensity, ScheduleEntry, Task, TaskKind};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// One task as the scheduler wire contract spells it: a flat object with a
/// `flexible` flag instead of the tagged variant the rest of the crate uses.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TaskPayload {
    pub name: String,
    pub length: f64,
    pub location: String,
    pub intensity: String,
    pub flexible: bool,
    pub start: Option<String>,
}

#[derive(Debug, Serialize)]
struct ScheduleRequest {
    tasks: Vec<TaskPayload>,
}

#[derive(Debug, Deserialize)]
struct ScheduleResponse {
    schedule: Vec<EntryPayload>,
}

#[derive(Debug, Deserialize)]
struct EntryPayload {
    name: String,
    start: String,
    end: String,
    flexible: bool,
    #[serde(default)]
    length: Option<f64>,
    #[serde(default)]
    intensity: Option<Intensity>,
    #[serde(default)]
    location: Option<String>,
}

pub struct SchedulerClient {
    base_url: String,
    http: reqwest::blocking::Client,
}

impl SchedulerClient {
    /// Client defaults only: the exchange has no retry and no cancellation,
    /// and each failure is terminal for that submission.
    pub fn new(base_url: impl Into<String>) -> Self {
        SchedulerClient {
            base_url: base_url.into(),
            http: reqwest::blocking::Client::new(),
        }
    }

    /// Submit the task batch and parse the returned schedule.
    ///
    /// Any non-2xx status or malformed body is a total failure; there is no
    /// partial result and no retry.
    pub fn schedule(&self, tasks: &[Task]) -> Result<Vec<ScheduleEntry>> {
        let request = ScheduleRequest {
            tasks: wire_tasks(tasks),
        };
        let endpoint = format!("{}/schedule/", self.base_url.trim_end_matches('/'));
        let response = self
            .http
            .post(&endpoint)
            .json(&request)
            .send()
            .with_context(|| format!("scheduler unreachable at {}", endpoint))?;
        let status = response.status();
        if !status.is_success() {
            bail!("scheduler returned {}", status);
        }
        let body: ScheduleResponse = response
            .json()
            .context("malformed scheduler response")?;
        body.schedule.into_iter().map(entry_from_payload).collect()
    }

    /// Call-site failure policy from the UI: log and fall back to an empty
    /// schedule so the view returns to its "no schedule yet" state.
    pub fn schedule_or_empty(&self, tasks: &[Task]) -> Vec<ScheduleEntry> {
        match self.schedule(tasks) {
            Ok(schedule) => schedule,
            Err(err) => {
                log::error!("schedule request failed: {:#}", err);
                Vec::new()
            }
        }
    }
}

/// Flatten tasks into the wire shape. Also serves as the cache key material:
/// two plans that serialize identically are the same request.
pub fn wire_tasks(tasks: &[Task]) -> Vec<TaskPayload> {
    tasks
        .iter()
        .map(|task| {
            let (flexible, start, intensity) = match task.kind {
                TaskKind::Fixed { start, intensity } => {
                    (false, Some(format_time(start)), intensity.as_str())
                }
                TaskKind::Flexible { intensity } => (true, None, intensity.as_str()),
            };
            TaskPayload {
                name: task.name.clone(),
                length: task.length,
                location: task.location.clone(),
                intensity: intensity.to_string(),
                flexible,
                start,
            }
        })
        .collect()
}

fn entry_from_payload(payload: EntryPayload) -> Result<ScheduleEntry> {
    let start = parse_time(&payload.start)
        .with_context(|| format!("entry {:?}", payload.name))?;
    let end = parse_time(&payload.end)
        .with_context(|| format!("entry {:?}", payload.name))?;
    if end < start {
        bail!("entry {:?} ends before it starts", payload.name);
    }
    Ok(ScheduleEntry {
        name: payload.name,
        start,
        end,
        flexible: payload.flexible,
        length: payload.length,
        intensity: payload.intensity,
        location: payload.location,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FixedIntensity, FlexIntensity};

    fn sample_tasks() -> Vec<Task> {
        vec![
            Task::fixed(
                "a1b2c3".into(),
                "Meeting".into(),
                1.0,
                "Office".into(),
                930,
                FixedIntensity::Deep,
            )
            .unwrap(),
            Task::flexible(
                "d4e5f6".into(),
                "Essay".into(),
                2.0,
                "Home".into(),
                FlexIntensity::Light,
            )
            .unwrap(),
        ]
    }

    #[test]
    fn wire_tasks_match_the_http_contract() {
        let payloads = wire_tasks(&sample_tasks());
        let json = serde_json::to_value(&payloads).unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                {
                    "name": "Meeting",
                    "length": 1.0,
                    "location": "Office",
                    "intensity": "Deep",
                    "flexible": false,
                    "start": "15:30"
                },
                {
                    "name": "Essay",
                    "length": 2.0,
                    "location": "Home",
                    "intensity": "Light",
                    "flexible": true,
                    "start": null
                }
            ])
        );
    }

    #[test]
    fn response_entries_parse_into_minutes() {
        let payload: EntryPayload = serde_json::from_str(
            r#"{
                "name": "Essay",
                "start": "09:00",
                "end": "10:30",
                "flexible": true,
                "length": 1.5,
                "intensity": "Light",
                "location": "Home"
            }"#,
        )
        .unwrap();
        let entry = entry_from_payload(payload).unwrap();
        assert_eq!(entry.start, 540);
        assert_eq!(entry.end, 630);
        assert_eq!(entry.intensity, Some(Intensity::Light));
    }

    #[test]
    fn fixed_entries_may_omit_the_flexible_fields() {
        let payload: EntryPayload = serde_json::from_str(
            r#"{ "name": "Meeting", "start": "15:30", "end": "16:30", "flexible": false }"#,
        )
        .unwrap();
        let entry = entry_from_payload(payload).unwrap();
        assert_eq!(entry.length, None);
        assert_eq!(entry.intensity, None);
        assert_eq!(entry.location, None);
    }

    #[test]
    fn inverted_or_unparseable_entries_are_malformed() {
        let inverted: EntryPayload = serde_json::from_str(
            r#"{ "name": "Nap", "start": "12:00", "end": "11:00", "flexible": true }"#,
        )
        .unwrap();
        assert!(entry_from_payload(inverted).is_err());

        let garbled: EntryPayload = serde_json::from_str(
            r#"{ "name": "Nap", "start": "noonish", "end": "13:00", "flexible": true }"#,
        )
        .unwrap();
        assert!(entry_from_payload(garbled).is_err());
    }

    #[test]
    fn unreachable_scheduler_resolves_to_an_empty_schedule() {
        // Nothing listens on the discard port; the send fails fast and the
        // fallback path must swallow it.
        let client = SchedulerClient::new("http://127.0.0.1:9");
        assert!(client.schedule_or_empty(&sample_tasks()).is_empty());
    }
}
