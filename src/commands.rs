use crate::cache::{CacheOptions, PersistentCache};
use crate::client::{self, SchedulerClient, DEFAULT_BASE_URL};
use crate::export;
use crate::model::{
    format_time, generate_id, parse_time, FixedIntensity, FlexIntensity, Plan, PlanError,
    ScheduleEntry, Task,
};
use crate::storage::{
    cache_dir, init_project_plan, load_plan, locate_plan, save_plan, PlanLocation, PlanScope,
};
use crate::ui;
use anyhow::{anyhow, Result};
use chrono::Local;
use std::env;

pub fn init(name: Option<String>) -> Result<()> {
    let location = init_project_plan(name)?;
    println!("Initialized plan at {}", location.path.display());
    Ok(())
}

pub fn list() -> Result<()> {
    let (plan, location) = load_current_plan()?;
    println!(
        "Plan: {} ({})",
        plan.name,
        match location.scope {
            PlanScope::Project => "project",
            PlanScope::Global => "global",
        }
    );
    if plan.tasks.is_empty() {
        println!("  (no tasks yet)");
    }
    for task in &plan.tasks {
        print_task(task);
    }
    Ok(())
}

pub fn add(
    name: String,
    length: f64,
    location: String,
    start: Option<String>,
    intensity: Option<String>,
) -> Result<()> {
    let (mut plan, plan_location) = load_current_plan()?;
    let id = generate_id();
    let task = match start {
        Some(raw) => {
            let start = parse_time(&raw)?;
            let intensity = parse_fixed_intensity(intensity.as_deref())?;
            Task::fixed(id.clone(), name, length, location, start, intensity)?
        }
        None => {
            let intensity = parse_flex_intensity(intensity.as_deref())?;
            Task::flexible(id.clone(), name, length, location, intensity)?
        }
    };
    plan.add_task(task);
    save_plan(&plan_location, &plan)?;
    println!("Added task {}", id);
    Ok(())
}

pub fn remove(task_id: String) -> Result<()> {
    let (mut plan, location) = load_current_plan()?;
    let task = plan.remove_task(&task_id)?;
    save_plan(&location, &plan)?;
    println!("Removed task {} ({})", task_id, task.name);
    Ok(())
}

pub fn schedule(url: Option<String>, no_cache: bool) -> Result<()> {
    let (plan, _) = load_current_plan()?;
    let entries = fetch_schedule(&plan, url, no_cache)?;
    if entries.is_empty() {
        println!("(empty schedule)");
    }
    for entry in &entries {
        print_entry(entry);
    }
    Ok(())
}

pub fn export(url: Option<String>, timezone: Option<String>) -> Result<()> {
    let (plan, _) = load_current_plan()?;
    let entries = fetch_schedule(&plan, url, false)?;
    if entries.is_empty() {
        println!("(nothing to export)");
        return Ok(());
    }
    let date = Local::now().date_naive();
    let timezone = timezone.unwrap_or_else(|| export::DEFAULT_TIMEZONE.to_string());
    for entry in &entries {
        println!("{}", export::event_url(entry, date, &timezone));
    }
    Ok(())
}

pub fn tui() -> Result<()> {
    let (plan, location) = load_current_plan()?;
    ui::run(plan, location)
}

fn fetch_schedule(
    plan: &Plan,
    url: Option<String>,
    no_cache: bool,
) -> Result<Vec<ScheduleEntry>> {
    if plan.tasks.is_empty() {
        return Err(anyhow!("plan has no tasks; add some first"));
    }
    let base_url = resolve_url(plan, url);
    let client = SchedulerClient::new(base_url);
    if no_cache {
        return client.schedule(&plan.tasks);
    }
    let mut cache = PersistentCache::open(&cache_dir()?, CacheOptions::default());
    cache.get_or_fetch(&client::wire_tasks(&plan.tasks), || {
        client.schedule(&plan.tasks)
    })
}

fn resolve_url(plan: &Plan, flag: Option<String>) -> String {
    flag.or_else(|| plan.scheduler_url.clone())
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
}

fn parse_fixed_intensity(input: Option<&str>) -> Result<FixedIntensity, PlanError> {
    match input {
        None => Ok(FixedIntensity::Medium),
        Some(raw) => match raw.to_ascii_lowercase().as_str() {
            "medium" => Ok(FixedIntensity::Medium),
            "deep" => Ok(FixedIntensity::Deep),
            other => Err(PlanError::BadIntensity(other.to_string())),
        },
    }
}

fn parse_flex_intensity(input: Option<&str>) -> Result<FlexIntensity, PlanError> {
    match input {
        None => Ok(FlexIntensity::Medium),
        Some(raw) => match raw.to_ascii_lowercase().as_str() {
            "light" => Ok(FlexIntensity::Light),
            "medium" => Ok(FlexIntensity::Medium),
            other => Err(PlanError::BadIntensity(other.to_string())),
        },
    }
}

fn load_current_plan() -> Result<(Plan, PlanLocation)> {
    let cwd = env::current_dir()?;
    let location = locate_plan(&cwd)?;
    let plan = load_plan(&location)?;
    Ok((plan, location))
}

fn print_task(task: &Task) {
    let shape = match task.start() {
        Some(start) => format!("fixed at {}", format_time(start)),
        None => "flexible".to_string(),
    };
    println!(
        "  - {}: {} ({:.1}h, {}, {})",
        task.id,
        task.name,
        task.length,
        task.intensity_label(),
        shape
    );
    if !task.location.is_empty() {
        println!("    at {}", task.location);
    }
}

fn print_entry(entry: &ScheduleEntry) {
    let tag = if entry.flexible { "" } else { "  [fixed]" };
    println!(
        "  {}-{}  {}{}",
        format_time(entry.start),
        format_time(entry.end),
        entry.name,
        tag
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intensity_flags_parse_case_insensitively() {
        assert_eq!(
            parse_fixed_intensity(Some("DEEP")).unwrap(),
            FixedIntensity::Deep
        );
        assert_eq!(
            parse_flex_intensity(Some("light")).unwrap(),
            FlexIntensity::Light
        );
        assert_eq!(parse_flex_intensity(None).unwrap(), FlexIntensity::Medium);
        assert!(parse_fixed_intensity(Some("light")).is_err());
        assert!(parse_flex_intensity(Some("deep")).is_err());
    }

    #[test]
    fn url_resolution_prefers_the_flag_over_the_plan() {
        let mut plan = Plan::default_named("today");
        assert_eq!(resolve_url(&plan, None), DEFAULT_BASE_URL);
        plan.scheduler_url = Some("http://plan.local".into());
        assert_eq!(resolve_url(&plan, None), "http://plan.local");
        assert_eq!(
            resolve_url(&plan, Some("http://flag.local".into())),
            "http://flag.local"
        );
    }
}
