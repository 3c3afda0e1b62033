use crate::model::Plan;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanScope {
    Project,
    Global,
}

#[derive(Debug, Clone)]
pub struct PlanLocation {
    pub path: PathBuf,
    pub scope: PlanScope,
}

pub fn init_project_plan(name: Option<String>) -> Result<PlanLocation> {
    let cwd = env::current_dir()?;
    let dir = cwd.join(".lazyplan");
    fs::create_dir_all(&dir).context("failed to create .lazyplan directory")?;
    let path = dir.join("plan.yml");
    if !path.exists() {
        let plan_name = name.unwrap_or_else(|| {
            cwd.file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("plan")
                .to_string()
        });
        let plan = Plan::default_named(plan_name);
        save_plan(
            &PlanLocation {
                path: path.clone(),
                scope: PlanScope::Project,
            },
            &plan,
        )?;
    }
    Ok(PlanLocation {
        path,
        scope: PlanScope::Project,
    })
}

pub fn locate_plan(start: &Path) -> Result<PlanLocation> {
    if let Some(project_path) = find_project_plan(start) {
        return Ok(PlanLocation {
            path: project_path,
            scope: PlanScope::Project,
        });
    }
    let global_path = project_dirs()?.data_dir().join("plan.yml");
    Ok(PlanLocation {
        path: global_path,
        scope: PlanScope::Global,
    })
}

pub fn load_plan(location: &PlanLocation) -> Result<Plan> {
    if location.path.exists() {
        let data = fs::read_to_string(&location.path)
            .with_context(|| format!("reading {:?}", location.path))?;
        let plan: Plan = serde_yaml::from_str(&data).context("parsing plan file")?;
        Ok(plan)
    } else {
        let fallback_name = match location.scope {
            PlanScope::Project => location
                .path
                .parent()
                .and_then(|p| p.parent())
                .and_then(|p| p.file_name())
                .and_then(|n| n.to_str())
                .unwrap_or("plan")
                .to_string(),
            PlanScope::Global => "today".to_string(),
        };
        let plan = Plan::default_named(fallback_name);
        save_plan(location, &plan)?;
        Ok(plan)
    }
}

pub fn save_plan(location: &PlanLocation, plan: &Plan) -> Result<()> {
    if let Some(parent) = location.path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating {:?}", parent))?;
    }
    let serialized = serde_yaml::to_string(plan).context("serializing plan")?;
    fs::write(&location.path, serialized)
        .with_context(|| format!("writing {:?}", location.path))?;
    Ok(())
}

/// Directory for the schedule response cache.
pub fn cache_dir() -> Result<PathBuf> {
    Ok(project_dirs()?.cache_dir().to_path_buf())
}

fn find_project_plan(start: &Path) -> Option<PathBuf> {
    let mut dir = Some(start);
    while let Some(current) = dir {
        let candidate = current.join(".lazyplan/plan.yml");
        if candidate.exists() {
            return Some(candidate);
        }
        dir = current.parent();
    }
    None
}

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("", "", "lazyplan").context("locating data directory")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FlexIntensity, Task};
    use tempfile::TempDir;

    #[test]
    fn load_creates_a_default_plan_when_missing() {
        let dir = TempDir::new().unwrap();
        let location = PlanLocation {
            path: dir.path().join(".lazyplan/plan.yml"),
            scope: PlanScope::Project,
        };
        let plan = load_plan(&location).unwrap();
        assert!(plan.tasks.is_empty());
        assert!(location.path.exists());
    }

    #[test]
    fn saved_plans_load_back_intact() {
        let dir = TempDir::new().unwrap();
        let location = PlanLocation {
            path: dir.path().join("plan.yml"),
            scope: PlanScope::Global,
        };
        let mut plan = Plan::default_named("today");
        plan.scheduler_url = Some("http://scheduler.local".into());
        plan.add_task(
            Task::flexible(
                "a1b2c3".into(),
                "Essay".into(),
                1.5,
                "Home".into(),
                FlexIntensity::Medium,
            )
            .unwrap(),
        );
        save_plan(&location, &plan).unwrap();
        let loaded = load_plan(&location).unwrap();
        assert_eq!(loaded.name, "today");
        assert_eq!(loaded.scheduler_url.as_deref(), Some("http://scheduler.local"));
        assert_eq!(loaded.tasks, plan.tasks);
    }

    #[test]
    fn locate_walks_up_to_the_nearest_project_plan() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join(".lazyplan")).unwrap();
        fs::write(root.join(".lazyplan/plan.yml"), "name: here\ntasks: []\n").unwrap();
        let nested = root.join("deep/nested");
        fs::create_dir_all(&nested).unwrap();
        let location = locate_plan(&nested).unwrap();
        assert_eq!(location.scope, PlanScope::Project);
        assert_eq!(location.path, root.join(".lazyplan/plan.yml"));
    }
}
