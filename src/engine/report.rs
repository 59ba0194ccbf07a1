//! JSON report of an apply run

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use declarative::{ExecuteSummary, ExecutionPlan, RunError};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Converged,
    Aborted,
    Rejected,
    Failed,
}

#[derive(Debug, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub fqdn: String,
    pub platform_family: String,
    pub dry_run: bool,
    pub outcome: Option<Outcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<ExecuteSummary>,
    pub exports: BTreeMap<String, String>,
}

impl RunReport {
    pub fn start(fqdn: &str, platform_family: &str, plan: &ExecutionPlan, dry_run: bool) -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            fqdn: fqdn.to_string(),
            platform_family: platform_family.to_string(),
            dry_run,
            outcome: None,
            error: None,
            summary: None,
            exports: plan.exports.clone(),
        }
    }

    pub fn finish(&mut self, outcome: Outcome, summary: Option<ExecuteSummary>) {
        self.finished_at = Some(Utc::now());
        self.outcome = Some(outcome);
        self.summary = summary;
    }

    /// Record a failed run, telling a rejected configuration from a host failure.
    pub fn fail(&mut self, error: &anyhow::Error) {
        let outcome = match error.downcast_ref::<RunError>() {
            Some(run_error) if run_error.is_configuration() => Outcome::Rejected,
            _ => Outcome::Failed,
        };
        self.error = Some(format!("{error:#}"));
        self.finish(outcome, None);
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write report: {}", path.display()))?;
        log::info!("Wrote run report to {}", path.display());
        Ok(())
    }
}
