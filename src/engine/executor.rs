//! Execution engine - runs a plan with confirmation, progress and a summary

use anyhow::Result;
use colored::Colorize;
use declarative::{
    Action, ExecuteOptions, ExecuteSummary, ExecutionPlan, Host, RunError, compute_diffs, execute,
};

use super::differ::{display_diff, display_text_diff};
use super::progress::ApplyProgress;

/// Options for an apply run (adds confirmation and output control)
#[derive(Debug, Clone, Default)]
pub struct ApplyOptions {
    /// Don't make changes, just show what would happen
    pub dry_run: bool,
    /// Skip confirmation prompts
    pub yes: bool,
    /// Verbose output
    pub verbose: bool,
    /// No diff or progress output
    pub quiet: bool,
}

/// How an apply run ended without error
#[derive(Debug)]
pub enum RunOutcome {
    Aborted,
    Completed(ExecuteSummary),
}

/// Reject a plan that carries a fatal step before anything runs
pub fn preflight(plan: &ExecutionPlan) -> Result<(), RunError> {
    let Some(Action::FatalError { message, details }) = plan.fatal_error() else {
        return Ok(());
    };

    for line in details {
        log::error!("{line}");
    }
    Err(RunError::ConfigurationRejected {
        message: message.clone(),
    })
}

/// Show the pending changes, confirm, and execute the plan
pub fn run(plan: &ExecutionPlan, host: Host, opts: &ApplyOptions) -> Result<RunOutcome> {
    preflight(plan)?;
    plan.validate()?;

    let diffs = compute_diffs(plan, &host)?;
    if !opts.quiet {
        display_diff(&diffs);
        preview_templates(plan, &host)?;
    }

    if !diffs.is_empty() && !opts.yes && !opts.dry_run && !confirm_proceed()? {
        println!();
        println!("  {} Aborted", "✗".red());
        return Ok(RunOutcome::Aborted);
    }

    let mut progress = if opts.quiet {
        ApplyProgress::hidden()
    } else {
        println!();
        ApplyProgress::new(plan.len(), opts.verbose)
    };

    let exec_opts = ExecuteOptions {
        dry_run: opts.dry_run,
    };
    let summary = execute(plan, host, &exec_opts, &mut progress)?;

    if !opts.quiet {
        print_summary(&summary, opts.dry_run);
    }
    Ok(RunOutcome::Completed(summary))
}

/// Show how each rendered file would change
fn preview_templates(plan: &ExecutionPlan, host: &Host) -> Result<()> {
    for step in &plan.steps {
        let Action::RenderTemplate {
            path,
            template,
            variables,
            ..
        } = &step.action
        else {
            continue;
        };
        let desired = host.templates.render(template, variables)?;
        let current = host.files.read(path)?.unwrap_or_default();
        if current != desired {
            display_text_diff(&path.display().to_string(), &current, &desired);
        }
    }
    Ok(())
}

/// Confirm with user
fn confirm_proceed() -> Result<bool> {
    use dialoguer::Confirm;

    let confirmed = Confirm::new()
        .with_prompt("Continue?")
        .default(true)
        .interact()?;

    Ok(confirmed)
}

/// Print final summary
pub fn print_summary(summary: &ExecuteSummary, dry_run: bool) {
    println!();
    if dry_run {
        println!(
            "  {} Dry run - {} steps would change",
            "ℹ".blue(),
            summary.skipped
        );
    } else if summary.total_changes() == 0 {
        println!("  {} Already converged, nothing changed", "✓".green().bold());
    } else {
        println!("  {} Configuration applied successfully!", "✓".green().bold());
    }

    if summary.created > 0 {
        println!("    • {} created", summary.created);
    }
    if summary.modified > 0 {
        println!("    • {} modified", summary.modified);
    }
    if summary.removed > 0 {
        println!("    • {} removed", summary.removed);
    }
    if !summary.notified.is_empty() {
        let verb = if dry_run { "would run" } else { "ran" };
        println!("    • handlers {}: {}", verb, summary.notified.join(", "));
    }
}

/// Print what to do about a failed run
pub fn explain_failure(error: &anyhow::Error) {
    let Some(RunError::BackendFailure { error: cause, .. }) = error.downcast_ref::<RunError>()
    else {
        return;
    };
    if let Some(host_error) = cause.downcast_ref::<hostkit::Error>() {
        let category = host_error.category();
        println!(
            "  {} {}: {}",
            "→".cyan(),
            category.description(),
            category.advice()
        );
        if category.is_transient() {
            println!("  {} This is usually temporary; run apply again", "→".cyan());
        }
    }
    println!(
        "  {} Steps before the failure stay applied; deferred reloads were not run",
        "ℹ".blue()
    );
}
