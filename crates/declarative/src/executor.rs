//! Execution engine - applies plan steps in order and resolves notifications

use crate::action::Action;
use crate::context::{ApplyContext, Host, NoProgress, ProgressCallback};
use crate::error::RunError;
use crate::planner::ExecutionPlan;
use crate::types::{ApplyResult, ExecuteOptions, ExecuteSummary, Timing};

/// Execute a plan against a host
///
/// Steps run strictly in order. A step that changes something fires its
/// notifications: immediate handlers run right after it, deferred handlers
/// are queued once each and run after the last step. A fatal step or a
/// backend error ends the run; deferred handlers are then dropped.
///
/// In a dry run nothing is mutated. Steps that would change are reported as
/// skipped and the handlers they would notify are listed in the summary.
pub fn execute<P: ProgressCallback>(
    plan: &ExecutionPlan,
    host: Host,
    opts: &ExecuteOptions,
    progress: &mut P,
) -> Result<ExecuteSummary, RunError> {
    plan.validate()?;

    let mut ctx = ApplyContext::new(host, opts.dry_run);
    let mut summary = ExecuteSummary::default();
    let mut deferred: Vec<&str> = Vec::new();

    for step in &plan.steps {
        let id = step.id();

        if let Action::FatalError { message, details } = &step.action {
            for line in details {
                log::error!("{line}");
            }
            log::error!("{message}");
            return Err(RunError::ConfigurationRejected {
                message: message.clone(),
            });
        }

        progress.on_step_start(&id, &step.action.description());
        let result = apply_step(&step.action, &id, &mut ctx)?;
        progress.on_step_complete(&id, &result);
        summary.add_result(&id, &result);

        if !changed(&result, opts.dry_run) {
            continue;
        }

        for notify in &step.notifies {
            progress.on_notify(&id, &notify.handler, notify.timing);
            match notify.timing {
                Timing::Immediate => {
                    run_handler(plan, &notify.handler, &mut ctx, &mut summary, progress)?;
                }
                Timing::Deferred => {
                    if !deferred.contains(&notify.handler.as_str()) {
                        deferred.push(&notify.handler);
                    }
                }
            }
        }
    }

    for handler in deferred {
        run_handler(plan, handler, &mut ctx, &mut summary, progress)?;
    }

    progress.on_run_complete();
    Ok(summary)
}

/// Execute a plan without progress reporting
pub fn execute_simple(
    plan: &ExecutionPlan,
    host: Host,
    opts: &ExecuteOptions,
) -> Result<ExecuteSummary, RunError> {
    execute(plan, host, opts, &mut NoProgress)
}

/// Whether a step result should fire notifications
///
/// In a dry run a skipped step stands for a change that would have happened.
fn changed(result: &ApplyResult, dry_run: bool) -> bool {
    result.is_change() || (dry_run && matches!(result, ApplyResult::Skipped { .. }))
}

fn run_handler<P: ProgressCallback>(
    plan: &ExecutionPlan,
    handler: &str,
    ctx: &mut ApplyContext,
    summary: &mut ExecuteSummary,
    progress: &mut P,
) -> Result<(), RunError> {
    let Some(action) = plan.handlers.get(handler) else {
        return Err(RunError::UnknownHandler {
            step: "handler".to_string(),
            handler: handler.to_string(),
        });
    };

    let id = action.id();
    progress.on_step_start(&id, &action.description());
    let result = apply_step(action, &id, ctx)?;
    progress.on_step_complete(&id, &result);
    summary.add_result(&id, &result);
    summary.notified.push(handler.to_string());
    Ok(())
}

fn apply_step(action: &Action, id: &str, ctx: &mut ApplyContext) -> Result<ApplyResult, RunError> {
    action.apply(ctx).map_err(|error| RunError::BackendFailure {
        step: id.to_string(),
        error,
    })
}
