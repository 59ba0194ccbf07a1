//! Diff computation for plan steps

use crate::action::Action;
use crate::context::Host;
use crate::planner::ExecutionPlan;
use crate::types::ResourceState;
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// A diff between current and desired state of one step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionDiff {
    /// Identifier of the step, e.g. `service[nginx]`
    pub action_id: String,
    /// Kind of the action
    pub kind: String,
    /// Human-readable description
    pub description: String,
    /// Current state
    pub current: ResourceState,
    /// Desired state
    pub desired: ResourceState,
}

impl ActionDiff {
    /// Create a diff from an action, returning None if no changes needed
    pub fn from_action(action: &Action, host: &Host) -> Result<Option<Self>> {
        if action.is_fatal() || !action.needs_apply(host)? {
            return Ok(None);
        }

        Ok(Some(Self {
            action_id: action.id(),
            kind: action.kind().to_string(),
            description: action.description(),
            current: action.current_state(host)?,
            desired: action.desired_state(host)?,
        }))
    }

    /// Check if this diff represents an addition
    pub fn is_addition(&self) -> bool {
        matches!(
            (&self.current, &self.desired),
            (ResourceState::Absent, ResourceState::Present { .. })
        )
    }

    /// Check if this diff represents a removal
    pub fn is_removal(&self) -> bool {
        matches!(
            (&self.current, &self.desired),
            (ResourceState::Present { .. }, ResourceState::Absent)
        )
    }
}

/// Compute diffs for every step of a plan, in plan order
///
/// Steps after a fatal step are not inspected, since they would never run.
/// Handlers are not included; they only run when notified.
pub fn compute_diffs(plan: &ExecutionPlan, host: &Host) -> Result<Vec<ActionDiff>> {
    let mut diffs = Vec::new();
    for step in &plan.steps {
        if step.action.is_fatal() {
            break;
        }
        if let Some(diff) = ActionDiff::from_action(&step.action, host)? {
            diffs.push(diff);
        }
    }
    Ok(diffs)
}

/// Diff summary statistics
#[derive(Debug, Clone, Default)]
pub struct DiffSummary {
    /// Number of things to create
    pub additions: usize,
    /// Number of things to remove
    pub removals: usize,
    /// Number of things to modify
    pub modifications: usize,
}

impl DiffSummary {
    /// Create a summary from a list of diffs
    pub fn from_diffs(diffs: &[ActionDiff]) -> Self {
        let mut summary = Self::default();
        for diff in diffs {
            if diff.is_addition() {
                summary.additions += 1;
            } else if diff.is_removal() {
                summary.removals += 1;
            } else {
                summary.modifications += 1;
            }
        }
        summary
    }

    /// Total number of changes
    pub fn total(&self) -> usize {
        self.additions + self.removals + self.modifications
    }

    /// Check if there are any changes
    pub fn has_changes(&self) -> bool {
        self.total() > 0
    }
}
