//! Execution planner - ordered steps, notification handlers, exported attributes

use crate::action::Action;
use crate::error::RunError;
use crate::types::Timing;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A notification from a step to a handler
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notify {
    pub handler: String,
    pub timing: Timing,
}

/// An action plus the handlers it notifies when it changes something
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub action: Action,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notifies: Vec<Notify>,
}

impl Step {
    pub fn new(action: Action) -> Self {
        Self {
            action,
            notifies: Vec::new(),
        }
    }

    /// Notify `handler` with `timing` when this step changes something
    pub fn notifies(mut self, handler: &str, timing: Timing) -> Self {
        self.notifies.push(Notify {
            handler: handler.to_string(),
            timing,
        });
        self
    }

    pub fn id(&self) -> String {
        self.action.id()
    }
}

/// An ordered plan of steps
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionPlan {
    /// Steps in the order they must be applied
    pub steps: Vec<Step>,
    /// Actions that only run when notified, keyed by handler id
    pub handlers: BTreeMap<String, Action>,
    /// Attributes the plan publishes for later configuration (e.g. `nagios.web_user`)
    pub exports: BTreeMap<String, String>,
}

impl ExecutionPlan {
    /// Create a new empty plan
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a step
    pub fn push(&mut self, step: Step) {
        self.steps.push(step);
    }

    /// Append a step with no notifications
    pub fn push_action(&mut self, action: Action) {
        self.push(Step::new(action));
    }

    /// Register a handler, replacing any previous one with the same id
    pub fn add_handler(&mut self, id: &str, action: Action) {
        self.handlers.insert(id.to_string(), action);
    }

    pub fn export(&mut self, key: &str, value: impl Into<String>) {
        self.exports.insert(key.to_string(), value.into());
    }

    /// The first fatal step, if the plan carries one
    pub fn fatal_error(&self) -> Option<&Action> {
        self.steps
            .iter()
            .map(|s| &s.action)
            .find(|a| a.is_fatal())
    }

    /// Check that every notification points at a registered handler
    pub fn validate(&self) -> Result<(), RunError> {
        for step in &self.steps {
            for notify in &step.notifies {
                if !self.handlers.contains_key(&notify.handler) {
                    return Err(RunError::UnknownHandler {
                        step: step.id(),
                        handler: notify.handler.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Filter plan to only include steps matching a predicate
    pub fn filter<F>(self, predicate: F) -> Self
    where
        F: Fn(&Step) -> bool,
    {
        Self {
            steps: self.steps.into_iter().filter(|s| predicate(s)).collect(),
            handlers: self.handlers,
            exports: self.exports,
        }
    }

    /// Filter plan to only include steps matching a target pattern
    ///
    /// Target format: "kind" or "kind.name", e.g. "service" or "service.nginx"
    pub fn filter_by_target(self, target: Option<&str>) -> Self {
        match target {
            None => self,
            Some(t) => {
                let (kind, name) = parse_target(t);
                self.filter(|s| matches_filter(&s.action, kind.as_deref(), name.as_deref()))
            }
        }
    }

    /// Number of steps in the plan
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Check if plan is empty
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Parse a target string like "kind.name" into (kind, name)
fn parse_target(target: &str) -> (Option<String>, Option<String>) {
    match target.split_once('.') {
        None => (Some(target.to_string()), None),
        Some((kind, name)) if !kind.contains('/') => {
            (Some(kind.to_string()), Some(name.to_string()))
        }
        Some(_) => (None, Some(target.to_string())),
    }
}

/// Check if an action matches the filter criteria
fn matches_filter(action: &Action, kind: Option<&str>, name: Option<&str>) -> bool {
    if let Some(k) = kind {
        // Allow common aliases
        let matches_kind = match k {
            "packages" => action.kind() == "package",
            "services" => action.kind() == "service",
            "files" | "sites" => matches!(action.kind(), "file" | "link" | "template"),
            "templates" => action.kind() == "template",
            _ => action.kind() == k,
        };
        if !matches_kind {
            return false;
        }
    }

    if let Some(n) = name
        && !action.id().contains(n)
    {
        return false;
    }

    true
}
