//! Plan and diff display

use colored::Colorize;
use declarative::{ActionDiff, DiffSummary, ExecutionPlan, ResourceState, Timing};
use similar::{ChangeTag, TextDiff};
use std::collections::BTreeMap;

/// Display the ordered steps of a plan with their notifications
pub fn display_plan(plan: &ExecutionPlan) {
    println!();
    for (index, step) in plan.steps.iter().enumerate() {
        let marker = if step.action.is_fatal() {
            "✗".red()
        } else {
            "•".cyan()
        };
        println!(
            "  {} {:>2}. {:<48} {}",
            marker,
            index + 1,
            step.id(),
            step.action.description().dimmed()
        );
        for notify in &step.notifies {
            let timing = match notify.timing {
                Timing::Immediate => "immediately".yellow(),
                Timing::Deferred => "at end".dimmed(),
            };
            println!("         {} notifies {} {}", "↳".dimmed(), notify.handler, timing);
        }
    }

    if !plan.handlers.is_empty() {
        println!();
        println!("  {}", "Handlers".bold());
        for (name, action) in &plan.handlers {
            println!("    {:<16} {}", name, action.description().dimmed());
        }
    }

    if !plan.exports.is_empty() {
        println!();
        println!("  {}", "Exports".bold());
        for (key, value) in &plan.exports {
            println!("    {} = {}", key, value.green());
        }
    }
}

/// Display a list of diffs grouped by kind
pub fn display_diff(diffs: &[ActionDiff]) {
    if diffs.is_empty() {
        println!();
        println!("  {} No changes needed", "✓".green());
        return;
    }

    let mut by_kind: BTreeMap<&str, Vec<&ActionDiff>> = BTreeMap::new();
    for diff in diffs {
        by_kind.entry(diff.kind.as_str()).or_default().push(diff);
    }

    println!();
    println!(
        "┌─ {} ─────────────────────────────────────────┐",
        "Pending Changes".bold()
    );
    println!("│");

    for (kind, kind_diffs) in &by_kind {
        let title = match *kind {
            "package" => "Packages",
            "service" => "Services",
            "file" => "Files",
            "link" => "Sites",
            "template" => "Templates",
            other => other,
        };
        println!("│ {}", title.bold());

        for diff in kind_diffs {
            let symbol = match (&diff.current, &diff.desired) {
                (ResourceState::Absent, ResourceState::Present { .. }) => "+".green(),
                (ResourceState::Present { .. }, ResourceState::Absent) => "-".red(),
                _ => "~".yellow(),
            };
            println!(
                "│   {} {:<44} {}",
                symbol,
                diff.action_id,
                describe_states(&diff.current, &diff.desired).dimmed()
            );
        }
        println!("│");
    }

    let summary = DiffSummary::from_diffs(diffs);
    println!("├─────────────────────────────────────────────────────┤");
    println!(
        "│ Summary: {} changes ({} to add, {} to change, {} to remove)",
        summary.total().to_string().bold(),
        summary.additions.to_string().green(),
        summary.modifications.to_string().yellow(),
        summary.removals.to_string().red()
    );
    println!("└─────────────────────────────────────────────────────┘");
}

fn describe_states(current: &ResourceState, desired: &ResourceState) -> String {
    match (current, desired) {
        (ResourceState::Absent, ResourceState::Present { details }) => details
            .as_ref()
            .map(|d| format!("(absent) → {d}"))
            .unwrap_or_else(|| "(absent)".to_string()),
        (ResourceState::Present { details: from }, ResourceState::Present { details: to }) => {
            format!(
                "{} → {}",
                from.as_deref().unwrap_or("current"),
                to.as_deref().unwrap_or("desired")
            )
        }
        (ResourceState::Modified { from, to }, _) => format!("{from} → {to}"),
        (ResourceState::Present { .. }, ResourceState::Absent) => "(will remove)".to_string(),
        _ => String::new(),
    }
}

/// Changed lines of a file grouped into hunks with three lines of context
fn hunks(old: &str, new: &str) -> Vec<Vec<(ChangeTag, String)>> {
    let diff = TextDiff::from_lines(old, new);
    diff.grouped_ops(3)
        .iter()
        .map(|group| {
            group
                .iter()
                .flat_map(|op| diff.iter_changes(op))
                .map(|change| {
                    let line = change.to_string_lossy();
                    (change.tag(), line.trim_end_matches('\n').to_string())
                })
                .collect()
        })
        .collect()
}

/// Print a colored unified diff of a file
pub fn display_text_diff(path: &str, old: &str, new: &str) {
    if old == new {
        println!("  {} {} is up to date", "✓".green(), path);
        return;
    }

    println!();
    println!("{}", format!("--- a{path}").red());
    println!("{}", format!("+++ b{path}").green());
    for hunk in hunks(old, new) {
        println!("{}", "@@".cyan());
        for (tag, line) in hunk {
            match tag {
                ChangeTag::Delete => println!("{}", format!("-{line}").red()),
                ChangeTag::Insert => println!("{}", format!("+{line}").green()),
                ChangeTag::Equal => println!("{}", format!(" {line}").dimmed()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hunks() {
        let hunks = hunks("listen 80;\nroot /a;\n", "listen 443 ssl;\nroot /a;\n");
        assert_eq!(hunks.len(), 1);
        assert_eq!(
            hunks[0],
            vec![
                (ChangeTag::Delete, "listen 80;".to_string()),
                (ChangeTag::Insert, "listen 443 ssl;".to_string()),
                (ChangeTag::Equal, "root /a;".to_string()),
            ]
        );
        assert!(super::hunks("same\n", "same\n").is_empty());
    }

    #[test]
    fn test_describe_states() {
        assert_eq!(
            describe_states(
                &ResourceState::Absent,
                &ResourceState::Present {
                    details: Some("fcgiwrap".into())
                }
            ),
            "(absent) → fcgiwrap"
        );
        assert_eq!(
            describe_states(&ResourceState::Present { details: None }, &ResourceState::Absent),
            "(will remove)"
        );
        assert_eq!(
            describe_states(
                &ResourceState::Present {
                    details: Some("stopped".into())
                },
                &ResourceState::Present {
                    details: Some("running".into())
                }
            ),
            "stopped → running"
        );
    }
}
