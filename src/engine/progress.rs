//! Terminal progress for apply runs

use colored::Colorize;
use declarative::{ApplyResult, ProgressCallback, Timing};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashSet;

/// Progress bar over plan steps.
///
/// Handlers are added to the bar length as they get notified (deferred ones
/// once), so the bar still ends full when reloads run.
pub struct ApplyProgress {
    bar: ProgressBar,
    verbose: bool,
    deferred: HashSet<String>,
}

impl ApplyProgress {
    pub fn new(steps: usize, verbose: bool) -> Self {
        let bar = ProgressBar::new(steps as u64);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        Self {
            bar,
            verbose,
            deferred: HashSet::new(),
        }
    }

    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
            verbose: false,
            deferred: HashSet::new(),
        }
    }
}

impl Drop for ApplyProgress {
    fn drop(&mut self) {
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }
}

fn symbol(result: &ApplyResult) -> colored::ColoredString {
    match result {
        ApplyResult::NoChange => "○".dimmed(),
        ApplyResult::Created | ApplyResult::Modified => "✓".green(),
        ApplyResult::Removed => "-".red(),
        ApplyResult::Skipped { .. } => "⊘".yellow(),
    }
}

impl ProgressCallback for ApplyProgress {
    fn on_step_start(&mut self, _id: &str, description: &str) {
        self.bar.set_message(description.to_string());
    }

    fn on_step_complete(&mut self, id: &str, result: &ApplyResult) {
        if self.verbose || !matches!(result, ApplyResult::NoChange) {
            let suffix = match result {
                ApplyResult::Skipped { reason } => format!(" ({reason})"),
                _ => String::new(),
            };
            self.bar
                .println(format!("  {} {}{}", symbol(result), id, suffix.dimmed()));
        }
        self.bar.inc(1);
    }

    fn on_notify(&mut self, step: &str, handler: &str, timing: Timing) {
        log::debug!("{step} notified {handler} ({timing})");
        let runs = match timing {
            Timing::Immediate => true,
            Timing::Deferred => self.deferred.insert(handler.to_string()),
        };
        if runs {
            self.bar.inc_length(1);
        }
    }

    fn on_run_complete(&mut self) {
        self.bar.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RELOAD: &str = "reload-nginx";

    #[test]
    fn test_bar_grows_with_handlers() {
        let mut progress = ApplyProgress::hidden();
        progress.bar.set_length(3);

        progress.on_notify("file[/etc/nginx/conf.d/default.conf]", RELOAD, Timing::Immediate);
        assert_eq!(progress.bar.length(), Some(4));

        progress.on_notify("file[/etc/nginx/sites-enabled/default]", RELOAD, Timing::Deferred);
        progress.on_notify("link[/etc/nginx/sites-enabled/nagios3.conf]", RELOAD, Timing::Deferred);
        assert_eq!(progress.bar.length(), Some(5));
    }
}
