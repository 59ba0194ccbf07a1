//! `apply` - converge the host

use anyhow::Result;
use hostkit::{LocalFs, SystemHost};

use crate::Context;
use crate::cli::ApplyArgs;
use crate::engine::{self, ApplyOptions, Outcome, RunOutcome, RunReport};
use crate::recipe::{self, HostFacts};
use crate::ui;
use crate::vhost::VhostTemplates;

pub fn run(ctx: &Context, args: &ApplyArgs) -> Result<()> {
    ui::header("Applying nginx front end for Nagios");

    if args.dry_run {
        ui::warn("Dry run - no changes will be made");
    }

    let attrs = ctx.load_attributes()?;
    let system = SystemHost::new(attrs.platform_family, LocalFs::new(&args.root));
    let templates = VhostTemplates::new()?;
    let plan = recipe::build(&attrs, HostFacts::probe(&system.files, &attrs));
    if system.is_staged() {
        ui::info(&format!(
            "Staging root {}: package and service steps are recorded, not run",
            args.root.display()
        ));
    }

    let mut report = RunReport::start(
        &attrs.fqdn,
        attrs.platform_family.as_str(),
        &plan,
        args.dry_run,
    );

    let result = engine::preflight(&plan)
        .map_err(anyhow::Error::from)
        .and_then(|()| {
            warn_if_unprivileged(args.dry_run, system.is_staged());
            let plan = plan.clone().filter_by_target(args.target.as_deref());
            let opts = ApplyOptions {
                dry_run: args.dry_run,
                yes: args.yes,
                verbose: ctx.verbose > 0,
                quiet: ctx.quiet,
            };
            engine::run(&plan, system.host(&templates), &opts)
        });

    match result {
        Ok(RunOutcome::Completed(summary)) => {
            let skipped = system.skipped();
            if !ctx.quiet && !skipped.is_empty() {
                ui::section("Skipped on staging root");
                for operation in &skipped {
                    ui::dim(operation);
                }
            }
            if !ctx.quiet && !args.dry_run {
                ui::section("Exports");
                for (key, value) in &plan.exports {
                    ui::kv(key, value);
                }
            }
            report.finish(Outcome::Converged, Some(summary));
        }
        Ok(RunOutcome::Aborted) => report.finish(Outcome::Aborted, None),
        Err(err) => {
            super::show_rejection(&plan);
            engine::explain_failure(&err);
            report.fail(&err);
            if let Some(path) = &args.report {
                report.write(path)?;
            }
            return Err(err);
        }
    }

    if let Some(path) = &args.report {
        report.write(path)?;
    }
    Ok(())
}

/// Warn when changing the live host without root privileges
fn warn_if_unprivileged(dry_run: bool, staged: bool) {
    if dry_run || staged || is_root() {
        return;
    }
    ui::warn("Not running as root; package and service steps will likely fail");
}

#[allow(unsafe_code)]
fn is_root() -> bool {
    // SAFETY: geteuid takes no arguments and cannot fail.
    unsafe { libc::geteuid() == 0 }
}
