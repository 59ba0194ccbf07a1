use clap::{Parser, Subcommand};
use clap_complete::Shell;
use hostkit::PlatformFamily;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "nagios-nginx")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Set up nginx as the web front end of a Nagios server", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Attributes file (.json or .toml) overlaid on the platform defaults
    #[arg(short, long, global = true, env = "NAGIOS_NGINX_ATTRIBUTES")]
    pub attributes: Option<String>,

    /// Platform family (debian, rhel, fedora, amazon, suse, arch); detected if omitted
    #[arg(short, long, global = true)]
    pub platform: Option<PlatformFamily>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show the ordered steps, handlers and exports for this host
    Plan(PlanArgs),

    /// Converge the host
    Apply(ApplyArgs),

    /// Render the Nagios virtual host
    Render(RenderArgs),

    /// Validate attributes and the authentication method
    Check,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser)]
pub struct PlanArgs {
    /// Only show matching steps (e.g. services, file, service.nginx, sites)
    #[arg(short, long)]
    pub target: Option<String>,

    /// Print the plan as JSON
    #[arg(long)]
    pub json: bool,

    /// Filesystem root probed for the enabled vhost
    #[arg(long, default_value = "/")]
    pub root: PathBuf,
}

#[derive(Parser)]
pub struct ApplyArgs {
    /// Only apply matching steps (e.g. packages, sites, service.nginx)
    #[arg(short, long)]
    pub target: Option<String>,

    /// Show what would change without changing anything
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Stage files under this directory; package and service steps are only recorded
    #[arg(long, default_value = "/")]
    pub root: PathBuf,

    /// Write a JSON run report to this file
    #[arg(long)]
    pub report: Option<PathBuf>,
}

#[derive(Parser)]
pub struct RenderArgs {
    /// Show a diff against the vhost currently on disk
    #[arg(short, long)]
    pub diff: bool,

    /// Filesystem root the current vhost is read from
    #[arg(long, default_value = "/")]
    pub root: PathBuf,
}
