mod attributes;
mod auth;
mod cli;
mod commands;
mod engine;
mod paths;
mod recipe;
mod ui;
mod vhost;

use anyhow::Result;
use attributes::HostAttributes;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use hostkit::PlatformFamily;
use std::io;
use std::path::PathBuf;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
    pub attributes: Option<String>,
    pub platform: Option<PlatformFamily>,
}

impl Context {
    /// Attributes file from the command line, else the one in the config directory
    pub fn attributes_file(&self) -> Result<Option<PathBuf>> {
        match &self.attributes {
            Some(path) => Ok(Some(paths::expand(path))),
            None => paths::default_attributes_file(),
        }
    }

    pub fn load_attributes(&self) -> Result<HostAttributes> {
        let file = self.attributes_file()?;
        if let Some(path) = &file {
            log::info!("Loading attributes from {}", path.display());
        }
        Ok(HostAttributes::load(file.as_deref(), self.platform)?)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
        attributes: cli.attributes,
        platform: cli.platform,
    };

    match cli.command {
        Command::Plan(args) => commands::plan::run(&ctx, &args),
        Command::Apply(args) => commands::apply::run(&ctx, &args),
        Command::Render(args) => commands::render::run(&ctx, &args),
        Command::Check => commands::check::run(&ctx),
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "nagios-nginx", &mut io::stdout());
            Ok(())
        }
    }
}
