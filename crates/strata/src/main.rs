//! strata CLI - layered system configuration manager
//!
//! This is the main entry point for the strata command-line interface.

mod cli;
mod commands;
mod output;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::{Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.quiet);

    let settings = cli.settings.as_path();
    match cli.command {
        Commands::Show(args) => commands::config::show(args, settings),
        Commands::Set(args) => commands::config::set(args, settings),
        Commands::DeleteKey(args) => commands::config::delete_key(args, settings),
        Commands::DeleteSection(args) => commands::config::delete_section(args, settings),
        Commands::ListAdd(args) => commands::config::list_add(args, settings),
        Commands::ListRemove(args) => commands::config::list_remove(args, settings),
        Commands::SequenceAdd(args) => commands::config::sequence_add(args, settings),
        Commands::SequenceRemove(args) => commands::config::sequence_remove(args, settings),
        Commands::Plugin(cmd) => commands::plugin::run(cmd, settings),
        Commands::Profile(cmd) => commands::profile::run(cmd, settings),
        Commands::Deploy(args) => commands::deploy::deploy(args, settings),
        Commands::Restart(args) => commands::deploy::restart(args, settings, false),
        Commands::Reload(args) => commands::deploy::restart(args, settings, true),
    }
}

/// Initialize tracing with appropriate verbosity
fn init_tracing(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            // Deployment steps are reported at info level
            0 => EnvFilter::new("info"),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}
