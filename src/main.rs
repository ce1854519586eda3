// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//
//! Stack builder CLI - check component prerequisites and install component stacks

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use stack_builder::commands::{self, install::Flags, settings::SettingsAction, Ctx};
use stack_builder::types::ComponentType;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "stack-builder")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Configuration file path
    #[arg(short, long, env = "STACK_BUILDER_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Project root holding .claude/
    #[arg(long, env = "STACK_BUILDER_BASE_PATH", global = true)]
    base_path: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, env = "NO_COLOR", global = true)]
    no_color: bool,

    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check every declared dependency and show its status
    Detect {
        /// Manifest file (default: search the project root)
        #[arg(short, long)]
        manifest: Option<PathBuf>,
    },

    /// Exit non-zero unless every required dependency is present
    Check {
        /// Manifest file (default: search the project root)
        #[arg(short, long)]
        manifest: Option<PathBuf>,
    },

    /// Show how to resolve missing dependencies
    Plan {
        /// Manifest file (default: search the project root)
        #[arg(short, long)]
        manifest: Option<PathBuf>,
    },

    /// Generate a shell script installing what can be installed automatically
    Script {
        /// Manifest file (default: search the project root)
        #[arg(short, long)]
        manifest: Option<PathBuf>,

        /// Output file (stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Install the components in a component, list or stack file
    Install {
        /// Component file (JSON)
        file: PathBuf,

        /// Replace components that are already installed
        #[arg(long)]
        force: bool,

        /// Skip pre-install dependency checks
        #[arg(long)]
        skip_deps: bool,

        /// Show what would happen without changing anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Remove the components in a file
    Uninstall {
        /// Component file (JSON)
        file: PathBuf,
    },

    /// Remove and freshly install the components in a file
    Reinstall {
        /// Component file (JSON)
        file: PathBuf,

        /// Skip pre-install dependency checks
        #[arg(long)]
        skip_deps: bool,
    },

    /// List installed components of a type
    List {
        /// Component type (skill, agent, subagent, mcp, command, hook, setting)
        component_type: ComponentType,
    },

    /// Show which components in a file are installed
    Status {
        /// Component file (JSON)
        file: PathBuf,
    },

    /// Inspect or edit .claude/settings.json
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },

    /// Show the effective configuration
    Config {
        /// Configuration key (omit to show all)
        key: Option<String>,
    },

    /// Generate shell completions
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish)
        shell: clap_complete::Shell,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let mut config = stack_builder::config::load(cli.config.as_deref())?;
    if let Some(base_path) = cli.base_path {
        config.base_path = base_path;
    }

    // Initialize logging; RUST_LOG wins over flags and config
    let log_level = match cli.verbose {
        0 if cli.quiet => "error",
        0 => config.log_level.as_str(),
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let ctx = Ctx {
        config,
        json: cli.json,
        color: !cli.no_color,
    };

    // Execute command
    let success = match cli.command {
        Commands::Detect { manifest } => commands::detect::run(&ctx, manifest).await.map(|()| true),
        Commands::Check { manifest } => commands::check::run(&ctx, manifest).await,
        Commands::Plan { manifest } => commands::plan::run(&ctx, manifest).await.map(|()| true),
        Commands::Script { manifest, output } => {
            commands::script::run(&ctx, manifest, output).await.map(|()| true)
        }
        Commands::Install { file, force, skip_deps, dry_run } => {
            let flags = Flags { force, skip_deps, dry_run };
            commands::install::run(&ctx, &file, flags).await
        }
        Commands::Uninstall { file } => commands::uninstall::run(&ctx, &file).await,
        Commands::Reinstall { file, skip_deps } => {
            let flags = Flags {
                force: true,
                skip_deps,
                dry_run: false,
            };
            commands::install::run(&ctx, &file, flags).await
        }
        Commands::List { component_type } => {
            commands::list::run(&ctx, component_type).await.map(|()| true)
        }
        Commands::Status { file } => commands::status::run(&ctx, &file).await.map(|()| true),
        Commands::Settings { action } => commands::settings::run(&ctx, action).await.map(|()| true),
        Commands::Config { key } => commands::config::run(&ctx, key.as_deref()).map(|()| true),
        Commands::Completions { shell } => {
            commands::completions::run(shell, &mut Cli::command()).map(|()| true)
        }
    }?;

    Ok(if success { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}
