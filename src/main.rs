//! FolderSync CLI
//!
//! Command-line interface for keeping configured file and folder pairs
//! identical across a workspace.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::env;
use std::path::PathBuf;

use foldersync::{SyncEngine, SyncTree, config, watch};

#[derive(Parser)]
#[command(name = "foldersync")]
#[command(
    author,
    version,
    about = "Keep pairs of files and folders in sync across a workspace"
)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Show detailed output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a starter configuration file
    Init {
        /// Directory for the new configuration (default: current directory)
        #[arg(short, long)]
        path: Option<PathBuf>,

        /// Overwrite an existing configuration without asking
        #[arg(short, long)]
        force: bool,
    },

    /// Rescan the configuration and show the tracked pairs
    Status {
        /// Workspace root folders to scan (default: current directory)
        #[arg(short, long = "root", value_name = "DIR")]
        roots: Vec<PathBuf>,

        /// Workspace aggregate file carrying foldersync settings
        #[arg(short, long)]
        workspace: Option<PathBuf>,
    },

    /// Rescan and run the initial synchronization (newest side wins)
    Sync {
        /// Workspace root folders to scan (default: current directory)
        #[arg(short, long = "root", value_name = "DIR")]
        roots: Vec<PathBuf>,

        /// Workspace aggregate file carrying foldersync settings
        #[arg(short, long)]
        workspace: Option<PathBuf>,
    },

    /// Run the initial synchronization, then mirror file events as they happen
    Watch {
        /// Workspace root folders to scan (default: current directory)
        #[arg(short, long = "root", value_name = "DIR")]
        roots: Vec<PathBuf>,

        /// Workspace aggregate file carrying foldersync settings
        #[arg(short, long)]
        workspace: Option<PathBuf>,
    },
}

/// Starter configuration written by `foldersync init`.
const DEFAULT_CONFIG: &str = r#"{
    "folders": [
        ["folder-a", "folder-b"]
    ],
    "files": []
}
"#;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Single-threaded cooperative execution: every file system call is
    // async, but nothing runs in parallel.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build async runtime")?;

    runtime.block_on(run(cli))
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Init { path, force } => init(path, force),

        Commands::Status { roots, workspace } => {
            let mut engine = make_engine(roots, workspace)?;
            engine.rescan().await;

            println!("{}", "➤ Tracked pairs".cyan().bold());
            print_tree(engine.tree(), 1);
            println!(
                "\n  Tracked paths: {}",
                engine.mapping().len().to_string().green()
            );
            Ok(())
        }

        Commands::Sync { roots, workspace } => {
            let mut engine = make_engine(roots, workspace)?;
            engine.rescan().await;

            println!("{}", "➤ Running initial synchronization".cyan().bold());
            let report = engine.initial_sync().await;
            print_sync_summary(&report);
            if !report.is_clean() {
                anyhow::bail!(
                    "initial synchronization completed with {} error(s)",
                    report.errors.len()
                );
            }
            Ok(())
        }

        Commands::Watch { roots, workspace } => {
            let roots = default_roots(roots)?;
            let mut engine = make_engine(roots.clone(), workspace)?;
            engine.rescan().await;

            println!("{}", "➤ Running initial synchronization".cyan().bold());
            let report = engine.initial_sync().await;
            // Partial failure is reported but does not stop watching;
            // the next event is the retry mechanism
            print_sync_summary(&report);

            println!("\n{}", "➤ Watching for changes (Ctrl-C to stop)".cyan().bold());
            watch::watch(&mut engine, &roots).await
        }
    }
}

fn init(path: Option<PathBuf>, force: bool) -> Result<()> {
    use dialoguer::{Confirm, theme::ColorfulTheme};

    let dir = match path {
        Some(path) => path,
        None => env::current_dir().context("Failed to resolve current directory")?,
    };
    let config_path = dir.join(config::CONFIG_FILE_NAME);

    if config_path.exists() && !force {
        let overwrite = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(format!(
                "{} already exists. Overwrite?",
                config_path.display()
            ))
            .default(false)
            .interact()?;
        if !overwrite {
            println!("  {} Keeping existing configuration", "○".yellow());
            return Ok(());
        }
    }

    std::fs::write(&config_path, DEFAULT_CONFIG)
        .with_context(|| format!("Failed to write {}", config_path.display()))?;
    println!("  {} Created: {}", "✔".green(), config_path.display());
    println!(
        "\nNext steps:\n  1. Declare your folder pairs in {}\n  2. Run {} to reconcile them",
        config::CONFIG_FILE_NAME.cyan(),
        "foldersync sync".cyan()
    );
    Ok(())
}

fn make_engine(roots: Vec<PathBuf>, workspace: Option<PathBuf>) -> Result<SyncEngine> {
    Ok(SyncEngine::new(workspace, default_roots(roots)?))
}

fn default_roots(roots: Vec<PathBuf>) -> Result<Vec<PathBuf>> {
    if roots.is_empty() {
        Ok(vec![
            env::current_dir().context("Failed to resolve current directory")?,
        ])
    } else {
        Ok(roots)
    }
}

fn print_sync_summary(report: &foldersync::ReconcileReport) {
    if report.is_clean() {
        println!(
            "\n{} Files copied: {}",
            "✨ Initial synchronization complete!".green().bold(),
            report.copied.to_string().green()
        );
        return;
    }

    println!(
        "\n{} Copied: {}, Errors: {}",
        "Initial synchronization completed with errors.".yellow().bold(),
        report.copied.to_string().green(),
        report.errors.len().to_string().red()
    );
    for error in &report.errors {
        eprintln!("  {} {}", "✘".red(), error);
    }
}

fn print_tree(nodes: &[SyncTree], depth: usize) {
    let indent = "  ".repeat(depth);
    for node in nodes {
        match node {
            SyncTree::Container { name, children } => {
                println!("{indent}{}", name.cyan().bold());
                print_tree(children, depth + 1);
            }
            SyncTree::Folder { name, children } => {
                println!("{indent}{} {}", "⇄".green(), name.bold());
                print_tree(children, depth + 1);
            }
            SyncTree::FolderError { name, children } => {
                println!("{indent}{} {}", "✘".red(), name.red());
                print_tree(children, depth + 1);
            }
            SyncTree::Pair { name } => {
                println!("{indent}{} {}", "•".dimmed(), name);
            }
        }
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .init();
}
