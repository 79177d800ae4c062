use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use covx::artifacts::{find_all, find_most_recent, SelectionPolicy};
use covx::config::{Config, Thresholds};
use covx::error::CovxError;
use covx::orchestrator::{CoverageRun, RunRequest};
use covx::paths::resolve;
use covx::report;
use covx::versions::{latest_version_dir, VersionOrdering};
use covx::{SystemProcessRunner, SystemViewer};

#[derive(Parser)]
#[command(name = "covx")]
#[command(about = "Run .NET unit tests with code coverage and render an HTML report")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file (default: covx.toml in the base directory, if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory relative paths are resolved against (default: current directory)
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,

    /// Enable debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run tests with coverage and generate the HTML report
    Run {
        /// Test project file or directory
        project: PathBuf,

        /// Test settings file (default: first *.runsettings next to the project)
        #[arg(short, long)]
        settings: Option<PathBuf>,

        /// Open the report in the default viewer when done
        #[arg(long)]
        open: bool,

        /// Pass --no-build to the test runner
        #[arg(long)]
        no_build: bool,

        /// Print the run summary as JSON
        #[arg(long)]
        json: bool,

        /// Minimum line coverage percentage
        #[arg(long, value_parser = parse_percent)]
        min_line: Option<f64>,

        /// Minimum branch coverage percentage
        #[arg(long, value_parser = parse_percent)]
        min_branch: Option<f64>,
    },

    /// Print the latest installed version directory of a package
    Latest {
        /// Package directory containing one subdirectory per version
        package_root: PathBuf,

        /// How version names are compared
        #[arg(long, value_enum)]
        ordering: Option<VersionOrdering>,
    },

    /// Find the most recent file matching a pattern
    Find {
        /// Directory to search
        root: PathBuf,

        /// File name glob, e.g. "*.coverage"
        pattern: String,

        /// Only search the top-level directory
        #[arg(long)]
        no_recursive: bool,

        /// How the most recent match is chosen
        #[arg(long, value_enum, default_value = "modified")]
        policy: SelectionPolicy,

        /// List every match instead of only the most recent
        #[arg(long)]
        all: bool,
    },
}

fn parse_percent(s: &str) -> std::result::Result<f64, String> {
    let value: f64 = s.parse().map_err(|_| format!("'{}' is not a number", s))?;
    if (0.0..=100.0).contains(&value) {
        Ok(value)
    } else {
        Err(format!("{} is not between 0 and 100", value))
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        let code = e
            .downcast_ref::<CovxError>()
            .map(CovxError::exit_code)
            .unwrap_or(1);
        std::process::exit(code);
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let cwd = std::env::current_dir().context("Could not determine current directory")?;
    let base_dir = match cli.base_dir {
        Some(dir) => cwd.join(dir),
        None => cwd,
    };

    let config_path = cli.config.map(|p| resolve(p, &base_dir)).transpose()?;
    let config = Config::discover(config_path.as_deref(), &base_dir)?;

    match cli.command {
        Commands::Run {
            project,
            settings,
            open,
            no_build,
            json,
            min_line,
            min_branch,
        } => {
            let request = RunRequest {
                project,
                settings,
                open_report: open,
                no_build,
                thresholds: Thresholds {
                    line: min_line.or(config.thresholds.line),
                    branch: min_branch.or(config.thresholds.branch),
                },
            };
            cmd_run(&config, &base_dir, &request, json)
        }
        Commands::Latest { package_root, ordering } => {
            let ordering = ordering.unwrap_or(config.packages.ordering);
            cmd_latest(&resolve(package_root, &base_dir)?, ordering)
        }
        Commands::Find {
            root,
            pattern,
            no_recursive,
            policy,
            all,
        } => cmd_find(&resolve(root, &base_dir)?, &pattern, !no_recursive, policy, all),
    }
}

/// Package cache root: config value, then `NUGET_PACKAGES`, then `~/.nuget/packages`.
fn package_cache_root(config: &Config) -> Result<PathBuf> {
    if let Some(root) = config.cache_root()? {
        return Ok(root);
    }

    if let Some(root) = std::env::var_os("NUGET_PACKAGES").filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(root));
    }

    let home = dirs::home_dir().context("Could not determine home directory for the package cache")?;
    Ok(home.join(".nuget").join("packages"))
}

fn cmd_run(config: &Config, base_dir: &Path, request: &RunRequest, json: bool) -> Result<()> {
    let cache_root = package_cache_root(config)?;
    let runner = SystemProcessRunner;
    let viewer = SystemViewer;

    if !json {
        println!(
            "\n{} {}\n",
            "▶".cyan(),
            request.project.display().to_string().bold()
        );
    }

    let summary = CoverageRun::new(config, base_dir, &cache_root, &runner, &viewer)
        .quiet(json)
        .execute(request)?;

    if json {
        println!("{}", report::to_json(&summary)?);
    } else {
        report::print_summary(&summary);
    }

    if let Some(ref thresholds) = summary.thresholds {
        if !thresholds.passed {
            return Err(CovxError::ThresholdNotMet(thresholds.failures().join(", ")).into());
        }
    }

    Ok(())
}

fn cmd_latest(package_root: &Path, ordering: VersionOrdering) -> Result<()> {
    let latest = latest_version_dir(package_root, ordering)?;
    println!("{}", latest.display());
    Ok(())
}

fn cmd_find(root: &Path, pattern: &str, recursive: bool, policy: SelectionPolicy, all: bool) -> Result<()> {
    if all {
        let candidates = find_all(root, pattern, recursive)?;
        if candidates.is_empty() {
            return Err(CovxError::not_found(format!("File matching '{}'", pattern), root).into());
        }
        for candidate in candidates {
            println!(
                "{}  {}",
                candidate.modified.format("%Y-%m-%d %H:%M:%S").to_string().dimmed(),
                candidate.path.display()
            );
        }
        return Ok(());
    }

    let found = find_most_recent(root, pattern, recursive, policy)?;
    println!("{}", found.display());
    Ok(())
}
