use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use fragment_patcher::{
    PatchOutcome, PatchRun, RunReport, Strategy, WorkspaceGuard, DEFAULT_TARGET,
};
use similar::{ChangeTag, TextDiff};
use std::env;
use std::path::{Path, PathBuf};

const SUCCESS_MESSAGE: &str = "Fragment support added successfully!";
const WORKSPACE_ENV: &str = "FRAGMENT_PATCHER_WORKSPACE";

#[derive(Parser)]
#[command(name = "fragment-patcher")]
#[command(about = "Add Fragment vnode support to the renderer module", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace root (defaults to $FRAGMENT_PATCHER_WORKSPACE, then the current directory)
    #[arg(short, long)]
    workspace: Option<PathBuf>,

    /// How insertion points are resolved
    #[arg(short, long, value_enum, default_value_t = StrategyArg::Anchored)]
    strategy: StrategyArg,

    /// Dry run - show what would be changed without modifying files
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Show unified diff of changes
    #[arg(short, long)]
    diff: bool,

    /// Treat skipped patches as failures
    #[arg(long)]
    strict: bool,

    /// Output format for the run report
    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, ValueEnum)]
enum StrategyArg {
    /// Resolve every insertion from document content
    Anchored,
    /// Fixed line offsets for the import and type guard
    Legacy,
}

impl From<StrategyArg> for Strategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Anchored => Strategy::Anchored,
            StrategyArg::Legacy => Strategy::Legacy,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let report = cmd_patch(&cli)?;

    let failed = report.failed() + if cli.strict { report.skipped() } else { 0 };
    if failed > 0 {
        std::process::exit(1);
    }

    Ok(())
}

/// Initialize tracing based on CLI flags. Logs go to stderr; `RUST_LOG` wins.
fn init_tracing(verbose: u8) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = match verbose {
        0 => "fragment_patcher=warn",
        1 => "fragment_patcher=debug",
        _ => "fragment_patcher=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Resolve workspace path
///
/// Priority order:
/// 1. Explicit --workspace flag
/// 2. FRAGMENT_PATCHER_WORKSPACE environment variable
/// 3. Current directory
fn resolve_workspace(cli_workspace: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = cli_workspace {
        return path
            .canonicalize()
            .with_context(|| format!("workspace {} does not exist", path.display()));
    }

    if let Ok(env_path) = env::var(WORKSPACE_ENV) {
        let path = PathBuf::from(&env_path);
        if path.exists() {
            return Ok(path.canonicalize()?);
        }
        eprintln!(
            "{}",
            format!(
                "Warning: {} is set but path doesn't exist: {}",
                WORKSPACE_ENV, env_path
            )
            .yellow()
        );
    }

    Ok(env::current_dir()?)
}

fn cmd_patch(cli: &Cli) -> Result<RunReport> {
    let strategy = Strategy::from(cli.strategy);
    let workspace = resolve_workspace(cli.workspace.as_deref())?;
    let guard = WorkspaceGuard::new(&workspace)?;
    let target = guard
        .validate_path(DEFAULT_TARGET)
        .with_context(|| format!("cannot patch {}", workspace.join(DEFAULT_TARGET).display()))?;

    let applied = PatchRun::load(&target)?.apply(strategy);

    if cli.diff && applied.has_changes() {
        display_diff(&target, applied.original(), &applied.patched());
    }

    let report = if cli.dry_run {
        applied.finish()
    } else {
        guard.revalidate(&target)?;
        applied
            .write()
            .with_context(|| format!("failed to persist {}", target.display()))?
    };

    match cli.format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        Format::Text => print_report(&report, cli.dry_run, cli.strict),
    }

    Ok(report)
}

fn print_report(report: &RunReport, dry_run: bool, strict: bool) {
    println!("Target: {}", report.file.display());
    println!("Strategy: {}", report.strategy);
    if dry_run {
        println!("{}", "  [DRY RUN - showing what would be applied]".cyan());
    }
    println!();

    for entry in &report.outcomes {
        match &entry.outcome {
            PatchOutcome::Applied { line, .. } => {
                let verb = if dry_run { "Would insert" } else { "Inserted" };
                println!("{} {}: {} at line {}", "✓".green(), entry.id, verb, line + 1);
            }
            PatchOutcome::AlreadyApplied { line } => {
                println!(
                    "{} {}: Already applied (line {})",
                    "⊙".yellow(),
                    entry.id,
                    line + 1
                );
            }
            PatchOutcome::Skipped { reason } => {
                eprintln!("{} {}: Skipped - {}", "⊘".cyan(), entry.id, reason);
            }
            PatchOutcome::Failed { reason } => {
                eprintln!("{} {}: Failed - {}", "✗".red(), entry.id, reason);
            }
        }
    }

    println!();
    println!("{}", "Summary:".bold());
    println!("  {} applied", format!("{}", report.applied()).green());
    println!(
        "  {} already applied",
        format!("{}", report.already_applied()).yellow()
    );
    println!("  {} skipped", format!("{}", report.skipped()).cyan());
    println!("  {} failed", format!("{}", report.failed()).red());
    println!();

    if report.failed() > 0 || (strict && report.skipped() > 0) {
        eprintln!("{}", "Fragment support was not fully added.".red());
    } else if report.applied() == 0 && report.skipped() == 0 {
        println!("{}", "Fragment support already present; nothing to do.".dimmed());
    } else if dry_run {
        println!("{}", "Dry run complete; no files were modified.".dimmed());
    } else {
        if report.skipped() > 0 {
            eprintln!(
                "{}",
                "Warning: some patches were skipped, the renderer may be incomplete.".yellow()
            );
        }
        println!("{}", SUCCESS_MESSAGE);
    }
}

/// Helper: Show unified diff between original and modified content
fn display_diff(file: &Path, original: &str, modified: &str) {
    println!(
        "\n{}",
        format!("--- {} (original)", file.display()).dimmed()
    );
    println!("{}", format!("+++ {} (patched)", file.display()).dimmed());

    let diff = TextDiff::from_lines(original, modified);

    let mut unified = diff.unified_diff();
    unified.context_radius(3);

    for hunk in unified.iter_hunks() {
        println!("{}", format!("{}", hunk.header()).cyan());
        for change in hunk.iter_changes() {
            let sign = match change.tag() {
                ChangeTag::Delete => format!("-{}", change).red(),
                ChangeTag::Insert => format!("+{}", change).green(),
                ChangeTag::Equal => format!(" {}", change).normal(),
            };
            print!("{}", sign);
        }
    }
    println!();
}
