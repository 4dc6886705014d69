use anchor_patcher::config::{load_rule_file, RuleFile};
use anchor_patcher::{
    check, patch_all, AttemptResult, FileReport, FsTextIo, PatchOutcome, WorkspaceGuard,
};
use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use colored::Colorize;
use serde::Serialize;
use similar::{ChangeTag, TextDiff};
use std::env;
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

const WORKSPACE_ENV: &str = "ANCHOR_PATCHER_WORKSPACE";

#[derive(Parser)]
#[command(name = "anchor-patcher")]
#[command(about = "Idempotent anchor-based source patching", long_about = None)]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct RuleSource {
    /// Workspace root (defaults to $ANCHOR_PATCHER_WORKSPACE, then the current directory)
    #[arg(short, long)]
    workspace: Option<PathBuf>,

    /// Rule file to use (repeatable; otherwise every .toml in <workspace>/patches)
    #[arg(short, long = "rules")]
    rules: Vec<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply rule files to a target
    Apply {
        /// Target file (otherwise each rule file's meta.target)
        target: Option<PathBuf>,

        #[command(flatten)]
        source: RuleSource,

        /// Dry run - show what would be changed without modifying files
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Show unified diff of changes
        #[arg(short, long)]
        diff: bool,
    },

    /// Report what apply would do, without writing
    Status {
        /// Target file (otherwise each rule file's meta.target)
        target: Option<PathBuf>,

        #[command(flatten)]
        source: RuleSource,

        /// Print machine-readable JSON
        #[arg(long)]
        json: bool,
    },

    /// List rule files with their changes and rules
    List {
        #[command(flatten)]
        source: RuleSource,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Apply {
            target,
            source,
            dry_run,
            diff,
        } => cmd_apply(target, source, dry_run, diff),

        Commands::Status {
            target,
            source,
            json,
        } => cmd_status(target, source, json),

        Commands::List { source } => cmd_list(source),
    }
}

fn init_tracing(verbosity: u8) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(match verbosity {
            0 => "warn",
            1 => "debug",
            _ => "trace",
        })
    });
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Resolve the workspace root.
///
/// Priority order:
/// 1. Explicit --workspace flag
/// 2. ANCHOR_PATCHER_WORKSPACE environment variable
/// 3. Current directory
fn resolve_workspace(cli_workspace: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = cli_workspace {
        return path
            .canonicalize()
            .with_context(|| format!("workspace not found: {}", path.display()));
    }

    if let Ok(env_path) = env::var(WORKSPACE_ENV) {
        let path = PathBuf::from(&env_path);
        if path.exists() {
            return Ok(path.canonicalize()?);
        }
        eprintln!(
            "{}",
            format!("Warning: {WORKSPACE_ENV} is set but path doesn't exist: {env_path}").yellow()
        );
    }

    Ok(env::current_dir()?.canonicalize()?)
}

/// Discover all .toml rule files directly under `<workspace>/patches`.
fn discover_rule_files(workspace: &Path) -> Result<Vec<PathBuf>> {
    let patches_dir = workspace.join("patches");
    if !patches_dir.is_dir() {
        anyhow::bail!(
            "No rule files given and {} does not exist (use --rules)",
            patches_dir.display()
        );
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(&patches_dir).max_depth(1) {
        let entry = entry?;
        if entry.file_type().is_file()
            && entry.path().extension().and_then(|s| s.to_str()) == Some("toml")
        {
            files.push(entry.path().to_path_buf());
        }
    }
    files.sort();

    if files.is_empty() {
        anyhow::bail!("No .toml rule files found in {}", patches_dir.display());
    }
    Ok(files)
}

/// Load and compile every rule file. Any configuration error is fatal
/// before a target is touched.
fn load_rule_files(source: &RuleSource, workspace: &Path) -> Result<Vec<RuleFile>> {
    let paths = if source.rules.is_empty() {
        discover_rule_files(workspace)?
    } else {
        source.rules.clone()
    };

    paths
        .iter()
        .map(|path| {
            debug!(path = %path.display(), "loading rule file");
            load_rule_file(path).map_err(anyhow::Error::from)
        })
        .collect()
}

fn resolve_target(
    cli_target: Option<&Path>,
    rule_file: &RuleFile,
    guard: &WorkspaceGuard,
) -> Result<PathBuf> {
    let target = match (cli_target, &rule_file.meta.target) {
        (Some(target), _) => target.to_path_buf(),
        (None, Some(target)) => PathBuf::from(target),
        (None, None) => anyhow::bail!(
            "no target given and {} has no meta.target",
            rule_file_label(rule_file)
        ),
    };
    Ok(guard.resolve_target(target)?)
}

fn rule_file_label(rule_file: &RuleFile) -> String {
    match &rule_file.path {
        Some(path) => path.display().to_string(),
        None => rule_file.meta.name.clone(),
    }
}

/// Show unified diff between original and patched content
fn display_diff(file: &Path, original: &str, modified: &str) {
    println!(
        "\n{}",
        format!("--- {} (original)", file.display()).dimmed()
    );
    println!("{}", format!("+++ {} (patched)", file.display()).dimmed());

    let diff = TextDiff::from_lines(original, modified);

    for change in diff.iter_all_changes() {
        let line = match change.tag() {
            ChangeTag::Delete => format!("-{}", change).red(),
            ChangeTag::Insert => format!("+{}", change).green(),
            ChangeTag::Equal => format!(" {}", change).normal(),
        };
        print!("{}", line);
        if change.missing_newline() {
            println!();
        }
    }
}

#[derive(Default)]
struct Totals {
    applied: usize,
    already_applied: usize,
    skipped: usize,
    failed: usize,
}

fn print_file_report(report: &FileReport, dry_run: bool, totals: &mut Totals) {
    let file = report.path.display();
    for change in &report.reports {
        match &change.outcome {
            PatchOutcome::Applied { rule } => {
                let verb = if dry_run { "Would apply" } else { "Applied" };
                println!(
                    "{} {}: {} (rule {}) to {}",
                    "✓".green(),
                    change.change,
                    verb,
                    rule,
                    file
                );
                totals.applied += 1;
            }
            PatchOutcome::AlreadyApplied => {
                println!("{} {}: Already applied to {}", "⊙".yellow(), change.change, file);
                totals.already_applied += 1;
            }
            PatchOutcome::Skipped => {
                println!("{} {}: Skipped (no rule matched)", "⊘".cyan(), change.change);
                for attempt in &change.attempts {
                    if let AttemptResult::Missed(reason) = &attempt.result {
                        println!("    - {}", format!("{}: {}", attempt.rule, reason).dimmed());
                    }
                }
                totals.skipped += 1;
            }
        }
    }
}

fn cmd_apply(
    target: Option<PathBuf>,
    source: RuleSource,
    dry_run: bool,
    show_diff: bool,
) -> Result<()> {
    let workspace = resolve_workspace(source.workspace.clone())?;
    let guard = WorkspaceGuard::new(&workspace)?;
    let rule_files = load_rule_files(&source, &workspace)?;

    println!("Workspace: {}", workspace.display());
    if dry_run {
        println!("{}", "[DRY RUN - showing what would be applied]".cyan());
    }
    println!();

    let io = FsTextIo;
    let mut totals = Totals::default();

    for rule_file in &rule_files {
        println!("Loading rules from {}...", rule_file_label(rule_file));
        let target_path = resolve_target(target.as_deref(), rule_file, &guard)?;

        let result = if dry_run {
            check(&io, &target_path, &rule_file.changes)
        } else {
            patch_all(&io, &target_path, &rule_file.changes)
        };

        match result {
            Ok(report) => {
                print_file_report(&report, dry_run, &mut totals);
                if show_diff && report.changed() {
                    display_diff(&report.path, &report.original, &report.patched);
                }
            }
            Err(e) => {
                eprintln!("{} {}: Error - {}", "✗".red(), rule_file_label(rule_file), e);
                totals.failed += rule_file.changes.len();
            }
        }

        println!();
    }

    println!("{}", "Summary:".bold());
    println!("  {} applied", format!("{}", totals.applied).green());
    println!(
        "  {} already applied",
        format!("{}", totals.already_applied).yellow()
    );
    println!("  {} skipped", format!("{}", totals.skipped).cyan());
    println!("  {} failed", format!("{}", totals.failed).red());

    if totals.failed > 0 {
        std::process::exit(1);
    }

    Ok(())
}

#[derive(Serialize)]
struct StatusEntry {
    rules: String,
    target: PathBuf,
    change: String,
    #[serde(flatten)]
    outcome: PatchOutcome,
}

fn select(entries: &[StatusEntry], pred: fn(&PatchOutcome) -> bool) -> Vec<&StatusEntry> {
    entries.iter().filter(|e| pred(&e.outcome)).collect()
}

fn cmd_status(target: Option<PathBuf>, source: RuleSource, json: bool) -> Result<()> {
    let workspace = resolve_workspace(source.workspace.clone())?;
    let guard = WorkspaceGuard::new(&workspace)?;
    let rule_files = load_rule_files(&source, &workspace)?;

    let io = FsTextIo;
    let mut entries = Vec::new();
    for rule_file in &rule_files {
        let target_path = resolve_target(target.as_deref(), rule_file, &guard)?;
        let report = check(&io, &target_path, &rule_file.changes)
            .with_context(|| format!("checking {}", rule_file_label(rule_file)))?;

        entries.extend(report.reports.into_iter().map(|change| StatusEntry {
            rules: rule_file_label(rule_file),
            target: report.path.clone(),
            change: change.change,
            outcome: change.outcome,
        }));
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    println!("{}", "Patch Status Report".bold());
    println!("Workspace: {}", workspace.display());
    println!();

    let applied = select(&entries, |o| matches!(o, PatchOutcome::AlreadyApplied));
    let pending = select(&entries, |o| matches!(o, PatchOutcome::Applied { .. }));
    let skipped = select(&entries, |o| matches!(o, PatchOutcome::Skipped));

    if !applied.is_empty() {
        println!(
            "{} {} ({} changes)",
            "✓".green(),
            "APPLIED".green().bold(),
            applied.len()
        );
        for entry in &applied {
            println!("  - {} ({})", entry.change, entry.target.display());
        }
        println!();
    }

    if !pending.is_empty() {
        println!(
            "{} {} ({} changes)",
            "⊙".yellow(),
            "NOT APPLIED".yellow().bold(),
            pending.len()
        );
        for entry in &pending {
            if let PatchOutcome::Applied { rule } = &entry.outcome {
                println!(
                    "  - {} ({})",
                    entry.change,
                    format!("rule {rule} would apply").dimmed()
                );
            }
        }
        println!();
    }

    if !skipped.is_empty() {
        println!(
            "{} {} ({} changes)",
            "⊘".cyan(),
            "SKIPPED".cyan().bold(),
            skipped.len()
        );
        for entry in &skipped {
            println!("  - {} ({})", entry.change, "no rule matches".dimmed());
        }
        println!();
    }

    Ok(())
}

fn cmd_list(source: RuleSource) -> Result<()> {
    let workspace = resolve_workspace(source.workspace.clone())?;
    let rule_files = load_rule_files(&source, &workspace)?;

    for rule_file in &rule_files {
        println!(
            "{} {}",
            rule_file.meta.name.bold(),
            format!("({})", rule_file_label(rule_file)).dimmed()
        );
        if let Some(description) = &rule_file.meta.description {
            println!("  {}", description);
        }
        if let Some(target) = &rule_file.meta.target {
            println!("  target: {}", target);
        }
        for change in &rule_file.changes {
            println!("  - {}", change.id);
            for (idx, rule) in change.rules.iter().enumerate() {
                println!(
                    "      {}. {} [{}] {}",
                    idx + 1,
                    rule.id,
                    rule.transform.kind(),
                    rule.anchor.to_string().dimmed()
                );
            }
        }
        println!();
    }

    Ok(())
}
