//! batch-replace -- find and replace across files.
//!
//! A TARGET is `PATH:LINE` (one batch location) or a single `PATH` (every
//! line of that file). `--stdin` reads `path:line[:text]` locations, as
//! printed by `rg -n`.

use std::collections::BTreeMap;
use std::io::BufRead;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use batch_replace::host::{FileStorage, Storage, TextHost};
use batch_replace::util::diff::unified_diff;
use batch_replace::{
    BatchOptions, BufferHost, BufferId, CancelFlag, MatchLocation, ReplaceRequest, RunReport,
    Scope, Strategy,
};
use clap::Parser;

/// Find and replace across files, one location list at a time.
#[derive(Debug, Parser)]
#[allow(clippy::struct_excessive_bools)]
#[command(name = "batch-replace", version, about)]
struct Args {
    /// Text (or regex with `r`) to search for
    #[arg(long)]
    find: String,

    /// Replacement text
    #[arg(long, default_value = "")]
    replace: String,

    /// Flag letters: c (case-sensitive), w (whole word), r (regex), p (preserve case)
    #[arg(long, default_value = "")]
    flags: String,

    /// Strategy tried first: bulk or precise
    #[arg(long)]
    strategy: Option<Strategy>,

    /// Do not retry line by line when bulk fails
    #[arg(long)]
    no_fallback: bool,

    /// Report what would change without writing files
    #[arg(long)]
    dry_run: bool,

    /// Print a unified diff of every changed file
    #[arg(long)]
    diff: bool,

    /// Print the run report as JSON
    #[arg(long)]
    json: bool,

    /// JSON options file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Read `path:line[:text]` locations from stdin
    #[arg(long)]
    stdin: bool,

    /// `PATH:LINE` locations, or a single `PATH`
    targets: Vec<String>,
}

/// `path:line` with a numeric line, else `None`.
fn parse_location(target: &str) -> Option<MatchLocation> {
    let (path, line) = target.rsplit_once(':')?;
    let line = line.parse().ok()?;
    (!path.is_empty()).then(|| MatchLocation::new(path, line))
}

/// `path:line[:rest]` as printed by grep-style tools.
fn parse_grep_line(line: &str) -> Option<MatchLocation> {
    let mut parts = line.splitn(3, ':');
    let path = parts.next().filter(|p| !p.is_empty())?;
    let line = parts.next()?.trim().parse().ok()?;
    Some(MatchLocation::new(path, line))
}

fn build_scope(args: &Args) -> Result<Scope> {
    let mut locations = Vec::new();
    let mut paths = Vec::new();
    for target in &args.targets {
        match parse_location(target) {
            Some(location) => locations.push(location),
            None => paths.push(target.as_str()),
        }
    }

    if args.stdin {
        for line in std::io::stdin().lock().lines() {
            let line = line.context("failed to read locations from stdin")?;
            match parse_grep_line(&line) {
                Some(location) => locations.push(location),
                None if line.trim().is_empty() => {}
                None => tracing::warn!(line = %line, "skipping unparseable location"),
            }
        }
    }

    match (locations.is_empty(), paths.as_slice()) {
        (true, [path]) => Ok(Scope::Buffer {
            buffer_id: BufferId::from(*path),
        }),
        (true, []) => bail!("no targets given"),
        (true, _) => bail!("whole-file scope takes one PATH; use PATH:LINE targets for a batch"),
        (false, []) => Ok(Scope::Batch {
            locations,
            strategy: args.strategy,
        }),
        (false, _) => bail!("cannot mix PATH and PATH:LINE targets"),
    }
}

fn scope_buffers(scope: &Scope) -> Vec<BufferId> {
    match scope {
        Scope::Buffer { buffer_id } => vec![buffer_id.clone()],
        Scope::Batch { locations, .. } => {
            let mut ids: Vec<BufferId> = locations.iter().map(|l| l.buffer_id.clone()).collect();
            ids.sort();
            ids.dedup();
            ids
        }
    }
}

fn print_summary(report: &RunReport) {
    for outcome in &report.per_buffer {
        let status = match (outcome.failed, outcome.persist_failed) {
            (_, true) => " NOT SAVED",
            (true, false) => " FAILED",
            (false, false) => "",
        };
        println!(
            "{}: {} replacement(s) on {}/{} line(s){status}",
            outcome.display_name, outcome.replacements, outcome.succeeded, outcome.attempted
        );
        for error in &outcome.errors {
            println!("    {error}");
        }
    }
    let strategy = report
        .strategy_used
        .map(|s| format!(" ({s})"))
        .unwrap_or_default();
    let cancelled = if report.cancelled { ", cancelled" } else { "" };
    println!(
        "{} replacement(s) in {} buffer(s){strategy}{cancelled}",
        report.total_replacements,
        report.per_buffer.len()
    );
}

fn main() -> Result<ExitCode> {
    // Initialize tracing to stderr so it does not mix with the report.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut options = match &args.config {
        Some(path) => BatchOptions::from_json_file(path)?,
        None => BatchOptions::default(),
    };
    if let Some(strategy) = args.strategy {
        options.strategy = strategy;
    }
    if args.no_fallback {
        options.fallback = false;
    }
    if args.dry_run {
        options.persist = false;
    }

    let scope = build_scope(&args)?;
    let workspace = std::env::current_dir().context("failed to resolve working directory")?;
    let storage = FileStorage::new(&workspace);

    let before: BTreeMap<BufferId, String> = if args.diff {
        scope_buffers(&scope)
            .into_iter()
            .filter_map(|id| storage.read(&id).ok().map(|text| (id, text)))
            .collect()
    } else {
        BTreeMap::new()
    };

    let request = ReplaceRequest {
        flags: args.flags.clone(),
        find: args.find.clone(),
        replace: args.replace.clone(),
        scope,
    };
    let mut host = TextHost::new(storage);
    let report = batch_replace::execute(&mut host, &request, &options, &CancelFlag::new())?;

    for (id, old) in &before {
        let Some(new) = host.text(id) else { continue };
        if let Some(diff) = unified_diff(&host.display_name(id), old, &new) {
            print!("{diff}");
        }
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report);
    }

    Ok(if report.success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
