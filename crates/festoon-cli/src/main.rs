//! `festoon`: offline tooling over saved design documents.

use clap::{Args, Parser, Subcommand};
use festoon_core::geometry::half_extents;
use festoon_core::stack_grid::preview_layout;
use festoon_core::symbols::has_cycle;
use festoon_core::{
    Catalog, ImportError, MaterialFilter, Scene, StackDirection, StackGridConfig, StackPattern,
    compute_materials, import_document,
};
use serde_json::{Value, json};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("{path} is not valid JSON: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("design rejected: {0}")]
    Import(#[from] ImportError),
    #[error("invalid catalog {path}: {source}")]
    Catalog {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("cannot write output: {0}")]
    Output(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "festoon", version, about = "Inspect saved balloon designs")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Import a design and report what it contains and what had to be repaired.
    Check { design: PathBuf },
    /// Print the material summary as JSON.
    Materials(MaterialsArgs),
    /// Print where a stack-grid re-flow would put every top-level node.
    Reflow(ReflowArgs),
}

#[derive(Args, Debug)]
struct MaterialsArgs {
    design: PathBuf,
    /// Catalog JSON (array of entries). Defaults to the built-in catalog.
    #[arg(long, env = "FESTOON_CATALOG")]
    catalog: Option<PathBuf>,
    #[arg(long)]
    include_hidden: bool,
    #[arg(long)]
    exclude_locked: bool,
}

#[derive(Args, Debug, Default)]
struct ReflowArgs {
    design: PathBuf,
    /// Cells per line. Defaults to the design's own stack grid.
    #[arg(long)]
    cols: Option<usize>,
    #[arg(long)]
    gap_x: Option<f32>,
    #[arg(long)]
    gap_y: Option<f32>,
    /// Fill columns first.
    #[arg(long)]
    column_major: bool,
    /// Reverse every other line.
    #[arg(long)]
    snake: bool,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();
    let result = match cli.command {
        Command::Check { design } => run_check(&design),
        Command::Materials(args) => run_materials(&args),
        Command::Reflow(args) => run_reflow(&args),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            eprintln!("festoon: {e}");
            ExitCode::FAILURE
        }
    }
}

fn read_json(path: &Path) -> Result<Value, CliError> {
    let text = fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| CliError::Json {
        path: path.to_path_buf(),
        source,
    })
}

fn load_design(path: &Path) -> Result<(Value, Scene), CliError> {
    let raw = read_json(path)?;
    let scene = import_document(&raw)?;
    log::debug!("loaded {} with {} nodes", path.display(), scene.nodes.len());
    Ok((raw, scene))
}

fn print_json(value: &impl serde::Serialize) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ─── check ───────────────────────────────────────────────────────────────

fn raw_len(raw: &Value, key: &str) -> usize {
    raw.get(key).and_then(Value::as_array).map_or(0, Vec::len)
}

/// Counts after import, next to what the raw document claimed.
fn check_report(raw: &Value, scene: &Scene) -> Value {
    let instances = scene.nodes.iter().filter(|n| n.symbol_id().is_some()).count();
    let guides = scene.nodes.iter().filter(|n| n.guide).count();
    let raw_instances = raw
        .get("nodes")
        .and_then(Value::as_array)
        .map_or(0, |nodes| {
            nodes
                .iter()
                .filter(|n| n.get("kind").and_then(Value::as_str) == Some("symbol"))
                .count()
        });
    json!({
        "nodes": scene.nodes.len(),
        "groups": scene.groups.len(),
        "symbols": scene.symbols.len(),
        "instances": instances,
        "guides": guides,
        "repairs": {
            "droppedGroups": raw_len(raw, "groups").saturating_sub(scene.groups.len()),
            "unresolvedInstances": raw_instances.saturating_sub(instances),
        },
        "symbolCycle": has_cycle(&scene.symbols),
    })
}

fn run_check(design: &Path) -> Result<(), CliError> {
    let (raw, scene) = load_design(design)?;
    print_json(&check_report(&raw, &scene))
}

// ─── materials ───────────────────────────────────────────────────────────

fn load_catalog(path: Option<&Path>) -> Result<Catalog, CliError> {
    let Some(path) = path else {
        return Ok(Catalog::builtin());
    };
    let text = fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Catalog::from_json(&text).map_err(|source| CliError::Catalog {
        path: path.to_path_buf(),
        source,
    })
}

fn run_materials(args: &MaterialsArgs) -> Result<(), CliError> {
    let (_, scene) = load_design(&args.design)?;
    let catalog = load_catalog(args.catalog.as_deref())?;
    let filter = MaterialFilter {
        include_hidden: args.include_hidden,
        include_locked: !args.exclude_locked,
    };
    print_json(&compute_materials(&scene, &catalog, filter))
}

// ─── reflow ──────────────────────────────────────────────────────────────

fn reflow_config(scene: &Scene, args: &ReflowArgs) -> StackGridConfig {
    let base = &scene.stack_grid.config;
    StackGridConfig {
        count: args.cols.unwrap_or(base.count).max(1),
        gap_x: args.gap_x.filter(|g| g.is_finite()).unwrap_or(base.gap_x),
        gap_y: args.gap_y.filter(|g| g.is_finite()).unwrap_or(base.gap_y),
        direction: if args.column_major {
            StackDirection::Column
        } else {
            base.direction
        },
        pattern: if args.snake {
            StackPattern::Snake
        } else {
            base.pattern
        },
        ..base.clone()
    }
}

fn reflow_targets(scene: &Scene, args: &ReflowArgs) -> Vec<Value> {
    let items: Vec<_> = scene
        .nodes
        .iter()
        .filter(|n| !n.guide)
        .map(|n| {
            let (hw, hh) = half_extents(n, &scene.symbols);
            (n.id, hw, hh)
        })
        .collect();
    preview_layout(&reflow_config(scene, args), &items)
        .into_iter()
        .map(|(id, x, y)| json!({ "id": id.as_str(), "x": x, "y": y }))
        .collect()
}

fn run_reflow(args: &ReflowArgs) -> Result<(), CliError> {
    let (_, scene) = load_design(&args.design)?;
    print_json(&reflow_targets(&scene, args))
}
