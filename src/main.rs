//! Flowgate CLI - validate, compile and query workflow documents

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use flowgate::{
    compile_strict, compile_with, FixSuggestion, FlowgateConfig, FlowgateError, GraphBuilder,
    OutputFormat, Problem, Severity, TransitionEngine, Validator, WorkflowDocument,
};

#[derive(Parser)]
#[command(name = "flowgate")]
#[command(about = "Flowgate - workflow graphs compiled into transition tables")]
#[command(version)]
struct Cli {
    /// Config file (defaults to ./flowgate.yaml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Show debug logs on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Answer queries from the stored transition table instead of recompiling
    #[arg(long, global = true)]
    stored: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a workflow document
    Validate {
        /// Path to the .json or .yaml document
        file: PathBuf,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Compile the graph and print the transition table
    Compile {
        file: PathBuf,

        /// Store the compiled table back into the document
        #[arg(short, long)]
        write: bool,

        /// Refuse graphs with any error-severity problem
        #[arg(long)]
        strict: bool,
    },

    /// List every state
    States { file: PathBuf },

    /// List the states reachable from a state
    Next {
        file: PathBuf,
        state: String,

        /// Only transitions open to these roles
        #[arg(short, long = "role")]
        roles: Vec<String>,
    },

    /// Check whether a transition is allowed
    Check {
        file: PathBuf,
        from: String,
        to: String,

        /// Actor roles; without any, only the structure is checked
        #[arg(short, long = "role")]
        roles: Vec<String>,
    },

    /// Write a sample workflow document
    Init {
        #[arg(default_value = "workflow.json")]
        file: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .init();

    let result = FlowgateConfig::load(cli.config.as_deref())
        .map_err(anyhow::Error::from)
        .and_then(|config| run(cli.command, &config, cli.stored));

    match result {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            if let Some(err) = e.downcast_ref::<FlowgateError>() {
                if let FlowgateError::Rejected { problems } = err {
                    for problem in problems {
                        print_problem(problem);
                    }
                }
                if let Some(suggestion) = err.fix_suggestion() {
                    eprintln!("  {} {}", "Fix:".yellow(), suggestion);
                }
            }
            std::process::exit(1);
        }
    }
}

/// Run one command; `Ok(false)` means "completed, but exit non-zero"
fn run(command: Commands, config: &FlowgateConfig, stored: bool) -> Result<bool> {
    match command {
        Commands::Validate { file, json } => validate(&file, json, config),
        Commands::Compile {
            file,
            write,
            strict,
        } => compile(&file, write, strict, config),
        Commands::States { file } => states(&file, stored),
        Commands::Next { file, state, roles } => next(&file, &state, &roles, stored),
        Commands::Check {
            file,
            from,
            to,
            roles,
        } => check(&file, &from, &to, &roles, stored),
        Commands::Init { file, force } => init(&file, force),
    }
}

fn load(file: &Path) -> Result<WorkflowDocument> {
    WorkflowDocument::load(file).with_context(|| format!("failed to load {}", file.display()))
}

/// Engine for the query commands
///
/// By default the graph is recompiled. With `stored`, the persisted table is
/// used as-is and a stale one is reported rather than replaced.
fn engine_for(file: &Path, stored: bool) -> Result<TransitionEngine> {
    let document = load(file)?;
    let stale = document.is_stale();

    if !stored {
        if stale && !document.transitions.is_empty() {
            eprintln!(
                "{} stored transitions in '{}' are out of date; answering from a fresh compile",
                "warning:".yellow(),
                file.display()
            );
        }
        return Ok(TransitionEngine::new(document.effective_table()));
    }

    if document.transitions.is_empty() {
        return Err(FlowgateError::MissingInput {
            what: format!("stored transition table in {}", file.display()),
        }
        .into());
    }
    if stale {
        eprintln!(
            "{} stored transitions in '{}' are out of date with the graph; run `flowgate compile --write`",
            "warning:".yellow(),
            file.display()
        );
    }
    Ok(TransitionEngine::from_shared(Arc::clone(&document.transitions)))
}

fn validate(file: &Path, json: bool, config: &FlowgateConfig) -> Result<bool> {
    let document = load(file)?;
    let report = Validator::new(config.validation.clone()).validate(&document.graph);

    if json || config.output.format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(report.is_valid());
    }

    for problem in report.problems() {
        print_problem(problem);
    }

    if report.is_valid() {
        println!(
            "{} Workflow '{}' is valid",
            "✓".green(),
            file.display()
        );
        println!("  States: {}", report.node_count);
        println!("  Transitions: {}", report.edge_count);
        if report.has_warnings() {
            println!("  Warnings: {}", report.warnings.len());
        }
    } else {
        println!(
            "{} Workflow '{}' has {} error(s)",
            "✗".red(),
            file.display(),
            report.errors.len()
        );
    }
    Ok(report.is_valid())
}

fn compile(file: &Path, write: bool, strict: bool, config: &FlowgateConfig) -> Result<bool> {
    let mut document = load(file)?;

    let table = if strict {
        compile_strict(&document.graph)?
    } else {
        let (table, problems) = compile_with(&document.graph, &config.compile)?.into_parts();
        for problem in &problems {
            print_problem(problem);
        }
        table
    };

    println!("{}", serde_json::to_string_pretty(&table)?);

    if write {
        document.transitions = Arc::new(table);
        document.save(file)?;
        eprintln!("{} Wrote transitions to '{}'", "✓".green(), file.display());
    }
    Ok(true)
}

fn states(file: &Path, stored: bool) -> Result<bool> {
    for state in engine_for(file, stored)?.all_states() {
        println!("{}", state);
    }
    Ok(true)
}

fn next(file: &Path, state: &str, roles: &[String], stored: bool) -> Result<bool> {
    let engine = engine_for(file, stored)?;
    if !engine.has_state(state) {
        eprintln!("{} unknown state '{}'", "warning:".yellow(), state);
    }

    let targets: Vec<&str> = if roles.is_empty() {
        engine.next_states(state)
    } else {
        engine
            .available_transitions(state, roles)
            .into_iter()
            .map(|t| t.to.as_str())
            .collect()
    };
    for target in targets {
        println!("{}", target);
    }
    Ok(true)
}

fn check(file: &Path, from: &str, to: &str, roles: &[String], stored: bool) -> Result<bool> {
    let engine = engine_for(file, stored)?;

    if roles.is_empty() {
        if !engine.is_valid_transition(from, to) {
            return Err(FlowgateError::IllegalTransition {
                from: from.to_string(),
                to: to.to_string(),
            }
            .into());
        }
    } else {
        engine.authorize(from, to, roles)?;
    }

    println!("{} {} -> {} is allowed", "✓".green(), from, to);
    let actions = engine.actions_between(from, to);
    if !actions.is_empty() {
        println!("  Actions: {}", actions.join(", "));
    }
    Ok(true)
}

fn init(file: &Path, force: bool) -> Result<bool> {
    if file.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", file.display());
    }

    let graph = GraphBuilder::new()
        .with_state("Draft", |s| s.color("#94a3b8"))
        .with_state("InReview", |s| s.label("In review").color("#f59e0b"))
        .with_state("Approved", |s| s.color("#22c55e"))
        .with_state("Rejected", |s| s.color("#ef4444"))
        .with_transition("Draft", "InReview", |t| t.action("submit"))
        .with_transition("InReview", "Approved", |t| t.action("approve").role("reviewer"))
        .with_transition("InReview", "Rejected", |t| t.action("reject").role("reviewer"))
        .with_transition("Rejected", "Draft", |t| t.action("revise"))
        .build()?;

    let document = WorkflowDocument::from_graph(graph);
    if let Some(parent) = file.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    document.save(file)?;

    println!("{} Created {}", "✓".green(), file.display());
    println!("  Next: flowgate validate {}", file.display());
    Ok(true)
}

fn print_problem(problem: &Problem) {
    let label = match problem.severity {
        Severity::Error => format!("{}[{}]", "error".red().bold(), problem.kind.as_str()),
        Severity::Warning => format!("{}[{}]", "warning".yellow().bold(), problem.kind.as_str()),
    };
    eprintln!("{}: {}", label, problem.message);
    eprintln!("  {} {}", "Fix:".yellow(), problem.suggestion());
}
