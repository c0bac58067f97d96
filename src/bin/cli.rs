//! RouteLens CLI - list and search HTTP endpoints in a project.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use routelens::search::highlight;
use routelens::{Endpoint, RouteConfig, RouteLens, SourceTree, CONFIG_FILE};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "routelens")]
#[command(about = "RouteLens - find HTTP endpoints in a source tree", long_about = None)]
struct Cli {
    /// Project root directory (default: current directory)
    #[arg(short, long, default_value = ".")]
    root: PathBuf,

    /// Config file (default: <root>/routelens.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List endpoints (best strategy unless told otherwise)
    List {
        /// Run only this strategy (name or framework alias, e.g. jersey)
        #[arg(short, long, conflicts_with = "all")]
        strategy: Option<String>,

        /// Run every strategy and merge
        #[arg(long)]
        all: bool,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Fuzzy-search endpoints by "<METHOD> <path>"
    Search {
        /// Free-text query
        query: String,

        /// Max results
        #[arg(short, long)]
        limit: Option<usize>,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Show registered strategies and whether they apply here
    Strategies {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    init_logging();

    if let Err(e) = run(Cli::parse()) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

/// Logs go to stderr so stdout stays clean for `--json`.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(cli: &Cli) -> Result<RouteConfig> {
    match &cli.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            RouteConfig::from_toml_str(&text)
                .with_context(|| format!("parsing config {}", path.display()))
        }
        None => Ok(RouteConfig::load(&cli.root.join(CONFIG_FILE))),
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = load_config(&cli)?;
    if let Commands::Search {
        limit: Some(limit), ..
    } = &cli.command
    {
        config.search.limit = Some(*limit);
    }
    let tree = SourceTree::open(&cli.root, &config.scan);
    let lens = RouteLens::new(tree, config);

    match &cli.command {
        Commands::List {
            strategy,
            all,
            json,
        } => {
            let endpoints = match (strategy, all) {
                (Some(name), _) => lens.scan_with_strategy(name)?,
                (None, true) => lens.scan_with_all_strategies(),
                (None, false) => lens.find_all_endpoints(),
            };
            if *json {
                println!("{}", serde_json::to_string_pretty(&endpoints)?);
            } else {
                print_endpoints(&endpoints, None);
                println!("\n{} endpoint(s)", endpoints.len());
            }
        }

        Commands::Search { query, json, .. } => {
            let hits = lens.search(query);
            if *json {
                println!("{}", serde_json::to_string_pretty(&hits)?);
            } else if hits.is_empty() {
                println!("No endpoints match '{query}'");
            } else {
                print_endpoints(&hits, Some(query));
            }
        }

        Commands::Strategies { json } => {
            let info = lens.strategy_info();
            if *json {
                println!("{}", serde_json::to_string_pretty(&info)?);
            } else {
                for s in info {
                    println!(
                        "{} {:<8} priority {}  [{}]",
                        if s.applicable { "✓" } else { " " },
                        s.name,
                        s.priority,
                        s.frameworks.join(", ")
                    );
                }
            }
        }
    }

    Ok(())
}

fn print_endpoints(endpoints: &[Endpoint], query: Option<&str>) {
    for e in endpoints {
        let path = match query {
            Some(q) => highlight(e.path(), q, "\x1b[1m", "\x1b[0m"),
            None => e.path().to_string(),
        };
        println!(
            "{:<7} {}  {}.{}  {}",
            e.method(),
            path,
            e.declaring_type(),
            e.member_name(),
            e.location()
        );
    }
}
