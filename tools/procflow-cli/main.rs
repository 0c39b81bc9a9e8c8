use clap::{Parser, Subcommand, ValueEnum};
use procflow::prelude::*;
use serde::Deserialize;
use std::fs;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

// --- Editor Document Structs (Input Format Specific) ---
// These match the canvas editor's export and are only used here for conversion.

#[derive(Deserialize)]
struct RawCanvas {
    id: String,
    #[serde(default)]
    name: Option<String>,
    nodes: Vec<RawNode>,
    #[serde(default)]
    edges: Vec<RawEdge>,
    #[serde(default)]
    kpis: Vec<KpiDefinition>,
}

#[derive(Deserialize)]
struct RawNode {
    id: String,
    data: RawNodeData,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawNodeData {
    #[serde(default)]
    label: Option<String>,
    #[serde(flatten)]
    config: NodeConfig,
    #[serde(default)]
    output_variable: Option<String>,
    #[serde(default)]
    on_error: FailurePolicy,
}

#[derive(Deserialize)]
struct RawEdge {
    source: String,
    target: String,
    #[serde(default, alias = "sourceHandle")]
    source_handle: Option<String>,
}

// --- Converter Implementation ---

impl IntoGraph for RawCanvas {
    fn into_graph(self) -> ProcessGraph {
        let nodes = self
            .nodes
            .into_iter()
            .map(|raw| {
                let mut node = Node::new(raw.id, raw.data.config).on_error(raw.data.on_error);
                if let Some(label) = raw.data.label {
                    node = node.labeled(label);
                }
                if let Some(variable) = raw.data.output_variable {
                    node = node.output_to(variable);
                }
                node
            })
            .collect();

        let edges = self
            .edges
            .into_iter()
            .map(|raw| Edge {
                source: raw.source,
                target: raw.target,
                handle: raw.source_handle,
            })
            .collect();

        let mut graph = ProcessGraph::new(self.id, nodes, edges).with_kpis(self.kpis);
        graph.name = self.name;
        graph
    }
}

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum GraphFormat {
    /// The engine's own graph document.
    #[default]
    Native,
    /// A canvas editor export (`data` wrappers, `sourceHandle` edges).
    Canvas,
}

/// Validate and run process graphs
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check a graph document without running it
    Validate {
        graph_path: String,
        #[arg(short, long, value_enum, default_value_t)]
        format: GraphFormat,
    },
    /// Execute a graph and print its trace
    Run {
        graph_path: String,
        #[arg(short, long, value_enum, default_value_t)]
        format: GraphFormat,
        /// JSON object with the initial context variables
        #[arg(short, long)]
        input: Option<String>,
        /// Engine configuration JSON
        #[arg(short, long)]
        config: Option<String>,
        /// Run graphs with cycles instead of rejecting them
        #[arg(long)]
        permissive_cycles: bool,
        /// Use the built-in deterministic completion and inference services
        #[arg(long)]
        mock_collaborators: bool,
        /// Write the execution record to this path
        #[arg(short, long)]
        output: Option<String>,
        /// Print the execution record as JSON instead of a report
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Validate { graph_path, format } => run_validate(&graph_path, format),
        Command::Run {
            graph_path,
            format,
            input,
            config,
            permissive_cycles,
            mock_collaborators,
            output,
            json,
        } => {
            let options = RunSettings {
                input,
                config,
                permissive_cycles,
                mock_collaborators,
                output,
                json,
            };
            run_graph(&graph_path, format, options).await
        }
    }
}

struct RunSettings {
    input: Option<String>,
    config: Option<String>,
    permissive_cycles: bool,
    mock_collaborators: bool,
    output: Option<String>,
    json: bool,
}

fn load_graph(path: &str, format: GraphFormat) -> ProcessGraph {
    match format {
        GraphFormat::Native => ProcessGraph::from_file(path).unwrap_or_else(|e| {
            exit_with_error(&format!("Failed to load graph '{}': {}", path, e))
        }),
        GraphFormat::Canvas => {
            let content = fs::read_to_string(path).unwrap_or_else(|e| {
                exit_with_error(&format!("Failed to read graph file '{}': {}", path, e))
            });
            let raw: RawCanvas = serde_json::from_str(&content).unwrap_or_else(|e| {
                exit_with_error(&format!("Failed to parse canvas JSON: {}", e))
            });
            raw.into_graph()
        }
    }
}

fn run_validate(graph_path: &str, format: GraphFormat) {
    let graph = load_graph(graph_path, format);
    match validate(&graph) {
        Ok(()) => println!(
            "Graph '{}' is valid: {} nodes, {} edges",
            graph.id,
            graph.nodes.len(),
            graph.edges.len()
        ),
        Err(e) => exit_with_error(&format!("Graph '{}' is invalid: {}", graph.id, e)),
    }
}

async fn run_graph(graph_path: &str, format: GraphFormat, settings: RunSettings) {
    let total_start = Instant::now();

    // --- 1. Loading ---
    let graph = load_graph(graph_path, format);
    let ctx = match &settings.input {
        Some(path) => ExecutionContext::from_file(path).unwrap_or_else(|e| {
            exit_with_error(&format!("Failed to load input '{}': {}", path, e))
        }),
        None => ExecutionContext::new(),
    };
    let mut config = match &settings.config {
        Some(path) => EngineConfig::from_file(path).unwrap_or_else(|e| {
            exit_with_error(&format!("Failed to load engine config '{}': {}", path, e))
        }),
        None => EngineConfig::default(),
    };
    if settings.permissive_cycles {
        config.cycle_policy = CyclePolicy::Append;
    }

    // --- 2. Engine ---
    let mut builder = ProcessEngine::builder().with_config(config);
    if settings.mock_collaborators {
        builder = builder.with_collaborators(Collaborators::mocks());
    }
    let engine = builder.build();

    // --- 3. Execution ---
    let quiet = settings.json;
    let total_nodes = graph.nodes.len();
    let mut reported = 0;
    let options = RunOptions::new().on_progress(move |execution: &ProcessExecution| {
        if quiet {
            return;
        }
        for result in execution
            .results
            .iter()
            .filter(|r| r.status.is_terminal())
            .skip(reported)
        {
            reported += 1;
            eprintln!(
                "  [{}/{}] {} -> {:?}",
                reported, total_nodes, result.node_id, result.status
            );
        }
    });
    let run_start = Instant::now();
    let execution = engine
        .execute_with(&graph, ctx, options)
        .await
        .unwrap_or_else(|e| exit_with_error(&format!("Execution could not start: {}", e)));
    let run_duration = run_start.elapsed();

    // --- 4. Results ---
    if let Some(path) = &settings.output {
        execution.write_to(path).unwrap_or_else(|e| {
            exit_with_error(&format!("Failed to write execution to '{}': {}", path, e))
        });
    }

    if settings.json {
        let json = execution
            .to_json()
            .unwrap_or_else(|e| exit_with_error(&format!("Failed to serialize execution: {}", e)));
        println!("{}", json);
    } else {
        println!("\n{}", execution.report());
        println!("\n--- Performance Summary ---");
        println!("Execution:       {:?}", run_duration);
        println!("Total:           {:?}", total_start.elapsed());
    }

    if execution.status != RunStatus::Completed {
        std::process::exit(2);
    }
}

fn exit_with_error(message: &str) -> ! {
    eprintln!("\nError: {}", message);
    std::process::exit(1);
}
