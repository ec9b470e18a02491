//! cognigraph CLI
//!
//! Commands:
//! - classify: Classify a window of interaction events into a cognitive state
//! - extract: Extract weighted concepts from text
//! - graph: Build or extend a user's concept graph from text files
//! - doctor: Check the engine configuration

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chrono::{DateTime, Utc};
use log::info;
use serde::Serialize;

use cognigraph::behavior::{CognitiveState, DetectionSession, FeatureVector, InteractionEvent};
use cognigraph::concepts::{ConceptExtractor, ConceptProcessor};
use cognigraph::config::EngineConfig;
use cognigraph::{CoreError, COGNIGRAPH_VERSION, PRODUCER_NAME};

/// cognigraph - Behavioral state inference and concept graphs
#[derive(Parser)]
#[command(name = "cognigraph")]
#[command(version = COGNIGRAPH_VERSION)]
#[command(about = "Infer cognitive state from interaction telemetry and build concept graphs", long_about = None)]
struct Cli {
    /// Engine configuration file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify interaction events into a cognitive state
    Classify {
        /// Input file path (use - for stdin)
        #[arg(short, long, default_value = "-")]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "json")]
        input_format: InputFormat,

        /// Window in milliseconds (overrides the configuration)
        #[arg(long)]
        window_ms: Option<u64>,

        /// Classification time (RFC 3339); defaults to the latest event
        #[arg(long)]
        now: Option<DateTime<Utc>>,

        /// Include the feature vector in the output
        #[arg(long)]
        features: bool,

        /// Output format
        #[arg(long, default_value = "json")]
        output_format: OutputFormat,
    },

    /// Extract weighted concepts from text
    Extract {
        /// Input text file (use - for stdin)
        #[arg(short, long, default_value = "-")]
        input: PathBuf,

        /// Maximum number of concepts (overrides the configuration)
        #[arg(long)]
        top_k: Option<usize>,

        /// Output format
        #[arg(long, default_value = "json")]
        output_format: OutputFormat,
    },

    /// Merge text files into a user's concept graph and print it
    Graph {
        /// Text files, each treated as one piece of viewed content
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// User the graph belongs to
        #[arg(long, default_value = "local")]
        user: String,

        /// Load a saved graph before merging
        #[arg(long)]
        load_graph: Option<PathBuf>,

        /// Save the graph after merging
        #[arg(long)]
        save_graph: Option<PathBuf>,

        /// Output format
        #[arg(long, default_value = "json")]
        output_format: OutputFormat,
    },

    /// Check the engine configuration and print the effective settings
    Doctor,
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// Newline-delimited JSON (one event per line)
    Ndjson,
    /// JSON array of events
    Json,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Compact JSON
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CgCliError> {
    let config = load_config(cli.config.as_deref())?;
    match cli.command {
        Commands::Classify {
            input,
            input_format,
            window_ms,
            now,
            features,
            output_format,
        } => cmd_classify(
            config,
            &input,
            input_format,
            window_ms,
            now,
            features,
            output_format,
        ),

        Commands::Extract {
            input,
            top_k,
            output_format,
        } => cmd_extract(config, &input, top_k, output_format),

        Commands::Graph {
            inputs,
            user,
            load_graph,
            save_graph,
            output_format,
        } => cmd_graph(
            &config,
            &inputs,
            &user,
            load_graph.as_deref(),
            save_graph.as_deref(),
            output_format,
        ),

        Commands::Doctor => cmd_doctor(&config),
    }
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig, CgCliError> {
    match path {
        Some(path) => Ok(EngineConfig::from_json(&fs::read_to_string(path)?)?),
        None => Ok(EngineConfig::default()),
    }
}

fn read_input(input: &Path) -> Result<String, CgCliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn parse_events(data: &str, format: InputFormat) -> Result<Vec<InteractionEvent>, CgCliError> {
    match format {
        InputFormat::Json => Ok(serde_json::from_str(data)?),
        InputFormat::Ndjson => {
            let mut events = Vec::new();
            for (line_no, line) in data.lines().enumerate() {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let event = serde_json::from_str(line).map_err(|e| {
                    CoreError::InvalidEvent(format!("line {}: {}", line_no + 1, e))
                })?;
                events.push(event);
            }
            Ok(events)
        }
    }
}

fn print_json<T: Serialize>(value: &T, format: &OutputFormat) -> Result<(), CgCliError> {
    let rendered = match format {
        OutputFormat::Json => serde_json::to_string(value)?,
        OutputFormat::JsonPretty => serde_json::to_string_pretty(value)?,
    };
    println!("{}", rendered);
    Ok(())
}

/// Classify one window at `now`, falling back to the latest event and then
/// the Unix epoch so the output never depends on the wall clock.
/// An empty window yields the neutral state.
fn classify_window(
    config: &EngineConfig,
    events: Vec<InteractionEvent>,
    now: Option<DateTime<Utc>>,
) -> (CognitiveState, FeatureVector) {
    let now = now
        .or_else(|| events.iter().map(|e| e.timestamp).max())
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);

    let mut config = config.clone();
    config.recorder.capacity = config.recorder.capacity.max(events.len());

    let mut session = DetectionSession::with_config(&config);
    for event in events {
        session.ingest(event);
    }
    let features = session.features_at(now);
    (session.tick_at(now), features)
}

fn cmd_classify(
    mut config: EngineConfig,
    input: &Path,
    input_format: InputFormat,
    window_ms: Option<u64>,
    now: Option<DateTime<Utc>>,
    include_features: bool,
    output_format: OutputFormat,
) -> Result<(), CgCliError> {
    let events = parse_events(&read_input(input)?, input_format)?;
    if let Some(window_ms) = window_ms {
        config.recorder.window_ms = window_ms;
    }

    let (state, features) = classify_window(&config, events, now);
    if include_features {
        print_json(
            &serde_json::json!({ "state": state, "features": features }),
            &output_format,
        )
    } else {
        print_json(&state, &output_format)
    }
}

fn cmd_extract(
    mut config: EngineConfig,
    input: &Path,
    top_k: Option<usize>,
    output_format: OutputFormat,
) -> Result<(), CgCliError> {
    if let Some(top_k) = top_k {
        config.extraction.top_k = top_k;
    }
    let text = read_input(input)?;
    let concepts = ConceptExtractor::new(config.extraction).extract_concepts(&text);
    print_json(&concepts, &output_format)
}

fn cmd_graph(
    config: &EngineConfig,
    inputs: &[PathBuf],
    user: &str,
    load_graph: Option<&Path>,
    save_graph: Option<&Path>,
    output_format: OutputFormat,
) -> Result<(), CgCliError> {
    let mut processor = ConceptProcessor::with_config(user, config);

    if let Some(path) = load_graph {
        processor
            .load_graph(&fs::read_to_string(path)?)
            .map_err(CgCliError::GraphLoad)?;
        if processor.graph().user_id() != user {
            return Err(CgCliError::UserMismatch {
                expected: user.to_string(),
                found: processor.graph().user_id().to_string(),
            });
        }
    }

    for input in inputs {
        let text = read_input(input)?;
        let analysis = processor.analyze(&text);
        info!(
            "{}: {} concepts, {} new edges",
            input.display(),
            analysis.concepts.len(),
            analysis.new_edges.len()
        );
    }

    if let Some(path) = save_graph {
        fs::write(path, processor.save_graph()?)?;
    }

    print_json(&processor.snapshot(), &output_format)
}

/// Configuration errors surface through `load_config` before this runs
fn cmd_doctor(config: &EngineConfig) -> Result<(), CgCliError> {
    let stdin = if atty::is(atty::Stream::Stdin) {
        "tty"
    } else {
        "pipe"
    };
    print_json(
        &serde_json::json!({
            "producer": PRODUCER_NAME,
            "version": COGNIGRAPH_VERSION,
            "config": config,
            "stdin": stdin,
        }),
        &OutputFormat::JsonPretty,
    )
}

// Error types

#[derive(Debug)]
enum CgCliError {
    Io(io::Error),
    Core(CoreError),
    Json(serde_json::Error),
    GraphLoad(CoreError),
    UserMismatch { expected: String, found: String },
}

impl From<io::Error> for CgCliError {
    fn from(e: io::Error) -> Self {
        CgCliError::Io(e)
    }
}

impl From<CoreError> for CgCliError {
    fn from(e: CoreError) -> Self {
        CgCliError::Core(e)
    }
}

impl From<serde_json::Error> for CgCliError {
    fn from(e: serde_json::Error) -> Self {
        CgCliError::Json(e)
    }
}

#[derive(Debug, Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<CgCliError> for CliError {
    fn from(e: CgCliError) -> Self {
        match e {
            CgCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            CgCliError::Core(e @ CoreError::InvalidConfig(_)) => CliError {
                code: "CONFIG_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Run 'cognigraph --config <file> doctor' to check it".to_string()),
            },
            CgCliError::Core(e @ CoreError::InvalidEvent(_)) => CliError {
                code: "INVALID_EVENT".to_string(),
                message: e.to_string(),
                hint: Some("Events need \"type\" and an RFC 3339 \"timestamp\"".to_string()),
            },
            CgCliError::Core(e) => CliError {
                code: "CORE_ERROR".to_string(),
                message: e.to_string(),
                hint: None,
            },
            CgCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            CgCliError::GraphLoad(e) => CliError {
                code: "GRAPH_LOAD_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Pass a file written by 'cognigraph graph --save-graph'".to_string()),
            },
            CgCliError::UserMismatch { expected, found } => CliError {
                code: "USER_MISMATCH".to_string(),
                message: format!("Saved graph belongs to {}, not {}", found, expected),
                hint: Some("Pass --user matching the saved graph".to_string()),
            },
        }
    }
}
