//! ViruskG CLI
//!
//! Builds a virus knowledge graph from crawled virus descriptions:
//! - Reads line-delimited JSON records
//! - Writes the extracted triples to a JSONL file and/or merges them into a
//!   graph store (Neo4j, or an in-memory store for dry runs)
//!
//! Settings come from built-in defaults, then `--config-file`, then flags.

use anyhow::{anyhow, Context, Result};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use viruskg_graph::{GraphIngestor, RelationEncoding};
use viruskg_pipeline::{
    AnnotatorBackend, GraphBackend, Pipeline, PipelineConfig, RunSummary, TripleSink,
};

#[derive(Parser, Debug)]
#[command(name = "viruskg")]
#[command(
    author,
    version,
    about = "ViruskG: build a virus knowledge graph from crawled virus descriptions"
)]
struct Cli {
    /// Input records, one JSON object per line
    #[arg(long, alias = "input_file")]
    input_file: Option<PathBuf>,

    /// Output triples file (JSONL)
    #[arg(long, alias = "output_file")]
    output_file: Option<PathBuf>,

    /// Write triples to the output file
    #[arg(long, alias = "output_to_file")]
    output_to_file: bool,

    /// Merge triples into the graph store
    #[arg(long, alias = "insert_into_neo4j", alias = "insert-into-neo4j")]
    insert_into_graph: bool,

    /// Append to the output file instead of truncating it
    #[arg(long)]
    append: bool,

    /// JSON configuration file
    #[arg(long, alias = "config_file")]
    config_file: Option<PathBuf>,

    #[arg(long, alias = "neo4j_uri")]
    neo4j_uri: Option<String>,

    #[arg(long, alias = "neo4j_user")]
    neo4j_user: Option<String>,

    #[arg(long, alias = "neo4j_password", env = "NEO4J_PASSWORD", hide_env_values = true)]
    neo4j_password: Option<String>,

    /// Target database (server default when unset)
    #[arg(long)]
    neo4j_database: Option<String>,

    /// Triples per graph transaction
    #[arg(long)]
    batch_size: Option<usize>,

    /// How relation labels are stored in Neo4j
    #[arg(long, value_enum)]
    relation_encoding: Option<EncodingArg>,

    #[arg(long, value_enum)]
    graph_backend: Option<GraphBackendArg>,

    /// NLP annotation backend
    #[arg(long, value_enum)]
    annotator: Option<AnnotatorArg>,

    /// CoreNLP server URL
    #[arg(long)]
    annotator_url: Option<String>,

    /// Stanza worker command line (split on whitespace)
    #[arg(long)]
    stanza_command: Option<String>,

    /// Annotation language
    #[arg(long)]
    language: Option<String>,

    /// Debug logging (RUST_LOG takes precedence)
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum EncodingArg {
    DynamicType,
    TypeProperty,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum GraphBackendArg {
    Neo4j,
    Memory,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum AnnotatorArg {
    Corenlp,
    Stanza,
    None,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = resolve_config(&cli)?;
    config.validate()?;
    let summary = run(&config)?;
    print_summary(&summary);
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Defaults, then the config file, then explicit flags.
fn resolve_config(cli: &Cli) -> Result<PipelineConfig> {
    let mut config = match &cli.config_file {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };

    if let Some(path) = &cli.input_file {
        config.input_file = Some(path.clone());
    }
    if let Some(path) = &cli.output_file {
        config.output_file = Some(path.clone());
    }
    config.output_to_file |= cli.output_to_file;
    config.insert_into_graph |= cli.insert_into_graph;
    config.append_output |= cli.append;

    let graph = &mut config.graph;
    if let Some(uri) = &cli.neo4j_uri {
        graph.uri = uri.clone();
    }
    if let Some(user) = &cli.neo4j_user {
        graph.user = user.clone();
    }
    if let Some(password) = &cli.neo4j_password {
        graph.password = Some(password.clone());
    }
    if let Some(db) = &cli.neo4j_database {
        graph.database = Some(db.clone());
    }
    if let Some(size) = cli.batch_size {
        graph.batch_size = size;
    }
    if let Some(encoding) = cli.relation_encoding {
        graph.relation_encoding = match encoding {
            EncodingArg::DynamicType => RelationEncoding::DynamicType,
            EncodingArg::TypeProperty => RelationEncoding::TypeProperty,
        };
    }
    if let Some(backend) = cli.graph_backend {
        graph.backend = match backend {
            GraphBackendArg::Neo4j => GraphBackend::Neo4j,
            GraphBackendArg::Memory => GraphBackend::Memory,
        };
    }

    let annotator = &mut config.annotator;
    if let Some(backend) = cli.annotator {
        annotator.backend = match backend {
            AnnotatorArg::Corenlp => AnnotatorBackend::Corenlp,
            AnnotatorArg::Stanza => AnnotatorBackend::Stanza,
            AnnotatorArg::None => AnnotatorBackend::None,
        };
    }
    if let Some(url) = &cli.annotator_url {
        annotator.url = url.clone();
    }
    if let Some(command) = &cli.stanza_command {
        annotator.command = command.split_whitespace().map(str::to_string).collect();
    }
    if let Some(language) = &cli.language {
        annotator.language = language.clone();
    }

    Ok(config)
}

fn run(config: &PipelineConfig) -> Result<RunSummary> {
    let input = config
        .input_file
        .as_ref()
        .ok_or_else(|| anyhow!("no input file specified"))?;

    let sink = match (&config.output_file, config.output_to_file) {
        (Some(path), true) => Some(
            TripleSink::create(path, config.append_output)
                .with_context(|| format!("opening output file {}", path.display()))?,
        ),
        _ => None,
    };
    let graph = if config.insert_into_graph {
        let store = config.graph.open_store().context("opening graph store")?;
        Some(GraphIngestor::new(store, config.graph.batch_size))
    } else {
        None
    };
    let annotator = config.annotator.open().context("starting annotator")?;

    println!(
        "{} {} (annotator={})",
        "Processing".green().bold(),
        input.display(),
        annotator.name()
    );
    if let Some(path) = config.output_file.as_ref().filter(|_| config.output_to_file) {
        println!("  {} {}", "→".cyan(), path.display());
    }
    if config.insert_into_graph {
        println!("  {} graph ({})", "→".cyan(), config.graph.uri);
    }

    tracing::info!(
        input = %input.display(),
        annotator = annotator.name(),
        output_to_file = config.output_to_file,
        insert_into_graph = config.insert_into_graph,
        graph_backend = ?config.graph.backend,
        batch_size = config.graph.batch_size,
        "starting run"
    );

    let mut pipeline = Pipeline::new(annotator, sink, graph);
    let summary = pipeline
        .run_file(input)
        .with_context(|| format!("reading {}", input.display()))?;
    if summary.failed > 0 {
        tracing::warn!(failed = summary.failed, "some records failed; see errors above");
    }
    Ok(summary)
}

fn print_summary(summary: &RunSummary) {
    let status = if summary.failed == 0 {
        "Done.".green().bold()
    } else {
        "Done with failures.".yellow().bold()
    };
    println!("{status}");
    println!("  processed:        {}", summary.processed);
    println!("  skipped:          {}", summary.skipped);
    println!("  failed:           {}", summary.failed);
    println!("  malformed lines:  {}", summary.malformed_lines);
    println!("  triples written:  {}", summary.triples_written);
    println!("  triples to graph: {}", summary.triples_sent());
}
