//! Per-record pipeline for ViruskG
//!
//! Drives each record through mining, annotation, assembly and the active
//! sinks (a JSONL triple file and/or a graph store). One bad record never
//! stops the run; only failing to open a sink at start is fatal.

use thiserror::Error;
use viruskg_graph::GraphError;
use viruskg_ingest::IngestError;

pub mod config;
pub mod pipeline;
pub mod sink;

pub use config::{AnnotatorBackend, AnnotatorConfig, GraphBackend, GraphConfig, PipelineConfig};
pub use pipeline::{Pipeline, RecordOutcome, RunSummary};
pub use sink::TripleSink;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("annotation failed: {0}")]
    Annotation(#[from] IngestError),
    #[error("graph ingestion failed: {0}")]
    Graph(#[from] GraphError),
    #[error("triple sink failed: {0}")]
    Sink(String),
}

impl PipelineError {
    /// Stage name for log fields.
    pub fn stage(&self) -> &'static str {
        match self {
            PipelineError::Config(_) => "config",
            PipelineError::Io(_) => "io",
            PipelineError::Annotation(_) => "annotation",
            PipelineError::Graph(_) => "graph",
            PipelineError::Sink(_) => "sink",
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
