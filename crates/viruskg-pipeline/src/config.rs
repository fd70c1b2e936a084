//! Run configuration.
//!
//! Read from a JSON file; every key is optional. The CLI applies its own
//! flags on top before calling [`PipelineConfig::validate`].

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use viruskg_graph::{GraphStore, MemoryGraph, Neo4jConfig, Neo4jGraph, RelationEncoding, DEFAULT_BATCH_SIZE};
use viruskg_ingest::{Annotator, CoreNlpClient, CoreNlpConfig, DisabledAnnotator, StanzaConfig, StanzaProcess};

use crate::{PipelineError, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub input_file: Option<PathBuf>,
    pub output_file: Option<PathBuf>,
    pub output_to_file: bool,
    #[serde(alias = "insert_into_neo4j")]
    pub insert_into_graph: bool,
    /// Append to `output_file` instead of truncating it.
    pub append_output: bool,
    pub graph: GraphConfig,
    pub annotator: AnnotatorConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GraphBackend {
    #[default]
    Neo4j,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    pub backend: GraphBackend,
    pub uri: String,
    pub user: String,
    pub password: Option<String>,
    pub database: Option<String>,
    pub batch_size: usize,
    pub relation_encoding: RelationEncoding,
    pub ensure_constraints: bool,
}

impl Default for GraphConfig {
    fn default() -> Self {
        let neo4j = Neo4jConfig::default();
        Self {
            backend: GraphBackend::default(),
            uri: neo4j.uri,
            user: neo4j.user,
            password: None,
            database: None,
            batch_size: DEFAULT_BATCH_SIZE,
            relation_encoding: RelationEncoding::default(),
            ensure_constraints: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotatorBackend {
    #[default]
    Corenlp,
    Stanza,
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotatorConfig {
    pub backend: AnnotatorBackend,
    /// CoreNLP server URL.
    pub url: String,
    /// Stanza worker command line.
    pub command: Vec<String>,
    pub language: String,
    pub timeout_secs: u64,
}

impl Default for AnnotatorConfig {
    fn default() -> Self {
        let corenlp = CoreNlpConfig::default();
        Self {
            backend: AnnotatorBackend::default(),
            url: corenlp.url,
            command: Vec::new(),
            language: corenlp.language,
            timeout_secs: corenlp.timeout_secs,
        }
    }
}

impl PipelineConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| {
            PipelineError::Config(format!("cannot read config {}: {e}", path.display()))
        })?;
        serde_json::from_str(&text)
            .map_err(|e| PipelineError::Config(format!("invalid config {}: {e}", path.display())))
    }

    pub fn validate(&self) -> Result<()> {
        if self.input_file.is_none() {
            return Err(PipelineError::Config("no input file specified".to_string()));
        }
        if !self.output_to_file && !self.insert_into_graph {
            return Err(PipelineError::Config(
                "no operation specified: enable output to file and/or graph insertion".to_string(),
            ));
        }
        if self.output_to_file && self.output_file.is_none() {
            return Err(PipelineError::Config(
                "output to file requested without an output file".to_string(),
            ));
        }
        if self.graph.batch_size == 0 {
            return Err(PipelineError::Config("batch size must be at least 1".to_string()));
        }
        if self.insert_into_graph
            && self.graph.backend == GraphBackend::Neo4j
            && self.graph.password.as_deref().map_or(true, str::is_empty)
        {
            return Err(PipelineError::Config(
                "Neo4j password is required for graph ingestion".to_string(),
            ));
        }
        if self.annotator.backend == AnnotatorBackend::Stanza && self.annotator.command.is_empty() {
            return Err(PipelineError::Config(
                "stanza annotator needs a worker command".to_string(),
            ));
        }
        Ok(())
    }
}

impl GraphConfig {
    pub fn neo4j_config(&self) -> Neo4jConfig {
        Neo4jConfig {
            uri: self.uri.clone(),
            user: self.user.clone(),
            password: self.password.clone().unwrap_or_default(),
            database: self.database.clone(),
            encoding: self.relation_encoding,
            ensure_constraints: self.ensure_constraints,
            ..Neo4jConfig::default()
        }
    }

    /// Build the configured store. Neo4j connects lazily on the first batch.
    pub fn open_store(&self) -> Result<Box<dyn GraphStore>> {
        Ok(match self.backend {
            GraphBackend::Neo4j => Box::new(Neo4jGraph::new(self.neo4j_config())?),
            GraphBackend::Memory => Box::new(MemoryGraph::new()),
        })
    }
}

impl AnnotatorConfig {
    pub fn open(&self) -> Result<Box<dyn Annotator>> {
        Ok(match self.backend {
            AnnotatorBackend::Corenlp => Box::new(CoreNlpClient::new(CoreNlpConfig {
                url: self.url.clone(),
                language: self.language.clone(),
                timeout_secs: self.timeout_secs,
            })?),
            AnnotatorBackend::Stanza => Box::new(StanzaProcess::spawn(&StanzaConfig {
                command: self.command.clone(),
                language: self.language.clone(),
            })?),
            AnnotatorBackend::None => Box::new(DisabledAnnotator),
        })
    }
}
