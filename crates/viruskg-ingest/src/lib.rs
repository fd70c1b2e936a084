//! Virus record ingestion for ViruskG
//!
//! Turns one crawled virus-description record into an ordered list of
//! `(subject, relation, object)` triples. Three extraction strategies feed the
//! same [`Triple`] shape:
//! - Structured fields (`aliases`, `origin`, `risk_assessment`, ...) mapped to
//!   `has_<field>` facts
//! - Pattern mining over the free-text `virus_characteristics` field
//!   (symptoms, per-file-type length increases)
//! - Dependency-parse driven extraction (entities, status/size attributes,
//!   subject-verb-object relations) over the same text, using an external
//!   [`Annotator`]
//!
//! Output:
//! - [`assemble_triples`] returns the per-record triple list, deduplicated and
//!   with every relation name passed through [`sanitize_identifier`]
//!
//! Graph writes live in `viruskg-graph`; this crate never talks to a store.

use thiserror::Error;

pub mod annotation;
pub mod characteristics;
pub mod corenlp;
pub mod record;
pub mod stanza;
pub mod syntax;
pub mod triples;

pub use annotation::*;
pub use characteristics::*;
pub use corenlp::{CoreNlpClient, CoreNlpConfig};
pub use record::*;
pub use stanza::{StanzaConfig, StanzaProcess};
pub use syntax::*;
pub use triples::*;

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("annotation failed: {0}")]
    Annotation(String),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("annotator protocol error: {0}")]
    Protocol(String),
}

pub type Result<T> = std::result::Result<T, IngestError>;
