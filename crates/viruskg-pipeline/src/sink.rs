//! Newline-delimited JSON triple output.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use viruskg_ingest::Triple;

use crate::{PipelineError, Result};

/// Writes `{"subject":..,"relation":..,"object":..}` lines.
pub struct TripleSink<W: Write> {
    writer: W,
    written: usize,
}

impl TripleSink<BufWriter<File>> {
    /// Open `path` for writing, truncating unless `append` is set.
    pub fn create(path: &Path, append: bool) -> Result<Self> {
        let mut options = OpenOptions::new();
        options.create(true);
        if append {
            options.append(true);
        } else {
            options.write(true).truncate(true);
        }
        let file = options.open(path).map_err(|e| {
            PipelineError::Sink(format!("cannot open {}: {e}", path.display()))
        })?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> TripleSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, written: 0 }
    }

    /// Write one record's triples and flush.
    pub fn write_triples(&mut self, triples: &[Triple]) -> Result<usize> {
        for triple in triples {
            serde_json::to_writer(&mut self.writer, triple)
                .map_err(|e| PipelineError::Sink(e.to_string()))?;
            self.writer
                .write_all(b"\n")
                .map_err(|e| PipelineError::Sink(e.to_string()))?;
        }
        self.writer
            .flush()
            .map_err(|e| PipelineError::Sink(e.to_string()))?;
        self.written += triples.len();
        Ok(triples.len())
    }

    pub fn triples_written(&self) -> usize {
        self.written
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}
