//! Virus records and the line-delimited record loader.
//!
//! The upstream crawler writes one JSON object per line. Every field is
//! optional; a record is only usable when it carries a `virus_name` that is
//! not the `"Unknown"` placeholder.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::Result;

/// Placeholder name the crawler writes when a page had no virus name.
pub const UNKNOWN_VIRUS: &str = "Unknown";

/// Structured fields that map to `has_<field>` triples, in declaration order.
pub const STRUCTURED_FIELDS: [&str; 12] = [
    "aliases",
    "discovery_date",
    "origin",
    "length",
    "type",
    "risk_assessment",
    "minimum_engine",
    "minimum_dat",
    "dat_release_date",
    "symptoms",
    "method_of_infection",
    "removal_instructions",
];

/// One crawled virus description.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    #[serde(default, deserialize_with = "lenient_string")]
    pub virus_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub aliases: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub discovery_date: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub origin: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub length: Option<String>,
    #[serde(rename = "type", default, deserialize_with = "lenient_string")]
    pub virus_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub risk_assessment: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub minimum_engine: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub minimum_dat: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub dat_release_date: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub virus_characteristics: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub symptoms: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub method_of_infection: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub removal_instructions: Option<String>,
}

impl Record {
    /// The record's identity, or `None` when it must be skipped.
    pub fn identity(&self) -> Option<&str> {
        let name = self.virus_name.as_deref()?.trim();
        if name.is_empty() || name == UNKNOWN_VIRUS {
            None
        } else {
            Some(name)
        }
    }

    /// Free-text characteristics, empty when absent.
    pub fn characteristics(&self) -> &str {
        self.virus_characteristics.as_deref().unwrap_or("")
    }

    /// Structured fields paired with their values, in [`STRUCTURED_FIELDS`] order.
    pub fn structured_fields(&self) -> [(&'static str, Option<&str>); 12] {
        [
            ("aliases", self.aliases.as_deref()),
            ("discovery_date", self.discovery_date.as_deref()),
            ("origin", self.origin.as_deref()),
            ("length", self.length.as_deref()),
            ("type", self.virus_type.as_deref()),
            ("risk_assessment", self.risk_assessment.as_deref()),
            ("minimum_engine", self.minimum_engine.as_deref()),
            ("minimum_dat", self.minimum_dat.as_deref()),
            ("dat_release_date", self.dat_release_date.as_deref()),
            ("symptoms", self.symptoms.as_deref()),
            ("method_of_infection", self.method_of_infection.as_deref()),
            ("removal_instructions", self.removal_instructions.as_deref()),
        ]
    }

    /// Parse one line. Anything other than a JSON object is rejected.
    pub fn from_json_line(line: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(line)?;
        if !value.is_object() {
            return Err(crate::IngestError::Json(de::Error::custom(
                "record line is not a JSON object",
            )));
        }
        Ok(Record::deserialize(value)?)
    }
}

/// Accept strings, render numbers/booleans as text, join scalar arrays.
fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    fn scalar(value: &Value) -> Option<String> {
        match value {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    let value = Option::<Value>::deserialize(deserializer)?;
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(items)) => {
            let parts: Option<Vec<String>> = items.iter().map(scalar).collect();
            parts
                .map(|p| Some(p.join(", ")))
                .ok_or_else(|| de::Error::custom("array field must contain only scalars"))
        }
        Some(Value::Object(_)) => Err(de::Error::custom("expected a string, found an object")),
        Some(other) => Ok(scalar(&other)),
    }
}

// ============================================================================
// Loader
// ============================================================================

/// Lazy iterator over the records of a line-delimited source.
///
/// Malformed lines are logged and skipped; an IO error ends the sequence.
pub struct RecordReader<R> {
    reader: R,
    line_no: usize,
    malformed: usize,
    buf: String,
}

impl<R: BufRead> RecordReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line_no: 0,
            malformed: 0,
            buf: String::new(),
        }
    }

    /// Lines skipped so far because they failed to parse.
    pub fn malformed_lines(&self) -> usize {
        self.malformed
    }

    pub fn lines_read(&self) -> usize {
        self.line_no
    }
}

impl<R: BufRead> Iterator for RecordReader<R> {
    type Item = Record;

    fn next(&mut self) -> Option<Record> {
        loop {
            self.buf.clear();
            match self.reader.read_line(&mut self.buf) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(e) => {
                    tracing::error!(line = self.line_no + 1, error = %e, "read failed, stopping record stream");
                    return None;
                }
            }
            self.line_no += 1;

            let line = self.buf.trim();
            if line.is_empty() {
                continue;
            }
            match Record::from_json_line(line) {
                Ok(record) => return Some(record),
                Err(e) => {
                    self.malformed += 1;
                    tracing::warn!(line = self.line_no, error = %e, "skipping malformed record line");
                }
            }
        }
    }
}

/// Open `path` and stream its records. Each call starts from the top.
pub fn load_records(path: &Path) -> Result<RecordReader<BufReader<File>>> {
    let file = File::open(path)?;
    Ok(RecordReader::new(BufReader::new(file)))
}
