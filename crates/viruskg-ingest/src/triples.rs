//! Triple assembly.
//!
//! Emission order per record:
//! 1. `(name, is_a, Virus)`
//! 2. `has_<field>` for each non-empty structured field
//! 3. mined symptoms and `<type>_length_increase` facts
//! 4. syntactic entities, attributes and relations
//!
//! Exact duplicates inside one record are dropped (first occurrence kept).
//! Cross-record duplicates are left to the graph store's merge semantics.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::characteristics::CharacteristicsFacts;
use crate::record::Record;
use crate::syntax::{Attribute, SyntacticFacts};

pub const IS_A: &str = "is_a";
pub const HAS: &str = "has";
pub const VIRUS_CLASS: &str = "Virus";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Triple {
    pub subject: String,
    pub relation: String,
    pub object: String,
}

impl Triple {
    pub fn new(
        subject: impl Into<String>,
        relation: impl Into<String>,
        object: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            relation: relation.into(),
            object: object.into(),
        }
    }

    /// Subject and object are non-empty after trimming.
    pub fn is_well_formed(&self) -> bool {
        !self.subject.trim().is_empty() && !self.object.trim().is_empty()
    }
}

/// Reduce `name` to `[A-Za-z0-9_]`, never digit-leading, never empty.
pub fn sanitize_identifier(name: &str) -> String {
    let mut out: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if out.is_empty() {
        out.push('_');
    }
    if out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

/// True when `name` is already a sanitized identifier.
pub fn is_identifier(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with(|c: char| c.is_ascii_digit())
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Ordered, deduplicating triple collector.
#[derive(Debug, Default)]
pub struct TripleSet {
    triples: Vec<Triple>,
    seen: HashSet<Triple>,
}

impl TripleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trim, sanitize the relation, drop ill-formed and repeated triples.
    /// Returns whether the triple was kept.
    pub fn push(&mut self, subject: &str, relation: &str, object: &str) -> bool {
        let triple = Triple::new(
            subject.trim(),
            sanitize_identifier(relation.trim()),
            object.trim(),
        );
        if !triple.is_well_formed() || self.seen.contains(&triple) {
            return false;
        }
        self.seen.insert(triple.clone());
        self.triples.push(triple);
        true
    }

    pub fn len(&self) -> usize {
        self.triples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
    }

    pub fn into_vec(self) -> Vec<Triple> {
        self.triples
    }
}

/// Assemble one record's triples. Records without an identity yield nothing.
pub fn assemble_triples(
    record: &Record,
    mined: &CharacteristicsFacts,
    syntactic: &SyntacticFacts,
) -> Vec<Triple> {
    let Some(name) = record.identity() else {
        return Vec::new();
    };
    let mut set = TripleSet::new();

    set.push(name, IS_A, VIRUS_CLASS);

    for (field, value) in record.structured_fields() {
        if let Some(value) = value {
            set.push(name, &format!("has_{field}"), value);
        }
    }

    // Only a found, non-empty span becomes a fact; "N/A" never does.
    if mined.symptoms_found() {
        set.push(name, "has_symptoms", &mined.symptoms);
    }
    for (file_type, amount) in &mined.length_increases {
        let relation = format!("{}_length_increase", sanitize_identifier(file_type));
        set.push(name, &relation, amount);
    }

    for entity in &syntactic.entities {
        for kind in &entity.kinds {
            set.push(&entity.text, IS_A, kind.as_label());
        }
    }
    for attribute in &syntactic.attributes {
        match attribute {
            Attribute::Status(word) => set.push(word, HAS, "status"),
            Attribute::Size(value) => set.push("size", HAS, value),
        };
    }
    for relation in &syntactic.relations {
        set.push(&relation.subject, &relation.relation, &relation.object);
    }

    set.into_vec()
}
