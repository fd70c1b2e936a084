//! Dependency-parse driven fact extraction.
//!
//! A heuristic, not a semantic-role labeler: entity mentions of a few
//! recognised kinds, status/size attributes keyed on single words, and
//! head-verb relations over subject/object-bearing arcs. Output is
//! best-effort and a pure function of the annotated document.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::annotation::{AnnotatedDocument, Annotator, Sentence, Token};
use crate::Result;

/// Words that mark a status attribute.
pub const STATUS_WORDS: [&str; 5] = ["infected", "available", "free", "active", "malicious"];

/// Head word that produces mostly misleading relations in this corpus.
pub const NOISE_HEAD: &str = "systems";

/// Recognised named-entity kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Organization,
    Product,
    Quantity,
    Cardinal,
    Disease,
}

impl EntityKind {
    /// Map an annotator label to a kind. Accepts OntoNotes (`ORG`) and
    /// CoreNLP (`ORGANIZATION`, `NUMBER`) spellings.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.to_ascii_uppercase().as_str() {
            "ORG" | "ORGANIZATION" => Some(EntityKind::Organization),
            "PRODUCT" => Some(EntityKind::Product),
            "QUANTITY" => Some(EntityKind::Quantity),
            "CARDINAL" | "NUMBER" => Some(EntityKind::Cardinal),
            "DISEASE" => Some(EntityKind::Disease),
            _ => None,
        }
    }

    /// Canonical label used as the triple object.
    pub fn as_label(&self) -> &'static str {
        match self {
            EntityKind::Organization => "ORG",
            EntityKind::Product => "PRODUCT",
            EntityKind::Quantity => "QUANTITY",
            EntityKind::Cardinal => "CARDINAL",
            EntityKind::Disease => "DISEASE",
        }
    }
}

/// Dependency arcs that carry subject/object content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyRole {
    Object,
    NominalModifier,
    Oblique,
    Subject,
    PassiveSubject,
}

impl DependencyRole {
    /// UD v2 labels, plus the UD v1 spellings older parsers still emit.
    pub fn from_deprel(deprel: &str) -> Option<Self> {
        match deprel {
            "obj" | "dobj" => Some(DependencyRole::Object),
            "nmod" => Some(DependencyRole::NominalModifier),
            "obl" => Some(DependencyRole::Oblique),
            "nsubj" => Some(DependencyRole::Subject),
            "nsubj:pass" | "nsubjpass" => Some(DependencyRole::PassiveSubject),
            _ => None,
        }
    }
}

/// An entity mention; identical text seen with several kinds keeps them all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    pub text: String,
    pub kinds: Vec<EntityKind>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attribute {
    /// A status word (`infected`, `active`, ...), lowercased.
    Status(String),
    /// Size: the word governing a `bytes` token.
    Size(String),
}

/// Head-verb relation: `(head text, head lemma, dependent text)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntacticRelation {
    pub subject: String,
    pub relation: String,
    pub object: String,
}

/// Per-record extraction context. Built and consumed by one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyntacticFacts {
    pub entities: Vec<Entity>,
    pub attributes: Vec<Attribute>,
    pub relations: Vec<SyntacticRelation>,
}

impl SyntacticFacts {
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty() && self.attributes.is_empty() && self.relations.is_empty()
    }
}

fn is_verb(token: &Token) -> bool {
    match token.upos.as_deref() {
        Some(upos) => upos == "VERB",
        None => token.xpos.as_deref().is_some_and(|x| x.starts_with("VB")),
    }
}

fn is_root(token: &Token) -> bool {
    token.deprel.eq_ignore_ascii_case("root")
}

fn collect_attributes(sentence: &Sentence, token: &Token, out: &mut Vec<Attribute>) {
    let lower = token.text.to_lowercase();
    if STATUS_WORDS.contains(&lower.as_str()) {
        out.push(Attribute::Status(lower));
        return;
    }
    if lower == "bytes" && token.head != token.id {
        if let Some(head) = sentence.head_of(token) {
            out.push(Attribute::Size(head.text.clone()));
        }
    }
}

fn collect_relation(sentence: &Sentence, token: &Token, out: &mut Vec<SyntacticRelation>) {
    if DependencyRole::from_deprel(&token.deprel).is_none() {
        return;
    }
    let Some(head) = sentence.head_of(token) else {
        return;
    };
    if !(is_verb(head) || is_root(head)) {
        return;
    }
    if head.text.eq_ignore_ascii_case(NOISE_HEAD) {
        return;
    }
    let relation = head
        .lemma
        .clone()
        .filter(|l| !l.trim().is_empty())
        .unwrap_or_else(|| head.text.to_lowercase());
    out.push(SyntacticRelation {
        subject: head.text.clone(),
        relation,
        object: token.text.clone(),
    });
}

/// Extract entities, attributes and relations from an annotated document.
pub fn extract_syntactic_facts(doc: &AnnotatedDocument) -> SyntacticFacts {
    let mut entities: IndexMap<String, Vec<EntityKind>> = IndexMap::new();
    let mut facts = SyntacticFacts::default();

    for sentence in &doc.sentences {
        for mention in &sentence.mentions {
            let Some(kind) = EntityKind::from_label(&mention.label) else {
                continue;
            };
            let kinds = entities.entry(mention.text.clone()).or_default();
            if !kinds.contains(&kind) {
                kinds.push(kind);
            }
        }

        for token in &sentence.tokens {
            collect_attributes(sentence, token, &mut facts.attributes);
            collect_relation(sentence, token, &mut facts.relations);
        }
    }

    facts.entities = entities
        .into_iter()
        .map(|(text, kinds)| Entity { text, kinds })
        .collect();
    facts
}

/// Annotate `text` and extract. Blank text never reaches the annotator.
pub fn annotate_and_extract<A: Annotator + ?Sized>(
    annotator: &mut A,
    text: &str,
) -> Result<SyntacticFacts> {
    if text.trim().is_empty() {
        return Ok(SyntacticFacts::default());
    }
    let doc = annotator.annotate(text)?;
    Ok(extract_syntactic_facts(&doc))
}
