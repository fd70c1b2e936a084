//! Annotation model and the [`Annotator`] collaborator seam.
//!
//! An annotator turns raw text into sentences of dependency-parsed tokens
//! plus named-entity mentions. Backends live in [`crate::corenlp`] and
//! [`crate::stanza`]; tests script their own.

use serde::{Deserialize, Serialize};

use crate::Result;

/// Annotated text: a sequence of sentences.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotatedDocument {
    pub sentences: Vec<Sentence>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sentence {
    pub tokens: Vec<Token>,
    pub mentions: Vec<EntityMention>,
}

/// A dependency-parsed word.
///
/// `id` is 1-based within its sentence; `head == 0` means the token hangs off
/// the virtual root and has no governing token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub id: usize,
    pub text: String,
    #[serde(default)]
    pub lemma: Option<String>,
    /// Universal POS tag (`VERB`, `NOUN`, ...).
    #[serde(default)]
    pub upos: Option<String>,
    /// Treebank-specific POS tag (`VBZ`, `NNS`, ...).
    #[serde(default)]
    pub xpos: Option<String>,
    pub deprel: String,
    pub head: usize,
}

/// A named-entity span as reported by the annotator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityMention {
    pub text: String,
    #[serde(rename = "type")]
    pub label: String,
}

impl Sentence {
    /// Resolve a 1-based head reference to its token.
    pub fn head_of(&self, token: &Token) -> Option<&Token> {
        if token.head == 0 {
            return None;
        }
        self.tokens.get(token.head - 1)
    }
}

/// NLP annotation collaborator.
///
/// Takes `&mut self`: implementations are not assumed safe for concurrent
/// calls. Construct one per pipeline and pass it in.
pub trait Annotator {
    fn annotate(&mut self, text: &str) -> Result<AnnotatedDocument>;

    /// Short backend name for logs.
    fn name(&self) -> &'static str;
}

impl<A: Annotator + ?Sized> Annotator for Box<A> {
    fn annotate(&mut self, text: &str) -> Result<AnnotatedDocument> {
        (**self).annotate(text)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// Annotator that returns nothing; syntactic extraction becomes a no-op.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledAnnotator;

impl Annotator for DisabledAnnotator {
    fn annotate(&mut self, _text: &str) -> Result<AnnotatedDocument> {
        Ok(AnnotatedDocument::default())
    }

    fn name(&self) -> &'static str {
        "none"
    }
}

/// Rebuild entity spans from per-token BIOES tags (`B-ORG`, `I-ORG`, `E-ORG`,
/// `S-CARDINAL`, `O`). Plain BIO tagging is accepted as well.
pub fn mentions_from_bioes<'a, I>(tagged: I) -> Vec<EntityMention>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    fn close<'a>(open: &mut Option<(Vec<&'a str>, &'a str)>, out: &mut Vec<EntityMention>) {
        if let Some((words, label)) = open.take() {
            out.push(EntityMention {
                text: words.join(" "),
                label: label.to_string(),
            });
        }
    }

    let mut mentions = Vec::new();
    let mut open: Option<(Vec<&'a str>, &'a str)> = None;

    for (text, tag) in tagged {
        let Some((prefix, label)) = tag.split_once('-') else {
            close(&mut open, &mut mentions);
            continue;
        };
        match prefix {
            "S" => {
                close(&mut open, &mut mentions);
                mentions.push(EntityMention {
                    text: text.to_string(),
                    label: label.to_string(),
                });
            }
            "B" => {
                close(&mut open, &mut mentions);
                open = Some((vec![text], label));
            }
            "I" | "E" => {
                let continues = matches!(&open, Some((_, open_label)) if *open_label == label);
                if continues {
                    if let Some((words, _)) = open.as_mut() {
                        words.push(text);
                    }
                } else {
                    close(&mut open, &mut mentions);
                    open = Some((vec![text], label));
                }
                if prefix == "E" {
                    close(&mut open, &mut mentions);
                }
            }
            _ => close(&mut open, &mut mentions),
        }
    }
    close(&mut open, &mut mentions);
    mentions
}
