//! Stanford CoreNLP server backend.
//!
//! One blocking `POST /?properties=...` per text, JSON output. Tokens come
//! from `tokens`, heads and labels from `basicDependencies`, mentions from
//! `entitymentions`. CoreNLP reports Penn tags only, so `pos` lands in
//! [`Token::xpos`].

use reqwest::blocking::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use crate::annotation::{AnnotatedDocument, Annotator, EntityMention, Sentence, Token};
use crate::{IngestError, Result};

const ANNOTATORS: &str = "tokenize,ssplit,pos,lemma,ner,depparse";

#[derive(Debug, Clone)]
pub struct CoreNlpConfig {
    /// Server base URL, e.g. `http://localhost:9000`.
    pub url: String,
    /// Pipeline language (`en`, `de`, ...). One locale per client.
    pub language: String,
    pub timeout_secs: u64,
}

impl Default for CoreNlpConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:9000".to_string(),
            language: "en".to_string(),
            timeout_secs: 120,
        }
    }
}

pub struct CoreNlpClient {
    client: Client,
    config: CoreNlpConfig,
    properties: String,
}

impl CoreNlpClient {
    pub fn new(config: CoreNlpConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        let properties = serde_json::json!({
            "annotators": ANNOTATORS,
            "outputFormat": "json",
            "pipelineLanguage": config.language,
        })
        .to_string();
        Ok(Self {
            client,
            config,
            properties,
        })
    }
}

impl Annotator for CoreNlpClient {
    fn annotate(&mut self, text: &str) -> Result<AnnotatedDocument> {
        let response = self
            .client
            .post(&self.config.url)
            .query(&[("properties", self.properties.as_str())])
            .header("Content-Type", "text/plain; charset=utf-8")
            .body(text.to_string())
            .send()?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(IngestError::Annotation(format!(
                "CoreNLP returned {status}: {body}"
            )));
        }

        let parsed: CoreNlpResponse = response.json()?;
        Ok(parsed.into_document())
    }

    fn name(&self) -> &'static str {
        "corenlp"
    }
}

// ============================================================================
// Wire format
// ============================================================================

#[derive(Debug, Deserialize)]
pub(crate) struct CoreNlpResponse {
    #[serde(default)]
    sentences: Vec<CoreNlpSentence>,
}

#[derive(Debug, Deserialize)]
struct CoreNlpSentence {
    #[serde(default)]
    tokens: Vec<CoreNlpToken>,
    #[serde(default, rename = "basicDependencies")]
    basic_dependencies: Vec<CoreNlpDependency>,
    #[serde(default)]
    entitymentions: Vec<CoreNlpMention>,
}

#[derive(Debug, Deserialize)]
struct CoreNlpToken {
    index: usize,
    word: String,
    #[serde(default)]
    lemma: Option<String>,
    #[serde(default)]
    pos: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CoreNlpDependency {
    dep: String,
    governor: usize,
    dependent: usize,
}

#[derive(Debug, Deserialize)]
struct CoreNlpMention {
    text: String,
    ner: String,
}

impl CoreNlpResponse {
    pub(crate) fn into_document(self) -> AnnotatedDocument {
        let sentences = self
            .sentences
            .into_iter()
            .map(|sentence| {
                let arcs: HashMap<usize, (&str, usize)> = sentence
                    .basic_dependencies
                    .iter()
                    .map(|d| (d.dependent, (d.dep.as_str(), d.governor)))
                    .collect();

                let tokens = sentence
                    .tokens
                    .iter()
                    .map(|t| {
                        let (deprel, head) = arcs.get(&t.index).copied().unwrap_or(("dep", 0));
                        Token {
                            id: t.index,
                            text: t.word.clone(),
                            lemma: t.lemma.clone(),
                            upos: None,
                            xpos: t.pos.clone(),
                            deprel: if deprel.eq_ignore_ascii_case("root") {
                                "root".to_string()
                            } else {
                                deprel.to_string()
                            },
                            head,
                        }
                    })
                    .collect();

                let mentions = sentence
                    .entitymentions
                    .into_iter()
                    .map(|m| EntityMention {
                        text: m.text,
                        label: m.ner,
                    })
                    .collect();

                Sentence { tokens, mentions }
            })
            .collect();
        AnnotatedDocument { sentences }
    }
}
