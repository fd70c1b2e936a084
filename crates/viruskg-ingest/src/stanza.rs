//! Long-lived Stanza worker process backend.
//!
//! The worker is spawned once and speaks a line protocol:
//!
//! ```text
//! stdin : {"text": "..."}\n
//! stdout: {"sentences": [{"words": [...], "entities": [{"text": .., "type": ..}]}]}\n
//! ```
//!
//! `words` entries use Stanza's dictionary shape (`id`, `text`, `lemma`,
//! `upos`, `xpos`, `head`, `deprel`, `ner`). Multi-word-token entries carry a
//! range id and are skipped. When `entities` is missing, mentions are rebuilt
//! from the per-word BIOES `ner` tags. A `{"error": ".."}` line fails only the
//! current record.
//!
//! `scripts/stanza_worker.py` implements this protocol on top of a
//! `tokenize,mwt,pos,lemma,depparse,ner` Stanza pipeline:
//!
//! ```text
//! viruskg --annotator stanza --stanza-command "python3 scripts/stanza_worker.py" \
//!     --language en --input-file viruses.jsonl --output-to-file
//! ```

use serde::Deserialize;
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use crate::annotation::{
    mentions_from_bioes, AnnotatedDocument, Annotator, EntityMention, Sentence, Token,
};
use crate::{IngestError, Result};

#[derive(Debug, Clone)]
pub struct StanzaConfig {
    /// Program and arguments of the worker.
    pub command: Vec<String>,
    pub language: String,
}

pub struct StanzaProcess {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    line: String,
}

impl StanzaProcess {
    /// Spawn the worker. The language is passed as `STANZA_LANG`.
    pub fn spawn(config: &StanzaConfig) -> Result<Self> {
        let (program, args) = config
            .command
            .split_first()
            .ok_or_else(|| IngestError::Protocol("empty stanza command".to_string()))?;

        let mut child = Command::new(program)
            .args(args)
            .env("STANZA_LANG", &config.language)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| IngestError::Protocol("worker stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| IngestError::Protocol("worker stdout unavailable".to_string()))?;

        tracing::info!(program = %program, "spawned stanza worker");
        Ok(Self {
            child,
            stdin,
            stdout: BufReader::new(stdout),
            line: String::new(),
        })
    }
}

impl Annotator for StanzaProcess {
    fn annotate(&mut self, text: &str) -> Result<AnnotatedDocument> {
        let request = serde_json::json!({ "text": text });
        serde_json::to_writer(&mut self.stdin, &request)?;
        self.stdin.write_all(b"\n")?;
        self.stdin.flush()?;

        self.line.clear();
        let n = self.stdout.read_line(&mut self.line)?;
        if n == 0 {
            return Err(IngestError::Annotation(
                "stanza worker closed its output".to_string(),
            ));
        }
        parse_response(&self.line)
    }

    fn name(&self) -> &'static str {
        "stanza"
    }
}

impl Drop for StanzaProcess {
    fn drop(&mut self) {
        if let Err(e) = self.child.kill() {
            tracing::debug!(error = %e, "stanza worker already gone");
        }
        let _ = self.child.wait();
    }
}

// ============================================================================
// Wire format
// ============================================================================

#[derive(Debug, Deserialize)]
struct StanzaResponse {
    #[serde(default)]
    sentences: Vec<StanzaSentence>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StanzaSentence {
    #[serde(default)]
    words: Vec<StanzaWord>,
    #[serde(default)]
    entities: Option<Vec<EntityMention>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WordId {
    Single(usize),
    Range(#[allow(dead_code)] Vec<usize>),
}

#[derive(Debug, Deserialize)]
struct StanzaWord {
    id: WordId,
    text: String,
    #[serde(default)]
    lemma: Option<String>,
    #[serde(default)]
    upos: Option<String>,
    #[serde(default)]
    xpos: Option<String>,
    #[serde(default)]
    head: Option<usize>,
    #[serde(default)]
    deprel: Option<String>,
    #[serde(default)]
    ner: Option<String>,
}

pub(crate) fn parse_response(line: &str) -> Result<AnnotatedDocument> {
    let response: StanzaResponse = serde_json::from_str(line)?;
    if let Some(error) = response.error {
        return Err(IngestError::Annotation(error));
    }

    let sentences = response
        .sentences
        .into_iter()
        .map(|sentence| {
            let words: Vec<StanzaWord> = sentence
                .words
                .into_iter()
                .filter(|w| matches!(w.id, WordId::Single(_)))
                .collect();

            let mentions = match sentence.entities {
                Some(entities) => entities,
                None => mentions_from_bioes(
                    words
                        .iter()
                        .map(|w| (w.text.as_str(), w.ner.as_deref().unwrap_or("O"))),
                ),
            };

            let tokens = words
                .into_iter()
                .filter_map(|w| {
                    let WordId::Single(id) = w.id else {
                        return None;
                    };
                    Some(Token {
                        id,
                        text: w.text,
                        lemma: w.lemma,
                        upos: w.upos,
                        xpos: w.xpos,
                        deprel: w.deprel.unwrap_or_else(|| "dep".to_string()),
                        head: w.head.unwrap_or(0),
                    })
                })
                .collect();

            Sentence { tokens, mentions }
        })
        .collect();

    Ok(AnnotatedDocument { sentences })
}
