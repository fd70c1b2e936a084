//! Pattern mining over the `virus_characteristics` narrative.
//!
//! Two facts are pulled out with regexes:
//! - the symptom description between the `Symptoms` and `Infected` markers
//! - "Infected .<TYPE> files have a file length increase of <AMOUNT>" clauses

use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Symptom value when the markers were not found.
pub const SYMPTOMS_NOT_FOUND: &str = "N/A";

/// File type → length increase. Insertion order is first appearance; a
/// repeated file type overwrites the earlier amount (last match wins).
pub type LengthIncreases = IndexMap<String, String>;

/// Facts mined from one characteristics text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacteristicsFacts {
    /// Symptom span, or [`SYMPTOMS_NOT_FOUND`].
    pub symptoms: String,
    pub length_increases: LengthIncreases,
}

impl CharacteristicsFacts {
    /// True when the markers were found (the span itself may still be empty).
    pub fn symptoms_found(&self) -> bool {
        self.symptoms != SYMPTOMS_NOT_FOUND
    }
}

impl Default for CharacteristicsFacts {
    fn default() -> Self {
        Self {
            symptoms: SYMPTOMS_NOT_FOUND.to_string(),
            length_increases: LengthIncreases::new(),
        }
    }
}

fn symptoms_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)Symptoms(.*?)Infected").expect("symptoms regex"))
}

fn length_increase_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // The file type is one token. The amount stays on its line and runs to
    // the next sentence end: a period followed by whitespace, a newline, or
    // the end of the text.
    RE.get_or_init(|| {
        Regex::new(
            r"Infected \.([A-Za-z0-9_-]+) files have a file length increase of ([^\n]*?)(?:\.(?:\s|\z)|\n|\z)",
        )
        .expect("length increase regex")
    })
}

/// Every amount ends in exactly one period, wherever its clause sat.
fn normalize_amount(raw: &str) -> Option<String> {
    let amount = raw.trim().trim_end_matches('.').trim_end();
    if amount.is_empty() {
        None
    } else {
        Some(format!("{amount}."))
    }
}

/// Extract the symptom span. Returns [`SYMPTOMS_NOT_FOUND`] when either
/// marker is missing. A `Symptoms:` heading colon is not part of the span.
pub fn extract_symptoms(text: &str) -> String {
    symptoms_regex()
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().trim_start_matches(':').trim_start().to_string())
        .unwrap_or_else(|| SYMPTOMS_NOT_FOUND.to_string())
}

/// Extract per-file-type length increases.
pub fn extract_length_increases(text: &str) -> LengthIncreases {
    let mut increases = LengthIncreases::new();
    for caps in length_increase_regex().captures_iter(text) {
        let (Some(file_type), Some(amount)) = (caps.get(1), caps.get(2)) else {
            continue;
        };
        let Some(amount) = normalize_amount(amount.as_str()) else {
            continue;
        };
        increases.insert(file_type.as_str().to_string(), amount);
    }
    increases
}

/// Mine symptoms and length increases from a characteristics text.
pub fn mine_characteristics(text: &str) -> CharacteristicsFacts {
    CharacteristicsFacts {
        symptoms: extract_symptoms(text),
        length_increases: extract_length_increases(text),
    }
}
