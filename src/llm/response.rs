//! Parsing and repair of model replies.
//!
//! Replies are untrusted. Structured output is decoded as either a bare
//! list or an object wrapping the list; when that fails the first balanced
//! array/object substring is tried instead.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::prompts::SUMMARY_SECTIONS;
use super::LlmError;

/// Quiz item as the model wrote it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawQuestion {
    #[serde(default, alias = "prompt", alias = "text", deserialize_with = "lenient_string")]
    pub question: Option<String>,
    #[serde(
        default,
        rename = "type",
        alias = "question_type",
        alias = "kind",
        deserialize_with = "lenient_string"
    )]
    pub kind: Option<String>,
    #[serde(default, alias = "choices", alias = "answers")]
    pub options: Option<Vec<Value>>,
    #[serde(default, alias = "correctIndex", alias = "answer_index", alias = "correct")]
    pub correct_index: Option<Value>,
    #[serde(
        default,
        alias = "correctAnswer",
        alias = "answer",
        deserialize_with = "lenient_string"
    )]
    pub correct_answer: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub explanation: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub difficulty: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub topic: Option<String>,
}

/// Flashcard as the model wrote it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawCard {
    #[serde(
        default,
        alias = "question",
        alias = "term",
        alias = "prompt",
        deserialize_with = "lenient_string"
    )]
    pub front: Option<String>,
    #[serde(
        default,
        alias = "answer",
        alias = "definition",
        deserialize_with = "lenient_string"
    )]
    pub back: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub mnemonic: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub example: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub difficulty: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub topic: Option<String>,
}

/// Accept strings, numbers and booleans as text.
fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(value_text))
}

pub(crate) fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(true) => Some("True".to_string()),
        Value::Bool(false) => Some("False".to_string()),
        _ => None,
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ItemsPayload<T> {
    List(Vec<T>),
    Wrapped {
        #[serde(
            alias = "questions",
            alias = "cards",
            alias = "flashcards",
            alias = "quiz"
        )]
        items: Vec<T>,
    },
}

impl<T> ItemsPayload<T> {
    fn into_items(self) -> Vec<T> {
        match self {
            Self::List(items) | Self::Wrapped { items } => items,
        }
    }
}

/// Remove a surrounding markdown code fence, if any.
pub fn strip_code_fences(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json", "markdown", ...).
    let body = match rest.find('\n') {
        Some(i) => &rest[i + 1..],
        None => rest,
    };
    body.trim_end().trim_end_matches("```").trim()
}

/// Parse a list of items from a model reply.
pub fn parse_items<T: DeserializeOwned>(reply: &str) -> Result<Vec<T>, LlmError> {
    let cleaned = strip_code_fences(reply);
    if let Ok(payload) = serde_json::from_str::<ItemsPayload<T>>(cleaned) {
        return Ok(payload.into_items());
    }

    let mut start = 0;
    while let Some(offset) = cleaned[start..].find(|c: char| c == '[' || c == '{') {
        let open = start + offset;
        if let Some(candidate) = balanced_from(&cleaned[open..]) {
            if let Ok(payload) = serde_json::from_str::<ItemsPayload<T>>(candidate) {
                return Ok(payload.into_items());
            }
        }
        start = open + 1;
    }

    Err(LlmError::Parse(
        "no JSON list of items found in model reply".to_string(),
    ))
}

/// The balanced bracket expression at the start of `text`.
fn balanced_from(text: &str) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '[' | '{' => depth += 1,
            ']' | '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(&text[..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Match a section header line, returning the section and any text that
/// follows the header on the same line.
fn section_header(line: &str) -> Option<(&'static str, &str)> {
    let stripped = line
        .trim()
        .trim_start_matches('#')
        .trim()
        .trim_matches('*')
        .trim();

    for name in SUMMARY_SECTIONS {
        let Some(head) = stripped.get(..name.len()) else {
            continue;
        };
        if !head.eq_ignore_ascii_case(name) {
            continue;
        }
        let rest = stripped[name.len()..].trim_start_matches('*');
        if rest.trim().is_empty() {
            return Some((name, ""));
        }
        if let Some(inline) = rest.strip_prefix(':') {
            return Some((name, inline.trim_start_matches('*').trim()));
        }
    }
    None
}

/// Sections of the sectioned format that are absent or empty.
pub fn missing_sections(summary: &str) -> Vec<&'static str> {
    let mut filled: Vec<&'static str> = Vec::new();
    let mut current: Option<&'static str> = None;

    for line in summary.lines() {
        if let Some((name, inline)) = section_header(line) {
            current = Some(name);
            if !inline.is_empty() {
                filled.push(name);
            }
            continue;
        }
        if let Some(name) = current {
            if !line.trim().is_empty() {
                filled.push(name);
            }
        }
    }

    SUMMARY_SECTIONS
        .into_iter()
        .filter(|name| !filled.contains(name))
        .collect()
}
