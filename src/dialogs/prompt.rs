//! Single-value prompts — ask, validate, re-ask until the answer fits.
//!
//! A prompt never gives up on its own: invalid input re-sends the retry text
//! and keeps the frame active. Only the controller's cancel keyword unwinds it.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

use super::context::{DialogContext, DialogTurnResult, TurnContext};
use super::dialog::Dialog;
use super::slot::{FoundChoice, SlotValue};
use super::stack::FrameState;
use crate::error::DialogError;

/// Integer or decimal literal; `,` is accepted as the decimal separator.
static NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[+-]?\d+(?:[.,]\d+)?$").expect("valid number regex"));

/// The kind of value a prompt collects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptKind {
    Text,
    Number,
    Choice,
}

impl PromptKind {
    /// Id under which the prompt for this kind is registered in a dialog set.
    pub fn dialog_id(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Number => "number",
            Self::Choice => "choice",
        }
    }

    /// Validate raw user input against this kind.
    pub fn recognize(&self, input: &str, choices: &[Choice]) -> Result<SlotValue, RecognizeError> {
        match self {
            Self::Text => recognize_text(input).map(SlotValue::Text),
            Self::Number => recognize_number(input).map(SlotValue::Number),
            Self::Choice => recognize_choice(input, choices).map(SlotValue::Choice),
        }
    }
}

impl std::fmt::Display for PromptKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.dialog_id())
    }
}

/// An offered choice plus the alternative spellings that select it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub value: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub synonyms: Vec<String>,
}

impl Choice {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            synonyms: Vec::new(),
        }
    }

    pub fn with_synonyms<I, S>(mut self, synonyms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.synonyms.extend(synonyms.into_iter().map(Into::into));
        self
    }
}

impl From<&str> for Choice {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Choice {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Options passed to a prompt when it is begun.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptOptions {
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<Choice>,
}

impl PromptOptions {
    pub fn retry_text(&self) -> &str {
        self.retry_prompt.as_deref().unwrap_or(&self.prompt)
    }
}

/// Persisted state of an active prompt frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptState {
    pub options: PromptOptions,
    /// Rejected answers so far.
    #[serde(default)]
    pub attempts: u32,
}

/// Why an answer was rejected. Recovered locally by re-asking.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecognizeError {
    #[error("empty input")]
    Empty,

    #[error("not a number: {0:?}")]
    NotANumber(String),

    #[error("no choice matches {0:?}")]
    NoMatchingChoice(String),
}

/// Any input that is not blank, verbatim.
pub fn recognize_text(input: &str) -> Result<String, RecognizeError> {
    if input.trim().is_empty() {
        return Err(RecognizeError::Empty);
    }
    Ok(input.to_string())
}

/// A numeric literal. Whole numbers stay integers.
pub fn recognize_number(input: &str) -> Result<serde_json::Number, RecognizeError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(RecognizeError::Empty);
    }
    if !NUMBER_RE.is_match(trimmed) {
        return Err(RecognizeError::NotANumber(trimmed.to_string()));
    }

    let literal = trimmed.replace(',', ".");
    if let Ok(n) = literal.parse::<i64>() {
        return Ok(n.into());
    }
    if let Ok(n) = literal.parse::<u64>() {
        return Ok(n.into());
    }
    literal
        .parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
        .ok_or_else(|| RecognizeError::NotANumber(trimmed.to_string()))
}

/// Case-insensitive match against choice labels, then synonyms, then a
/// 1-based position ("2" picks the second choice).
pub fn recognize_choice(input: &str, choices: &[Choice]) -> Result<FoundChoice, RecognizeError> {
    let needle = normalize(input);
    if needle.is_empty() {
        return Err(RecognizeError::Empty);
    }

    let found = |index: usize| FoundChoice {
        value: choices[index].value.clone(),
        index,
    };

    if let Some(index) = choices.iter().position(|c| normalize(&c.value) == needle) {
        return Ok(found(index));
    }
    if let Some(index) = choices
        .iter()
        .position(|c| c.synonyms.iter().any(|s| normalize(s) == needle))
    {
        return Ok(found(index));
    }
    if let Ok(ordinal) = needle.parse::<usize>()
        && (1..=choices.len()).contains(&ordinal)
    {
        return Ok(found(ordinal - 1));
    }

    Err(RecognizeError::NoMatchingChoice(input.trim().to_string()))
}

/// Lowercase, fold `ё` into `е`, strip surrounding whitespace and punctuation.
fn normalize(s: &str) -> String {
    s.trim_matches(|c: char| c.is_whitespace() || c.is_ascii_punctuation() || "«»…".contains(c))
        .to_lowercase()
        .replace('ё', "е")
}

/// Render choices inline: `(1) A, (2) B или (3) C`.
pub fn inline_choices(choices: &[Choice]) -> String {
    let items: Vec<String> = choices
        .iter()
        .enumerate()
        .map(|(i, c)| format!("({}) {}", i + 1, c.value))
        .collect();
    match items.split_last() {
        None => String::new(),
        Some((last, [])) => last.clone(),
        Some((last, rest)) => format!("{} или {}", rest.join(", "), last),
    }
}

/// A prompt dialog for one [`PromptKind`].
#[derive(Debug, Clone)]
pub struct Prompt {
    id: String,
    kind: PromptKind,
}

impl Prompt {
    pub fn new(id: impl Into<String>, kind: PromptKind) -> Self {
        Self {
            id: id.into(),
            kind,
        }
    }

    /// A prompt registered under the kind's default id.
    pub fn for_kind(kind: PromptKind) -> Self {
        Self::new(kind.dialog_id(), kind)
    }

    pub fn kind(&self) -> PromptKind {
        self.kind
    }

    fn state<'s>(&self, dc: &'s mut DialogContext<'_>) -> Result<&'s mut PromptState, DialogError> {
        match dc.active_state_mut()? {
            FrameState::Prompt(state) => Ok(state),
            _ => Err(DialogError::StateMismatch {
                dialog_id: self.id.clone(),
            }),
        }
    }

    /// Send `text`, with the choice list attached for choice prompts.
    fn ask(&self, turn: &mut TurnContext, options: &PromptOptions, text: &str) {
        if self.kind != PromptKind::Choice {
            turn.send_text(text);
            return;
        }

        let actions: Vec<Value> = options
            .choices
            .iter()
            .map(|c| json!({"type": "imBack", "title": c.value, "value": c.value}))
            .collect();
        turn.send_structured(json!({
            "text": format!("{} {}", text, inline_choices(&options.choices)),
            "suggestedActions": {"actions": actions},
        }));
    }
}

impl Dialog for Prompt {
    fn id(&self) -> &str {
        &self.id
    }

    fn initial_state(&self, options: Option<Value>) -> Result<FrameState, DialogError> {
        let options: PromptOptions = match options {
            Some(value) => serde_json::from_value(value)?,
            None => {
                return Err(DialogError::InvalidOptions {
                    dialog_id: self.id.clone(),
                    reason: "prompt text is required".to_string(),
                });
            }
        };
        if self.kind == PromptKind::Choice && options.choices.is_empty() {
            return Err(DialogError::InvalidOptions {
                dialog_id: self.id.clone(),
                reason: "choice prompt needs at least one choice".to_string(),
            });
        }
        Ok(FrameState::Prompt(PromptState {
            options,
            attempts: 0,
        }))
    }

    fn begin(&self, dc: &mut DialogContext<'_>) -> Result<DialogTurnResult, DialogError> {
        let options = self.state(dc)?.options.clone();
        self.ask(dc.turn, &options, &options.prompt);
        Ok(DialogTurnResult::Waiting)
    }

    fn continue_dialog(&self, dc: &mut DialogContext<'_>) -> Result<DialogTurnResult, DialogError> {
        let input = dc.turn.text().to_string();
        let options = self.state(dc)?.options.clone();

        match self.kind.recognize(&input, &options.choices) {
            Ok(value) => {
                debug!(dialog_id = %self.id, value = %value, "Prompt answered");
                dc.end_dialog(Some(serde_json::to_value(value)?))
            }
            Err(reason) => {
                let state = self.state(dc)?;
                state.attempts += 1;
                debug!(
                    dialog_id = %self.id,
                    attempts = state.attempts,
                    %reason,
                    "Prompt input rejected, re-asking"
                );
                self.ask(dc.turn, &options, options.retry_text());
                Ok(DialogTurnResult::Waiting)
            }
        }
    }
}
