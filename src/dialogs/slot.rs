//! Slot definitions and captured slot values.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::prompt::{Choice, PromptKind, PromptOptions};

/// One field collected by a slot-filling dialog.
///
/// Immutable once built; the builders below are the only constructors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotDefinition {
    name: String,
    kind: PromptKind,
    prompt: String,
    retry_prompt: Option<String>,
    choices: Vec<Choice>,
}

impl SlotDefinition {
    /// A free-text slot.
    pub fn text(name: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self::new(name, PromptKind::Text, prompt, Vec::new())
    }

    /// A numeric slot.
    pub fn number(name: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self::new(name, PromptKind::Number, prompt, Vec::new())
    }

    /// A one-of-choices slot. Choice order is the order they are offered in.
    pub fn choice<I, C>(name: impl Into<String>, prompt: impl Into<String>, choices: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Choice>,
    {
        let choices = choices.into_iter().map(Into::into).collect();
        Self::new(name, PromptKind::Choice, prompt, choices)
    }

    fn new(
        name: impl Into<String>,
        kind: PromptKind,
        prompt: impl Into<String>,
        choices: Vec<Choice>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            prompt: prompt.into(),
            retry_prompt: None,
            choices,
        }
    }

    /// Set the text re-sent when an answer fails validation.
    pub fn with_retry(mut self, retry_prompt: impl Into<String>) -> Self {
        self.retry_prompt = Some(retry_prompt.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> PromptKind {
        self.kind
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Retry text, defaulting to the prompt text.
    pub fn retry_prompt(&self) -> &str {
        self.retry_prompt.as_deref().unwrap_or(&self.prompt)
    }

    pub fn choices(&self) -> &[Choice] {
        &self.choices
    }

    /// Options handed to the prompt dialog that collects this slot.
    pub fn prompt_options(&self) -> PromptOptions {
        PromptOptions {
            prompt: self.prompt.clone(),
            retry_prompt: self.retry_prompt.clone(),
            choices: self.choices.clone(),
        }
    }
}

/// The choice a user picked, as stored in a slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoundChoice {
    /// Canonical choice label.
    pub value: String,
    /// Zero-based position of the choice in the offered list.
    pub index: usize,
}

/// A captured slot value.
///
/// Serialized untagged: numbers as JSON numbers, text as strings, choices as
/// `{"value": ..., "index": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SlotValue {
    Number(serde_json::Number),
    Text(String),
    Choice(FoundChoice),
}

impl SlotValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<&serde_json::Number> {
        match self {
            Self::Number(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_choice(&self) -> Option<&FoundChoice> {
        match self {
            Self::Choice(c) => Some(c),
            _ => None,
        }
    }
}

impl std::fmt::Display for SlotValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "{s}"),
            Self::Choice(c) => write!(f, "{}", c.value),
        }
    }
}

/// Slot name → captured value. A slot is filled iff its name is a key.
pub type SlotValues = BTreeMap<String, SlotValue>;
