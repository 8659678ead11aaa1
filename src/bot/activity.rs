//! Inbound events — one per turn, as delivered by a channel.

use serde::{Deserialize, Deserializer, Serialize};

/// A conversation participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: String,
    /// Display name. Missing and `null` both read as empty.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub name: String,
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl Participant {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// What happened this turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// The user sent a text message.
    TextMessage { text: String },
    /// Members joined the conversation.
    MembersAdded { members: Vec<Participant> },
    /// Anything else (typing indicators, reactions, ...). Logged and ignored.
    Other { kind: String },
}

/// One inbound event for one conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    pub conversation_id: String,
    /// Who sent the event.
    pub from: Participant,
    /// The bot account the event was addressed to, if the channel says.
    pub recipient_id: Option<String>,
    pub kind: EventKind,
}

impl InboundEvent {
    pub fn text(
        conversation_id: impl Into<String>,
        from: Participant,
        text: impl Into<String>,
    ) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            from,
            recipient_id: None,
            kind: EventKind::TextMessage { text: text.into() },
        }
    }

    pub fn members_added(
        conversation_id: impl Into<String>,
        from: Participant,
        members: Vec<Participant>,
    ) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            from,
            recipient_id: None,
            kind: EventKind::MembersAdded { members },
        }
    }

    pub fn other(
        conversation_id: impl Into<String>,
        from: Participant,
        kind: impl Into<String>,
    ) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            from,
            recipient_id: None,
            kind: EventKind::Other { kind: kind.into() },
        }
    }

    pub fn with_recipient(mut self, recipient_id: impl Into<String>) -> Self {
        self.recipient_id = Some(recipient_id.into());
        self
    }

    /// Short name of the event kind, for logs.
    pub fn kind_name(&self) -> &str {
        match &self.kind {
            EventKind::TextMessage { .. } => "message",
            EventKind::MembersAdded { .. } => "membersAdded",
            EventKind::Other { kind } => kind,
        }
    }
}
