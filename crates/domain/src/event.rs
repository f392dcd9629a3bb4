use std::fmt::{Display, Formatter};

use chainaudit_core::{AppError, AppResult, NonEmptyString};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::document::Document;

/// Priority assigned when the caller does not supply one.
pub const DEFAULT_EVENT_PRIORITY: &str = "normal";

/// Caller-supplied identifier of an event, unique per ledger.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EventId(String);

impl EventId {
    /// Minimum identifier length in characters.
    pub const MIN_LENGTH: usize = 3;
    /// Maximum identifier length in characters.
    pub const MAX_LENGTH: usize = 50;

    /// Creates a validated event identifier.
    ///
    /// Surrounding whitespace is trimmed before the length check.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        let trimmed = value.trim();
        let length = trimmed.chars().count();

        if !(Self::MIN_LENGTH..=Self::MAX_LENGTH).contains(&length) {
            return Err(AppError::Validation(format!(
                "eventId must be between {} and {} characters, got {length}",
                Self::MIN_LENGTH,
                Self::MAX_LENGTH
            )));
        }

        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl TryFrom<String> for EventId {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<EventId> for String {
    fn from(value: EventId) -> Self {
        value.0
    }
}

impl Display for EventId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.0.as_str())
    }
}

/// Unvalidated event as received from a transport boundary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventInput {
    /// Caller-supplied event identifier.
    #[serde(default)]
    pub event_id: Option<String>,
    /// Event type such as `login` or `payment`.
    #[serde(default, rename = "type")]
    pub event_type: Option<String>,
    /// Who performed the action.
    #[serde(default)]
    pub actor: Option<Value>,
    /// What the action was performed on.
    #[serde(default)]
    pub subject: Option<Value>,
    /// Free-form event body.
    #[serde(default)]
    pub payload: Option<Value>,
    /// Optional routing priority.
    #[serde(default)]
    pub priority: Option<String>,
    /// Optional caller metadata such as `source` or `environment`.
    #[serde(default)]
    pub metadata: Option<Value>,
}

/// Validated, immutable unit of work entering the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    event_id: EventId,
    #[serde(rename = "type")]
    event_type: NonEmptyString,
    #[serde(default)]
    actor: Document,
    #[serde(default)]
    subject: Document,
    #[serde(default)]
    payload: Document,
    #[serde(default = "default_priority")]
    priority: String,
    #[serde(default)]
    metadata: Document,
}

impl Event {
    /// Validates transport input into an event.
    ///
    /// Every missing or malformed field is collected so callers can report
    /// them together.
    pub fn from_input(input: EventInput) -> AppResult<Self> {
        let mut invalid_fields = Vec::new();

        let event_id = input.event_id.and_then(|value| EventId::new(value).ok());
        if event_id.is_none() {
            invalid_fields.push("eventId".to_owned());
        }

        let event_type = input
            .event_type
            .and_then(|value| NonEmptyString::new(value.trim()).ok());
        if event_type.is_none() {
            invalid_fields.push("type".to_owned());
        }

        let actor = document_field("actor", input.actor, &mut invalid_fields);
        let subject = document_field("subject", input.subject, &mut invalid_fields);
        let payload = document_field("payload", input.payload, &mut invalid_fields);
        let metadata = document_field("metadata", input.metadata, &mut invalid_fields);

        let (
            Some(event_id),
            Some(event_type),
            Some(actor),
            Some(subject),
            Some(payload),
            Some(metadata),
        ) = (event_id, event_type, actor, subject, payload, metadata)
        else {
            return Err(AppError::InvalidFields(invalid_fields));
        };

        let priority = input
            .priority
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(default_priority);

        Ok(Self {
            event_id,
            event_type,
            actor,
            subject,
            payload,
            priority,
            metadata,
        })
    }

    /// Returns the event identifier.
    #[must_use]
    pub fn event_id(&self) -> &EventId {
        &self.event_id
    }

    /// Returns the event type.
    #[must_use]
    pub fn event_type(&self) -> &str {
        self.event_type.as_str()
    }

    /// Returns the actor document.
    #[must_use]
    pub fn actor(&self) -> &Document {
        &self.actor
    }

    /// Returns the subject document.
    #[must_use]
    pub fn subject(&self) -> &Document {
        &self.subject
    }

    /// Returns the payload document.
    #[must_use]
    pub fn payload(&self) -> &Document {
        &self.payload
    }

    /// Returns the routing priority.
    #[must_use]
    pub fn priority(&self) -> &str {
        self.priority.as_str()
    }

    /// Returns the metadata document.
    #[must_use]
    pub fn metadata(&self) -> &Document {
        &self.metadata
    }

    /// Looks up a signal by name in the payload, then in the metadata.
    #[must_use]
    pub fn signal(&self, key: &str) -> Option<&str> {
        self.payload
            .get_str(key)
            .or_else(|| self.metadata.get_str(key))
    }
}

impl From<Event> for EventInput {
    fn from(value: Event) -> Self {
        Self {
            event_id: Some(value.event_id.into()),
            event_type: Some(value.event_type.into()),
            actor: Some(value.actor.into()),
            subject: Some(value.subject.into()),
            payload: Some(value.payload.into()),
            priority: Some(value.priority),
            metadata: Some(value.metadata.into()),
        }
    }
}

fn default_priority() -> String {
    DEFAULT_EVENT_PRIORITY.to_owned()
}

fn document_field(
    name: &str,
    value: Option<Value>,
    invalid_fields: &mut Vec<String>,
) -> Option<Document> {
    match Document::from_value(value.unwrap_or(Value::Null)) {
        Ok(document) => Some(document),
        Err(_) => {
            invalid_fields.push(name.to_owned());
            None
        }
    }
}
