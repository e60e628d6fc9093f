use crate::components::schedule_store::ScheduleEvent;
use crate::error::{validation_error, Error};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Structured action a message is classified into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    Create,
    Update,
    Delete,
    Query,
}

impl Intent {
    pub const ALL: [Intent; 4] = [Intent::Create, Intent::Update, Intent::Delete, Intent::Query];

    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Create => "create",
            Intent::Update => "update",
            Intent::Delete => "delete",
            Intent::Query => "query",
        }
    }
}

impl FromStr for Intent {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|intent| intent.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| validation_error(&format!("Unsupported intent: {}", s)))
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Partially filled schedule fields proposed by the model or edited by the user
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attendees: Option<String>,
    /// Raw category; unknown values are ignored on execution
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Raw priority; unknown values are ignored on execution
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_important: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_urgent: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

impl ProposalPayload {
    /// True when no field is set at all
    pub fn is_empty(&self) -> bool {
        *self == ProposalPayload::default()
    }

    /// True when either bound of the time range is set
    pub fn touches_time(&self) -> bool {
        self.start_time.is_some() || self.end_time.is_some()
    }
}

/// A confirmable suggestion built from one model reply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Proposal {
    pub intent: Intent,
    pub summary: String,
    pub data: ProposalPayload,
    /// Advisory only, clamped to 0.0..=1.0
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_event_id: Option<String>,
    #[serde(default)]
    pub missing_fields: Vec<String>,
    pub requires_clarification: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub follow_up_question: Option<String>,
}

/// Result of parsing one user message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiScheduleResponse {
    pub reply: String,
    pub requires_clarification: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub follow_up_question: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proposal: Option<Proposal>,
    /// Parsed model output, kept for auditing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<Map<String, Value>>,
}

/// Input of the parse operation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseRequest {
    pub message: String,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub model_id: Option<String>,
    #[serde(default)]
    pub now: Option<DateTime<Utc>>,
}

impl ParseRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }
}

/// A confirmed proposal submitted for execution
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRequest {
    /// Raw intent; anything outside the four known intents is rejected
    pub intent: String,
    #[serde(default)]
    pub schedule_id: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub data: Option<ProposalPayload>,
    #[serde(default)]
    pub context: Option<Map<String, Value>>,
}

impl ExecutionRequest {
    pub fn new(intent: Intent) -> Self {
        Self {
            intent: intent.as_str().to_string(),
            ..Default::default()
        }
    }

    pub fn with_schedule_id(mut self, id: impl Into<String>) -> Self {
        self.schedule_id = Some(id.into());
        self
    }

    pub fn with_data(mut self, data: ProposalPayload) -> Self {
        self.data = Some(data);
        self
    }
}

/// What an execution touched
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Affected {
    Event(ScheduleEvent),
    Events(Vec<ScheduleEvent>),
}

/// Outcome of executing an intent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub intent: Intent,
    pub message: String,
    #[serde(flatten)]
    pub affected: Affected,
}

impl ExecutionResult {
    pub fn event(&self) -> Option<&ScheduleEvent> {
        match &self.affected {
            Affected::Event(event) => Some(event),
            Affected::Events(_) => None,
        }
    }

    pub fn events(&self) -> &[ScheduleEvent] {
        match &self.affected {
            Affected::Event(event) => std::slice::from_ref(event),
            Affected::Events(events) => events,
        }
    }
}
