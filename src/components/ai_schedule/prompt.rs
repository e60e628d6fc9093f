use super::models::Intent;
use crate::components::schedule_store::{ScheduleCategory, ScheduleEvent, SchedulePriority};
use crate::utils::time::to_iso;
use chrono::{DateTime, Utc};

/// Line shown instead of the event list when nothing is upcoming
const NO_EVENTS: &str = "None";

fn join_values<T>(values: &[T], as_str: fn(&T) -> &'static str) -> String {
    values.iter().map(as_str).collect::<Vec<_>>().join("|")
}

/// Keep a user-supplied title on one line without extra field separators
fn line_safe(title: &str) -> String {
    title
        .chars()
        .map(|c| match c {
            '|' => '/',
            '\n' | '\r' => ' ',
            other => other,
        })
        .collect()
}

/// One `id|title|start|end` line per event
fn event_lines(events: &[ScheduleEvent]) -> String {
    if events.is_empty() {
        return NO_EVENTS.to_string();
    }

    events
        .iter()
        .map(|event| {
            format!(
                "{}|{}|{}|{}",
                event.id,
                line_safe(&event.title),
                to_iso(&event.start_time),
                to_iso(&event.end_time)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// The JSON shape the model must answer with
fn response_schema(timezone: &str) -> String {
    let intents = join_values(&Intent::ALL, Intent::as_str);
    let categories = join_values(&ScheduleCategory::ALL, ScheduleCategory::as_str);
    let priorities = join_values(&SchedulePriority::ALL, SchedulePriority::as_str);

    format!(
        r#"{{
  "reply": "Friendly acknowledgement and short summary for the user",
  "intent": "{intents}",
  "confidence": 0.0-1.0,
  "follow_up_question": "question when missing_fields is not empty" | null,
  "missing_fields": ["field name"],
  "target_event_id": "id for update/delete" | null,
  "proposal": {{
    "title": "...",
    "description": "...",
    "startTime": "ISO timestamp",
    "endTime": "ISO timestamp",
    "location": "...",
    "attendees": "...",
    "category": "{categories}",
    "priority": "{priorities}",
    "isImportant": true|false,
    "isUrgent": true|false,
    "timezone": "{timezone}"
  }}
}}"#
    )
}

/// Build the system prompt for one parse call. Identical inputs give identical output.
pub fn build_system_prompt(now: DateTime<Utc>, timezone: &str, events: &[ScheduleEvent]) -> String {
    [
        "You are an intelligent scheduling assistant.".to_string(),
        format!("Current server time: {}", to_iso(&now)),
        format!("User timezone: {}", timezone),
        "Upcoming user events (id|title|start|end):".to_string(),
        event_lines(events),
        "Always respond **ONLY** with JSON matching this schema:".to_string(),
        response_schema(timezone),
        "If the request is ambiguous set missing_fields with required data and provide follow_up_question.".to_string(),
    ]
    .join("\n")
}
