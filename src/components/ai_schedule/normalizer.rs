use super::models::{AiScheduleResponse, Intent, Proposal, ProposalPayload};
use rust_i18n::t;
use serde_json::{Map, Value};
use tracing::warn;

/// First non-empty string among `keys`
fn string_field(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match map.get(*key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    })
}

fn bool_field(map: &Map<String, Value>, keys: &[&str]) -> Option<bool> {
    keys.iter().find_map(|key| map.get(*key)?.as_bool())
}

/// Identifiers may come back as strings or bare numbers
fn id_field(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match map.get(*key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Attendees are a string on the wire; a list of names is joined
fn attendees_field(map: &Map<String, Value>) -> Option<String> {
    match map.get("attendees")? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Array(items) => {
            let names: Vec<&str> = items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .collect();
            (!names.is_empty()).then(|| names.join(", "))
        }
        _ => None,
    }
}

fn missing_fields(map: &Map<String, Value>) -> Vec<String> {
    match map.get("missing_fields").or_else(|| map.get("missingFields")) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|field| !field.is_empty())
            .map(str::to_string)
            .collect(),
        Some(Value::String(field)) if !field.trim().is_empty() => vec![field.trim().to_string()],
        _ => Vec::new(),
    }
}

fn confidence(map: &Map<String, Value>) -> Option<f64> {
    map.get("confidence")?
        .as_f64()
        .filter(|value| value.is_finite())
        .map(|value| value.clamp(0.0, 1.0))
}

fn intent(map: &Map<String, Value>) -> Option<Intent> {
    let raw = string_field(map, &["intent"])?;
    match raw.parse::<Intent>() {
        Ok(intent) => Some(intent),
        Err(_) => {
            warn!("Model returned an unknown intent: {}", raw);
            None
        }
    }
}

/// Read the proposal object field by field; wrong-typed fields are dropped
pub fn payload_from_map(map: &Map<String, Value>) -> ProposalPayload {
    ProposalPayload {
        title: string_field(map, &["title"]),
        description: string_field(map, &["description"]),
        start_time: string_field(map, &["startTime", "start_time"]),
        end_time: string_field(map, &["endTime", "end_time"]),
        location: string_field(map, &["location"]),
        attendees: attendees_field(map),
        category: string_field(map, &["category"]).map(|c| c.to_lowercase()),
        priority: string_field(map, &["priority"]).map(|p| p.to_lowercase()),
        is_important: bool_field(map, &["isImportant", "is_important"]),
        is_urgent: bool_field(map, &["isUrgent", "is_urgent"]),
        timezone: string_field(map, &["timezone"]),
        completed: bool_field(map, &["completed"]),
        metadata: map.get("metadata").and_then(Value::as_object).cloned(),
    }
}

/// Response used when the model could not be reached or understood
pub fn unavailable_response() -> AiScheduleResponse {
    AiScheduleResponse {
        reply: t!("unavailable_reply").to_string(),
        requires_clarification: true,
        follow_up_question: None,
        proposal: None,
        raw: None,
    }
}

/// Build the caller-facing response from parsed model output
pub fn build_response(parsed: Map<String, Value>, timezone: &str) -> AiScheduleResponse {
    let model_reply = string_field(&parsed, &["reply"]);
    let follow_up_question = string_field(&parsed, &["follow_up_question", "followUpQuestion"]);
    let missing = missing_fields(&parsed);
    let requires_clarification = !missing.is_empty() || follow_up_question.is_some();

    let proposal = intent(&parsed).map(|intent| {
        let mut data = parsed
            .get("proposal")
            .and_then(Value::as_object)
            .map(payload_from_map)
            .unwrap_or_default();
        if data.timezone.is_none() {
            data.timezone = Some(timezone.to_string());
        }

        let summary = data
            .title
            .clone()
            .or_else(|| model_reply.clone())
            .unwrap_or_else(|| t!("pending_summary").to_string());

        Proposal {
            intent,
            summary,
            data,
            confidence: confidence(&parsed),
            original_event_id: id_field(&parsed, &["target_event_id", "targetEventId"]),
            missing_fields: missing,
            requires_clarification,
            follow_up_question: follow_up_question.clone(),
        }
    });

    AiScheduleResponse {
        reply: model_reply.unwrap_or_else(|| t!("fallback_reply").to_string()),
        requires_clarification,
        follow_up_question,
        proposal,
        raw: Some(parsed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_complete_create_proposal() {
        let response = build_response(
            obj(json!({
                "reply": "安排好啦",
                "intent": "create",
                "confidence": 0.9,
                "proposal": {
                    "title": "会议",
                    "startTime": "2024-01-01T00:00:00.000Z",
                    "endTime": "2024-01-01T01:00:00.000Z"
                }
            })),
            "Asia/Shanghai",
        );

        assert_eq!(response.reply, "安排好啦");
        assert!(!response.requires_clarification);
        let proposal = response.proposal.unwrap();
        assert_eq!(proposal.intent, Intent::Create);
        assert_eq!(proposal.summary, "会议");
        assert_eq!(proposal.data.title.as_deref(), Some("会议"));
        assert_eq!(proposal.data.timezone.as_deref(), Some("Asia/Shanghai"));
        assert_eq!(proposal.confidence, Some(0.9));
        assert!(response.raw.is_some());
    }

    #[test]
    fn test_missing_intent_means_no_proposal() {
        let response = build_response(obj(json!({"reply": "Hello there"})), "UTC");
        assert!(response.proposal.is_none());
        assert_eq!(response.reply, "Hello there");
        assert!(!response.requires_clarification);
    }

    #[test]
    fn test_missing_reply_uses_fallback() {
        let response = build_response(obj(json!({"intent": "query"})), "UTC");
        assert_eq!(response.reply, t!("fallback_reply"));
        let proposal = response.proposal.unwrap();
        assert_eq!(proposal.summary, t!("pending_summary"));
    }

    #[test]
    fn test_summary_falls_back_to_reply() {
        let response = build_response(
            obj(json!({"intent": "delete", "reply": "Removing the dentist visit", "target_event_id": "e-9"})),
            "UTC",
        );
        let proposal = response.proposal.unwrap();
        assert_eq!(proposal.summary, "Removing the dentist visit");
        assert_eq!(proposal.original_event_id.as_deref(), Some("e-9"));
    }

    #[test]
    fn test_clarification_from_missing_fields_or_question() {
        let by_fields = build_response(
            obj(json!({"intent": "create", "missing_fields": ["startTime"]})),
            "UTC",
        );
        assert!(by_fields.requires_clarification);
        assert!(by_fields.proposal.unwrap().requires_clarification);

        let by_question = build_response(
            obj(json!({"intent": "create", "follow_up_question": "What time?"})),
            "UTC",
        );
        assert!(by_question.requires_clarification);
        assert_eq!(by_question.follow_up_question.as_deref(), Some("What time?"));
        assert!(by_question.proposal.unwrap().requires_clarification);
    }

    #[test]
    fn test_model_timezone_is_kept() {
        let response = build_response(
            obj(json!({"intent": "create", "proposal": {"title": "Sauna", "timezone": "Europe/Helsinki"}})),
            "UTC",
        );
        assert_eq!(
            response.proposal.unwrap().data.timezone.as_deref(),
            Some("Europe/Helsinki")
        );
    }

    #[test]
    fn test_adversarial_types_do_not_panic() {
        let response = build_response(
            obj(json!({
                "reply": 42,
                "intent": ["create"],
                "confidence": "very",
                "missing_fields": {"a": 1},
                "proposal": "not an object"
            })),
            "UTC",
        );
        assert!(response.proposal.is_none());
        assert_eq!(response.reply, t!("fallback_reply"));

        let response = build_response(
            obj(json!({
                "intent": "CREATE",
                "confidence": 7.5,
                "missing_fields": ["title", 3, null, ""],
                "target_event_id": 12345,
                "extra": {"nested": true},
                "proposal": {
                    "title": 99,
                    "startTime": false,
                    "isImportant": "yes",
                    "isUrgent": true,
                    "category": "Meeting",
                    "attendees": ["Ann", " ", "Bo"],
                    "metadata": [1, 2]
                }
            })),
            "UTC",
        );
        let proposal = response.proposal.unwrap();
        assert_eq!(proposal.intent, Intent::Create);
        assert_eq!(proposal.confidence, Some(1.0));
        assert_eq!(proposal.missing_fields, vec!["title".to_string()]);
        assert_eq!(proposal.original_event_id.as_deref(), Some("12345"));
        assert!(proposal.data.title.is_none());
        assert!(proposal.data.start_time.is_none());
        assert!(proposal.data.is_important.is_none());
        assert_eq!(proposal.data.is_urgent, Some(true));
        assert_eq!(proposal.data.category.as_deref(), Some("meeting"));
        assert_eq!(proposal.data.attendees.as_deref(), Some("Ann, Bo"));
        assert!(proposal.data.metadata.is_none());
    }

    #[test]
    fn test_unknown_intent_is_dropped() {
        let response = build_response(obj(json!({"intent": "reschedule", "reply": "ok"})), "UTC");
        assert!(response.proposal.is_none());
    }

    #[test]
    fn test_unavailable_response_asks_again() {
        let response = unavailable_response();
        assert!(response.requires_clarification);
        assert!(response.proposal.is_none());
        assert_eq!(response.reply, t!("unavailable_reply"));
    }
}
