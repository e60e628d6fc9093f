use super::models::{Affected, ExecutionRequest, ExecutionResult, Intent, ProposalPayload};
use crate::components::schedule_store::models::{
    MAX_ATTENDEES_LEN, MAX_LOCATION_LEN, MAX_TIMEZONE_LEN, MAX_TITLE_LEN,
};
use crate::components::schedule_store::{
    merge_metadata, EventRange, ScheduleCategory, ScheduleEvent, ScheduleFields,
    SchedulePriority, ScheduleStore,
};
use crate::error::{validation_error, AssistantResult};
use crate::utils::time::{
    normalize_range, parse_timestamp, parse_timezone, shift, to_iso, DEFAULT_QUERY_DAYS,
};
use chrono::{DateTime, Duration, Utc};
use rust_i18n::t;
use std::sync::Arc;
use tracing::{debug, info};

/// Unknown categories are treated as not given
fn guard_category(input: Option<&str>) -> Option<ScheduleCategory> {
    input.and_then(|value| value.parse().ok())
}

/// Unknown priorities are treated as not given
fn guard_priority(input: Option<&str>) -> Option<SchedulePriority> {
    input.and_then(|value| value.parse().ok())
}

fn check_length(value: Option<&str>, max: usize, field: &str) -> AssistantResult<()> {
    match value {
        Some(value) if value.chars().count() > max => Err(validation_error(&format!(
            "{} must be at most {} characters",
            field, max
        ))),
        _ => Ok(()),
    }
}

fn validate_fields(fields: &ScheduleFields) -> AssistantResult<()> {
    if fields.title.trim().is_empty() {
        return Err(validation_error("Title must not be empty"));
    }
    check_length(Some(&fields.title), MAX_TITLE_LEN, "title")?;
    check_length(fields.location.as_deref(), MAX_LOCATION_LEN, "location")?;
    check_length(fields.attendees.as_deref(), MAX_ATTENDEES_LEN, "attendees")?;
    check_length(fields.timezone.as_deref(), MAX_TIMEZONE_LEN, "timezone")?;
    Ok(())
}

/// Resolve a create payload into complete fields with defaults applied
pub fn create_fields(data: &ProposalPayload) -> AssistantResult<ScheduleFields> {
    let (Some(title), Some(start_time)) = (data.title.as_deref(), data.start_time.as_deref())
    else {
        return Err(validation_error(
            "Title and start time are required to create a schedule",
        ));
    };

    let timezone = parse_timezone(data.timezone.as_deref());
    let range = normalize_range(start_time, data.end_time.as_deref(), timezone)?;

    let fields = ScheduleFields {
        title: title.to_string(),
        description: data.description.clone(),
        start_time: range.start,
        end_time: range.end,
        category: guard_category(data.category.as_deref()).unwrap_or_default(),
        priority: guard_priority(data.priority.as_deref()).unwrap_or_default(),
        is_important: data.is_important.unwrap_or(false),
        is_urgent: data.is_urgent.unwrap_or(false),
        location: data.location.clone(),
        attendees: data.attendees.clone(),
        timezone: data.timezone.clone(),
        metadata: merge_metadata(None, data.metadata.as_ref(), data.completed).resolve(None),
    };
    validate_fields(&fields)?;
    Ok(fields)
}

/// Overwrite the provided fields of an existing entry.
///
/// When either time bound is given both are normalized together, with the
/// stored value standing in for the missing one.
pub fn apply_patch(current: ScheduleFields, data: &ProposalPayload) -> AssistantResult<ScheduleFields> {
    let mut next = current;

    if data.touches_time() {
        let zone_label = data.timezone.as_deref().or(next.timezone.as_deref());
        let start = data
            .start_time
            .clone()
            .unwrap_or_else(|| to_iso(&next.start_time));
        let end = data
            .end_time
            .clone()
            .unwrap_or_else(|| to_iso(&next.end_time));
        let range = normalize_range(&start, Some(&end), parse_timezone(zone_label))?;
        next.start_time = range.start;
        next.end_time = range.end;
    }

    if let Some(title) = &data.title {
        next.title = title.clone();
    }
    if let Some(description) = &data.description {
        next.description = Some(description.clone());
    }
    if let Some(category) = guard_category(data.category.as_deref()) {
        next.category = category;
    }
    if let Some(priority) = guard_priority(data.priority.as_deref()) {
        next.priority = priority;
    }
    if let Some(is_important) = data.is_important {
        next.is_important = is_important;
    }
    if let Some(is_urgent) = data.is_urgent {
        next.is_urgent = is_urgent;
    }
    if let Some(location) = &data.location {
        next.location = Some(location.clone());
    }
    if let Some(attendees) = &data.attendees {
        next.attendees = Some(attendees.clone());
    }
    if let Some(timezone) = &data.timezone {
        next.timezone = Some(timezone.clone());
    }

    let existing = next.metadata.take();
    next.metadata = merge_metadata(existing.as_ref(), data.metadata.as_ref(), data.completed)
        .resolve(existing);

    validate_fields(&next)?;
    Ok(next)
}

/// Query window from an optional payload: `[start, end)`, defaulting to the next week
pub fn query_range(data: Option<&ProposalPayload>, now: DateTime<Utc>) -> AssistantResult<EventRange> {
    let timezone = parse_timezone(data.and_then(|d| d.timezone.as_deref()));

    let start = match data.and_then(|d| d.start_time.as_deref()) {
        Some(start) => parse_timestamp(start, timezone)
            .ok_or_else(|| validation_error("Invalid start time"))?,
        None => now,
    };
    let end = match data.and_then(|d| d.end_time.as_deref()) {
        Some(end) => parse_timestamp(end, timezone)
            .ok_or_else(|| validation_error("Invalid end time"))?,
        None => shift(start, Duration::days(DEFAULT_QUERY_DAYS))?,
    };

    Ok(EventRange::new(start, end))
}

/// Validates confirmed proposals and applies them to the schedule store
#[derive(Clone)]
pub struct IntentExecutor {
    store: Arc<dyn ScheduleStore>,
}

impl IntentExecutor {
    pub fn new(store: Arc<dyn ScheduleStore>) -> Self {
        Self { store }
    }

    /// Execute a request on behalf of `owner_id`; `now` anchors default query windows
    pub async fn execute(
        &self,
        owner_id: &str,
        request: &ExecutionRequest,
        now: DateTime<Utc>,
    ) -> AssistantResult<ExecutionResult> {
        let intent: Intent = request.intent.parse()?;
        debug!("Executing {} intent for {}", intent, owner_id);

        match intent {
            Intent::Create => self.execute_create(owner_id, request).await,
            Intent::Update => self.execute_update(owner_id, request).await,
            Intent::Delete => self.execute_delete(owner_id, request).await,
            Intent::Query => self.execute_query(owner_id, request, now).await,
        }
    }

    async fn execute_create(
        &self,
        owner_id: &str,
        request: &ExecutionRequest,
    ) -> AssistantResult<ExecutionResult> {
        let data = request.data.clone().unwrap_or_default();
        let fields = create_fields(&data)?;

        let created = self.store.create_event(owner_id, fields).await?;
        Ok(ExecutionResult {
            intent: Intent::Create,
            message: t!("schedule_created").to_string(),
            affected: Affected::Event(created),
        })
    }

    async fn execute_update(
        &self,
        owner_id: &str,
        request: &ExecutionRequest,
    ) -> AssistantResult<ExecutionResult> {
        let schedule_id = required_id(request, "Missing the id of the schedule to update")?;
        let data = match &request.data {
            Some(data) if !data.is_empty() => data,
            _ => return Err(validation_error("No changes were provided for the update")),
        };

        let current = self.store.fetch_owned(owner_id, schedule_id).await?;
        let fields = apply_patch(current.fields(), data)?;

        let updated = self.store.update_event(owner_id, schedule_id, fields).await?;
        Ok(ExecutionResult {
            intent: Intent::Update,
            message: t!("schedule_updated").to_string(),
            affected: Affected::Event(updated),
        })
    }

    async fn execute_delete(
        &self,
        owner_id: &str,
        request: &ExecutionRequest,
    ) -> AssistantResult<ExecutionResult> {
        let schedule_id = required_id(request, "Missing the id of the schedule to delete")?;

        let schedule: ScheduleEvent = self.store.fetch_owned(owner_id, schedule_id).await?;
        self.store.soft_delete(&schedule).await?;

        let title = schedule.title.clone();
        Ok(ExecutionResult {
            intent: Intent::Delete,
            message: t!("schedule_deleted", title = title).to_string(),
            affected: Affected::Event(schedule),
        })
    }

    async fn execute_query(
        &self,
        owner_id: &str,
        request: &ExecutionRequest,
        now: DateTime<Utc>,
    ) -> AssistantResult<ExecutionResult> {
        let range = query_range(request.data.as_ref(), now)?;

        let events = self.store.find_in_range(owner_id, range).await?;
        info!("Query for {} matched {} schedules", owner_id, events.len());
        Ok(ExecutionResult {
            intent: Intent::Query,
            message: t!("query_results").to_string(),
            affected: Affected::Events(events),
        })
    }
}

fn required_id<'a>(request: &'a ExecutionRequest, message: &str) -> AssistantResult<&'a str> {
    request
        .schedule_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| validation_error(message))
}
