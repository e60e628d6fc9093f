use super::models::{EventRange, ScheduleEvent, ScheduleFields};
use super::{ScheduleStore, NOT_FOUND_MESSAGE};
use crate::error::{not_found_error, AssistantResult};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::info;

/// In-memory implementation of the schedule store (for testing and as a fallback)
#[derive(Debug, Default)]
pub struct InMemoryScheduleStore {
    events: RwLock<HashMap<String, ScheduleEvent>>,
}

impl InMemoryScheduleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a prepared event as-is, tombstone included
    pub async fn insert(&self, event: ScheduleEvent) {
        let mut events = self.events.write().await;
        events.insert(event.id.clone(), event);
    }

    /// Look up any event by id, ignoring owner and tombstone
    pub async fn get_raw(&self, id: &str) -> Option<ScheduleEvent> {
        let events = self.events.read().await;
        events.get(id).cloned()
    }

    fn sorted(mut events: Vec<ScheduleEvent>) -> Vec<ScheduleEvent> {
        events.sort_by(|a, b| a.start_time.cmp(&b.start_time));
        events
    }
}

#[async_trait]
impl ScheduleStore for InMemoryScheduleStore {
    async fn create_event(
        &self,
        owner_id: &str,
        fields: ScheduleFields,
    ) -> AssistantResult<ScheduleEvent> {
        let event = ScheduleEvent::new(owner_id, fields, Utc::now());
        let mut events = self.events.write().await;
        events.insert(event.id.clone(), event.clone());
        info!("Created schedule {} for {}", event.id, owner_id);
        Ok(event)
    }

    async fn update_event(
        &self,
        owner_id: &str,
        id: &str,
        fields: ScheduleFields,
    ) -> AssistantResult<ScheduleEvent> {
        let mut events = self.events.write().await;
        let event = events
            .get_mut(id)
            .filter(|event| event.owner_id == owner_id && !event.is_deleted())
            .ok_or_else(|| not_found_error(NOT_FOUND_MESSAGE))?;
        event.apply_fields(fields, Utc::now());
        Ok(event.clone())
    }

    async fn fetch_owned(&self, owner_id: &str, id: &str) -> AssistantResult<ScheduleEvent> {
        let events = self.events.read().await;
        events
            .get(id)
            .filter(|event| event.owner_id == owner_id && !event.is_deleted())
            .cloned()
            .ok_or_else(|| not_found_error(NOT_FOUND_MESSAGE))
    }

    async fn soft_delete(&self, event: &ScheduleEvent) -> AssistantResult<()> {
        let mut events = self.events.write().await;
        let stored = events
            .get_mut(&event.id)
            .filter(|stored| stored.owner_id == event.owner_id)
            .ok_or_else(|| not_found_error(NOT_FOUND_MESSAGE))?;
        stored.deleted_at = Some(Utc::now());
        info!("Soft deleted schedule {}", event.id);
        Ok(())
    }

    async fn restore(&self, owner_id: &str, id: &str) -> AssistantResult<ScheduleEvent> {
        let mut events = self.events.write().await;
        let event = events
            .get_mut(id)
            .filter(|event| event.owner_id == owner_id && event.is_deleted())
            .ok_or_else(|| not_found_error(NOT_FOUND_MESSAGE))?;
        event.deleted_at = None;
        event.updated_at = Utc::now();
        Ok(event.clone())
    }

    async fn find_in_range(
        &self,
        owner_id: &str,
        range: EventRange,
    ) -> AssistantResult<Vec<ScheduleEvent>> {
        let events = self.events.read().await;
        let matching = events
            .values()
            .filter(|event| event.owner_id == owner_id && !event.is_deleted())
            .filter(|event| range.contains(&event.start_time))
            .cloned()
            .collect();
        Ok(Self::sorted(matching))
    }

    async fn find_upcoming(
        &self,
        owner_id: &str,
        limit: usize,
    ) -> AssistantResult<Vec<ScheduleEvent>> {
        let range = EventRange {
            start: Some(Utc::now()),
            end: None,
        };
        let mut upcoming = self.find_in_range(owner_id, range).await?;
        upcoming.truncate(limit);
        Ok(upcoming)
    }
}
