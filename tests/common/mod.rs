#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use schedule_assistant::components::model_gateway::{
    ModelCatalog, ModelGateway, ModelHandle, ModelProfile, ModelProvider,
};
use schedule_assistant::components::schedule_store::{
    EventRange, InMemoryScheduleStore, ScheduleCategory, ScheduleEvent, ScheduleFields,
    SchedulePriority, ScheduleStore,
};
use schedule_assistant::error::{upstream_error, AssistantResult};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Schedule store that records how often each mutation was attempted
#[derive(Debug, Default)]
pub struct RecordingStore {
    inner: InMemoryScheduleStore,
    creates: AtomicUsize,
    updates: AtomicUsize,
    soft_deletes: AtomicUsize,
}

impl RecordingStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn updates(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    pub fn soft_deletes(&self) -> usize {
        self.soft_deletes.load(Ordering::SeqCst)
    }

    /// Seed an event directly, bypassing the counters
    pub async fn seed(&self, owner_id: &str, title: &str, start: DateTime<Utc>) -> ScheduleEvent {
        let event = ScheduleEvent::new(owner_id, fields(title, start), Utc::now());
        self.inner.insert(event.clone()).await;
        event
    }

    pub async fn get_raw(&self, id: &str) -> Option<ScheduleEvent> {
        self.inner.get_raw(id).await
    }
}

#[async_trait]
impl ScheduleStore for RecordingStore {
    async fn create_event(
        &self,
        owner_id: &str,
        fields: ScheduleFields,
    ) -> AssistantResult<ScheduleEvent> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        self.inner.create_event(owner_id, fields).await
    }

    async fn update_event(
        &self,
        owner_id: &str,
        id: &str,
        fields: ScheduleFields,
    ) -> AssistantResult<ScheduleEvent> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        self.inner.update_event(owner_id, id, fields).await
    }

    async fn fetch_owned(&self, owner_id: &str, id: &str) -> AssistantResult<ScheduleEvent> {
        self.inner.fetch_owned(owner_id, id).await
    }

    async fn soft_delete(&self, event: &ScheduleEvent) -> AssistantResult<()> {
        self.soft_deletes.fetch_add(1, Ordering::SeqCst);
        self.inner.soft_delete(event).await
    }

    async fn restore(&self, owner_id: &str, id: &str) -> AssistantResult<ScheduleEvent> {
        self.inner.restore(owner_id, id).await
    }

    async fn find_in_range(
        &self,
        owner_id: &str,
        range: EventRange,
    ) -> AssistantResult<Vec<ScheduleEvent>> {
        self.inner.find_in_range(owner_id, range).await
    }

    async fn find_upcoming(
        &self,
        owner_id: &str,
        limit: usize,
    ) -> AssistantResult<Vec<ScheduleEvent>> {
        self.inner.find_upcoming(owner_id, limit).await
    }
}

/// A prompt the scripted gateway received
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub model_id: String,
    pub system_prompt: String,
    pub user_message: String,
    pub temperature: f64,
}

/// Model gateway that answers from a script instead of a provider
pub struct ScriptedGateway {
    catalog: ModelCatalog,
    replies: Mutex<VecDeque<Result<String, String>>>,
    calls: Mutex<Vec<RecordedCall>>,
    delay: Option<std::time::Duration>,
}

impl ScriptedGateway {
    pub fn new(replies: Vec<Result<String, String>>) -> Self {
        Self {
            catalog: test_catalog(),
            replies: Mutex::new(replies.into()),
            calls: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    pub fn replying(reply: &str) -> Arc<Self> {
        Arc::new(Self::new(vec![Ok(reply.to_string())]))
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self::new(vec![Err(message.to_string())]))
    }

    /// Every completion waits this long before answering
    pub fn with_delay(mut self, delay: std::time::Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub async fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().await.clone()
    }
}

#[async_trait]
impl ModelGateway for ScriptedGateway {
    async fn resolve_model(&self, model_id: Option<&str>) -> AssistantResult<ModelHandle> {
        let profile = self.catalog.resolve(model_id)?;
        Ok(ModelHandle::new(profile.clone(), "test-key"))
    }

    async fn complete(
        &self,
        model: &ModelHandle,
        system_prompt: &str,
        user_message: &str,
        temperature: f64,
    ) -> AssistantResult<String> {
        self.calls.lock().await.push(RecordedCall {
            model_id: model.id().to_string(),
            system_prompt: system_prompt.to_string(),
            user_message: user_message.to_string(),
            temperature,
        });

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match self.replies.lock().await.pop_front() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(message)) => Err(upstream_error(&message)),
            None => Err(upstream_error("script exhausted")),
        }
    }
}

fn profile(id: &str, sort_order: i32) -> ModelProfile {
    ModelProfile {
        id: id.to_string(),
        provider: ModelProvider::OpenAi,
        model: format!("{}-model", id),
        base_url: None,
        api_key_env: Some("TEST_KEY".to_string()),
        is_active: true,
        sort_order,
        created_at: None,
    }
}

pub fn test_catalog() -> ModelCatalog {
    ModelCatalog::new(
        vec![profile("primary", 0), profile("secondary", 1)],
        Some("primary".to_string()),
    )
}

pub fn fields(title: &str, start: DateTime<Utc>) -> ScheduleFields {
    ScheduleFields {
        title: title.to_string(),
        description: None,
        start_time: start,
        end_time: start + Duration::hours(1),
        category: ScheduleCategory::Work,
        priority: SchedulePriority::Medium,
        is_important: false,
        is_urgent: false,
        location: None,
        attendees: None,
        timezone: None,
        metadata: None,
    }
}
