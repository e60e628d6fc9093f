pub mod executor;
pub mod models;
pub mod normalizer;
pub mod parser;
pub mod prompt;

pub use executor::IntentExecutor;
pub use models::{
    Affected, AiScheduleResponse, ExecutionRequest, ExecutionResult, Intent, ParseRequest,
    Proposal, ProposalPayload,
};
pub use normalizer::unavailable_response;

use crate::components::model_gateway::ModelGateway;
use crate::components::schedule_store::{EventRange, ScheduleEvent, ScheduleStore};
use crate::error::{validation_error, AssistantResult};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{error, info};

/// Sampling temperature for intent extraction
pub const PARSE_TEMPERATURE: f64 = 0.2;

/// Number of upcoming entries shown to the model
pub const DEFAULT_UPCOMING_LIMIT: usize = 5;

/// Timezone assumed when the caller gives none
pub const DEFAULT_TIMEZONE: &str = "Asia/Shanghai";

/// Turns chat messages into schedule proposals and applies confirmed ones
#[derive(Clone)]
pub struct ScheduleAssistant {
    store: Arc<dyn ScheduleStore>,
    gateway: Arc<dyn ModelGateway>,
    executor: IntentExecutor,
    default_timezone: String,
    upcoming_limit: usize,
}

impl ScheduleAssistant {
    pub fn new(store: Arc<dyn ScheduleStore>, gateway: Arc<dyn ModelGateway>) -> Self {
        Self {
            executor: IntentExecutor::new(store.clone()),
            store,
            gateway,
            default_timezone: DEFAULT_TIMEZONE.to_string(),
            upcoming_limit: DEFAULT_UPCOMING_LIMIT,
        }
    }

    pub fn with_default_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.default_timezone = timezone.into();
        self
    }

    pub fn with_upcoming_limit(mut self, limit: usize) -> Self {
        self.upcoming_limit = limit;
        self
    }

    pub fn default_timezone(&self) -> &str {
        &self.default_timezone
    }

    /// Classify a message into a proposal.
    ///
    /// Model resolution and store failures propagate. A failed completion or a
    /// reply that cannot be read degrades to the "please ask again" response.
    pub async fn parse(
        &self,
        owner_id: &str,
        request: &ParseRequest,
    ) -> AssistantResult<AiScheduleResponse> {
        let message = request.message.trim();
        if message.is_empty() {
            return Err(validation_error("Message must not be empty"));
        }

        let timezone = request
            .timezone
            .as_deref()
            .map(str::trim)
            .filter(|tz| !tz.is_empty())
            .unwrap_or(&self.default_timezone);
        let now = request.now.unwrap_or_else(Utc::now);

        let model = self.gateway.resolve_model(request.model_id.as_deref()).await?;
        let upcoming = self.store.find_upcoming(owner_id, self.upcoming_limit).await?;
        let system_prompt = prompt::build_system_prompt(now, timezone, &upcoming);

        let content = match self
            .gateway
            .complete(&model, &system_prompt, message, PARSE_TEMPERATURE)
            .await
        {
            Ok(content) => content,
            Err(e) => {
                error!("Completion with model {} failed: {}", model.id(), e);
                return Ok(unavailable_response());
            }
        };

        let parsed = parser::parse_assistant_content(&content);
        if parsed.is_empty() {
            error!("Model {} returned no usable JSON", model.id());
            return Ok(unavailable_response());
        }

        let response = normalizer::build_response(parsed, timezone);
        info!(
            "Parsed message for {} with model {}: intent={}",
            owner_id,
            model.id(),
            response
                .proposal
                .as_ref()
                .map(|p| p.intent.as_str())
                .unwrap_or("none")
        );
        Ok(response)
    }

    /// Apply a confirmed proposal
    pub async fn execute(
        &self,
        owner_id: &str,
        request: &ExecutionRequest,
    ) -> AssistantResult<ExecutionResult> {
        self.execute_at(owner_id, request, Utc::now()).await
    }

    /// Apply a confirmed proposal with an explicit clock for default query windows
    pub async fn execute_at(
        &self,
        owner_id: &str,
        request: &ExecutionRequest,
        now: DateTime<Utc>,
    ) -> AssistantResult<ExecutionResult> {
        self.executor.execute(owner_id, request, now).await
    }

    /// Live entries of `owner_id` starting inside `range`
    pub async fn list(
        &self,
        owner_id: &str,
        range: EventRange,
    ) -> AssistantResult<Vec<ScheduleEvent>> {
        self.store.find_in_range(owner_id, range).await
    }

    /// Bring back a soft-deleted entry
    pub async fn restore(&self, owner_id: &str, id: &str) -> AssistantResult<ScheduleEvent> {
        let restored = self.store.restore(owner_id, id).await?;
        info!("Restored schedule {} for {}", restored.id, owner_id);
        Ok(restored)
    }
}
