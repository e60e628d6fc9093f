pub mod catalog;
mod rig_gateway;

pub use catalog::{ModelCatalog, ModelProfile, ModelProvider};
pub use rig_gateway::RigGateway;

use crate::error::AssistantResult;
use async_trait::async_trait;
use std::fmt;

/// A resolved model with its credential bound
#[derive(Clone)]
pub struct ModelHandle {
    pub profile: ModelProfile,
    api_key: String,
}

impl ModelHandle {
    pub fn new(profile: ModelProfile, api_key: impl Into<String>) -> Self {
        Self {
            profile,
            api_key: api_key.into(),
        }
    }

    pub fn id(&self) -> &str {
        &self.profile.id
    }

    pub(crate) fn api_key(&self) -> &str {
        &self.api_key
    }
}

impl fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelHandle")
            .field("profile", &self.profile)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

/// Access to the text-completion backend
#[async_trait]
pub trait ModelGateway: Send + Sync + 'static {
    /// Resolve a model identifier (or the fallback chain) to a usable handle
    async fn resolve_model(&self, model_id: Option<&str>) -> AssistantResult<ModelHandle>;

    /// Run a single system + user completion and return the assistant text
    async fn complete(
        &self,
        model: &ModelHandle,
        system_prompt: &str,
        user_message: &str,
        temperature: f64,
    ) -> AssistantResult<String>;
}
