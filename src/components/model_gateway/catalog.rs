use crate::error::{config_error, not_found_error, AssistantResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::fmt;
use tracing::{error, info};

/// Provider family used to talk to a model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ModelProvider {
    /// OpenAI or any OpenAI-compatible endpoint
    #[default]
    OpenAi,
    Gemini,
}

impl fmt::Display for ModelProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelProvider::OpenAi => write!(f, "openai"),
            ModelProvider::Gemini => write!(f, "gemini"),
        }
    }
}

/// A configured model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelProfile {
    pub id: String,
    pub provider: ModelProvider,
    /// Provider-side model name
    pub model: String,
    #[serde(default)]
    pub base_url: Option<String>,
    /// Environment variable holding the provider API key
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    /// Lower sorts first
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

fn default_active() -> bool {
    true
}

/// The set of models the assistant may use
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelCatalog {
    /// Model used when a request names none
    #[serde(default)]
    pub default_model_id: Option<String>,
    #[serde(default)]
    pub models: Vec<ModelProfile>,
}

/// One step of the fallback chain
type Resolver = fn(&ModelCatalog) -> Option<&ModelProfile>;

/// Tried in order when the request does not name a model
const FALLBACK_RESOLVERS: [(&str, Resolver); 3] = [
    ("configured default", configured_default),
    ("highest priority active", highest_priority_active),
    ("any configured", any_configured),
];

fn configured_default(catalog: &ModelCatalog) -> Option<&ModelProfile> {
    let id = catalog.default_model_id.as_deref()?;
    catalog.find(id)
}

fn highest_priority_active(catalog: &ModelCatalog) -> Option<&ModelProfile> {
    catalog
        .models
        .iter()
        .filter(|model| model.is_active)
        .min_by_key(|model| (model.sort_order, Reverse(model.created_at)))
}

fn any_configured(catalog: &ModelCatalog) -> Option<&ModelProfile> {
    catalog.models.first()
}

impl ModelCatalog {
    pub fn new(models: Vec<ModelProfile>, default_model_id: Option<String>) -> Self {
        Self {
            default_model_id,
            models,
        }
    }

    pub fn find(&self, id: &str) -> Option<&ModelProfile> {
        self.models.iter().find(|model| model.id == id)
    }

    /// Pick the model for a request.
    ///
    /// A named model must exist and be active. Otherwise the configured
    /// default, the highest priority active model and finally any model are
    /// tried in that order.
    pub fn resolve(&self, requested: Option<&str>) -> AssistantResult<&ModelProfile> {
        if let Some(id) = requested {
            return self
                .find(id)
                .filter(|model| model.is_active)
                .ok_or_else(|| not_found_error("The requested model does not exist"));
        }

        for (tier, resolver) in FALLBACK_RESOLVERS {
            if let Some(model) = resolver(self) {
                info!("Resolved model {} via {}", model.id, tier);
                return Ok(model);
            }
        }

        error!("No AI model is configured");
        Err(config_error("No usable AI model has been configured"))
    }
}
