use super::catalog::{ModelCatalog, ModelProfile, ModelProvider};
use super::{ModelGateway, ModelHandle};
use crate::error::{config_error, upstream_error, AssistantResult};
use async_trait::async_trait;
use rig::completion::{Chat, Message};
use rig::providers::gemini::Client as GeminiClient;
use rig::providers::openai::Client as OpenAiClient;
use std::env;
use tracing::{error, info};

/// Message shown when a model has no usable credential; details are only logged
const MISSING_CREDENTIAL: &str = "AI model credential is not configured, contact the administrator";

/// Model gateway that talks to providers through rig
#[derive(Debug, Clone)]
pub struct RigGateway {
    catalog: ModelCatalog,
}

impl RigGateway {
    pub fn new(catalog: ModelCatalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &ModelCatalog {
        &self.catalog
    }

    /// Look up the API key bound to a model
    fn bind_credential(profile: &ModelProfile) -> AssistantResult<String> {
        let Some(var) = profile.api_key_env.as_deref() else {
            error!("Model {} has no bound credential", profile.id);
            return Err(config_error(MISSING_CREDENTIAL));
        };

        match env::var(var) {
            Ok(key) if !key.trim().is_empty() => Ok(key),
            _ => {
                error!(
                    "Model {} expects its credential in {}, which is not set",
                    profile.id, var
                );
                Err(config_error(MISSING_CREDENTIAL))
            }
        }
    }
}

#[async_trait]
impl ModelGateway for RigGateway {
    async fn resolve_model(&self, model_id: Option<&str>) -> AssistantResult<ModelHandle> {
        let profile = self.catalog.resolve(model_id)?;
        let api_key = Self::bind_credential(profile)?;
        Ok(ModelHandle::new(profile.clone(), api_key))
    }

    async fn complete(
        &self,
        model: &ModelHandle,
        system_prompt: &str,
        user_message: &str,
        temperature: f64,
    ) -> AssistantResult<String> {
        let profile = &model.profile;
        info!("Requesting completion from {} model {}", profile.provider, profile.model);

        let response = match profile.provider {
            ModelProvider::OpenAi => {
                let client = match profile.base_url.as_deref() {
                    Some(base_url) => OpenAiClient::from_url(model.api_key(), base_url),
                    None => OpenAiClient::new(model.api_key()),
                };
                let agent = client
                    .agent(&profile.model)
                    .preamble(system_prompt)
                    .temperature(temperature)
                    .build();
                agent.chat(user_message, Vec::<Message>::new()).await
            }
            ModelProvider::Gemini => {
                let client = GeminiClient::new(model.api_key());
                let agent = client
                    .agent(&profile.model)
                    .preamble(system_prompt)
                    .temperature(temperature)
                    .build();
                agent.chat(user_message, Vec::<Message>::new()).await
            }
        };

        response.map_err(|e| upstream_error(&format!("Completion request failed: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn profile(api_key_env: Option<&str>) -> ModelProfile {
        ModelProfile {
            id: "m1".to_string(),
            provider: ModelProvider::OpenAi,
            model: "gpt-4o-mini".to_string(),
            base_url: None,
            api_key_env: api_key_env.map(str::to_string),
            is_active: true,
            sort_order: 0,
            created_at: None,
        }
    }

    #[tokio::test]
    async fn test_model_without_credential_is_configuration_error() {
        let gateway = RigGateway::new(ModelCatalog::new(vec![profile(None)], None));
        let err = gateway.resolve_model(None).await.unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        // Only the generic message reaches the caller
        assert!(!err.to_string().contains("m1"));
    }

    #[tokio::test]
    async fn test_unset_credential_variable_is_configuration_error() {
        let gateway = RigGateway::new(ModelCatalog::new(
            vec![profile(Some("SCHEDULE_ASSISTANT_TEST_KEY_THAT_IS_NEVER_SET"))],
            None,
        ));
        let err = gateway.resolve_model(Some("m1")).await.unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[tokio::test]
    async fn test_unknown_model_is_not_found_before_credentials() {
        let gateway = RigGateway::new(ModelCatalog::new(vec![profile(None)], None));
        let err = gateway.resolve_model(Some("nope")).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_handle_debug_redacts_key() {
        let handle = ModelHandle::new(profile(None), "sk-secret");
        assert!(!format!("{:?}", handle).contains("sk-secret"));
    }
}
