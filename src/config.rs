use crate::components::ai_schedule::{DEFAULT_TIMEZONE, DEFAULT_UPCOMING_LIMIT};
use crate::components::model_gateway::ModelCatalog;
use crate::error::{config_error, env_error, AssistantResult};
use crate::utils::time::parse_timezone;
use dotenvy::dotenv;
use std::env;
use std::fs;
use std::path::Path;
use tracing::warn;
use url::Url;

/// Default location of the model catalog
pub const MODELS_CONFIG_PATH: &str = "config/models.toml";

/// Default address for the HTTP server
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";

/// Default request-level timeout around a model completion
pub const DEFAULT_COMPLETION_TIMEOUT_SECS: u64 = 30;

/// Main configuration structure for the assistant
#[derive(Debug, Clone)]
pub struct Config {
    /// Redis connection string; the in-memory store is used when unset
    pub redis_url: Option<String>,
    /// Address the HTTP server listens on
    pub bind_addr: String,
    /// Timezone used when a request gives none
    pub default_timezone: String,
    /// Secret used to verify bearer tokens
    pub jwt_secret: String,
    /// Seconds a parse call may wait for the model
    pub completion_timeout_secs: u64,
    /// Upcoming entries listed in the prompt
    pub upcoming_event_limit: usize,
    /// Locale for user-facing messages
    pub locale: String,
    /// Models the assistant may use
    pub models: ModelCatalog,
}

impl Config {
    /// Load configuration from environment and config file
    pub fn load() -> AssistantResult<Self> {
        // Load .env file if it exists
        dotenv().ok();

        let jwt_secret = env::var("JWT_SECRET").map_err(|_| env_error("JWT_SECRET"))?;

        let redis_url = env::var("REDIS_URL").ok().filter(|url| !url.trim().is_empty());
        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());
        let locale = env::var("ASSISTANT_LOCALE").unwrap_or_else(|_| String::from("en"));

        let default_timezone =
            env::var("DEFAULT_TIMEZONE").unwrap_or_else(|_| String::from(DEFAULT_TIMEZONE));
        if parse_timezone(Some(&default_timezone)).is_none() {
            return Err(config_error(&format!(
                "DEFAULT_TIMEZONE is not a known timezone: {}",
                default_timezone
            )));
        }

        let completion_timeout_secs = parse_number(
            "COMPLETION_TIMEOUT_SECS",
            DEFAULT_COMPLETION_TIMEOUT_SECS,
        )?;
        let upcoming_event_limit = parse_number("UPCOMING_EVENT_LIMIT", DEFAULT_UPCOMING_LIMIT)?;

        let models_path =
            env::var("MODELS_CONFIG").unwrap_or_else(|_| String::from(MODELS_CONFIG_PATH));
        let mut models = load_catalog(Path::new(&models_path))?;
        if let Ok(default_model_id) = env::var("DEFAULT_MODEL_ID") {
            if !default_model_id.trim().is_empty() {
                models.default_model_id = Some(default_model_id);
            }
        }

        Ok(Config {
            redis_url,
            bind_addr,
            default_timezone,
            jwt_secret,
            completion_timeout_secs,
            upcoming_event_limit,
            locale,
            models,
        })
    }
}

fn parse_number<T: std::str::FromStr>(var: &str, default: T) -> AssistantResult<T> {
    match env::var(var) {
        Ok(value) => value
            .trim()
            .parse::<T>()
            .map_err(|_| env_error(&format!("Invalid {} format", var))),
        Err(_) => Ok(default),
    }
}

/// Read the model catalog; a missing file yields an empty catalog
pub fn load_catalog(path: &Path) -> AssistantResult<ModelCatalog> {
    match fs::read_to_string(path) {
        Ok(content) => parse_catalog(&content),
        Err(e) => {
            warn!("Model catalog {} not readable ({}), no models configured", path.display(), e);
            Ok(ModelCatalog::default())
        }
    }
}

/// Parse and validate catalog TOML
pub fn parse_catalog(content: &str) -> AssistantResult<ModelCatalog> {
    let catalog: ModelCatalog = toml::from_str(content)?;

    for model in &catalog.models {
        if model.id.trim().is_empty() {
            return Err(config_error("Model entries need a non-empty id"));
        }
        if let Some(base_url) = &model.base_url {
            Url::parse(base_url).map_err(|e| {
                config_error(&format!("Model {} has an invalid base_url: {}", model.id, e))
            })?;
        }
    }

    Ok(catalog)
}
