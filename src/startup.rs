use crate::components::{
    InMemoryScheduleStore, RedisScheduleStore, RigGateway, ScheduleAssistant, ScheduleStore,
};
use crate::config::Config;
use crate::error::config_error;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Initialize logging with environment-based configuration
pub fn init_logging() -> miette::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug")),
        )
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| config_error(&format!("Failed to set up logging: {}", e)))?;

    Ok(())
}

/// Load the application config and apply the message locale
pub fn load_config() -> miette::Result<Config> {
    match Config::load() {
        Ok(config) => {
            rust_i18n::set_locale(&config.locale);
            info!("Setting locale to {}", config.locale);
            Ok(config)
        }
        Err(e) => {
            error!("Failed to load configuration: {:?}", e);
            Err(e.into())
        }
    }
}

/// Connect to Redis when configured, falling back to the in-memory store
pub async fn build_store(config: &Config) -> Arc<dyn ScheduleStore> {
    let Some(redis_url) = config.redis_url.as_deref() else {
        info!("REDIS_URL not set, using in-memory schedule store");
        return Arc::new(InMemoryScheduleStore::new());
    };

    let store = match RedisScheduleStore::new(redis_url) {
        Ok(store) => store,
        Err(e) => {
            error!("Failed to create Redis store: {}", e);
            info!("Using in-memory schedule store as fallback");
            return Arc::new(InMemoryScheduleStore::new());
        }
    };

    let ping = store.ping().await;
    match ping {
        Ok(()) => {
            info!("Connected to Redis successfully");
            Arc::new(store)
        }
        Err(e) => {
            error!("Failed to connect to Redis: {}", e);
            info!("Using in-memory schedule store as fallback");
            Arc::new(InMemoryScheduleStore::new())
        }
    }
}

/// Wire the assistant from config
pub async fn build_assistant(config: &Config) -> ScheduleAssistant {
    let store = build_store(config).await;
    let gateway = Arc::new(RigGateway::new(config.models.clone()));
    info!("{} model(s) configured", gateway.catalog().models.len());

    ScheduleAssistant::new(store, gateway)
        .with_default_timezone(config.default_timezone.clone())
        .with_upcoming_limit(config.upcoming_event_limit)
}

/// Run the HTTP server until a shutdown signal arrives
#[cfg(feature = "web-interface")]
pub async fn start_server(config: Config) -> miette::Result<()> {
    use crate::web::{auth::AuthService, router, AppState};
    use std::time::Duration;

    let assistant = build_assistant(&config).await;
    let state = AppState {
        assistant: Arc::new(assistant),
        auth_service: Arc::new(AuthService::new(config.jwt_secret.clone())),
        completion_timeout: Duration::from_secs(config.completion_timeout_secs),
    };

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .map_err(crate::error::Error::from)?;
    info!("Listening on {}", config.bind_addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(crate::shutdown::wait_for_signal())
        .await
        .map_err(crate::error::Error::from)?;

    info!("Server shut down");
    Ok(())
}

/// Without the web interface there is nothing to serve
#[cfg(not(feature = "web-interface"))]
pub async fn start_server(_config: Config) -> miette::Result<()> {
    info!("Web interface feature not enabled. Compile with --features web-interface");
    Ok(())
}
