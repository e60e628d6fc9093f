use schedule_assistant::startup;
use tracing::info;

#[tokio::main]
async fn main() -> miette::Result<()> {
    // Initialize logging
    startup::init_logging()?;

    info!("Starting schedule assistant");

    // Load configuration
    let config = startup::load_config()?;

    // Serve the schedule API
    startup::start_server(config).await
}
