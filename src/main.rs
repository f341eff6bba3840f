use zoneboard::app;
use zoneboard::config::AppConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let config = AppConfig::from_env();
    log::info!(
        "zone dashboard starting on port {} against document {}",
        config.port,
        config.spreadsheet_id
    );

    app::run(config).await
}
