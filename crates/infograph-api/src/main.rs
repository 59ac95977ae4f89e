use infograph_core::Config;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    infograph_api::telemetry::init_telemetry();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize the application (services, routes)
    let (_state, router) = infograph_api::setup::initialize_app(config.clone())?;

    // Start the server
    infograph_api::setup::server::start_server(&config, router).await?;

    Ok(())
}
