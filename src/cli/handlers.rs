use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::cli::commands::ServerCommand;
use crate::config::Settings;
use crate::constants::protocol::WIRE_VERSION;
use crate::service::PredictionServer;

/// Run the prediction server until Ctrl-C or a fatal listener error
pub async fn handle_server(cmd: ServerCommand) -> Result<()> {
    let mut settings = Settings::load(cmd.config.as_deref())
        .context("Failed to load configuration")?;
    cmd.apply(&mut settings);

    // Set up logging before anything else
    let _guard = crate::telemetry::init(&settings.logging)?;

    if cmd.port.is_none() {
        warn!("No port given, using configured port {}", settings.server.port);
    }
    info!(
        "Starting {} (reply schema v{})",
        settings.server.service_name, WIRE_VERSION
    );

    let registry = Arc::new(settings.models.registry());
    let server = PredictionServer::new(registry, &settings);

    let listener = match PredictionServer::bind(&settings).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("{}", e);
            return Err(e).context("Failed to start prediction server");
        }
    };

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Could not listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    if let Err(e) = server.serve_with_shutdown(listener, shutdown).await {
        error!("{}", e);
        return Err(e).context("Prediction server stopped");
    }
    Ok(())
}
