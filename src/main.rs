use std::sync::Arc;

use log::{error, info};
use tcp_relay::configuration::Config;
use tcp_relay::logger::init_logger;
use tcp_relay::network::NetworkListener;

#[tokio::main]
async fn main() {
    let config = Config::from_args().unwrap_or_else(|e| {
        init_logger(false, false);
        error!("Unable to load configuration: {}", e);
        std::process::exit(1);
    });

    init_logger(config.debug, config.verbose);
    info!("starting up tcp-relay v{}", env!("CARGO_PKG_VERSION"));

    let session_config = config.session_config().await.unwrap_or_else(|e| {
        error!("Invalid configuration: {}", e);
        std::process::exit(1);
    });

    let listener = NetworkListener::bind(Arc::new(session_config))
        .await
        .unwrap_or_else(|e| {
            error!("Failed to open local port to listen: {}", e);
            std::process::exit(1);
        });

    info!("Proxying from {} to {}", config.local, config.remote);

    if let Err(e) = listener.start_listening().await {
        error!("Listener stopped: {}", e);
        std::process::exit(1);
    }
}
