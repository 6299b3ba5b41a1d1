mod handlers;

use axum::{Router, routing};
use commit_status_relay::logging::init_logging;
use commit_status_relay::{AppState, RelayConfig, load_config};
use handlers::{handle_webhook, root};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{self, error, info};

const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:8888";
const DEFAULT_CONFIG_PATH: &str = "relay_config.toml";

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    init_logging();

    let bind_address =
        std::env::var("BIND_ADDRESS").unwrap_or_else(|_| DEFAULT_BIND_ADDRESS.to_string());
    let config_path =
        std::env::var("RELAY_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

    let config: RelayConfig = match load_config(&config_path) {
        Ok(cfg) => cfg.with_token_override(std::env::var("GITHUB_TOKEN").ok()),
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = config.token() {
        eprintln!("{}", e);
        std::process::exit(1);
    }

    let state = Arc::new(AppState {
        build_lock: Mutex::new(()),
        config,
    });

    let app = Router::new()
        .route("/", routing::get(root))
        .route("/webhook", routing::post(handle_webhook))
        .with_state(state);

    info!("Listening on {}", bind_address);
    info!("Using config at {:?}", config_path);
    let listener = match tokio::net::TcpListener::bind(&bind_address).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind {}: {}", bind_address, e);
            std::process::exit(1);
        }
    };
    if let Err(e) = axum::serve(listener, app).await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }
}
