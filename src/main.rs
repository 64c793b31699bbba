// src/main.rs
mod api;
mod auditor;
mod config;
mod geometry;
mod model;
mod planner;
mod progression;
mod session;
mod types;

use config::AppConfig;

#[tokio::main]
async fn main() {
    if let Err(err) = dotenvy::dotenv() {
        if !matches!(err, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound)
        {
            eprintln!("⚠️ Could not load .env: {}", err);
        }
    }

    let app_config = AppConfig::from_env();
    let api_config = app_config.api.clone();
    let planner_config = app_config.planner.planner_config();

    println!("🚀 Stowage Service starting...");
    api::start_api_server(api_config, planner_config).await;
}
