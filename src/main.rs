use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};

mod api;
mod artifact;
mod cli;
mod client;
mod config;
mod generator;
mod jobs;
mod shutdown;
mod telemetry;
mod worker;

#[cfg(test)]
mod test_support;

use crate::api::{
    batch::{batch_config, BatchService},
    download::download_config,
    generate::{generate_config, WordService},
    health::health_config,
    models::models_config,
    state::AppState,
    validation,
};
use crate::artifact::FileArtifactBuilder;
use crate::cli::{Cli, Command};
use crate::generator::{ChatCompletionGenerator, ItemGenerator, ModelCatalog};
use crate::jobs::JobStore;
use crate::shutdown::ShutdownCoordinator;
use crate::worker::{BatchRunner, RetentionSweeper};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let opts = Cli::parse();

    match opts.command {
        None | Some(Command::Serve) => serve().await,
        Some(Command::Submit(args)) => {
            telemetry::init_client_logging();
            cli::submit(args).await.map_err(|e| {
                error!("{}", e);
                std::io::Error::other(e.to_string())
            })
        }
    }
}

async fn serve() -> std::io::Result<()> {
    // Load configuration from environment
    let config = config::Config::from_env().map_err(std::io::Error::other)?;

    telemetry::init_server_logging(&config.log_dir)?;

    info!("Starting spelling-decks server");
    info!("Configuration loaded successfully:");
    info!("  - Max payload size: {} bytes", config.max_payload_size);
    info!("  - Max concurrent items: {}", config.max_concurrent_items);
    info!("  - Item timeout: {:?}", config.item_timeout);
    info!("  - Job retention: {:?}", config.job_retention);
    info!("  - Output directory: {}", config.output_dir.display());

    std::fs::create_dir_all(&config.output_dir)?;

    let settings = config.provider_settings();
    let generator: Arc<dyn ItemGenerator> =
        Arc::new(ChatCompletionGenerator::new(settings.clone()).map_err(std::io::Error::other)?);
    let catalog = web::Data::new(ModelCatalog::new(settings).map_err(std::io::Error::other)?);
    let files = FileArtifactBuilder::new(config.output_dir.clone());

    let store = Arc::new(JobStore::new());
    let runner = Arc::new(BatchRunner::new(
        store.clone(),
        generator.clone(),
        Arc::new(files.clone()),
        config.max_concurrent_items,
        config.item_timeout,
    ));

    // watch channel allows multiple receivers to get the same value
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    let sweeper = RetentionSweeper::new(store, config.job_retention, config.retention_sweep_interval);
    let sweeper_handle = tokio::spawn(sweeper.run(shutdown_rx));

    let batch_service = web::Data::new(BatchService::new(runner.clone()));
    let word_service = web::Data::new(WordService::new(generator));
    let files = web::Data::new(files);
    let app_state = web::Data::new(AppState::new("spelling-decks", runner.clone()));

    let max_payload_size = config.max_payload_size;
    let cors_origin = config.cors_origin.clone();

    let server = HttpServer::new(move || {
        let payload_config = web::PayloadConfig::new(max_payload_size);
        let multipart_config = validation::multipart_config(max_payload_size);
        let cors = Cors::default()
            .allowed_origin(&cors_origin)
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .wrap(cors)
            .app_data(batch_service.clone())
            .app_data(word_service.clone())
            .app_data(catalog.clone())
            .app_data(files.clone())
            .app_data(app_state.clone())
            .app_data(payload_config) // Global payload size limit
            .app_data(multipart_config) // Global multipart/file upload size limit
            .app_data(validation::json_config()) // Global validation config
            .configure(health_config)
            .configure(batch_config)
            .configure(download_config)
            .configure(generate_config)
            .configure(models_config)
    })
    // Signals are handled by the ShutdownCoordinator
    .disable_signals();

    info!("Server starting on http://{}:{}", config.host, config.port);

    let server = server.bind((config.host.as_str(), config.port))?.run();
    let server_handle = server.handle();
    let server_task = tokio::spawn(server);

    let coordinator = ShutdownCoordinator::new(
        server_handle,
        server_task,
        vec![sweeper_handle],
        shutdown_tx,
        runner,
        config.shutdown_grace,
    );

    coordinator.wait_for_shutdown().await
}
