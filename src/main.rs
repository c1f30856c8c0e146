use std::process::ExitCode;
use std::sync::Arc;

use actix_web::{web, App, HttpServer};
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;
mod config;
mod health;
mod messaging;
mod metrics;
mod models;
mod shutdown;
mod subscriber;

use config::Config;
use messaging::{KafkaConsumerFactory, KafkaProducerFactory, Publisher, SubscriberError};
use shutdown::ShutdownCoordinator;
use subscriber::{state_channel, LoggingHandler, StopReason, SubscriberLoop};

#[actix_web::main]
async fn main() -> ExitCode {
    // Default to INFO level, can be overridden with RUST_LOG env var
    // Example: RUST_LOG=debug customer_pipeline
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,customer_pipeline=debug"))
        )
        .init();

    let config = Config::parse();

    match run(config).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "Startup failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config) -> anyhow::Result<ExitCode> {
    tracing::info!(
        brokers = %config.broker.bootstrap_servers,
        topic = %config.broker.topic,
        http_addr = %config.http_addr,
        "Starting customer pipeline"
    );

    // === 1. Metrics and shutdown coordination ===
    let metrics = Arc::new(metrics::Metrics::new()?);
    let coordinator = ShutdownCoordinator::new();
    let signals = coordinator.listen_for_signals()?;

    // === 2. Publisher ===
    let producers = KafkaProducerFactory::new(config.broker.clone(), config.producer.clone())?;
    let publisher = Publisher::new(
        producers,
        config.broker.topic.clone(),
        config.producer.headers.clone(),
        metrics.clone(),
    )
    .with_partition(config.producer.partition_selector());
    tracing::info!(
        topic = %publisher.topic(),
        partition = ?config.producer.partition,
        reuse_producer = config.producer.reuse_producer,
        "Publisher ready"
    );
    let publisher = web::Data::new(publisher);

    // === 3. HTTP ingestion server ===
    let (state_tx, state_rx) = state_channel();
    let metrics_data = web::Data::from(metrics.clone());
    let state_data = web::Data::new(state_rx);

    // Signals are owned by the coordinator, not actix.
    let server = HttpServer::new(move || {
        App::new()
            .app_data(publisher.clone())
            .app_data(metrics_data.clone())
            .app_data(state_data.clone())
            .configure(api::configure::<KafkaProducerFactory>)
    })
    .disable_signals()
    .bind(&config.http_addr)?
    .run();

    let server_handle = server.handle();
    let mut server_task = tokio::spawn(server);
    tracing::info!(addr = %config.http_addr, "HTTP server listening");

    // === 4. Subscriber loop ===
    // Spawned last: nothing after this point may bail out early, or the
    // runtime would wait on the blocking loop forever.
    let mut subscriber = SubscriberLoop::new(
        KafkaConsumerFactory::new(config.broker.clone(), config.consumer.clone()),
        LoggingHandler,
        config.subscription_topics(),
        config.consumer.poll_timeout(),
        metrics,
        state_tx,
    )
    .spawn(coordinator.token());

    // === 5. Wait for the subscriber to stop or the server to die ===
    let finished = tokio::select! {
        result = &mut subscriber => Some(result),
        result = &mut server_task => {
            match result {
                Ok(Ok(())) => tracing::warn!("HTTP server exited"),
                Ok(Err(e)) => tracing::error!(error = %e, "HTTP server failed"),
                Err(e) => tracing::error!(error = %e, "HTTP server task failed"),
            }
            None
        }
    };

    coordinator.request_stop("pipeline");
    let code = match finished {
        Some(result) => exit_code(result),
        // A server that stops on its own is a failure even if the subscriber exits cleanly.
        None => {
            exit_code(subscriber.await);
            ExitCode::FAILURE
        }
    };

    server_handle.stop(true).await;
    signals.abort();

    Ok(code)
}

fn exit_code(
    outcome: Result<Result<StopReason, SubscriberError>, tokio::task::JoinError>,
) -> ExitCode {
    match outcome {
        Ok(Ok(reason)) if reason.is_clean() => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Ok(Ok(reason)) => {
            tracing::error!(reason = ?reason, "Subscriber stopped abnormally");
            ExitCode::FAILURE
        }
        Ok(Err(e)) => {
            tracing::error!(error = %e, "Subscriber failed");
            ExitCode::FAILURE
        }
        Err(e) => {
            tracing::error!(error = %e, "Subscriber task panicked");
            ExitCode::FAILURE
        }
    }
}
