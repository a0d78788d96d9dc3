// Copyright 2026 The Tutorline Project
// SPDX-License-Identifier: Apache-2.0

use clap::Parser;
use tutorline::config;
use tutorline::engine;
use tutorline::proxy;
use tutorline::sources;

use std::net::SocketAddr;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "tutorline", about = "Streaming tutoring assistant backend")]
struct Cli {
    /// Path to the tutorline.yaml config file
    #[arg(long, default_value = "tutorline.yaml", env = "TUTORLINE_CONFIG")]
    config: String,

    /// Port to listen on
    #[arg(long, default_value_t = 3000, env = "TUTORLINE_PORT")]
    port: u16,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .json()
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let addr = SocketAddr::from(([127, 0, 0, 1], cli.port));
    tracing::info!(%addr, "tutorline starting");

    let source = config::FileSource::new(cli.config);
    let config = match config::load_config(&source) {
        Ok(c) => Arc::new(c),
        Err(e) => {
            tracing::error!("failed to load config: {e}");
            std::process::exit(1);
        }
    };

    tracing::info!(
        environment = %config.environment,
        model = %config.upstream.model,
        search = config.search.is_some(),
        config_hash = %config.config_hash,
        "config loaded"
    );

    let client = reqwest::Client::new();
    let chat: Arc<dyn proxy::ChatBackend> =
        Arc::new(engine::build_chat_engine(config.clone(), client.clone()));
    let source_service: Arc<dyn proxy::SourceBackend> =
        Arc::new(sources::build_source_service(&config, client));

    let app = proxy::build_router(chat, source_service);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!(%addr, "failed to bind: {e}");
            std::process::exit(1);
        }
    };

    tracing::info!(%addr, "tutorline listening");

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("server error: {e}");
        std::process::exit(1);
    }
}
