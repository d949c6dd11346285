// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! vertrack build version tracking server binary.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tower_http::{
	cors::{Any, CorsLayer},
	trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vertrack_server::{create_app_state, create_router, version};
use vertrack_server_config::{LogFormat, LoggingConfig, ServerConfig};
use vertrack_server_db::{PoolSettings, VersionRepository};

/// vertrack server - records build versions and ingests client builds.
#[derive(Parser, Debug)]
#[command(
	name = "vertrack-server",
	about = "Build version tracking server",
	version
)]
struct Args {
	/// Path to the TOML config file
	#[arg(long, env = "VERTRACK_CONFIG", global = true)]
	config: Option<PathBuf>,

	/// Subcommands for vertrack-server (e.g., `version`)
	#[command(subcommand)]
	command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Show version and build information
	Version,
	/// Load and validate configuration, then exit
	CheckConfig,
}

fn load_config(path: Option<PathBuf>) -> Result<ServerConfig, vertrack_server_config::ConfigError> {
	match path {
		Some(path) => vertrack_server_config::load_config_with_file(path),
		None => vertrack_server_config::load_config(),
	}
}

fn init_tracing(logging: &LoggingConfig) {
	let filter = tracing_subscriber::EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| logging.level.clone().into());
	let registry = tracing_subscriber::registry().with(filter);

	match logging.format {
		LogFormat::Json => registry
			.with(tracing_subscriber::fmt::layer().json())
			.init(),
		LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
	}
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	if let Some(Command::Version) = args.command {
		println!("{}", version::format_version_info());
		return Ok(());
	}

	// Load .env file if present
	dotenvy::dotenv().ok();

	let config = load_config(args.config)?;

	if let Some(Command::CheckConfig) = args.command {
		println!("configuration OK\n{config:#?}");
		return Ok(());
	}

	init_tracing(&config.logging);
	config.log_summary();

	tracing::info!(version = version::VERSION, "starting vertrack-server");

	let pool = vertrack_server_db::create_pool_with_settings(
		&config.database.url,
		PoolSettings {
			max_connections: config.database.max_connections,
			busy_timeout: Duration::from_secs(config.database.busy_timeout_secs),
		},
	)
	.await?;
	vertrack_server_db::run_migrations(&pool).await?;

	let failed = VersionRepository::new(pool.clone())
		.fail_stale_processing()
		.await?;
	if failed > 0 {
		tracing::warn!(count = failed, "marked interrupted ingests as error");
	}

	let state = create_app_state(pool, &config)?;
	let ingest = state.ingest.clone();

	let app = create_router(state)
		.layer(TraceLayer::new_for_http())
		.layer(
			CorsLayer::new()
				.allow_origin(Any)
				.allow_methods(Any)
				.allow_headers(Any),
		);

	let addr = config.socket_addr();
	tracing::info!(addr = %addr, "listening");
	let listener = tokio::net::TcpListener::bind(&addr).await?;

	// Run server with graceful shutdown
	tokio::select! {
		result = axum::serve(listener, app) => {
			if let Err(e) = result {
				tracing::error!(error = %e, "Server error");
			}
		}
		_ = tokio::signal::ctrl_c() => {
			tracing::info!("Received shutdown signal");
		}
	}

	tracing::info!("Shutting down ingest queue...");
	ingest.shutdown().await;

	Ok(())
}
