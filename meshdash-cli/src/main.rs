//! meshdash CLI

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use meshdash_config::{load_config, Config};
use meshdash_core::Status;
use meshdash_runtime::{ServerBuilder, SignalHandler};
use std::path::{Path, PathBuf};
use tokio::net::TcpListener;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "meshdash")]
#[command(about = "Steelmesh admin dashboard", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the dashboard
    Serve {
        /// Path to configuration file
        #[arg(short, long, default_value = "meshdash.yaml", env = "MESHDASH_CONFIG")]
        config: PathBuf,

        /// Log level (trace, debug, info, warn, error); overrides logging.level
        #[arg(short, long)]
        log_level: Option<String>,
    },

    /// Validate configuration file
    Validate {
        /// Path to configuration file
        #[arg(short, long, default_value = "meshdash.yaml", env = "MESHDASH_CONFIG")]
        config: PathBuf,
    },

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config, log_level } => {
            let path = config;
            let config = load_logged(&path, log_level.as_deref(), std::io::stdout)?;

            let level = log_level.unwrap_or_else(|| config.logging.level.clone());
            init_tracing(&level, &config.logging.format)?;

            tracing::info!(config = %path.display(), "Starting meshdash");
            tracing::info!(
                listen = %config.dashboard.listen_addr(),
                dbname = %config.dbname,
                apps = config.apps.len(),
                "Configuration loaded"
            );

            serve(config).await
        }

        Commands::Validate { config } => {
            tracing_subscriber::fmt().with_target(false).init();

            tracing::info!("Validating configuration: {}", config.display());

            match load_config(&config, true) {
                Ok(cfg) => {
                    tracing::info!("✓ Configuration is valid");
                    tracing::info!("  Listen: {}", cfg.dashboard.listen_addr());
                    tracing::info!("  Database: {}", cfg.dbname);
                    tracing::info!(
                        "  Replication: {}",
                        cfg.replication_url().unwrap_or("disabled")
                    );
                    tracing::info!("  Apps: {}", cfg.apps.len());
                    Ok(())
                }
                Err(e) => {
                    tracing::error!("✗ Configuration validation failed: {}", e);
                    std::process::exit(1);
                }
            }
        }

        Commands::Version => {
            println!("meshdash");
            println!("Version: {}", env!("CARGO_PKG_VERSION"));
            println!("Rust version: {}", env!("CARGO_PKG_RUST_VERSION"));
            Ok(())
        }
    }
}

/// Run the dashboard and act as the platform for its status events
async fn serve(config: Config) -> Result<()> {
    let addr = config.dashboard.listen_addr();
    let server = ServerBuilder::new().config(config).build()?;
    let platform = server.platform().clone();

    let shutdown_signal = server.shutdown_signal();
    tokio::spawn(async move {
        let handler = SignalHandler::new(shutdown_signal);
        handler.run().await;
    });

    {
        let platform = platform.clone();
        let shutdown_signal = server.shutdown_signal();
        tokio::spawn(async move {
            shutdown_signal.wait().await;
            platform.emit_status(Status::Stopping);
        });
    }

    server.start().await?;
    platform.emit_status(Status::Starting);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    platform.emit_status(Status::Online);
    let served = server.serve(listener).await;
    platform.emit_status(Status::Shutdown);

    served?;
    tracing::info!("Server stopped");
    Ok(())
}

/// Load the config while a temporary subscriber is active, so loader
/// warnings are visible before logging is configured from the file.
fn load_logged<W>(path: &Path, level: Option<&str>, writer: W) -> Result<Config>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let bootstrap = tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(build_filter(level.unwrap_or("info"))?)
        .with_writer(writer)
        .finish();

    tracing::subscriber::with_default(bootstrap, || load_config(path, true))
        .with_context(|| format!("Failed to load {}", path.display()))
}

fn build_filter(level: &str) -> Result<EnvFilter> {
    let level = match level.to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    };

    Ok(EnvFilter::from_default_env()
        .add_directive(level.into())
        // tower-http traces every request at debug
        .add_directive("tower_http=info".parse()?))
}

fn init_tracing(level: &str, format: &str) -> Result<()> {
    let registry = tracing_subscriber::registry().with(build_filter(level)?);

    if format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_level(true),
            )
            .init();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    #[test]
    fn test_missing_config_warning_is_logged() {
        let captured = Captured::default();
        let writer = captured.clone();

        let config = load_logged(
            Path::new("does-not-exist/meshdash.yaml"),
            None,
            move || writer.clone(),
        )
        .unwrap();

        assert_eq!(config.dbname, "steelmesh");
        assert!(captured.text().contains("Config file not found, using defaults"));
    }

    #[test]
    fn test_log_level_flag_filters_bootstrap_output() {
        let captured = Captured::default();
        let writer = captured.clone();

        load_logged(
            Path::new("does-not-exist/meshdash.yaml"),
            Some("error"),
            move || writer.clone(),
        )
        .unwrap();

        assert!(captured.text().is_empty());
    }
}
