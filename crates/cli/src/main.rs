use clap::Parser;
use dohrelay_domain::CliOverrides;
use dohrelay_infrastructure::dns::Listener;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

mod bootstrap;
mod server;

#[derive(Parser)]
#[command(name = "dohrelay")]
#[command(version)]
#[command(about = "DNS proxy that forwards plaintext DNS queries over DNS-over-HTTPS")]
struct Cli {
    /// Configuration file path
    #[arg(short = 'c', long, value_name = "FILE")]
    config: Option<String>,

    /// DNS listener port
    #[arg(short = 'p', long)]
    port: Option<u16>,

    /// Status server port
    #[arg(long)]
    metrics_port: Option<u16>,

    /// Bind address
    #[arg(short = 'b', long)]
    bind: Option<String>,

    /// DoH upstream URL; repeatable, listed order is failover order
    #[arg(short = 'u', long = "upstream", value_name = "URL")]
    upstreams: Vec<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cli_overrides = CliOverrides {
        dns_port: cli.port,
        metrics_port: cli.metrics_port,
        bind_address: cli.bind.clone(),
        upstreams: if cli.upstreams.is_empty() {
            None
        } else {
            Some(cli.upstreams.clone())
        },
        log_level: cli.log_level.clone(),
    };

    let config = bootstrap::load_config(cli.config.as_deref(), cli_overrides)?;
    bootstrap::init_logging(&config);

    info!("Starting dohrelay v{}", env!("CARGO_PKG_VERSION"));

    // The status listener comes up before the DNS listener; failing to bind
    // it is fatal to the whole process.
    let metrics_addr: SocketAddr = format!(
        "{}:{}",
        config.server.bind_address, config.server.metrics_port
    )
    .parse()?;
    let metrics_listener = tokio::net::TcpListener::bind(metrics_addr).await?;

    let dns_addr = format!("{}:{}", config.server.bind_address, config.server.dns_port);
    let status_state = server::StatusState {
        upstreams: Arc::new(config.upstream.servers.clone()),
        dns_listener: dns_addr,
        started_at: Instant::now(),
    };
    tokio::spawn(async move {
        if let Err(e) = server::start_status_server(metrics_listener, status_state).await {
            error!(error = %e, "Status server error");
        }
    });

    let mut listener = match Listener::create(
        &config.server.bind_address,
        config.server.dns_port,
        &config.upstream,
    ) {
        Ok(listener) => listener,
        Err(e) => {
            error!(error = %e, "Failed to create a listener");
            return Err(e.into());
        }
    };

    if let Err(e) = listener.start().await {
        // A failed start rolls its own sockets back; nothing is left to stop.
        error!(error = %e, "Failed to start");
        return Err(e.into());
    }

    shutdown_signal().await;
    info!("Shutdown signal received, stopping");

    if let Err(e) = listener.stop().await {
        error!(error = %e, "Failed to stop");
        return Err(e.into());
    }

    Ok(())
}

/// Block until SIGINT or SIGTERM.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
