//! Listener lifecycle: owns the DNS sockets and the serving-framework server.
//!
//! Construction builds the whole handler chain without binding anything;
//! `start` binds UDP then TCP and hands each socket to a framework service
//! loop; `stop` signals shutdown and blocks until both loops have exited.

use crate::dns::exchange::{Exchanger, HttpsUpstream};
use crate::dns::resolver::{FailoverResolver, QueryHandler};
use crate::dns::server::ProxyHandler;
use dohrelay_domain::{DomainError, UpstreamConfig};
use hickory_server::ServerFuture;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, UdpSocket};
use tracing::{info, warn};

/// Per-connection timeout handed to the framework's TCP service loop.
const TCP_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub struct Listener {
    server: ServerFuture<ProxyHandler>,
    bind_addr: SocketAddr,
}

impl Listener {
    /// Build the serving configuration for the given bind address and ordered
    /// upstream list. Fails eagerly if the bind address or any upstream URL is
    /// malformed; no socket is bound here.
    pub fn create(
        bind_address: &str,
        port: u16,
        upstream: &UpstreamConfig,
    ) -> Result<Self, DomainError> {
        let ip: IpAddr = bind_address
            .parse()
            .map_err(|_| DomainError::InvalidBindAddress(bind_address.to_string()))?;
        let bind_addr = SocketAddr::new(ip, port);

        let timeout = Duration::from_secs(upstream.query_timeout);
        let mut upstreams: Vec<Arc<dyn Exchanger>> = Vec::with_capacity(upstream.servers.len());
        for url in &upstream.servers {
            info!(url = %url, "Adding DoH upstream");
            upstreams.push(Arc::new(HttpsUpstream::new(
                url,
                &upstream.bootstrap,
                timeout,
            )?));
        }

        // Terminal stage of the handler chain; a caching stage would wrap it
        // behind the same `QueryHandler` trait.
        let chain: Arc<dyn QueryHandler> = Arc::new(FailoverResolver::new(upstreams));
        let server = ServerFuture::new(ProxyHandler::new(chain));

        Ok(Self { server, bind_addr })
    }

    /// Bind both sockets and launch their service loops.
    ///
    /// UDP binds first; a UDP failure aborts start before TCP is attempted. A
    /// TCP failure after UDP succeeded rolls the already-launched UDP loop
    /// back, so a failed start never leaves a half-running listener.
    pub async fn start(&mut self) -> Result<(), DomainError> {
        info!(addr = %self.bind_addr, "Starting DNS over HTTPS proxy server");

        let udp = UdpSocket::bind(self.bind_addr)
            .await
            .map_err(|e| DomainError::BindFailed {
                transport: "UDP",
                addr: self.bind_addr.to_string(),
                cause: e.to_string(),
            })?;
        self.server.register_socket(udp);

        match TcpListener::bind(self.bind_addr).await {
            Ok(tcp) => {
                self.server.register_listener(tcp, TCP_REQUEST_TIMEOUT);
                Ok(())
            }
            Err(e) => {
                if let Err(shutdown_err) = self.server.shutdown_gracefully().await {
                    warn!(error = %shutdown_err, "Failed to roll back UDP service loop");
                }
                Err(DomainError::BindFailed {
                    transport: "TCP",
                    addr: self.bind_addr.to_string(),
                    cause: e.to_string(),
                })
            }
        }
    }

    /// Signal shutdown and block until every service loop has exited. Safe to
    /// call after a failed start; releases whatever sockets were opened.
    pub async fn stop(&mut self) -> Result<(), DomainError> {
        info!(addr = %self.bind_addr, "Stopping DNS over HTTPS proxy server");
        self.server
            .shutdown_gracefully()
            .await
            .map_err(|e| DomainError::ShutdownFailed(e.to_string()))
    }

    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }
}
