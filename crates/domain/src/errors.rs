use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum DomainError {
    #[error("Invalid upstream URL {url}: {cause}")]
    InvalidUpstreamUrl { url: String, cause: String },

    #[error("Invalid bind address: {0}")]
    InvalidBindAddress(String),

    #[error("No upstream resolvers configured")]
    NoUpstreams,

    #[error("Failed to serialize DNS query: {0}")]
    MessageEncode(String),

    #[error("Invalid DNS response from {server}: {cause}")]
    InvalidDnsResponse { server: String, cause: String },

    #[error("Transport timeout connecting to {server}")]
    TransportTimeout { server: String },

    #[error("HTTPS request to {server} failed: {cause}")]
    TransportFailed { server: String, cause: String },

    #[error("DoH server {server} returned HTTP {status}")]
    UpstreamHttpStatus { server: String, status: u16 },

    #[error("Failed to read response body from {server}: {cause}")]
    BodyRead { server: String, cause: String },

    #[error("unreachable backend: {0}")]
    UnreachableBackend(String),

    #[error("Failed to bind {transport} socket on {addr}: {cause}")]
    BindFailed {
        transport: &'static str,
        addr: String,
        cause: String,
    },

    #[error("Server shutdown error: {0}")]
    ShutdownFailed(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}
