use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Ordered DoH upstream configuration. List order is failover priority order.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpstreamConfig {
    #[serde(default = "default_servers")]
    pub servers: Vec<String>,

    /// Addresses used to reach the endpoint hostname before the proxy itself
    /// can serve that resolution.
    #[serde(default = "default_bootstrap")]
    pub bootstrap: Vec<IpAddr>,

    /// Per-request timeout in seconds, applied to each upstream attempt.
    #[serde(default = "default_query_timeout")]
    pub query_timeout: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            servers: default_servers(),
            bootstrap: default_bootstrap(),
            query_timeout: default_query_timeout(),
        }
    }
}

fn default_servers() -> Vec<String> {
    vec!["https://dns.cloudflare.com/dns-query".to_string()]
}

fn default_bootstrap() -> Vec<IpAddr> {
    vec![
        IpAddr::V6(Ipv6Addr::new(
            0x2400, 0xcb00, 0x2048, 0x0001, 0, 0, 0x6813, 0xc066,
        )),
        IpAddr::V4(Ipv4Addr::new(104, 19, 192, 102)),
    ]
}

fn default_query_timeout() -> u64 {
    5
}
