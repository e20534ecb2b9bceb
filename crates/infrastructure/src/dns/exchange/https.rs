//! DoH upstream: DNS wire format carried as an HTTPS POST body
//!
//! Sends the serialized query as `application/dns-udpwireformat` and expects
//! the raw DNS response back in the body of a 200 reply. TLS verification and
//! the HTTP `Host` header stay pinned to the endpoint hostname even when
//! bootstrap addresses are used to dial the endpoint, so the proxy can reach
//! its own DoH resolver before that hostname is resolvable through it.

use super::{Exchanger, DNS_WIRE_FORMAT_CONTENT_TYPE};
use async_trait::async_trait;
use dohrelay_domain::DomainError;
use hickory_proto::op::Message;
use reqwest::{StatusCode, Url};
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use tracing::{debug, error};

pub struct HttpsUpstream {
    endpoint: Url,
    client: reqwest::Client,
}

impl HttpsUpstream {
    /// Build the HTTPS client for one endpoint. Fails on a malformed or
    /// host-less URL; no connection is attempted here.
    pub fn new(
        endpoint: &str,
        bootstrap: &[IpAddr],
        timeout: Duration,
    ) -> Result<Self, DomainError> {
        let url = Url::parse(endpoint).map_err(|e| DomainError::InvalidUpstreamUrl {
            url: endpoint.to_string(),
            cause: e.to_string(),
        })?;
        let hostname = url
            .host_str()
            .ok_or_else(|| DomainError::InvalidUpstreamUrl {
                url: endpoint.to_string(),
                cause: "URL has no hostname".to_string(),
            })?
            .to_string();

        let mut builder = reqwest::Client::builder()
            .use_rustls_tls()
            .timeout(timeout);

        // Bootstrap addresses override the dial target only; the URL keeps the
        // hostname, so Host header and SNI are unaffected.
        if !bootstrap.is_empty() {
            let port = url.port_or_known_default().unwrap_or(443);
            let addrs: Vec<SocketAddr> = bootstrap
                .iter()
                .map(|ip| SocketAddr::new(*ip, port))
                .collect();
            builder = builder.resolve_to_addrs(&hostname, &addrs);
        }

        let client = builder.build().map_err(|e| DomainError::TransportFailed {
            server: endpoint.to_string(),
            cause: e.to_string(),
        })?;

        Ok(Self {
            endpoint: url,
            client,
        })
    }

    /// Perform the message exchange in the UDP wire format: POST the query
    /// bytes, require HTTP 200, return the raw response body.
    async fn exchange_wireformat(&self, query_bytes: Vec<u8>) -> Result<Vec<u8>, DomainError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .header("Content-Type", DNS_WIRE_FORMAT_CONTENT_TYPE)
            .body(query_bytes)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    DomainError::TransportTimeout {
                        server: self.endpoint.to_string(),
                    }
                } else {
                    DomainError::TransportFailed {
                        server: self.endpoint.to_string(),
                        cause: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(DomainError::UpstreamHttpStatus {
                server: self.endpoint.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                DomainError::TransportTimeout {
                    server: self.endpoint.to_string(),
                }
            } else {
                DomainError::BodyRead {
                    server: self.endpoint.to_string(),
                    cause: e.to_string(),
                }
            }
        })?;

        Ok(body.to_vec())
    }
}

#[async_trait]
impl Exchanger for HttpsUpstream {
    async fn exchange(&self, query: &Message) -> Result<Message, DomainError> {
        let query_bytes = query
            .to_vec()
            .map_err(|e| DomainError::MessageEncode(e.to_string()))?;

        debug!(
            endpoint = %self.endpoint,
            query_len = query_bytes.len(),
            "Sending DoH query"
        );

        let buf = match self.exchange_wireformat(query_bytes).await {
            Ok(buf) => buf,
            Err(backend_err) => {
                error!(
                    endpoint = %self.endpoint,
                    error = %backend_err,
                    "Failed to connect to HTTPS backend"
                );
                return Err(backend_err);
            }
        };

        let mut reply =
            Message::from_vec(&buf).map_err(|e| DomainError::InvalidDnsResponse {
                server: self.endpoint.to_string(),
                cause: e.to_string(),
            })?;

        // The upstream may not preserve the transaction id; demultiplexing at
        // the transport layer requires the original.
        reply.set_id(query.id());

        debug!(
            endpoint = %self.endpoint,
            response_len = buf.len(),
            "DoH response received"
        );

        Ok(reply)
    }

    fn endpoint(&self) -> &str {
        self.endpoint.as_str()
    }
}
