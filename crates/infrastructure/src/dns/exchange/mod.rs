pub mod https;

use async_trait::async_trait;
use dohrelay_domain::DomainError;
use hickory_proto::op::Message;

pub use https::HttpsUpstream;

/// Content type for the DoH wire-format exchange. No content negotiation is
/// performed; request and response bodies are raw DNS messages.
pub const DNS_WIRE_FORMAT_CONTENT_TYPE: &str = "application/dns-udpwireformat";

/// One query/response exchange against a single DoH endpoint.
///
/// An exchange either succeeds with a complete DNS answer or fails with a
/// descriptive cause; retry and failover belong to the resolver, not here.
#[async_trait]
pub trait Exchanger: Send + Sync {
    async fn exchange(&self, query: &Message) -> Result<Message, DomainError>;

    fn endpoint(&self) -> &str;
}
