pub mod failover;

use async_trait::async_trait;
use dohrelay_domain::DomainError;
use hickory_proto::op::Message;

pub use failover::FailoverResolver;

/// One stage in the query-handling chain.
///
/// Stages compose by wrapping an inner `Arc<dyn QueryHandler>`, so a caching
/// stage can sit in front of the resolver without either knowing the other's
/// concrete type. `FailoverResolver` is the terminal stage.
#[async_trait]
pub trait QueryHandler: Send + Sync {
    async fn handle(&self, query: &Message) -> Result<Message, DomainError>;
}
