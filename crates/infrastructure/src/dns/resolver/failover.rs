use super::QueryHandler;
use crate::dns::exchange::Exchanger;
use async_trait::async_trait;
use dohrelay_domain::DomainError;
use hickory_proto::op::Message;
use std::sync::Arc;
use tracing::{debug, warn};

/// Walks the upstream chain strictly in configured order and returns the
/// first successful answer. The chain is immutable after construction; every
/// query re-walks it from the start. No per-upstream retries, no backoff, no
/// health memory across queries.
pub struct FailoverResolver {
    upstreams: Vec<Arc<dyn Exchanger>>,
}

impl FailoverResolver {
    pub fn new(upstreams: Vec<Arc<dyn Exchanger>>) -> Self {
        Self { upstreams }
    }
}

#[async_trait]
impl QueryHandler for FailoverResolver {
    async fn handle(&self, query: &Message) -> Result<Message, DomainError> {
        if self.upstreams.is_empty() {
            return Err(DomainError::NoUpstreams);
        }

        debug!(
            upstreams = self.upstreams.len(),
            id = query.id(),
            "Trying upstreams sequentially"
        );

        let mut backend_err = None;
        for (position, upstream) in self.upstreams.iter().enumerate() {
            match upstream.exchange(query).await {
                Ok(reply) => {
                    debug!(endpoint = %upstream.endpoint(), position, "Upstream responded");
                    return Ok(reply);
                }
                Err(e) => {
                    warn!(endpoint = %upstream.endpoint(), error = %e, position, "Failing over");
                    backend_err = Some(e);
                }
            }
        }

        // Only the most recent attempt's cause is surfaced.
        let cause = backend_err.map(|e| e.to_string()).unwrap_or_default();
        Err(DomainError::UnreachableBackend(cause))
    }
}
