use crate::dns::resolver::QueryHandler;
use hickory_proto::op::{Message, MessageType, OpCode, ResponseCode};
use hickory_proto::rr::Record;
use hickory_proto::ProtoError;
use hickory_server::authority::MessageResponseBuilder;
use hickory_server::server::{Request, RequestHandler, ResponseHandler, ResponseInfo};
use std::sync::Arc;
use tracing::{debug, error};

/// Bridges the serving framework to the query-handling chain: rebuilds the
/// upstream-bound query from the inbound request, runs the chain, and writes
/// the reply (or an error code) back through the framework.
#[derive(Clone)]
pub struct ProxyHandler {
    chain: Arc<dyn QueryHandler>,
}

impl ProxyHandler {
    pub fn new(chain: Arc<dyn QueryHandler>) -> Self {
        Self { chain }
    }

    fn upstream_query(request: &Request) -> Result<Message, ProtoError> {
        let request_info = request.request_info()?;

        let mut query = Message::new();
        query
            .set_id(request.header().id())
            .set_message_type(MessageType::Query)
            .set_op_code(OpCode::Query)
            .set_recursion_desired(request.header().recursion_desired())
            .add_query(request_info.query.original().clone());

        if let Some(edns) = request.edns() {
            *query.extensions_mut() = Some(edns.clone());
        }

        Ok(query)
    }
}

#[async_trait::async_trait]
impl RequestHandler for ProxyHandler {
    async fn handle_request<R: ResponseHandler>(
        &self,
        request: &Request,
        mut response_handle: R,
    ) -> ResponseInfo {
        let query = match Self::upstream_query(request) {
            Ok(query) => query,
            Err(e) => {
                error!(error = %e, "Failed to parse request info");
                return send_error_response(request, &mut response_handle, ResponseCode::FormErr)
                    .await;
            }
        };

        debug!(
            id = query.id(),
            client = %request.src(),
            transport = ?request.protocol(),
            "DNS query received"
        );

        let reply = match self.chain.handle(&query).await {
            Ok(reply) => reply,
            Err(e) => {
                error!(error = %e, "Query resolution failed");
                return send_error_response(request, &mut response_handle, ResponseCode::ServFail)
                    .await;
            }
        };

        let builder = MessageResponseBuilder::from_message_request(request);
        let response = builder.build(
            *reply.header(),
            reply.answers(),
            reply.name_servers(),
            &[],
            reply.additionals(),
        );

        match response_handle.send_response(response).await {
            Ok(info) => info,
            Err(e) => {
                error!(error = %e, "Failed to send response");
                ResponseInfo::from(*request.header())
            }
        }
    }
}

async fn send_error_response<R: ResponseHandler>(
    request: &Request,
    response_handle: &mut R,
    code: ResponseCode,
) -> ResponseInfo {
    debug!(code = ?code, "Sending error response");
    let builder = MessageResponseBuilder::from_message_request(request);
    let mut header = *request.header();
    header.set_message_type(MessageType::Response);
    header.set_response_code(code);
    header.set_recursion_available(true);
    let response = builder.build(header, &[], &[] as &[Record], &[], &[]);

    match response_handle.send_response(response).await {
        Ok(info) => info,
        Err(e) => {
            error!(error = %e, "Failed to send error response");
            ResponseInfo::from(*request.header())
        }
    }
}
