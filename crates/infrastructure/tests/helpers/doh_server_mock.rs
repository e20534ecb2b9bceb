#![allow(dead_code)]
use hickory_proto::op::{Message, MessageType, OpCode};
use hickory_proto::rr::rdata::A;
use hickory_proto::rr::{RData, Record};
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;

/// What the mock answers with for every request it receives.
#[derive(Clone, Copy)]
pub enum MockBehavior {
    /// HTTP 200 with a one-answer DNS reply. `reply_id` overrides the reply's
    /// transaction id to simulate an upstream that does not preserve it.
    Answer {
        answer_ip: Ipv4Addr,
        reply_id: Option<u16>,
    },
    /// The given HTTP status with an empty body.
    Status(u16),
    /// HTTP 200 with a body that is not a DNS message.
    Garbage,
}

/// A scriptable single-behavior DoH endpoint speaking plain HTTP/1.1.
pub struct MockDohServer {
    addr: SocketAddr,
    hits: Arc<AtomicUsize>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockDohServer {
    pub async fn start(behavior: MockBehavior) -> Result<Self, std::io::Error> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_counter = Arc::clone(&hits);

        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => {
                        break;
                    }
                    result = listener.accept() => {
                        if let Ok((stream, _)) = result {
                            hits_counter.fetch_add(1, Ordering::SeqCst);
                            let _ = handle_connection(stream, behavior).await;
                        }
                    }
                }
            }
        });

        Ok(Self {
            addr,
            hits,
            shutdown_tx: Some(shutdown_tx),
        })
    }

    /// Endpoint URL the exchanger should be pointed at.
    pub fn url(&self) -> String {
        format!("http://{}/dns-query", self.addr)
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Number of requests received so far.
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockDohServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

async fn handle_connection(
    mut stream: TcpStream,
    behavior: MockBehavior,
) -> Result<(), std::io::Error> {
    let query_bytes = match read_request_body(&mut stream).await {
        Some(body) => body,
        None => return Ok(()),
    };

    let (status, body) = match behavior {
        MockBehavior::Answer {
            answer_ip,
            reply_id,
        } => (200, build_answer(&query_bytes, answer_ip, reply_id)),
        MockBehavior::Status(status) => (status, vec![]),
        MockBehavior::Garbage => (200, b"this is not a dns message".to_vec()),
    };

    let headers = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/dns-udpwireformat\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        status,
        reason(status),
        body.len()
    );
    stream.write_all(headers.as_bytes()).await?;
    stream.write_all(&body).await?;
    stream.flush().await?;
    Ok(())
}

/// Read one HTTP request off the stream and return its body.
async fn read_request_body(stream: &mut TcpStream) -> Option<Vec<u8>> {
    let mut buf = Vec::new();
    let mut tmp = [0u8; 1024];

    let header_end = loop {
        let n = stream.read(&mut tmp).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&tmp[..n]);
        if let Some(pos) = find_subsequence(&buf, b"\r\n\r\n") {
            break pos + 4;
        }
        if buf.len() > 16384 {
            return None;
        }
    };

    let headers = String::from_utf8_lossy(&buf[..header_end]).to_ascii_lowercase();
    let content_length: usize = headers
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = stream.read(&mut tmp).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&tmp[..n]);
    }

    Some(buf[header_end..header_end + content_length].to_vec())
}

fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Build a valid one-answer reply to the given wire-format query.
fn build_answer(query_bytes: &[u8], answer_ip: Ipv4Addr, reply_id: Option<u16>) -> Vec<u8> {
    let query = match Message::from_vec(query_bytes) {
        Ok(query) => query,
        Err(_) => return vec![],
    };

    let mut reply = Message::new();
    reply
        .set_id(reply_id.unwrap_or_else(|| query.id()))
        .set_message_type(MessageType::Response)
        .set_op_code(OpCode::Query)
        .set_recursion_desired(query.recursion_desired())
        .set_recursion_available(true);

    if let Some(question) = query.queries().first() {
        reply.add_query(question.clone());
        reply.add_answer(Record::from_rdata(
            question.name().clone(),
            60,
            RData::A(A(answer_ip)),
        ));
    }

    reply.to_vec().unwrap_or_default()
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        404 => "Not Found",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}
