//! The demo `Caller` binding: dials the arithmetic server over
//! `loadgen-proto`'s framing, builds randomized arithmetic requests, and
//! classifies the server's responses.
//!
//! Grounded in `original_source/testHelper/commom.go`'s `TCPComm`
//! (`BuildReq`/`Call`/`CheckResp`).

use std::net::SocketAddr;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use loadgen_engine::{Caller, CallResult, ErrorInfo, RawRequest, RawResponse, ResultCode};
use loadgen_proto::{
    evaluate, format_formula, read_frame_bytes, write_frame_bytes, ServerRequest, ServerResponse,
    OPERATORS,
};
use rand::Rng;
use tokio::io::BufReader;
use tokio::net::TcpStream;

/// Dials `addr` fresh for every call, matching the original's
/// connection-per-request `net.DialTimeout`.
pub struct TcpCaller {
    addr: SocketAddr,
    next_id: AtomicI64,
}

impl TcpCaller {
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            next_id: AtomicI64::new(1),
        }
    }
}

#[async_trait]
impl Caller for TcpCaller {
    fn build_request(&self) -> RawRequest {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut rng = rand::thread_rng();
        let request = ServerRequest {
            id,
            operands: vec![rng.gen_range(1..=1000), rng.gen_range(1..=1000)],
            operator: OPERATORS[rng.gen_range(0..OPERATORS.len())].to_string(),
        };
        let payload =
            serde_json::to_vec(&request).expect("ServerRequest always serializes to JSON");
        RawRequest { id, payload }
    }

    async fn call(&self, payload: Vec<u8>, timeout: Duration) -> Result<Vec<u8>, ErrorInfo> {
        let stream = tokio::time::timeout(timeout, TcpStream::connect(self.addr))
            .await
            .map_err(|_| ErrorInfo::new(format!("dial {} timed out", self.addr)))?
            .map_err(|err| ErrorInfo::new(format!("dial {} failed: {err}", self.addr)))?;

        let (read_half, mut write_half) = stream.into_split();
        write_frame_bytes(&mut write_half, &payload)
            .await
            .map_err(|err| ErrorInfo::new(format!("request write failed: {err}")))?;

        let mut reader = BufReader::new(read_half);
        read_frame_bytes(&mut reader)
            .await
            .map_err(|err| ErrorInfo::new(format!("response read failed: {err}")))
    }

    fn check(&self, request: &RawRequest, response: &RawResponse) -> CallResult {
        let base = |code, message: String| CallResult {
            id: request.id,
            request: request.clone(),
            response: response.clone(),
            code,
            message,
            elapsed: response.elapsed,
        };

        let sent: ServerRequest = match serde_json::from_slice(&request.payload) {
            Ok(v) => v,
            Err(err) => {
                return base(
                    ResultCode::Fatal,
                    format!("our own request was not valid JSON: {err}"),
                )
            }
        };

        let reply: ServerResponse = match serde_json::from_slice(&response.payload) {
            Err(err) => {
                return base(
                    ResultCode::ErrResponse,
                    format!(
                        "malformed response {:?}: {err}",
                        String::from_utf8_lossy(&response.payload)
                    ),
                )
            }
            Ok(v) => v,
        };

        if sent.id != reply.id {
            return base(
                ResultCode::ErrResponse,
                format!("inconsistent id ({} != {})", sent.id, reply.id),
            );
        }

        if let Some(err) = &reply.error {
            return base(ResultCode::ErrCallee, format!("abnormal server: {err}"));
        }

        match evaluate(&sent.operands, &sent.operator) {
            Some(expected) if expected == reply.result => {
                base(ResultCode::Success, format!("success. ({})", reply.formula))
            }
            Some(expected) => base(
                ResultCode::ErrResponse,
                format!(
                    "incorrect result: {} (expected {expected})",
                    format_formula(&sent.operands, &sent.operator, reply.result, false)
                ),
            ),
            None => base(
                ResultCode::ErrResponse,
                format!("our own request was unevaluable: {:?} {}", sent.operands, sent.operator),
            ),
        }
    }
}
