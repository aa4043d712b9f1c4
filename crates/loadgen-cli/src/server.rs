//! The bundled demo TCP arithmetic server, started when `--serve` is given.
//!
//! One accepted connection handles exactly one request/response pair, then
//! closes — mirrors `original_source/testHelper/server.go`'s
//! `TCPServer`/`reqHandler`, rebuilt as one spawned task per connection
//! instead of the original's bare `go reqHandler(conn)`.

use std::net::SocketAddr;

use loadgen_proto::{evaluate, format_formula, read_frame, write_frame, ServerRequest, ServerResponse};
use tokio::io::BufReader;
use tokio::net::{TcpListener, TcpStream};

/// Binds `addr`, returning the listener so the caller can confirm the
/// server is ready to accept before dialing it.
pub async fn bind(addr: SocketAddr) -> std::io::Result<TcpListener> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "demo arithmetic server listening");
    Ok(listener)
}

/// Accepts and serves connections until the listener errors.
pub async fn run(listener: TcpListener) -> std::io::Result<()> {
    loop {
        let (stream, peer) = listener.accept().await?;
        tokio::spawn(async move {
            if let Err(err) = handle_connection(stream).await {
                tracing::debug!(%peer, %err, "demo server connection ended");
            }
        });
    }
}

async fn handle_connection(stream: TcpStream) -> Result<(), loadgen_proto::FramingError> {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    let response = match read_frame::<ServerRequest>(&mut reader).await {
        Ok(request) => evaluate_request(&request),
        Err(loadgen_proto::FramingError::ConnectionClosed) => {
            return Ok(());
        }
        Err(err) => ServerResponse {
            id: 0,
            formula: String::new(),
            result: 0,
            error: Some(format!("request read error: {err}")),
        },
    };

    write_frame(&mut write_half, &response).await
}

fn evaluate_request(request: &ServerRequest) -> ServerResponse {
    match evaluate(&request.operands, &request.operator) {
        Some(result) => ServerResponse {
            id: request.id,
            formula: format_formula(&request.operands, &request.operator, result, true),
            result,
            error: None,
        },
        None => ServerResponse {
            id: request.id,
            formula: String::new(),
            result: 0,
            error: Some(format!(
                "cannot evaluate {:?} {}",
                request.operands, request.operator
            )),
        },
    }
}
