use serde::{de::DeserializeOwned, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};

const DELIM: u8 = b'\n';

/// Errors from the newline-delimited framing.
#[derive(Debug, thiserror::Error)]
pub enum FramingError {
    #[error("connection closed before a full frame was read")]
    ConnectionClosed,
    #[error("connection closed mid-frame: got {0} byte(s) with no trailing delimiter")]
    Truncated(usize),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed json frame: {0}")]
    Json(#[from] serde_json::Error),
}

/// Reads one newline-delimited raw frame from `reader`, stripped of its
/// trailing delimiter.
///
/// Mirrors `original_source/testHelper/commom.go`'s byte-oriented `read`:
/// framing and content encoding are separate concerns there, and kept
/// separate here too — [`read_frame`] layers JSON decoding on top of this.
/// Like the original, any read that doesn't end in a full frame — an
/// immediate EOF or a peer that closes mid-frame — is an error, never a
/// partial result.
pub async fn read_frame_bytes(
    reader: &mut BufReader<OwnedReadHalf>,
) -> Result<Vec<u8>, FramingError> {
    let mut line = Vec::new();
    let n = reader.read_until(DELIM, &mut line).await?;
    if n == 0 {
        return Err(FramingError::ConnectionClosed);
    }
    if line.last() != Some(&DELIM) {
        return Err(FramingError::Truncated(line.len()));
    }
    line.pop();
    Ok(line)
}

/// Writes `payload` to `writer` as one newline-delimited raw frame.
pub async fn write_frame_bytes(
    writer: &mut OwnedWriteHalf,
    payload: &[u8],
) -> Result<(), FramingError> {
    writer.write_all(payload).await?;
    writer.write_all(&[DELIM]).await?;
    writer.flush().await?;
    Ok(())
}

/// Reads one newline-delimited JSON frame from `reader`.
pub async fn read_frame<T: DeserializeOwned>(
    reader: &mut BufReader<OwnedReadHalf>,
) -> Result<T, FramingError> {
    let line = read_frame_bytes(reader).await?;
    Ok(serde_json::from_slice(&line)?)
}

/// Writes `value` to `writer` as one newline-delimited JSON frame.
pub async fn write_frame<T: Serialize>(
    writer: &mut OwnedWriteHalf,
    value: &T,
) -> Result<(), FramingError> {
    let buf = serde_json::to_vec(value)?;
    write_frame_bytes(writer, &buf).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::{TcpListener, TcpStream};

    async fn loopback_pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).await.unwrap();
        let (server, _) = listener.accept().await.unwrap();
        (client, server)
    }

    #[tokio::test]
    async fn reads_back_a_full_frame() {
        let (client, server) = loopback_pair().await;
        let (_client_read, mut client_write) = client.into_split();
        let (server_read, _server_write) = server.into_split();
        let mut reader = BufReader::new(server_read);

        write_frame_bytes(&mut client_write, b"hello").await.unwrap();

        assert_eq!(read_frame_bytes(&mut reader).await.unwrap(), b"hello");
    }

    #[tokio::test]
    async fn immediate_close_is_connection_closed() {
        let (client, server) = loopback_pair().await;
        let (server_read, _server_write) = server.into_split();
        let mut reader = BufReader::new(server_read);
        drop(client);

        assert!(matches!(
            read_frame_bytes(&mut reader).await,
            Err(FramingError::ConnectionClosed)
        ));
    }

    #[tokio::test]
    async fn partial_frame_then_close_is_truncated_not_ok() {
        let (client, server) = loopback_pair().await;
        let (server_read, _server_write) = server.into_split();
        let mut reader = BufReader::new(server_read);

        let (_client_read, mut client_write) = client.into_split();
        client_write.write_all(b"partial, no delimiter").await.unwrap();
        client_write.flush().await.unwrap();
        drop(client_write);

        assert!(matches!(
            read_frame_bytes(&mut reader).await,
            Err(FramingError::Truncated(_))
        ));
    }
}
