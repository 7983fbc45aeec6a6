use log::{error, info, warn};
use serde_json::Value;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::Mutex;

use crate::client::ClientRegistry;
use crate::config::ServerConfig;
use crate::error::RpcError;
use crate::middleware::logging::{log_disconnect, log_request};
use crate::protocol::dispatch;
use crate::protocol::responses::{Response, encode};
use crate::storage::FileStore;

/// One newline-delimited message read from a client.
#[derive(Debug, PartialEq, Eq)]
enum Frame {
    /// A complete line, without its terminating newline.
    Line(Vec<u8>),
    /// A line longer than the limit. Its bytes were skipped, not kept.
    TooLong,
    Closed,
}

/// Reads one line, buffering at most `max_len` bytes of it.
async fn read_frame<R>(reader: &mut R, max_len: usize) -> io::Result<Frame>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    let limit = u64::try_from(max_len).unwrap_or(u64::MAX).saturating_add(1);
    let read = (&mut *reader).take(limit).read_until(b'\n', &mut buf).await?;

    if read == 0 {
        return Ok(Frame::Closed);
    }

    if buf.last() == Some(&b'\n') {
        buf.pop();
    } else if buf.len() > max_len {
        discard_line(reader).await?;
        return Ok(Frame::TooLong);
    }

    Ok(Frame::Line(buf))
}

/// Skips input up to and including the next newline (or EOF).
async fn discard_line<R>(reader: &mut R) -> io::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            return Ok(());
        }
        match available.iter().position(|&b| b == b'\n') {
            Some(end) => {
                reader.consume(end + 1);
                return Ok(());
            }
            None => {
                let skipped = available.len();
                reader.consume(skipped);
            }
        }
    }
}

fn error_line(err: RpcError) -> Option<String> {
    Some(encode(&Response::from_rpc_error(Value::Null, &err)))
}

/// Serves one client connection until it closes.
///
/// - Reads newline-delimited JSON-RPC messages, never holding more than
///   `max_request_length` bytes of a single line.
/// - Dispatches each line against the shared `FileStore`.
/// - Writes one response line per message that expects an answer.
pub async fn handle_client(
    stream: TcpStream,
    client_addr: SocketAddr,
    clients: Arc<Mutex<ClientRegistry>>,
    store: Arc<FileStore>,
    config: Arc<ServerConfig>,
) {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    loop {
        let response = match read_frame(&mut reader, config.max_request_length).await {
            Ok(Frame::Closed) => {
                info!("Connection closed by client {client_addr}");
                break;
            }
            Ok(Frame::TooLong) => {
                warn!(
                    "Client {client_addr} sent a line over the {} byte limit",
                    config.max_request_length
                );
                error_line(RpcError::InvalidRequest("Request too long".into()))
            }
            Ok(Frame::Line(bytes)) => match String::from_utf8(bytes) {
                Ok(line) => {
                    let request = line.trim();
                    if request.is_empty() {
                        continue;
                    }
                    log_request(&client_addr, request);
                    dispatch(Arc::clone(&store), request).await
                }
                Err(_) => error_line(RpcError::Parse("Request is not valid UTF-8".into())),
            },
            Err(e) => {
                error!("Failed to read from {client_addr}: {e}");
                break;
            }
        };

        clients.lock().await.record_request(&client_addr);

        if let Some(mut response) = response {
            response.push('\n');
            if let Err(e) = write_half.write_all(response.as_bytes()).await {
                error!("Failed to write to {client_addr}: {e}");
                break;
            }
        }
    }

    if let Some(session) = clients.lock().await.remove(&client_addr) {
        log_disconnect(&session);
    }
}
