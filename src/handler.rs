//! Connection handler
//!
//! Frames a byte stream into UTF-8 lines and runs one session over it:
//! the read loop feeds [`ChatServer::on_line`], a write task drains the
//! session's queue into the socket.

use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_util::codec::{Framed, LinesCodec, LinesCodecError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::AppError;
use crate::interpreter::Flow;
use crate::message::ServerMessage;
use crate::server::ChatServer;
use crate::types::SessionId;

/// Upper bound on flushing queued lines once a session is closed
const CLOSE_FLUSH_TIMEOUT: Duration = Duration::from_secs(1);

type LineSink<S> = SplitSink<Framed<S, LinesCodec>, String>;

/// Serve one client connection until it quits, fails or is shut down
///
/// `peer_port` seeds the default handle.
pub async fn handle_connection<S>(
    stream: S,
    peer_port: u16,
    server: Arc<ChatServer>,
) -> Result<(), AppError>
where
    S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    let session_config = &server.config().session;
    let framed = Framed::new(
        stream,
        LinesCodec::new_with_max_length(session_config.max_line_length),
    );
    let (line_sink, mut line_stream) = framed.split();

    // Create channel for server -> client lines
    let capacity = session_config.outbound_buffer.max(1);
    let (msg_tx, msg_rx) = mpsc::channel::<ServerMessage>(capacity);

    let session = server.on_connect(peer_port, msg_tx)?;
    let close = session.close_token();
    let session_id = session.id();

    // Spawn write task (ServerMessage -> socket)
    let write_task = tokio::spawn(write_lines(line_sink, msg_rx, close.clone(), session_id));

    // Read loop (socket -> ChatServer)
    let result = loop {
        let next = tokio::select! {
            _ = close.cancelled() => break Ok(()),
            next = line_stream.next() => next,
        };
        match next {
            Some(Ok(line)) => {
                if server.on_line(&session, &line) == Flow::Close {
                    break Ok(());
                }
            }
            Some(Err(e)) => break Err(AppError::from(e)),
            None => {
                debug!("Client {} closed the stream", session_id);
                break Ok(());
            }
        }
    };

    server.on_disconnect(&session);
    drop(session);
    let _ = write_task.await;

    info!("Client {} disconnected", session_id);
    result
}

/// Drain the session queue into the socket until the session is closed
///
/// Every write is raced against the close token, so a client that stopped
/// reading cannot pin the task. Lines already queued at close time get
/// `CLOSE_FLUSH_TIMEOUT` to reach the socket.
async fn write_lines<S>(
    mut sink: LineSink<S>,
    mut rx: mpsc::Receiver<ServerMessage>,
    close: CancellationToken,
    session_id: SessionId,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    loop {
        let msg = tokio::select! {
            biased;
            msg = rx.recv() => msg,
            _ = close.cancelled() => break,
        };
        let Some(msg) = msg else { break };
        tokio::select! {
            biased;
            sent = sink.send(msg.to_string()) => {
                if let Err(e) = sent {
                    debug!("Write to {} failed: {}", session_id, e);
                    close.cancel();
                    return;
                }
            }
            _ = close.cancelled() => break,
        }
    }

    // Flush whatever was queued before the close, then shut the socket
    let flush = async {
        while let Ok(msg) = rx.try_recv() {
            sink.feed(msg.to_string()).await?;
        }
        sink.close().await?;
        Ok::<_, LinesCodecError>(())
    };
    match timeout(CLOSE_FLUSH_TIMEOUT, flush).await {
        Ok(Ok(())) => debug!("Write task ended for {}", session_id),
        Ok(Err(e)) => debug!("Final flush to {} failed: {}", session_id, e),
        Err(_) => debug!(
            "Gave up flushing to {} after {:?}",
            session_id, CLOSE_FLUSH_TIMEOUT
        ),
    }
}
