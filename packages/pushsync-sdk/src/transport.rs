use crate::error::*;
use crate::SdkResult;
use futures_util::{SinkExt, StreamExt};
use pushsync_core::{PushEvent, TransportFrame};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, warn};

/// 推送通道：负责申请注册令牌
///
/// Token requests are fire-and-forget; the answer arrives later as a
/// [`PushEvent`] on the transport's event queue.
pub trait PushTransport: Send + Sync {
    fn request_token(&self) -> SdkResult<()>;
}

/// Push transport speaking JSON [`TransportFrame`]s over a WebSocket.
#[derive(Clone)]
pub struct WebSocketTransport {
    outbound: mpsc::UnboundedSender<TransportFrame>,
    sender_id: String,
}

impl WebSocketTransport {
    /// Connects and returns the transport handle plus its event queue.
    ///
    /// The queue closes when the connection does.
    pub async fn connect(
        url: &str,
        sender_id: &str,
    ) -> SdkResult<(Self, mpsc::UnboundedReceiver<PushEvent>)> {
        let (ws_stream, _) = connect_async(url)
            .await
            .map_err(|e| SdkError::NetworkError(e.to_string()))?;
        let (mut write, mut read) = ws_stream.split();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<TransportFrame>();

        tokio::spawn(async move {
            let mut outbound_open = true;
            loop {
                tokio::select! {
                    frame = outbound_rx.recv(), if outbound_open => {
                        let Some(frame) = frame else {
                            outbound_open = false;
                            continue;
                        };
                        match serde_json::to_string(&frame) {
                            Ok(text) => {
                                if let Err(e) = write.send(Message::Text(text.into())).await {
                                    warn!(error = %e, "failed to send transport frame");
                                    break;
                                }
                            }
                            Err(e) => warn!(error = %e, "failed to encode transport frame"),
                        }
                    }
                    msg = read.next() => {
                        match msg {
                            Some(Ok(Message::Text(text))) => forward_frame(&event_tx, text.as_str()),
                            Some(Ok(Message::Binary(data))) => match std::str::from_utf8(&data) {
                                Ok(text) => forward_frame(&event_tx, text),
                                Err(e) => warn!(error = %e, "binary transport frame is not UTF-8"),
                            },
                            Some(Ok(Message::Ping(payload))) => {
                                // Respond to ping with pong
                                if let Err(e) = write.send(Message::Pong(payload)).await {
                                    warn!(error = %e, "failed to send pong");
                                    break;
                                }
                            }
                            Some(Ok(Message::Close(_))) | None => break,
                            Some(Err(e)) => {
                                warn!(error = %e, "push transport read failed");
                                break;
                            }
                            Some(Ok(_)) => {}
                        }
                    }
                }
            }
            debug!("push transport closed");
        });

        Ok((
            Self {
                outbound: outbound_tx,
                sender_id: sender_id.to_string(),
            },
            event_rx,
        ))
    }
}

impl PushTransport for WebSocketTransport {
    fn request_token(&self) -> SdkResult<()> {
        self.outbound
            .send(TransportFrame::Register {
                sender: self.sender_id.clone(),
            })
            .map_err(|_| SdkError::NetworkError("push transport connection closed".to_string()))
    }
}

fn forward_frame(tx: &mpsc::UnboundedSender<PushEvent>, text: &str) {
    match serde_json::from_str::<TransportFrame>(text) {
        Ok(frame) => match frame.into_event() {
            Some(event) => {
                let _ = tx.send(event);
            }
            None => debug!("ignoring transport frame without event"),
        },
        Err(e) => warn!(error = %e, "skipping unparseable transport frame"),
    }
}
