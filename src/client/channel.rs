//! Client session on the realtime channel.
//!
//! A [`TeamChannel`] is an explicitly owned connection handle: opened on
//! team selection, closed on team switch or view teardown, and injected
//! into whatever needs it rather than living as an ambient singleton. Chat
//! sends are fire-and-forget; the sender sees its own message when the
//! server echoes it back, so every participant renders through one path.

use super::api::ClientError;
use crate::ws::protocol::{ChannelEvent, ChatMessage, PresenceUser};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};
use uuid::Uuid;

/// How long after the last composer keystroke a `stop typing` goes out.
pub const TYPING_STOP_DELAY: Duration = Duration::from_secs(2);

/// Everything received so far on the channel.
#[derive(Debug, Default)]
struct ChannelState {
    /// Chat messages in arrival order (no cross-sender ordering guarantee)
    messages: Vec<ChatMessage>,
    /// Users currently typing, de-duplicated by user id
    typing: Vec<PresenceUser>,
}

/// One client's connection to a team's realtime channel.
pub struct TeamChannel {
    identity: PresenceUser,
    outgoing: mpsc::Sender<Message>,
    state: Arc<Mutex<ChannelState>>,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
    /// Armed while the composer is live; rearmed on every keystroke
    stop_timer: Option<JoinHandle<()>>,
}

impl TeamChannel {
    /// Connect to `{server}/ws/team/{team_id}` and start the read/write
    /// tasks. `server` is a ws:// base URL.
    pub async fn connect(
        server: &str,
        team_id: &str,
        identity: PresenceUser,
    ) -> Result<Self, ClientError> {
        let url = format!("{}/ws/team/{}", server, team_id);
        let (stream, _) = connect_async(&url)
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;
        let (mut write, mut read) = stream.split();

        let (outgoing, mut outgoing_rx) = mpsc::channel::<Message>(64);
        let writer = tokio::spawn(async move {
            while let Some(msg) = outgoing_rx.recv().await {
                let is_close = matches!(msg, Message::Close(_));
                if let Err(e) = write.send(msg).await {
                    debug!("channel write failed: {}", e);
                    break;
                }
                // A flushed close frame is the writer's last word
                if is_close {
                    break;
                }
            }
        });

        let state = Arc::new(Mutex::new(ChannelState::default()));
        let reader_state = state.clone();
        let reader = tokio::spawn(async move {
            while let Some(msg) = read.next().await {
                let frame = match msg {
                    Ok(Message::Text(frame)) => frame,
                    Ok(Message::Close(_)) | Err(_) => break,
                    Ok(_) => continue,
                };
                let event = match ChannelEvent::from_frame(&frame) {
                    Ok(event) => event,
                    Err(e) => {
                        warn!("ignoring malformed channel frame: {}", e);
                        continue;
                    }
                };
                let mut state = reader_state.lock().await;
                match event {
                    ChannelEvent::Chat(message) => state.messages.push(message),
                    ChannelEvent::Typing(user) => {
                        if !state.typing.iter().any(|u| u.user_id == user.user_id) {
                            state.typing.push(user);
                        }
                    }
                    ChannelEvent::StopTyping(user) => {
                        state.typing.retain(|u| u.user_id != user.user_id);
                    }
                }
            }
        });

        Ok(Self {
            identity,
            outgoing,
            state,
            reader,
            writer,
            stop_timer: None,
        })
    }

    /// Send a chat message. Fire-and-forget: no acknowledgement, and the
    /// message only shows up in [`messages`](Self::messages) once the
    /// server relays it back. Sending also ends any live typing signal.
    pub async fn send_chat(&mut self, text: &str) -> Result<ChatMessage, ClientError> {
        let message = ChatMessage {
            id: Uuid::new_v4().to_string(),
            user_id: self.identity.user_id.clone(),
            display_name: self.identity.display_name.clone(),
            avatar_initials: self.identity.avatar_initials.clone(),
            text: text.to_string(),
            timestamp: chrono::Utc::now().timestamp_millis(),
        };
        if self.stop_timer.take().map(|t| t.abort()).is_some() {
            self.send_event(&ChannelEvent::StopTyping(self.identity.clone()))
                .await?;
        }
        self.send_event(&ChannelEvent::Chat(message.clone())).await?;
        Ok(message)
    }

    /// Signal a composer keystroke: emits `typing` and rearms the local
    /// stop timer, which emits `stop typing` once the composer goes quiet.
    pub async fn composer_keystroke(&mut self) -> Result<(), ClientError> {
        self.send_event(&ChannelEvent::Typing(self.identity.clone()))
            .await?;

        if let Some(timer) = self.stop_timer.take() {
            timer.abort();
        }
        let outgoing = self.outgoing.clone();
        let identity = self.identity.clone();
        self.stop_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(TYPING_STOP_DELAY).await;
            if let Ok(frame) = ChannelEvent::StopTyping(identity).to_frame() {
                let _ = outgoing.send(Message::Text(frame)).await;
            }
        }));
        Ok(())
    }

    /// Chat messages received so far, in arrival order.
    pub async fn messages(&self) -> Vec<ChatMessage> {
        self.state.lock().await.messages.clone()
    }

    /// Users currently typing, as seen by this client.
    pub async fn typing_users(&self) -> Vec<PresenceUser> {
        self.state.lock().await.typing.clone()
    }

    /// Close the connection and stop all tasks. Returns once the writer
    /// has flushed the close frame.
    pub async fn close(mut self) {
        let _ = self.outgoing.send(Message::Close(None)).await;
        let _ = (&mut self.writer).await;
        self.shutdown();
    }

    async fn send_event(&self, event: &ChannelEvent) -> Result<(), ClientError> {
        let frame = event
            .to_frame()
            .map_err(|e| ClientError::Network(e.to_string()))?;
        self.outgoing
            .send(Message::Text(frame))
            .await
            .map_err(|e| ClientError::Network(e.to_string()))
    }

    fn shutdown(&mut self) {
        if let Some(timer) = self.stop_timer.take() {
            timer.abort();
        }
        self.reader.abort();
        self.writer.abort();
    }
}

impl Drop for TeamChannel {
    fn drop(&mut self) {
        self.shutdown();
    }
}
