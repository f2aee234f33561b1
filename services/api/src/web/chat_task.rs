//! services/api/src/web/chat_task.rs
//!
//! This module contains the asynchronous "worker" responsible for one chat
//! turn: sending the user's text and streaming the reply into the page's
//! transcript. A turn can be stopped early through its `CancellationToken`.

use crate::web::protocol::ServerMessage;
use clinic_core::{
    chat::{ChatWidget, SendOutcome, TranscriptView},
    domain::ChatMessage,
    ports::ChatSession,
};
use std::sync::Arc;
use tokio::{
    sync::{mpsc::UnboundedSender, Mutex},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Renders transcript changes by queueing them for the page's socket.
///
/// Once the page is gone the queue is closed and changes are discarded.
pub struct OutboxView {
    outbox: UnboundedSender<ServerMessage>,
}

impl OutboxView {
    pub fn new(outbox: UnboundedSender<ServerMessage>) -> Self {
        Self { outbox }
    }

    fn push(&self, message: ServerMessage) {
        let _ = self.outbox.send(message);
    }
}

impl TranscriptView for OutboxView {
    fn message_appended(&mut self, message: &ChatMessage) {
        self.push(ServerMessage::ChatMessageAppended {
            message: message.clone(),
        });
    }

    fn message_updated(&mut self, id: &str, text: &str) {
        self.push(ServerMessage::ChatMessageUpdated {
            id: id.to_string(),
            text: text.to_string(),
        });
    }

    fn message_sealed(&mut self, id: &str) {
        self.push(ServerMessage::ChatMessageSealed { id: id.to_string() });
    }

    fn scroll_to_latest(&mut self) {
        self.push(ServerMessage::ScrollToLatest);
    }
}

/// A chat turn running in the background.
pub struct ChatTurn {
    handle: JoinHandle<()>,
    token: CancellationToken,
}

impl ChatTurn {
    pub fn spawn(
        chat: Arc<Mutex<ChatWidget>>,
        session: Arc<dyn ChatSession>,
        outbox: UnboundedSender<ServerMessage>,
        text: String,
    ) -> Self {
        let token = CancellationToken::new();
        let handle = tokio::spawn(chat_process(chat, session, outbox, text, token.clone()));
        Self { handle, token }
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Cancels the turn and waits until it has released the widget.
    pub async fn stop(self) {
        self.token.cancel();
        if let Err(e) = self.handle.await {
            error!("Chat task ended abnormally: {:?}", e);
        }
    }
}

/// Runs one `send` on the widget, or interrupts it when cancelled.
async fn chat_process(
    chat: Arc<Mutex<ChatWidget>>,
    session: Arc<dyn ChatSession>,
    outbox: UnboundedSender<ServerMessage>,
    text: String,
    cancellation_token: CancellationToken,
) {
    let mut chat = chat.lock().await;
    let mut view = OutboxView::new(outbox);

    if !chat.is_open() {
        warn!("Chat message received while the panel is closed; ignoring.");
        return;
    }

    let outcome = tokio::select! {
        outcome = chat.send(&text, session.as_ref(), &mut view) => Some(outcome),
        _ = cancellation_token.cancelled() => None,
    };

    match outcome {
        Some(SendOutcome::Completed) => info!("Chat reply finished streaming."),
        Some(SendOutcome::Ignored) => info!("Chat message ignored (blank or reply in flight)."),
        Some(SendOutcome::Failed(e)) => error!("Chat error: {}", e),
        None => {
            info!("Chat turn cancelled; sealing the partial reply.");
            chat.interrupt(&mut view);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use clinic_core::{
        domain::Language,
        ports::{FragmentStream, PortResult},
    };
    use futures::stream;
    use tokio::sync::mpsc;

    struct HoursSession;

    #[async_trait]
    impl ChatSession for HoursSession {
        async fn send_message_stream(&self, _message: &str) -> PortResult<FragmentStream> {
            let fragments = ["We", " are open", " 9-6."].map(|f| Ok(f.to_string()));
            Ok(Box::pin(stream::iter(fragments)))
        }
    }

    /// Sends one fragment, then never finishes.
    struct StallingSession;

    #[async_trait]
    impl ChatSession for StallingSession {
        async fn send_message_stream(&self, _message: &str) -> PortResult<FragmentStream> {
            let first = stream::iter([Ok("Let me check".to_string())]);
            Ok(Box::pin(futures::StreamExt::chain(first, stream::pending())))
        }
    }

    fn open_widget() -> Arc<Mutex<ChatWidget>> {
        let mut widget = ChatWidget::new(Language::En);
        widget.open();
        Arc::new(Mutex::new(widget))
    }

    async fn next_update(rx: &mut mpsc::UnboundedReceiver<ServerMessage>) -> ServerMessage {
        loop {
            match rx.recv().await.expect("outbox closed") {
                message @ (ServerMessage::ChatMessageUpdated { .. }
                | ServerMessage::ChatMessageSealed { .. }) => return message,
                _ => continue,
            }
        }
    }

    #[tokio::test]
    async fn completed_turn_streams_updates_to_the_outbox() {
        let chat = open_widget();
        let (outbox, mut rx) = mpsc::unbounded_channel();

        let turn = ChatTurn::spawn(
            chat.clone(),
            Arc::new(HoursSession),
            outbox,
            "What are your hours?".to_string(),
        );

        let mut updates = Vec::new();
        loop {
            match next_update(&mut rx).await {
                ServerMessage::ChatMessageUpdated { text, .. } => updates.push(text),
                _ => break,
            }
        }
        while turn.is_running() {
            tokio::task::yield_now().await;
        }
        turn.stop().await;

        assert_eq!(updates, vec!["We", "We are open", "We are open 9-6."]);
        let widget = chat.lock().await;
        let reply = widget.messages().last().unwrap();
        assert_eq!(reply.text, "We are open 9-6.");
        assert!(!reply.is_streaming);
    }

    #[tokio::test]
    async fn stopping_a_stalled_turn_seals_the_partial_reply() {
        let chat = open_widget();
        let (outbox, mut rx) = mpsc::unbounded_channel();

        let turn = ChatTurn::spawn(
            chat.clone(),
            Arc::new(StallingSession),
            outbox,
            "Are you open Sunday?".to_string(),
        );
        assert!(matches!(
            next_update(&mut rx).await,
            ServerMessage::ChatMessageUpdated { .. }
        ));
        assert!(turn.is_running());
        turn.stop().await;

        let widget = chat.lock().await;
        let reply = widget.messages().last().unwrap();
        assert_eq!(reply.text, "Let me check");
        assert!(!reply.is_streaming);
        assert!(!widget.is_loading());
    }
}
