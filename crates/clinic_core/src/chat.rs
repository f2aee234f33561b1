//! crates/clinic_core/src/chat.rs
//!
//! The chat widget: a transcript of user and model turns, and the loop that
//! consumes a streamed reply into a placeholder message.
//!
//! At most one message carries `is_streaming` at a time: the placeholder of
//! the turn currently being received.

use crate::catalog::{CHAT_APOLOGY, CHAT_GREETING};
use crate::domain::{ChatMessage, Language};
use crate::ports::{ChatSession, PortError, PortResult};
use futures::StreamExt;

/// Where transcript mutations are rendered.
///
/// `scroll_to_latest` follows every mutation.
pub trait TranscriptView: Send {
    fn message_appended(&mut self, message: &ChatMessage);
    fn message_updated(&mut self, id: &str, text: &str);
    fn message_sealed(&mut self, id: &str);
    fn scroll_to_latest(&mut self);
}

#[derive(Debug)]
pub enum SendOutcome {
    /// Blank input, or another send was still in flight.
    Ignored,
    Completed,
    /// The apology was appended in place of a reply.
    Failed(PortError),
}

/// A turn that has been appended and is waiting for its reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTurn {
    pub prompt: String,
    pub reply_id: String,
}

#[derive(Debug, Clone)]
pub struct ChatWidget {
    language: Language,
    messages: Vec<ChatMessage>,
    is_loading: bool,
    is_open: bool,
}

impl ChatWidget {
    /// A closed widget holding only the greeting.
    pub fn new(language: Language) -> Self {
        Self {
            language,
            messages: vec![ChatMessage::model("init", CHAT_GREETING.get(language))],
            is_loading: false,
            is_open: false,
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    pub fn set_language(&mut self, language: Language) {
        self.language = language;
    }

    pub fn open(&mut self) {
        self.is_open = true;
    }

    /// Closes the panel. The caller is responsible for dropping any in-flight
    /// reply stream and then calling `interrupt`.
    pub fn close(&mut self) {
        self.is_open = false;
    }

    /// Sends `text` and consumes the whole reply.
    pub async fn send(
        &mut self,
        text: &str,
        session: &dyn ChatSession,
        view: &mut dyn TranscriptView,
    ) -> SendOutcome {
        let Some(turn) = self.begin_send(text, view) else {
            return SendOutcome::Ignored;
        };

        match self.receive_reply(&turn, session, view).await {
            Ok(()) => {
                self.seal(&turn.reply_id, view);
                SendOutcome::Completed
            }
            Err(e) => {
                self.fail(&turn.reply_id, view);
                SendOutcome::Failed(e)
            }
        }
    }

    /// Appends the user turn and an empty streaming placeholder.
    ///
    /// Returns `None`, without touching the transcript, for blank input or
    /// while a previous turn is still loading.
    pub fn begin_send(&mut self, text: &str, view: &mut dyn TranscriptView) -> Option<PendingTurn> {
        if text.trim().is_empty() || self.is_loading {
            return None;
        }
        self.is_loading = true;

        let user = ChatMessage::user(text);
        self.append(user, view);

        let placeholder = ChatMessage::placeholder();
        let reply_id = placeholder.id.clone();
        self.append(placeholder, view);

        Some(PendingTurn {
            prompt: text.to_string(),
            reply_id,
        })
    }

    /// Stops waiting for the current reply: the placeholder keeps whatever
    /// text it has and is sealed.
    pub fn interrupt(&mut self, view: &mut dyn TranscriptView) {
        let streaming: Vec<String> = self
            .messages
            .iter()
            .filter(|m| m.is_streaming)
            .map(|m| m.id.clone())
            .collect();
        for id in streaming {
            self.seal(&id, view);
        }
        self.is_loading = false;
    }

    async fn receive_reply(
        &mut self,
        turn: &PendingTurn,
        session: &dyn ChatSession,
        view: &mut dyn TranscriptView,
    ) -> PortResult<()> {
        let mut fragments = session.send_message_stream(&turn.prompt).await?;
        let mut reply = String::new();
        while let Some(fragment) = fragments.next().await {
            reply.push_str(&fragment?);
            self.replace_text(&turn.reply_id, &reply, view);
        }
        Ok(())
    }

    fn append(&mut self, message: ChatMessage, view: &mut dyn TranscriptView) {
        view.message_appended(&message);
        self.messages.push(message);
        view.scroll_to_latest();
    }

    fn replace_text(&mut self, id: &str, text: &str, view: &mut dyn TranscriptView) {
        if let Some(message) = self.messages.iter_mut().find(|m| m.id == id) {
            message.text = text.to_string();
            view.message_updated(id, text);
            view.scroll_to_latest();
        }
    }

    fn seal(&mut self, id: &str, view: &mut dyn TranscriptView) {
        if let Some(message) = self.messages.iter_mut().find(|m| m.id == id) {
            message.is_streaming = false;
            view.message_sealed(id);
            view.scroll_to_latest();
        }
        self.is_loading = false;
    }

    fn fail(&mut self, reply_id: &str, view: &mut dyn TranscriptView) {
        self.seal(reply_id, view);
        let apology = ChatMessage::model(uuid::Uuid::new_v4().to_string(), CHAT_APOLOGY.get(self.language));
        self.append(apology, view);
    }
}
