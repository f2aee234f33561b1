//! services/api/src/web/protocol.rs
//!
//! Defines the WebSocket message protocol between the browser page and the API
//! server. One connection hosts one page: its booking form, chat widget and
//! pending badge.

use clinic_core::{
    booking_form::{BookingField, BookingForm, FormStatus},
    domain::{BookingFields, ChatMessage, Language},
};
use serde::{Deserialize, Serialize};

//=========================================================================================
// Messages Sent FROM the Client (Browser) TO the Server
//=========================================================================================

/// Represents the structured text messages a client can send to the server.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Mounts the page. This must be the first message sent on the connection.
    Init {
        #[serde(default, alias = "lang")]
        language: Language,
    },

    /// Switches the language used for messages the server generates.
    SetLanguage {
        #[serde(alias = "lang")]
        language: Language,
    },

    /// The user edited one form input.
    UpdateField { field: BookingField, value: String },

    /// The booking form was submitted.
    SubmitBooking,

    /// "Book another" on the confirmation screen.
    BookAnother,

    /// "Book visit" on a doctor card.
    SelectDoctor { doctor: String },

    /// A general "Book now" call to action.
    BookNow,

    OpenChat,

    /// Closing the panel also stops any reply still streaming.
    CloseChat,

    SendChat { text: String },
}

//=========================================================================================
// Messages Sent FROM the Server TO the Client (Browser)
//=========================================================================================

/// Represents the structured text messages the server can send to the client.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Confirms the page is mounted and carries its initial state.
    PageInitialized {
        pending_count: usize,
        form: FormSnapshot,
        transcript: Vec<ChatMessage>,
    },

    /// The booking form's current state.
    FormState(FormSnapshot),

    /// A submit was rejected because required inputs are blank.
    BookingInvalid { missing: Vec<BookingField> },

    ChatOpened,
    ChatClosed,
    ChatMessageAppended { message: ChatMessage },

    /// Replaces the text of a message that is still streaming.
    ChatMessageUpdated { id: String, text: String },

    ChatMessageSealed { id: String },

    /// Sent after every transcript change.
    ScrollToLatest,

    /// The pending-records badge.
    PendingCount { count: usize },

    /// Reports an error the page should display.
    Error { message: String },
}

/// A serializable view of the booking form.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct FormSnapshot {
    pub status: FormStatus,
    pub fields: BookingFields,
    pub success_message: Option<String>,
}

impl FormSnapshot {
    pub fn of(form: &BookingForm, language: Language) -> Self {
        Self {
            status: form.status(),
            fields: form.fields().clone(),
            success_message: form.success_message(language),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_messages_are_tagged_by_type() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"update_field","field":"phone","value":"123"}"#).unwrap();
        assert_eq!(
            msg,
            ClientMessage::UpdateField {
                field: BookingField::Phone,
                value: "123".to_string()
            }
        );

        let init: ClientMessage = serde_json::from_str(r#"{"type":"init"}"#).unwrap();
        assert_eq!(init, ClientMessage::Init { language: Language::En });

        let zh: ClientMessage = serde_json::from_str(r#"{"type":"init","lang":"zh"}"#).unwrap();
        assert_eq!(zh, ClientMessage::Init { language: Language::Zh });
    }

    #[test]
    fn form_state_flattens_the_snapshot() {
        let msg = ServerMessage::FormState(FormSnapshot::of(&BookingForm::new(), Language::En));
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["type"], "form_state");
        assert_eq!(value["status"], "idle");
        assert!(value["success_message"].is_null());
    }
}
