//! services/api/src/web/ws_handler.rs
//!
//! This is the main entry point and control loop for a WebSocket connection.
//! One connection hosts one page: the loop applies the page's input to its
//! booking form and chat widget, and relays bus notifications back to it.

use crate::web::{
    chat_task::ChatTurn,
    protocol::{ClientMessage, FormSnapshot, ServerMessage},
    state::{AppState, PageState},
};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use clinic_core::{booking_form::BookingError, events::ClinicEvent};
use futures::{
    stream::{SplitSink, StreamExt},
    SinkExt,
};
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{error, info, warn};

/// The handler for upgrading HTTP requests to WebSocket connections.
pub async fn ws_handler(ws: WebSocketUpgrade, State(app_state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, app_state))
}

async fn handle_socket(socket: WebSocket, app_state: Arc<AppState>) {
    info!("New WebSocket connection established.");

    let (sender, mut receiver) = socket.split();
    let (outbox, outbox_rx) = mpsc::unbounded_channel::<ServerMessage>();
    let writer = tokio::spawn(write_outbox(sender, outbox_rx));

    // --- 1. Initialization Phase ---
    let language = match receiver.next().await {
        Some(Ok(Message::Text(init_json))) => {
            match serde_json::from_str::<ClientMessage>(init_json.as_str()) {
                Ok(ClientMessage::Init { language }) => Some(language),
                _ => {
                    error!("First message was not a valid Init message.");
                    let _ = outbox.send(ServerMessage::Error {
                        message: "Expected an init message.".to_string(),
                    });
                    None
                }
            }
        }
        _ => {
            error!("Client disconnected before sending Init message.");
            None
        }
    };

    let page = match language.map(|language| PageState::new(&app_state, language)) {
        Some(Ok(page)) => Some(page),
        Some(Err(e)) => {
            error!("Failed to set up the page: {:?}", e);
            let _ = outbox.send(ServerMessage::Error {
                message: "The assistant is unavailable right now.".to_string(),
            });
            None
        }
        None => None,
    };

    if let Some(mut page) = page {
        run_page(&mut receiver, &app_state, &mut page, &outbox).await;
    }

    // --- 3. Cleanup ---
    drop(outbox);
    if let Err(e) = writer.await {
        error!("Socket writer ended abnormally: {:?}", e);
    }
    info!("WebSocket connection closed.");
}

/// Mounts the page and runs its message loop until the client goes away.
async fn run_page(
    receiver: &mut futures::stream::SplitStream<WebSocket>,
    app_state: &Arc<AppState>,
    page: &mut PageState,
    outbox: &UnboundedSender<ServerMessage>,
) {
    let (events_tx, mut events_rx) = mpsc::unbounded_channel::<ClinicEvent>();
    let page_subscription = {
        let events_tx = events_tx.clone();
        page.page_bus.subscribe(move |event| {
            let _ = events_tx.send(event.clone());
        })
    };
    let app_subscription = app_state.bus.subscribe(move |event| {
        if *event == ClinicEvent::AppointmentsUpdated {
            let _ = events_tx.send(event.clone());
        }
    });

    refresh_pending_count(app_state, page).await;
    let initialized = {
        let form = page.form.lock().await;
        let chat = page.chat.lock().await;
        ServerMessage::PageInitialized {
            pending_count: page.pending_count,
            form: FormSnapshot::of(&form, page.language),
            transcript: chat.messages().to_vec(),
        }
    };
    let _ = outbox.send(initialized);
    info!(language = ?page.language, "Page mounted.");

    // --- 2. Main Message Loop ---
    let mut chat_turn: Option<ChatTurn> = None;
    loop {
        tokio::select! {
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    handle_text_message(text.as_str(), app_state, page, outbox, &mut chat_turn).await;
                }
                Some(Ok(Message::Close(_))) => {
                    info!("Client sent close message.");
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!("WebSocket receive failed: {}", e);
                    break;
                }
                None => {
                    info!("Client disconnected.");
                    break;
                }
            },
            Some(event) = events_rx.recv() => {
                handle_event(event, app_state, page, outbox).await;
            }
        }
    }

    if let Some(turn) = chat_turn.take() {
        turn.stop().await;
    }
    drop(page_subscription);
    drop(app_subscription);
}

/// Serializes queued messages onto the socket until every sender is gone.
async fn write_outbox(
    mut sender: SplitSink<WebSocket, Message>,
    mut outbox: UnboundedReceiver<ServerMessage>,
) {
    while let Some(message) = outbox.recv().await {
        let json = match serde_json::to_string(&message) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize server message: {}", e);
                continue;
            }
        };
        if sender.send(Message::Text(json.into())).await.is_err() {
            warn!("Client went away; dropping outbound messages.");
            break;
        }
    }
    let _ = sender.close().await;
}

/// Helper function to handle the logic for different `ClientMessage` variants.
async fn handle_text_message(
    text: &str,
    app_state: &Arc<AppState>,
    page: &mut PageState,
    outbox: &UnboundedSender<ServerMessage>,
    chat_turn: &mut Option<ChatTurn>,
) {
    let client_msg = match serde_json::from_str::<ClientMessage>(text) {
        Ok(client_msg) => client_msg,
        Err(e) => {
            warn!("Failed to deserialize client message: {}", e);
            return;
        }
    };

    match client_msg {
        ClientMessage::Init { .. } => {
            warn!("Received subsequent Init message, which is ignored.");
        }
        ClientMessage::SetLanguage { language } => {
            page.language = language;
            // The widget stays locked while a reply streams.
            let chat = page.chat.clone();
            tokio::spawn(async move {
                chat.lock().await.set_language(language);
            });
            send_form_state(page, outbox).await;
        }
        ClientMessage::UpdateField { field, value } => {
            page.form.lock().await.set_field(field, value);
        }
        ClientMessage::SubmitBooking => submit_booking(app_state, page, outbox).await,
        ClientMessage::BookAnother => {
            page.form.lock().await.book_another();
            send_form_state(page, outbox).await;
        }
        ClientMessage::SelectDoctor { doctor } => {
            page.page_bus.publish(ClinicEvent::SelectDoctor(doctor));
        }
        ClientMessage::BookNow => page.page_bus.publish(ClinicEvent::BookNow),
        ClientMessage::OpenChat => {
            if chat_turn.as_ref().is_some_and(ChatTurn::is_running) {
                return;
            }
            page.chat.lock().await.open();
            let _ = outbox.send(ServerMessage::ChatOpened);
        }
        ClientMessage::CloseChat => {
            if let Some(turn) = chat_turn.take() {
                turn.stop().await;
            }
            page.chat.lock().await.close();
            let _ = outbox.send(ServerMessage::ChatClosed);
        }
        ClientMessage::SendChat { text } => {
            if chat_turn.as_ref().is_some_and(ChatTurn::is_running) {
                warn!("Chat message received while a reply is streaming; ignoring.");
                return;
            }
            *chat_turn = Some(ChatTurn::spawn(
                page.chat.clone(),
                page.chat_session.clone(),
                outbox.clone(),
                text,
            ));
        }
    }
}

/// Stores the record, then shows the confirmation once the submit latency
/// has passed.
async fn submit_booking(
    app_state: &Arc<AppState>,
    page: &PageState,
    outbox: &UnboundedSender<ServerMessage>,
) {
    let mut form = page.form.lock().await;
    match form.submit(&app_state.book).await {
        Ok(appointment) => {
            info!(id = %appointment.id, "Appointment stored.");
            let _ = outbox.send(ServerMessage::FormState(FormSnapshot::of(&form, page.language)));

            let form_lock = page.form.clone();
            let outbox = outbox.clone();
            let latency = app_state.config.submit_latency;
            let language = page.language;
            tokio::spawn(async move {
                tokio::time::sleep(latency).await;
                let mut form = form_lock.lock().await;
                if form.finish_submit() {
                    let _ = outbox.send(ServerMessage::FormState(FormSnapshot::of(&form, language)));
                }
            });
        }
        Err(BookingError::MissingFields(missing)) => {
            let _ = outbox.send(ServerMessage::BookingInvalid { missing });
        }
        Err(BookingError::AlreadySubmitting) => {
            warn!("Submit received while a submission is pending; ignoring.");
        }
        Err(BookingError::NotEditable) => {
            warn!("Submit received for a confirmed booking; ignoring.");
            let _ = outbox.send(ServerMessage::FormState(FormSnapshot::of(&form, page.language)));
        }
        Err(e @ BookingError::Storage(_)) => {
            error!("Failed to store appointment: {}", e);
            let _ = outbox.send(ServerMessage::FormState(FormSnapshot::of(&form, page.language)));
            let _ = outbox.send(ServerMessage::Error {
                message: e.to_string(),
            });
        }
    }
}

async fn handle_event(
    event: ClinicEvent,
    app_state: &Arc<AppState>,
    page: &mut PageState,
    outbox: &UnboundedSender<ServerMessage>,
) {
    match event {
        ClinicEvent::AppointmentsUpdated => {
            refresh_pending_count(app_state, page).await;
            let _ = outbox.send(ServerMessage::PendingCount {
                count: page.pending_count,
            });
        }
        event => {
            let changed = page.form.lock().await.handle_event(&event);
            if changed {
                send_form_state(page, outbox).await;
            }
        }
    }
}

/// Recounts pending records. An unreadable collection shows as zero.
async fn refresh_pending_count(app_state: &AppState, page: &mut PageState) {
    page.pending_count = match app_state.book.pending_count().await {
        Ok(count) => count,
        Err(e) => {
            warn!("Failed to count pending appointments: {}", e);
            0
        }
    };
}

async fn send_form_state(page: &PageState, outbox: &UnboundedSender<ServerMessage>) {
    let form = page.form.lock().await;
    let _ = outbox.send(ServerMessage::FormState(FormSnapshot::of(&form, page.language)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::web::state::test_support;
    use clinic_core::{
        appointments::APPOINTMENTS_KEY,
        booking_form::FormStatus,
        domain::{ChatRole, Language},
        memory::InMemoryStorage,
        ports::KeyValueStorage,
    };

    struct Harness {
        app_state: Arc<AppState>,
        page: PageState,
        outbox: UnboundedSender<ServerMessage>,
        rx: UnboundedReceiver<ServerMessage>,
        chat_turn: Option<ChatTurn>,
    }

    impl Harness {
        fn new() -> Self {
            Self::with_state(test_support::app_state())
        }

        /// A page whose stored collection is not valid JSON.
        async fn corrupted() -> Self {
            let storage = InMemoryStorage::new();
            storage.set_item(APPOINTMENTS_KEY, "{not json").await.unwrap();
            Self::with_state(test_support::app_state_with(Arc::new(storage)))
        }

        fn with_state(app_state: Arc<AppState>) -> Self {
            let page = PageState::new(&app_state, Language::En).unwrap();
            let (outbox, rx) = mpsc::unbounded_channel();
            Self {
                app_state,
                page,
                outbox,
                rx,
                chat_turn: None,
            }
        }

        async fn send(&mut self, json: &str) {
            handle_text_message(
                json,
                &self.app_state,
                &mut self.page,
                &self.outbox,
                &mut self.chat_turn,
            )
            .await;
        }

        async fn fill_form(&mut self) {
            self.send(r#"{"type":"update_field","field":"name","value":"Zhang Min"}"#).await;
            self.send(r#"{"type":"update_field","field":"phone","value":"123"}"#).await;
            self.send(r#"{"type":"update_field","field":"date","value":"2024-06-01"}"#).await;
        }

        async fn next_form_state(&mut self) -> FormSnapshot {
            loop {
                if let ServerMessage::FormState(snapshot) = self.rx.recv().await.unwrap() {
                    return snapshot;
                }
            }
        }
    }

    #[tokio::test]
    async fn blank_required_fields_are_reported() {
        let mut h = Harness::new();
        h.send(r#"{"type":"update_field","field":"name","value":"Zhang Min"}"#).await;
        h.send(r#"{"type":"submit_booking"}"#).await;

        let msg = h.rx.recv().await.unwrap();
        assert!(matches!(msg, ServerMessage::BookingInvalid { ref missing } if missing.len() == 2));
        assert_eq!(h.app_state.book.load().await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn submit_stores_the_record_then_confirms() {
        let mut h = Harness::new();
        h.fill_form().await;
        h.send(r#"{"type":"submit_booking"}"#).await;

        assert_eq!(h.next_form_state().await.status, FormStatus::Submitting);
        let confirmed = h.next_form_state().await;
        assert_eq!(confirmed.status, FormStatus::Success);
        assert!(confirmed.success_message.unwrap().contains("Zhang Min"));
        assert_eq!(h.app_state.book.pending_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn store_change_refreshes_the_badge() {
        let mut h = Harness::new();
        h.fill_form().await;
        h.send(r#"{"type":"submit_booking"}"#).await;

        handle_event(
            ClinicEvent::AppointmentsUpdated,
            &h.app_state,
            &mut h.page,
            &h.outbox,
        )
        .await;
        let badge = loop {
            if let ServerMessage::PendingCount { count } = h.rx.recv().await.unwrap() {
                break count;
            }
        };
        assert_eq!(badge, 1);
    }

    #[tokio::test]
    async fn selecting_a_doctor_prefills_the_form() {
        let mut h = Harness::new();
        handle_event(
            ClinicEvent::SelectDoctor("Dr. Li Wei".to_string()),
            &h.app_state,
            &mut h.page,
            &h.outbox,
        )
        .await;

        let snapshot = h.next_form_state().await;
        assert_eq!(snapshot.fields.doctor, "Dr. Li Wei");
        assert_eq!(snapshot.status, FormStatus::Idle);
    }

    #[tokio::test]
    async fn chat_replies_stream_back_to_the_page() {
        let mut h = Harness::new();
        h.send(r#"{"type":"open_chat"}"#).await;
        assert_eq!(h.rx.recv().await.unwrap(), ServerMessage::ChatOpened);

        h.send(r#"{"type":"send_chat","text":"Hi"}"#).await;
        let sealed_text = loop {
            if let ServerMessage::ChatMessageUpdated { text, .. } = h.rx.recv().await.unwrap() {
                if text == "Hello there" {
                    break text;
                }
            }
        };
        assert_eq!(sealed_text, "Hello there");

        h.send(r#"{"type":"close_chat"}"#).await;
        let chat = h.page.chat.lock().await;
        assert!(!chat.is_open());
        assert_eq!(chat.messages().last().unwrap().text, "Hello there");
    }

    #[tokio::test]
    async fn second_submit_after_confirmation_stores_nothing() {
        let mut h = Harness::new();
        h.fill_form().await;
        h.send(r#"{"type":"submit_booking"}"#).await;
        assert_eq!(h.next_form_state().await.status, FormStatus::Submitting);
        assert_eq!(h.next_form_state().await.status, FormStatus::Success);

        h.send(r#"{"type":"submit_booking"}"#).await;
        assert_eq!(h.next_form_state().await.status, FormStatus::Success);
        assert_eq!(h.app_state.book.load().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn corrupted_store_puts_the_form_in_error() {
        let mut h = Harness::corrupted().await;
        h.fill_form().await;
        h.send(r#"{"type":"submit_booking"}"#).await;

        assert_eq!(h.next_form_state().await.status, FormStatus::Error);
        match h.rx.recv().await.unwrap() {
            ServerMessage::Error { message } => assert!(message.contains("corrupted")),
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[tokio::test]
    async fn corrupted_store_shows_an_empty_badge() {
        let mut h = Harness::corrupted().await;
        h.page.pending_count = 3;

        handle_event(
            ClinicEvent::AppointmentsUpdated,
            &h.app_state,
            &mut h.page,
            &h.outbox,
        )
        .await;
        assert_eq!(h.rx.recv().await.unwrap(), ServerMessage::PendingCount { count: 0 });
    }

    #[tokio::test]
    async fn second_send_while_streaming_appends_nothing() {
        let mut h = Harness::new();
        h.send(r#"{"type":"open_chat"}"#).await;
        h.send(r#"{"type":"send_chat","text":"first"}"#).await;
        h.send(r#"{"type":"send_chat","text":"second"}"#).await;

        while h.chat_turn.as_ref().is_some_and(ChatTurn::is_running) {
            tokio::task::yield_now().await;
        }

        let chat = h.page.chat.lock().await;
        let users: Vec<&str> = chat
            .messages()
            .iter()
            .filter(|m| m.role == ChatRole::User)
            .map(|m| m.text.as_str())
            .collect();
        assert_eq!(users, vec!["first"]);
        assert_eq!(chat.messages().len(), 3);
    }
}
