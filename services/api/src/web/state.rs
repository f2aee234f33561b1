//! services/api/src/web/state.rs
//!
//! Defines the application's shared state and the per-page state hosted by a
//! single WebSocket connection.

use crate::config::Config;
use clinic_core::{
    admin::{AdminGate, AdminPanel, CredentialVerifier},
    appointments::AppointmentBook,
    booking_form::BookingForm,
    chat::ChatWidget,
    domain::Language,
    events::NotificationBus,
    ports::{ChatSession, ChatSessionFactory, KeyValueStorage, PortResult},
};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// How long an admin login stays valid, in hours.
pub const ADMIN_SESSION_TTL_HOURS: i64 = 8;

/// A logged-in admin panel and when its cookie stops being honored.
pub struct AdminSession {
    pub panel: AdminPanel,
    pub expires_at: DateTime<Utc>,
}

impl AdminSession {
    pub fn new(panel: AdminPanel) -> Self {
        Self {
            panel,
            expires_at: Utc::now() + Duration::hours(ADMIN_SESSION_TTL_HOURS),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

//=========================================================================================
// AppState (Shared Across All Connections)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
pub struct AppState {
    pub config: Arc<Config>,
    /// Carries `AppointmentsUpdated` to every mounted page and admin panel.
    pub bus: NotificationBus,
    pub book: AppointmentBook,
    pub admin_gate: AdminGate,
    /// Logged-in admin panels keyed by their session cookie.
    pub admin_sessions: Mutex<HashMap<String, AdminSession>>,
    pub chat_sessions: Arc<dyn ChatSessionFactory>,
}

impl AppState {
    pub fn new(
        config: Arc<Config>,
        storage: Arc<dyn KeyValueStorage>,
        verifier: Arc<dyn CredentialVerifier>,
        chat_sessions: Arc<dyn ChatSessionFactory>,
    ) -> Self {
        let bus = NotificationBus::new();
        let book = AppointmentBook::new(storage, bus.clone());
        let admin_gate = AdminGate::new(verifier, book.clone());
        Self {
            config,
            bus,
            book,
            admin_gate,
            admin_sessions: Mutex::new(HashMap::new()),
            chat_sessions,
        }
    }
}

//=========================================================================================
// PageState (Specific to One WebSocket Connection)
//=========================================================================================

/// Everything one open page owns: its form, chat widget, badge and the bus
/// its sections use to talk to each other.
pub struct PageState {
    pub language: Language,
    pub form: Arc<Mutex<BookingForm>>,
    pub chat: Arc<Mutex<ChatWidget>>,
    /// Created when the page mounts; lives as long as the connection.
    pub chat_session: Arc<dyn ChatSession>,
    /// Page-local notifications (`SelectDoctor`, `BookNow`).
    pub page_bus: NotificationBus,
    pub pending_count: usize,
}

impl PageState {
    pub fn new(app_state: &AppState, language: Language) -> PortResult<Self> {
        Ok(Self {
            language,
            form: Arc::new(Mutex::new(BookingForm::new())),
            chat: Arc::new(Mutex::new(ChatWidget::new(language))),
            chat_session: app_state.chat_sessions.create_session()?,
            page_bus: NotificationBus::new(),
            pending_count: 0,
        })
    }
}
