pub mod admin;
pub mod appointments;
pub mod booking_form;
pub mod catalog;
pub mod chat;
pub mod domain;
pub mod events;
pub mod memory;
pub mod ports;

pub use admin::{AdminError, AdminGate, AdminPanel, Confirmation, CredentialVerifier};
pub use appointments::{pending_count, AppointmentBook, APPOINTMENTS_KEY};
pub use booking_form::{BookingError, BookingField, BookingForm, FormStatus, SUBMIT_LATENCY};
pub use chat::{ChatWidget, SendOutcome, TranscriptView};
pub use domain::{
    Appointment, AppointmentStatus, BookingFields, ChatMessage, ChatRole, Language, LocalizedString,
};
pub use events::{ClinicEvent, NotificationBus, Subscription};
pub use memory::InMemoryStorage;
pub use ports::{ChatSession, ChatSessionFactory, FragmentStream, KeyValueStorage, PortError, PortResult};
