//! crates/clinic_core/src/domain.rs
//!
//! Defines the core data structures for the clinic: booking records, chat
//! messages and the static catalog types.
//!
//! Booking records derive `serde` because their JSON layout *is* the persisted
//! format (camelCase keys, lowercase status strings).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

//=========================================================================================
// Booking Records
//=========================================================================================

/// The two-valued follow-up status of a booking record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Pending,
    Contacted,
}

impl AppointmentStatus {
    /// Returns the other status value.
    pub fn toggled(self) -> Self {
        match self {
            AppointmentStatus::Pending => AppointmentStatus::Contacted,
            AppointmentStatus::Contacted => AppointmentStatus::Pending,
        }
    }
}

/// A single booking entry as stored in the collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: String,
    pub name: String,
    pub phone: String,
    pub date: String,
    pub service: String,
    /// Empty when the patient did not pick a doctor.
    #[serde(default)]
    pub doctor: String,
    #[serde(default)]
    pub notes: String,
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
}

/// The patient-entered fields of the booking form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingFields {
    pub name: String,
    pub phone: String,
    pub date: String,
    pub service: String,
    pub doctor: String,
    pub notes: String,
}

//=========================================================================================
// Chat Messages
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Model,
}

/// One turn in the chat transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub role: ChatRole,
    pub text: String,
    pub is_streaming: bool,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: ChatRole::User,
            text: text.into(),
            is_streaming: false,
        }
    }

    /// An empty model turn that will be filled by a reply stream.
    pub fn placeholder() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: ChatRole::Model,
            text: String::new(),
            is_streaming: true,
        }
    }

    pub fn model(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: ChatRole::Model,
            text: text.into(),
            is_streaming: false,
        }
    }
}

//=========================================================================================
// Localization and Catalog
//=========================================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Zh,
}

/// A human-readable string carried in both site languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalizedString {
    pub en: &'static str,
    pub zh: &'static str,
}

impl LocalizedString {
    pub const fn new(en: &'static str, zh: &'static str) -> Self {
        Self { en, zh }
    }

    pub fn get(&self, language: Language) -> &'static str {
        match language {
            Language::En => self.en,
            Language::Zh => self.zh,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClinicInfo {
    pub name: &'static str,
    pub chinese_name: &'static str,
    pub address: LocalizedString,
    pub phone: &'static str,
    pub email: &'static str,
    pub opening_hours: LocalizedString,
}

/// A treatment offered by the clinic.
#[derive(Debug, Clone)]
pub struct Service {
    pub id: &'static str,
    pub title: LocalizedString,
    pub description: LocalizedString,
    pub icon: &'static str,
    pub price_start: &'static str,
}

#[derive(Debug, Clone)]
pub struct Doctor {
    pub id: &'static str,
    pub name: LocalizedString,
    pub title: LocalizedString,
    pub specialty: LocalizedString,
    pub image: &'static str,
    pub experience: LocalizedString,
    pub bio: LocalizedString,
    pub education: LocalizedString,
}

#[derive(Debug, Clone)]
pub struct Testimonial {
    pub id: &'static str,
    pub name: LocalizedString,
    pub comment: LocalizedString,
    pub rating: u8,
}
