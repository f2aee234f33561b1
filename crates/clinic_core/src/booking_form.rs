//! crates/clinic_core/src/booking_form.rs
//!
//! The booking form state machine: `Idle -> Submitting -> Success`, back to
//! `Idle` on "book another". A storage failure during submit lands in `Error`.
//!
//! The record is persisted as soon as the submit is accepted; the caller waits
//! `SUBMIT_LATENCY` before calling `finish_submit` so the confirmation does not
//! appear instantly.

use crate::appointments::AppointmentBook;
use crate::catalog::booking_success_message;
use crate::domain::{Appointment, BookingFields, Language};
use crate::events::ClinicEvent;
use crate::ports::PortError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Delay between accepting a submit and showing the confirmation.
pub const SUBMIT_LATENCY: Duration = Duration::from_millis(800);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormStatus {
    Idle,
    Submitting,
    Success,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingField {
    Name,
    Phone,
    Date,
    Service,
    Doctor,
    Notes,
}

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("Missing required fields: {0:?}")]
    MissingFields(Vec<BookingField>),
    #[error("A submission is already in progress")]
    AlreadySubmitting,
    #[error("The booking is confirmed; start a new one first")]
    NotEditable,
    #[error("Could not store the appointment: {0}")]
    Storage(#[from] PortError),
}

#[derive(Debug, Clone)]
pub struct BookingForm {
    fields: BookingFields,
    status: FormStatus,
}

impl Default for BookingForm {
    fn default() -> Self {
        Self::new()
    }
}

impl BookingForm {
    pub fn new() -> Self {
        Self {
            fields: BookingFields::default(),
            status: FormStatus::Idle,
        }
    }

    pub fn fields(&self) -> &BookingFields {
        &self.fields
    }

    pub fn status(&self) -> FormStatus {
        self.status
    }

    pub fn set_field(&mut self, field: BookingField, value: impl Into<String>) {
        let value = value.into();
        match field {
            BookingField::Name => self.fields.name = value,
            BookingField::Phone => self.fields.phone = value,
            BookingField::Date => self.fields.date = value,
            BookingField::Service => self.fields.service = value,
            BookingField::Doctor => self.fields.doctor = value,
            BookingField::Notes => self.fields.notes = value,
        }
    }

    /// Required inputs that are blank: name, phone and date.
    pub fn missing_fields(&self) -> Vec<BookingField> {
        [
            (BookingField::Name, &self.fields.name),
            (BookingField::Phone, &self.fields.phone),
            (BookingField::Date, &self.fields.date),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| field)
        .collect()
    }

    /// Validates, moves to `Submitting` and stores the new record.
    ///
    /// Only `Idle` and `Error` accept a submit. Validation failures leave the
    /// state untouched. A storage failure moves the form to `Error`.
    pub async fn submit(&mut self, book: &AppointmentBook) -> Result<Appointment, BookingError> {
        match self.status {
            FormStatus::Submitting => return Err(BookingError::AlreadySubmitting),
            FormStatus::Success => return Err(BookingError::NotEditable),
            FormStatus::Idle | FormStatus::Error => {}
        }
        let missing = self.missing_fields();
        if !missing.is_empty() {
            return Err(BookingError::MissingFields(missing));
        }

        self.status = FormStatus::Submitting;
        match book.create(&self.fields).await {
            Ok(appointment) => Ok(appointment),
            Err(e) => {
                self.status = FormStatus::Error;
                Err(e.into())
            }
        }
    }

    /// Shows the confirmation. Ignored unless a submit is still pending, so a
    /// reset that arrived during the latency window wins.
    pub fn finish_submit(&mut self) -> bool {
        if self.status != FormStatus::Submitting {
            return false;
        }
        self.status = FormStatus::Success;
        true
    }

    /// "Book another": clear everything and start over.
    pub fn book_another(&mut self) {
        self.fields = BookingFields::default();
        self.status = FormStatus::Idle;
    }

    /// Applies a notification from elsewhere on the page. Returns whether the
    /// form changed.
    pub fn handle_event(&mut self, event: &ClinicEvent) -> bool {
        match event {
            ClinicEvent::SelectDoctor(doctor) => {
                self.fields.doctor = doctor.clone();
                self.status = FormStatus::Idle;
                true
            }
            ClinicEvent::BookNow => {
                if self.status == FormStatus::Success {
                    self.fields = BookingFields::default();
                }
                self.status = FormStatus::Idle;
                true
            }
            ClinicEvent::AppointmentsUpdated => false,
        }
    }

    pub fn success_message(&self, language: Language) -> Option<String> {
        (self.status == FormStatus::Success).then(|| {
            booking_success_message(language, &self.fields.name, &self.fields.date, &self.fields.phone)
        })
    }
}
