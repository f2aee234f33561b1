//! crates/clinic_core/src/admin.rs
//!
//! The admin gate and the record management panel behind it.
//!
//! The gate is a single shared password. It only controls what the panel
//! shows; it is not a security boundary.

use crate::appointments::AppointmentBook;
use crate::catalog::ADMIN_INCORRECT_PASSWORD;
use crate::domain::Appointment;
use crate::ports::PortError;
use std::sync::Arc;

pub const DEFAULT_ADMIN_PASSWORD: &str = "admin";

#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    #[error("{}", ADMIN_INCORRECT_PASSWORD)]
    IncorrectPassword,
    #[error("Deletion was not confirmed")]
    NotConfirmed,
    #[error(transparent)]
    Port(#[from] PortError),
}

/// Checks a candidate against the shared staff credential.
pub trait CredentialVerifier: Send + Sync {
    fn verify(&self, candidate: &str) -> bool;
}

/// The answer to "Are you sure you want to delete this appointment?".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Confirmed,
    Declined,
}

impl From<bool> for Confirmation {
    fn from(confirmed: bool) -> Self {
        if confirmed {
            Confirmation::Confirmed
        } else {
            Confirmation::Declined
        }
    }
}

#[derive(Clone)]
pub struct AdminGate {
    verifier: Arc<dyn CredentialVerifier>,
    book: AppointmentBook,
}

impl AdminGate {
    pub fn new(verifier: Arc<dyn CredentialVerifier>, book: AppointmentBook) -> Self {
        Self { verifier, book }
    }

    /// Opens the panel and loads the full collection. No lockout on failure.
    pub async fn login(&self, password: &str) -> Result<AdminPanel, AdminError> {
        if !self.verifier.verify(password) {
            return Err(AdminError::IncorrectPassword);
        }
        let mut panel = AdminPanel {
            book: self.book.clone(),
            appointments: Vec::new(),
        };
        panel.refresh().await?;
        Ok(panel)
    }
}

/// The logged-in view over all booking records.
pub struct AdminPanel {
    book: AppointmentBook,
    appointments: Vec<Appointment>,
}

impl AdminPanel {
    pub fn appointments(&self) -> &[Appointment] {
        &self.appointments
    }

    /// Re-reads the collection from storage.
    pub async fn refresh(&mut self) -> Result<&[Appointment], AdminError> {
        self.appointments = self.book.load().await?;
        Ok(&self.appointments)
    }

    pub async fn toggle_status(&mut self, id: &str) -> Result<Appointment, AdminError> {
        let updated = self.book.toggle_status(id).await?;
        self.refresh().await?;
        Ok(updated)
    }

    /// Removes one record once the deletion is confirmed. Returns whether a
    /// record was removed; an unknown id is a no-op.
    pub async fn delete(&mut self, id: &str, confirmation: Confirmation) -> Result<bool, AdminError> {
        if confirmation == Confirmation::Declined {
            return Err(AdminError::NotConfirmed);
        }
        let removed = self.book.delete(id).await?;
        self.refresh().await?;
        Ok(removed)
    }
}
