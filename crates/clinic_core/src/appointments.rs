//! crates/clinic_core/src/appointments.rs
//!
//! The persistence shim for booking records. The whole collection lives under
//! a single storage key as a JSON array, newest first, and is rewritten in full
//! on every mutation. Every mutation publishes `AppointmentsUpdated`.
//!
//! Writes are read-modify-write without locking: two writers racing on the
//! same storage silently overwrite each other and the last write wins.

use crate::domain::{Appointment, AppointmentStatus, BookingFields};
use crate::events::{ClinicEvent, NotificationBus};
use crate::ports::{KeyValueStorage, PortError, PortResult};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// The storage key holding the booking collection.
pub const APPOINTMENTS_KEY: &str = "clinic_appointments";

#[derive(Clone)]
pub struct AppointmentBook {
    storage: Arc<dyn KeyValueStorage>,
    bus: NotificationBus,
}

impl AppointmentBook {
    pub fn new(storage: Arc<dyn KeyValueStorage>, bus: NotificationBus) -> Self {
        Self { storage, bus }
    }

    pub fn bus(&self) -> &NotificationBus {
        &self.bus
    }

    /// Reads the full collection. A missing entry is an empty collection; an
    /// entry that does not parse is reported as `CorruptedState`.
    pub async fn load(&self) -> PortResult<Vec<Appointment>> {
        match self.storage.get_item(APPOINTMENTS_KEY).await? {
            None => Ok(Vec::new()),
            Some(raw) => serde_json::from_str(&raw)
                .map_err(|e| PortError::CorruptedState(format!("{}: {}", APPOINTMENTS_KEY, e))),
        }
    }

    /// Builds a pending record from the form fields and stores it first.
    pub async fn create(&self, fields: &BookingFields) -> PortResult<Appointment> {
        let mut appointments = self.load().await?;
        let created_at = Utc::now();
        let appointment = Appointment {
            id: next_id(&appointments, created_at),
            name: fields.name.clone(),
            phone: fields.phone.clone(),
            date: fields.date.clone(),
            service: fields.service.clone(),
            doctor: fields.doctor.clone(),
            notes: fields.notes.clone(),
            status: AppointmentStatus::Pending,
            created_at,
        };
        appointments.insert(0, appointment.clone());
        self.save(&appointments).await?;
        Ok(appointment)
    }

    /// Flips pending/contacted on exactly one record.
    pub async fn toggle_status(&self, id: &str) -> PortResult<Appointment> {
        let mut appointments = self.load().await?;
        let appointment = appointments
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| PortError::NotFound(format!("appointment {}", id)))?;
        appointment.status = appointment.status.toggled();
        let updated = appointment.clone();
        self.save(&appointments).await?;
        Ok(updated)
    }

    /// Removes one record. Returns `false`, and writes nothing, when no record
    /// has that id.
    pub async fn delete(&self, id: &str) -> PortResult<bool> {
        let mut appointments = self.load().await?;
        let before = appointments.len();
        appointments.retain(|a| a.id != id);
        if appointments.len() == before {
            return Ok(false);
        }
        self.save(&appointments).await?;
        Ok(true)
    }

    pub async fn pending_count(&self) -> PortResult<usize> {
        Ok(pending_count(&self.load().await?))
    }

    async fn save(&self, appointments: &[Appointment]) -> PortResult<()> {
        let raw = serde_json::to_string(appointments)
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        self.storage.set_item(APPOINTMENTS_KEY, &raw).await?;
        self.bus.publish(ClinicEvent::AppointmentsUpdated);
        Ok(())
    }
}

/// Number of records still waiting for the clinic to call back.
pub fn pending_count(appointments: &[Appointment]) -> usize {
    appointments
        .iter()
        .filter(|a| a.status == AppointmentStatus::Pending)
        .count()
}

/// Millisecond timestamp token, bumped past any id already in the collection.
fn next_id(existing: &[Appointment], now: DateTime<Utc>) -> String {
    let mut millis = now.timestamp_millis();
    loop {
        let candidate = millis.to_string();
        if !existing.iter().any(|a| a.id == candidate) {
            return candidate;
        }
        millis += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryStorage;
    use futures::executor::block_on;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn fields(name: &str) -> BookingFields {
        BookingFields {
            name: name.to_string(),
            phone: "123".to_string(),
            date: "2024-06-01".to_string(),
            service: "Teeth Cleaning".to_string(),
            ..Default::default()
        }
    }

    fn book() -> (AppointmentBook, InMemoryStorage) {
        let storage = InMemoryStorage::new();
        let book = AppointmentBook::new(Arc::new(storage.clone()), NotificationBus::new());
        (book, storage)
    }

    #[test]
    fn missing_entry_loads_as_empty() {
        let (book, _) = book();
        assert!(block_on(book.load()).unwrap().is_empty());
        assert_eq!(block_on(book.pending_count()).unwrap(), 0);
    }

    #[test]
    fn corrupted_entry_is_reported() {
        let (book, storage) = book();
        block_on(storage.set_item(APPOINTMENTS_KEY, "{not json")).unwrap();
        assert!(matches!(block_on(book.load()), Err(PortError::CorruptedState(_))));
    }

    #[test]
    fn create_prepends_a_pending_record() {
        let (book, _) = book();
        let first = block_on(book.create(&fields("Zhang Min"))).unwrap();
        let second = block_on(book.create(&fields("Liu Fang"))).unwrap();

        let all = block_on(book.load()).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, second.id);
        assert_eq!(all[1].id, first.id);
        assert_ne!(first.id, second.id);
        assert_eq!(second.status, AppointmentStatus::Pending);
    }

    #[test]
    fn toggling_twice_restores_the_status() {
        let (book, _) = book();
        let created = block_on(book.create(&fields("Zhang Min"))).unwrap();

        let once = block_on(book.toggle_status(&created.id)).unwrap();
        assert_eq!(once.status, AppointmentStatus::Contacted);
        let twice = block_on(book.toggle_status(&created.id)).unwrap();
        assert_eq!(twice.status, AppointmentStatus::Pending);
    }

    #[test]
    fn toggling_an_unknown_id_is_not_found() {
        let (book, _) = book();
        assert!(matches!(block_on(book.toggle_status("42")), Err(PortError::NotFound(_))));
    }

    #[test]
    fn delete_is_idempotent() {
        let (book, _) = book();
        let keep = block_on(book.create(&fields("Zhang Min"))).unwrap();
        let gone = block_on(book.create(&fields("Liu Fang"))).unwrap();

        assert!(block_on(book.delete(&gone.id)).unwrap());
        assert!(!block_on(book.delete(&gone.id)).unwrap());

        let all = block_on(book.load()).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, keep.id);
    }

    #[test]
    fn pending_count_tracks_every_mutation() {
        let (book, _) = book();
        let a = block_on(book.create(&fields("A"))).unwrap();
        let b = block_on(book.create(&fields("B"))).unwrap();
        block_on(book.create(&fields("C"))).unwrap();
        assert_eq!(block_on(book.pending_count()).unwrap(), 3);

        block_on(book.toggle_status(&a.id)).unwrap();
        assert_eq!(block_on(book.pending_count()).unwrap(), 2);

        block_on(book.delete(&b.id)).unwrap();
        assert_eq!(block_on(book.pending_count()).unwrap(), 1);

        block_on(book.delete(&a.id)).unwrap();
        assert_eq!(block_on(book.pending_count()).unwrap(), 1);
    }

    #[test]
    fn every_write_publishes_one_update() {
        let (book, _) = book();
        let updates = Arc::new(AtomicUsize::new(0));
        let counter = updates.clone();
        let _subscription = book.bus().subscribe(move |event| {
            if *event == ClinicEvent::AppointmentsUpdated {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        let created = block_on(book.create(&fields("Zhang Min"))).unwrap();
        block_on(book.toggle_status(&created.id)).unwrap();
        block_on(book.delete(&created.id)).unwrap();
        block_on(book.delete(&created.id)).unwrap();

        assert_eq!(updates.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn ids_skip_past_collisions() {
        let now = Utc::now();
        let taken = Appointment {
            id: now.timestamp_millis().to_string(),
            name: String::new(),
            phone: String::new(),
            date: String::new(),
            service: String::new(),
            doctor: String::new(),
            notes: String::new(),
            status: AppointmentStatus::Pending,
            created_at: now,
        };
        let id = next_id(&[taken], now);
        assert_eq!(id, (now.timestamp_millis() + 1).to_string());
    }
}
