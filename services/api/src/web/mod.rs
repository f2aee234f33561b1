pub mod admin;
pub mod chat_task;
pub mod middleware;
pub mod protocol;
pub mod rest;
pub mod state;
pub mod ws_handler;

// Re-export the handlers the binary wires into the router.
pub use admin::{
    delete_appointment_handler, list_appointments_handler, login_handler, logout_handler,
    toggle_status_handler,
};
pub use middleware::require_admin;
pub use rest::{clinic_handler, pending_count_handler};
pub use ws_handler::ws_handler;
