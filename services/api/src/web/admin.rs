//! services/api/src/web/admin.rs
//!
//! Admin endpoints: password login/logout and record management. A successful
//! login stores an `AdminPanel` under an opaque `admin_session` cookie.

use crate::web::{
    rest::AppointmentView,
    state::{AdminSession, AppState, ADMIN_SESSION_TTL_HOURS},
};
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use chrono::Utc;
use clinic_core::{
    admin::{AdminError, AdminPanel, Confirmation},
    ports::PortError,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

pub const ADMIN_COOKIE: &str = "admin_session";

/// The admin session id, inserted by the `require_admin` middleware.
#[derive(Clone, Debug)]
pub struct AdminSessionId(pub String);

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub password: String,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DeleteQuery {
    /// Must be `true`; anything else declines the deletion.
    #[serde(default)]
    pub confirm: bool,
}

#[derive(Serialize, ToSchema)]
pub struct DeleteResponse {
    /// False when no record had the id.
    pub removed: bool,
}

type HandlerError = (StatusCode, String);

fn map_admin_error(e: AdminError) -> HandlerError {
    match e {
        AdminError::IncorrectPassword => (StatusCode::UNAUTHORIZED, e.to_string()),
        AdminError::NotConfirmed => (StatusCode::BAD_REQUEST, e.to_string()),
        AdminError::Port(PortError::NotFound(id)) => {
            (StatusCode::NOT_FOUND, format!("Appointment {} not found", id))
        }
        AdminError::Port(e) => {
            error!("Admin operation failed: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

fn session_missing() -> HandlerError {
    (StatusCode::UNAUTHORIZED, "Admin session expired".to_string())
}

/// The panel behind `session_id`, unless the session has expired.
fn live_panel<'a>(
    sessions: &'a mut HashMap<String, AdminSession>,
    session_id: &str,
) -> Result<&'a mut AdminPanel, HandlerError> {
    sessions
        .get_mut(session_id)
        .filter(|session| !session.is_expired(Utc::now()))
        .map(|session| &mut session.panel)
        .ok_or_else(session_missing)
}

fn session_cookie(value: &str, max_age_secs: i64, secure: bool) -> String {
    let secure = if secure { "; Secure" } else { "" };
    format!(
        "{}={}; HttpOnly{}; SameSite=Lax; Path=/; Max-Age={}",
        ADMIN_COOKIE, value, secure, max_age_secs
    )
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /admin/login - Open the admin panel with the shared password
#[utoipa::path(
    post,
    path = "/admin/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = [AppointmentView]),
        (status = 401, description = "Incorrect password"),
        (status = 500, description = "Stored records could not be read")
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let panel = state
        .admin_gate
        .login(&req.password)
        .await
        .map_err(map_admin_error)?;
    let appointments: Vec<AppointmentView> =
        panel.appointments().iter().cloned().map(AppointmentView::from).collect();

    let session_id = Uuid::new_v4().to_string();
    {
        let mut sessions = state.admin_sessions.lock().await;
        let now = Utc::now();
        sessions.retain(|_, session| !session.is_expired(now));
        sessions.insert(session_id.clone(), AdminSession::new(panel));
    }
    info!("Admin logged in.");

    let cookie = session_cookie(
        &session_id,
        ADMIN_SESSION_TTL_HOURS * 3600,
        state.config.admin_cookie_secure,
    );
    Ok(([(header::SET_COOKIE, cookie)], Json(appointments)))
}

/// POST /admin/logout - Close the admin panel
#[utoipa::path(
    post,
    path = "/admin/logout",
    responses(
        (status = 200, description = "Logout successful"),
        (status = 401, description = "Not logged in")
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    Extension(AdminSessionId(session_id)): Extension<AdminSessionId>,
) -> impl IntoResponse {
    state.admin_sessions.lock().await.remove(&session_id);
    info!("Admin logged out.");

    let cookie = session_cookie("", 0, state.config.admin_cookie_secure);
    (StatusCode::OK, [(header::SET_COOKIE, cookie)])
}

/// GET /admin/appointments - Every booking record, newest first
#[utoipa::path(
    get,
    path = "/admin/appointments",
    responses(
        (status = 200, description = "All booking records", body = [AppointmentView]),
        (status = 401, description = "Not logged in"),
        (status = 500, description = "Stored records could not be read")
    )
)]
pub async fn list_appointments_handler(
    State(state): State<Arc<AppState>>,
    Extension(AdminSessionId(session_id)): Extension<AdminSessionId>,
) -> Result<Json<Vec<AppointmentView>>, HandlerError> {
    let mut sessions = state.admin_sessions.lock().await;
    let panel = live_panel(&mut sessions, &session_id)?;
    let appointments = panel.refresh().await.map_err(map_admin_error)?;
    Ok(Json(appointments.iter().cloned().map(AppointmentView::from).collect()))
}

/// POST /admin/appointments/{id}/toggle - Flip pending/contacted
#[utoipa::path(
    post,
    path = "/admin/appointments/{id}/toggle",
    params(("id" = String, Path, description = "The booking record id")),
    responses(
        (status = 200, description = "The updated record", body = AppointmentView),
        (status = 401, description = "Not logged in"),
        (status = 404, description = "No record has this id"),
        (status = 500, description = "Stored records could not be read")
    )
)]
pub async fn toggle_status_handler(
    State(state): State<Arc<AppState>>,
    Extension(AdminSessionId(session_id)): Extension<AdminSessionId>,
    Path(id): Path<String>,
) -> Result<Json<AppointmentView>, HandlerError> {
    let mut sessions = state.admin_sessions.lock().await;
    let panel = live_panel(&mut sessions, &session_id)?;
    let updated = panel.toggle_status(&id).await.map_err(map_admin_error)?;
    info!(id = %updated.id, status = ?updated.status, "Appointment status toggled.");
    Ok(Json(updated.into()))
}

/// DELETE /admin/appointments/{id}?confirm=true - Remove one record
#[utoipa::path(
    delete,
    path = "/admin/appointments/{id}",
    params(
        ("id" = String, Path, description = "The booking record id"),
        DeleteQuery
    ),
    responses(
        (status = 200, description = "Deletion applied", body = DeleteResponse),
        (status = 400, description = "Deletion was not confirmed"),
        (status = 401, description = "Not logged in"),
        (status = 500, description = "Stored records could not be read")
    )
)]
pub async fn delete_appointment_handler(
    State(state): State<Arc<AppState>>,
    Extension(AdminSessionId(session_id)): Extension<AdminSessionId>,
    Path(id): Path<String>,
    Query(query): Query<DeleteQuery>,
) -> Result<Json<DeleteResponse>, HandlerError> {
    let mut sessions = state.admin_sessions.lock().await;
    let panel = live_panel(&mut sessions, &session_id)?;
    let removed = panel
        .delete(&id, Confirmation::from(query.confirm))
        .await
        .map_err(map_admin_error)?;
    if removed {
        info!(id = %id, "Appointment deleted.");
    }
    Ok(Json(DeleteResponse { removed }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::web::state::test_support;
    use axum::response::Response;
    use clinic_core::{
        appointments::APPOINTMENTS_KEY,
        domain::{Appointment, BookingFields},
        memory::InMemoryStorage,
        ports::KeyValueStorage,
    };

    async fn seeded() -> (Arc<AppState>, Appointment) {
        let state = test_support::app_state();
        let fields = BookingFields {
            name: "Zhang Min".to_string(),
            phone: "123".to_string(),
            date: "2024-06-01".to_string(),
            ..Default::default()
        };
        let created = state.book.create(&fields).await.unwrap();
        (state, created)
    }

    async fn login(state: &Arc<AppState>) -> AdminSessionId {
        let response: Response = login_handler(
            State(state.clone()),
            Json(LoginRequest {
                password: "admin".to_string(),
            }),
        )
        .await
        .map_err(|e| e.1)
        .unwrap()
        .into_response();
        let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
        let id = cookie
            .strip_prefix("admin_session=")
            .and_then(|rest| rest.split(';').next())
            .unwrap();
        AdminSessionId(id.to_string())
    }

    #[tokio::test]
    async fn wrong_password_is_unauthorized() {
        let (state, _) = seeded().await;
        let err = login_handler(
            State(state.clone()),
            Json(LoginRequest {
                password: "guess".to_string(),
            }),
        )
        .await
        .err()
        .unwrap();
        assert_eq!(err, (StatusCode::UNAUTHORIZED, "Incorrect password.".to_string()));
        assert!(state.admin_sessions.lock().await.is_empty());
    }

    #[tokio::test]
    async fn toggle_then_list_shows_contacted() {
        let (state, created) = seeded().await;
        let session = login(&state).await;

        let Json(updated) = toggle_status_handler(
            State(state.clone()),
            Extension(session.clone()),
            Path(created.id.clone()),
        )
        .await
        .unwrap();
        assert_eq!(updated.status, "contacted");

        let Json(listed) = list_appointments_handler(State(state.clone()), Extension(session))
            .await
            .unwrap();
        assert_eq!(listed, vec![updated]);
        assert_eq!(state.book.pending_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn toggling_an_unknown_id_is_not_found() {
        let (state, _) = seeded().await;
        let session = login(&state).await;
        let err = toggle_status_handler(State(state), Extension(session), Path("nope".to_string()))
            .await
            .err()
            .unwrap();
        assert_eq!(err.0, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn delete_needs_confirmation() {
        let (state, created) = seeded().await;
        let session = login(&state).await;

        let err = delete_appointment_handler(
            State(state.clone()),
            Extension(session.clone()),
            Path(created.id.clone()),
            Query(DeleteQuery { confirm: false }),
        )
        .await
        .err()
        .unwrap();
        assert_eq!(err.0, StatusCode::BAD_REQUEST);

        let Json(response) = delete_appointment_handler(
            State(state.clone()),
            Extension(session),
            Path(created.id),
            Query(DeleteQuery { confirm: true }),
        )
        .await
        .unwrap();
        assert!(response.removed);
        assert!(state.book.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn logout_forgets_the_session() {
        let (state, _) = seeded().await;
        let session = login(&state).await;
        logout_handler(State(state.clone()), Extension(session.clone())).await;

        let err = list_appointments_handler(State(state), Extension(session))
            .await
            .err()
            .unwrap();
        assert_eq!(err.0, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn login_cookie_is_secure_and_bounded() {
        let (state, _) = seeded().await;
        let response = login_handler(
            State(state),
            Json(LoginRequest {
                password: "admin".to_string(),
            }),
        )
        .await
        .map_err(|e| e.1)
        .unwrap()
        .into_response();
        let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
        assert!(cookie.contains("; HttpOnly"));
        assert!(cookie.contains("; Secure"));
        assert!(cookie.contains("Max-Age=28800"));
    }

    #[tokio::test]
    async fn expired_sessions_are_refused_and_evicted_on_login() {
        let (state, _) = seeded().await;
        let stale = login(&state).await;
        state
            .admin_sessions
            .lock()
            .await
            .get_mut(&stale.0)
            .unwrap()
            .expires_at = Utc::now() - chrono::Duration::minutes(1);

        let err = list_appointments_handler(State(state.clone()), Extension(stale.clone()))
            .await
            .err()
            .unwrap();
        assert_eq!(err.0, StatusCode::UNAUTHORIZED);

        let fresh = login(&state).await;
        let sessions = state.admin_sessions.lock().await;
        assert_eq!(sessions.len(), 1);
        assert!(sessions.contains_key(&fresh.0));
        assert!(!sessions.contains_key(&stale.0));
    }

    #[tokio::test]
    async fn corrupted_records_fail_login_with_server_error() {
        let storage = InMemoryStorage::new();
        storage.set_item(APPOINTMENTS_KEY, "{not json").await.unwrap();
        let state = test_support::app_state_with(Arc::new(storage));

        let err = login_handler(
            State(state.clone()),
            Json(LoginRequest {
                password: "admin".to_string(),
            }),
        )
        .await
        .err()
        .unwrap();
        assert_eq!(err.0, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(state.admin_sessions.lock().await.is_empty());
    }

    #[tokio::test]
    async fn corruption_after_login_fails_the_listing() {
        let storage = Arc::new(InMemoryStorage::new());
        let state = test_support::app_state_with(storage.clone());
        let session = login(&state).await;
        storage.set_item(APPOINTMENTS_KEY, "{not json").await.unwrap();

        let err = list_appointments_handler(State(state), Extension(session))
            .await
            .err()
            .unwrap();
        assert_eq!(err.0, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
