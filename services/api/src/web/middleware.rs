//! services/api/src/web/middleware.rs
//!
//! Admin session middleware for protecting the admin routes.

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use std::sync::Arc;
use tracing::warn;

use crate::web::{
    admin::{AdminSessionId, ADMIN_COOKIE},
    state::AppState,
};

/// Middleware that checks the `admin_session` cookie against the logged-in,
/// unexpired panels.
///
/// If valid, inserts the session id into request extensions for handlers to use.
/// If invalid or missing, returns 401 Unauthorized.
pub async fn require_admin(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let session_id = req
        .headers()
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(session_from_cookie_header)
        .ok_or(StatusCode::UNAUTHORIZED)?;

    {
        let mut sessions = state.admin_sessions.lock().await;
        let expired = match sessions.get(&session_id) {
            Some(session) => session.is_expired(Utc::now()),
            None => {
                warn!("Rejected request with an unknown admin session.");
                return Err(StatusCode::UNAUTHORIZED);
            }
        };
        if expired {
            sessions.remove(&session_id);
            warn!("Rejected request with an expired admin session.");
            return Err(StatusCode::UNAUTHORIZED);
        }
    }

    req.extensions_mut().insert(AdminSessionId(session_id));
    Ok(next.run(req).await)
}

fn session_from_cookie_header(cookie_header: &str) -> Option<String> {
    cookie_header.split(';').find_map(|c| {
        c.trim()
            .strip_prefix(ADMIN_COOKIE)
            .and_then(|rest| rest.strip_prefix('='))
            .filter(|id| !id.is_empty())
            .map(str::to_string)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_the_admin_cookie_among_others() {
        assert_eq!(
            session_from_cookie_header("theme=dark; admin_session=abc-123; lang=zh"),
            Some("abc-123".to_string())
        );
        assert_eq!(session_from_cookie_header("admin_session="), None);
        assert_eq!(session_from_cookie_header("admin_sessionx=1"), None);
    }
}
