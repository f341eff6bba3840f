use crate::app::AppState;
use crate::error::AppError;
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::Form;
use axum_extra::extract::cookie::{Cookie, SignedCookieJar};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, SystemTime};
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "session";
const SESSION_DURATION: u64 = 24 * 60 * 60; // 24 hours in seconds

/// An authenticated supervisor session. The zone is the only fact a session
/// carries.
#[derive(Debug, Clone)]
pub struct Session {
    pub zone: String,
    pub expires_at: SystemTime,
}

/// Thread-safe in-memory session storage, owned by the application state.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Session>>,
}

impl SessionStore {
    /// Create a session for a zone and return its id.
    pub fn create(&self, zone: &str) -> String {
        let session_id = Uuid::new_v4().to_string();
        let session = Session {
            zone: zone.to_string(),
            expires_at: SystemTime::now() + Duration::from_secs(SESSION_DURATION),
        };
        self.sessions
            .write()
            .expect("session store poisoned")
            .insert(session_id.clone(), session);
        session_id
    }

    /// The zone for a live session, `None` for unknown or expired ids.
    pub fn validate(&self, session_id: &str) -> Option<String> {
        let sessions = self.sessions.read().expect("session store poisoned");
        sessions
            .get(session_id)
            .filter(|session| session.expires_at > SystemTime::now())
            .map(|session| session.zone.clone())
    }

    pub fn destroy(&self, session_id: &str) {
        self.sessions
            .write()
            .expect("session store poisoned")
            .remove(session_id);
    }

    #[cfg(test)]
    fn insert_expired(&self, session_id: &str, zone: &str) {
        let session = Session {
            zone: zone.to_string(),
            expires_at: SystemTime::now() - Duration::from_secs(1),
        };
        self.sessions
            .write()
            .expect("session store poisoned")
            .insert(session_id.to_string(), session);
    }
}

/// The authenticated zone, inserted into request extensions by the guard.
#[derive(Debug, Clone)]
pub struct CurrentZone(pub String);

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub zone: String,
    pub password: String,
}

/// Authentication guard for every data-bearing route.
///
/// Rejects with a redirect to the login page before any remote fetch is
/// attempted; on success the zone rides along in request extensions.
pub async fn require_auth(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        if let Some(zone) = state.sessions.validate(cookie.value()) {
            request.extensions_mut().insert(CurrentZone(zone));
            return next.run(request).await;
        }
    }
    AppError::NotAuthenticated.into_response()
}

/// Handle the login form.
///
/// A zone/password pair that matches the gate table exactly opens a session
/// and lands on the dashboard. Any mismatch re-renders the form with the
/// full zone list and one generic message, revealing nothing about which
/// half of the pair was wrong.
pub async fn handle_login(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    if state.config.zone_password_matches(&form.zone, &form.password) {
        let session_id = state.sessions.create(&form.zone);
        let cookie = Cookie::build((SESSION_COOKIE, session_id))
            .path("/")
            .http_only(true)
            .build();
        return Ok((jar.add(cookie), Redirect::to("/dashboard")).into_response());
    }

    let body = state
        .templates
        .render(
            "login",
            &json!({
                "zones": state.config.zone_names(),
                "error": AppError::InvalidCredentials.user_message(),
            }),
        )
        .map_err(|e| AppError::Template(e.to_string()))?;
    Ok(Html(body).into_response())
}

/// Destroy the session and clear its cookie.
pub async fn handle_logout(
    State(state): State<AppState>,
    jar: SignedCookieJar,
) -> (SignedCookieJar, Redirect) {
    let jar = match jar.get(SESSION_COOKIE) {
        Some(cookie) => {
            state.sessions.destroy(cookie.value());
            let removal = Cookie::build((SESSION_COOKIE, "")).path("/").build();
            jar.remove(removal)
        }
        None => jar,
    };
    (jar, Redirect::to("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn created_sessions_validate_to_their_zone() {
        let store = SessionStore::default();
        let id = store.create("Giza");
        assert_eq!(store.validate(&id), Some("Giza".to_string()));
    }

    #[test]
    fn unknown_ids_do_not_validate() {
        let store = SessionStore::default();
        assert_eq!(store.validate("not-a-session"), None);
    }

    #[test]
    fn expired_sessions_do_not_validate() {
        let store = SessionStore::default();
        store.insert_expired("stale", "Suez");
        assert_eq!(store.validate("stale"), None);
    }

    #[test]
    fn destroyed_sessions_do_not_validate() {
        let store = SessionStore::default();
        let id = store.create("Maadi");
        store.destroy(&id);
        assert_eq!(store.validate(&id), None);
    }

    #[test]
    fn session_ids_are_unique_per_login() {
        let store = SessionStore::default();
        let a = store.create("Tanta");
        let b = store.create("Tanta");
        assert_ne!(a, b);
    }
}
