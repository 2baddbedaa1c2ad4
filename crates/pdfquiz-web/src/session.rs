//! Server-side sessions keyed by a random id held in a cookie.
//!
//! Each visitor gets their own extracted text, API key and summary; nothing
//! is shared between visitors.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::{Request, State};
use axum::http::{HeaderMap, HeaderValue, header};
use axum::middleware::Next;
use axum::response::Response;
use dashmap::DashMap;

use crate::state::AppState;

pub const SESSION_COOKIE: &str = "pdfquiz_session";

/// Per-visitor state carried between pages.
#[derive(Clone, Default)]
pub struct SessionData {
    /// Text extracted from the last uploaded PDF, waiting to be summarised.
    pub extracted_text: Option<String>,
    pub api_key: Option<String>,
    pub summary: Option<String>,
}

impl std::fmt::Debug for SessionData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionData")
            .field(
                "extracted_text",
                &self.extracted_text.as_ref().map(|t| t.len()),
            )
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("summary", &self.summary.as_ref().map(|s| s.len()))
            .finish()
    }
}

struct Entry {
    data: SessionData,
    last_seen: Instant,
}

/// Identifier of the current request's session, inserted by [`session_middleware`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionId(pub String);

/// In-memory session store with idle expiry.
pub struct SessionStore {
    entries: DashMap<String, Entry>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// A fresh random session id. Nothing is stored until the first [`update`](Self::update).
    pub fn new_id() -> String {
        uuid::Uuid::new_v4().simple().to_string()
    }

    /// Refresh a session's idle timer. Returns `false` for unknown or expired ids.
    pub fn touch(&self, id: &str) -> bool {
        let expired = match self.entries.get_mut(id) {
            Some(mut entry) if entry.last_seen.elapsed() < self.ttl => {
                entry.last_seen = Instant::now();
                return true;
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            self.entries.remove(id);
        }
        false
    }

    /// Snapshot of a session's data (empty if the session is unknown).
    pub fn get(&self, id: &str) -> SessionData {
        self.entries
            .get(id)
            .map(|e| e.data.clone())
            .unwrap_or_default()
    }

    /// Mutate a session's data in place, creating it if needed.
    pub fn update<R>(&self, id: &str, f: impl FnOnce(&mut SessionData) -> R) -> R {
        let mut entry = self.entries.entry(id.to_string()).or_insert_with(|| Entry {
            data: SessionData::default(),
            last_seen: Instant::now(),
        });
        entry.last_seen = Instant::now();
        f(&mut entry.data)
    }

    /// Mutate a session's data only if it already exists.
    pub fn update_existing(&self, id: &str, f: impl FnOnce(&mut SessionData)) -> bool {
        match self.entries.get_mut(id) {
            Some(mut entry) => {
                entry.last_seen = Instant::now();
                f(&mut entry.data);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Drop sessions idle for longer than the TTL. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| entry.last_seen.elapsed() < self.ttl);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Read a cookie value from the request headers.
pub fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v)
}

/// Attach a [`SessionId`] to every request.
///
/// Visitors without a live session get a provisional id; the cookie is only
/// issued once a handler has stored something under it.
pub async fn session_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let existing = cookie_value(request.headers(), SESSION_COOKIE)
        .filter(|id| state.sessions.touch(id))
        .map(str::to_string);

    let (id, is_new) = match existing {
        Some(id) => (id, false),
        None => (SessionStore::new_id(), true),
    };

    request.extensions_mut().insert(SessionId(id.clone()));
    let mut response = next.run(request).await;

    if is_new
        && state.sessions.contains(&id)
        && let Ok(value) = HeaderValue::from_str(&format!(
            "{SESSION_COOKIE}={id}; Path=/; HttpOnly; SameSite=Lax"
        ))
    {
        response.headers_mut().append(header::SET_COOKIE, value);
    }

    response
}

/// Periodically purge idle sessions until the process exits.
pub async fn sweep_expired(state: Arc<AppState>, every: Duration) {
    let mut interval = tokio::time::interval(every);
    loop {
        interval.tick().await;
        let removed = state.sessions.purge_expired();
        if removed > 0 {
            tracing::debug!(removed, remaining = state.sessions.len(), "purged idle sessions");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_creates_session() {
        let store = SessionStore::new(Duration::from_secs(60));
        let id = SessionStore::new_id();
        assert!(!store.touch(&id));
        assert!(store.is_empty());

        store.update(&id, |s| s.summary = Some("sum".into()));
        assert!(store.touch(&id));
        assert_eq!(store.get(&id).summary.as_deref(), Some("sum"));
    }

    #[test]
    fn update_existing_skips_unknown() {
        let store = SessionStore::new(Duration::from_secs(60));
        assert!(!store.update_existing("nope", |s| s.api_key = None));
        assert!(store.is_empty());

        store.update("known", |s| s.api_key = Some("k".into()));
        assert!(store.update_existing("known", |s| s.api_key = None));
        assert!(store.get("known").api_key.is_none());
    }

    #[test]
    fn unknown_id_is_not_touched() {
        let store = SessionStore::new(Duration::from_secs(60));
        assert!(!store.touch("nope"));
        assert!(store.get("nope").summary.is_none());
    }

    #[test]
    fn expired_sessions_are_dropped() {
        let store = SessionStore::new(Duration::ZERO);
        store.update("a", |_| ());
        assert!(!store.touch("a"));
        assert!(store.is_empty());

        store.update("b", |_| ());
        store.update("c", |_| ());
        assert_eq!(store.purge_expired(), 2);
    }

    #[test]
    fn ids_are_unique() {
        assert_ne!(SessionStore::new_id(), SessionStore::new_id());
    }

    #[test]
    fn cookie_lookup() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; pdfquiz_session=abc123"),
        );
        assert_eq!(cookie_value(&headers, SESSION_COOKIE), Some("abc123"));
        assert_eq!(cookie_value(&headers, "missing"), None);
    }

    #[test]
    fn debug_hides_secrets() {
        let data = SessionData {
            extracted_text: Some("private document".into()),
            api_key: Some("AIzaSecret".into()),
            summary: None,
        };
        let dbg = format!("{data:?}");
        assert!(!dbg.contains("AIzaSecret"));
        assert!(!dbg.contains("private document"));
    }
}
