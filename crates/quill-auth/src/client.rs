//! Auth backend HTTP client.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock, Weak};
use std::time::Duration;

use quill_kv::KvStore;
use tracing::{debug, warn};
use ureq::Agent;

use crate::AuthError;
use crate::retry::with_retry;
use crate::session::{AUTH_KEY_PREFIX, AuthEvent, SESSION_KEY, Session, User};

/// Default HTTP timeout in seconds.
const DEFAULT_TIMEOUT: u64 = 30;

type Listener = Arc<dyn Fn(&AuthEvent) + Send + Sync>;
type ListenerMap = Arc<Mutex<HashMap<u64, Listener>>>;

/// Registration handle for an auth-state observer.
///
/// Uses RAII - dropping the handle deregisters the observer automatically.
pub struct Subscription {
    id: u64,
    listeners: Weak<Mutex<HashMap<u64, Listener>>>,
}

impl Subscription {
    /// Deregister immediately (consumes the handle).
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(listeners) = self.listeners.upgrade() {
            listeners.lock().unwrap().remove(&self.id);
        }
    }
}

/// Client for the hosted auth backend.
///
/// Construct one per process and share it; the client is `Send + Sync`.
/// On construction any session persisted in the token store is restored,
/// so a restarted process resumes its signed-in state without a network
/// round trip.
pub struct AuthClient {
    agent: Agent,
    base_url: String,
    api_key: String,
    kv: Arc<dyn KvStore>,
    session: RwLock<Option<Session>>,
    listeners: ListenerMap,
    next_listener_id: AtomicU64,
}

impl AuthClient {
    /// Create a client for the backend at `base_url`.
    ///
    /// `api_key` is sent with every request. `kv` holds locally persisted
    /// auth material under `sb-` keys.
    #[must_use]
    pub fn new(base_url: &str, api_key: &str, kv: Arc<dyn KvStore>) -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(DEFAULT_TIMEOUT)))
            .http_status_as_error(false)
            .build()
            .into();

        // Eagerly restore the persisted session; a stale or unreadable
        // entry just means we start signed out
        let session = match kv.get(SESSION_KEY) {
            Ok(Some(json)) => match serde_json::from_str(&json) {
                Ok(session) => Some(session),
                Err(e) => {
                    debug!("ignoring unparsable persisted session: {e}");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                debug!("failed to read persisted session: {e}");
                None
            }
        };

        Self {
            agent,
            base_url: base_url.trim_end_matches('/').to_owned(),
            api_key: api_key.to_owned(),
            kv,
            session: RwLock::new(session),
            listeners: Arc::new(Mutex::new(HashMap::new())),
            next_listener_id: AtomicU64::new(0),
        }
    }

    /// The current session, if signed in.
    pub fn session(&self) -> Option<Session> {
        self.session.read().unwrap().clone()
    }

    /// The currently signed-in user, if any.
    pub fn current_user(&self) -> Option<User> {
        self.session().map(|s| s.user)
    }

    /// Register an observer for auth state transitions.
    ///
    /// The listener fires on every sign-in and sign-out. The returned
    /// [`Subscription`] deregisters the listener when dropped.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&AuthEvent) + Send + Sync + 'static,
    {
        let id = self.next_listener_id.fetch_add(1, Ordering::Relaxed);
        self.listeners.lock().unwrap().insert(id, Arc::new(listener));
        Subscription {
            id,
            listeners: Arc::downgrade(&self.listeners),
        }
    }

    fn notify(&self, event: &AuthEvent) {
        // Snapshot the listeners first so a callback can subscribe or
        // unsubscribe without deadlocking on the registry lock
        let listeners: Vec<Listener> = self
            .listeners
            .lock()
            .unwrap()
            .values()
            .map(Arc::clone)
            .collect();
        for listener in listeners {
            listener(event);
        }
    }

    /// Update, persist and broadcast the session state.
    fn set_session(&self, session: Option<Session>) -> Result<(), AuthError> {
        match &session {
            Some(s) => {
                let json = serde_json::to_string(s)?;
                self.kv.set(SESSION_KEY, &json)?;
            }
            None => self.kv.remove(SESSION_KEY)?,
        }

        let event = match &session {
            Some(s) => AuthEvent::SignedIn(s.clone()),
            None => AuthEvent::SignedOut,
        };
        *self.session.write().unwrap() = session;
        self.notify(&event);
        Ok(())
    }

    /// Sign in with email and password.
    ///
    /// Transient backend failures (503, transport errors) are retried up to
    /// 3 total attempts with exponential backoff; terminal failures are
    /// returned on the first attempt.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError`] when all attempts fail or the failure is
    /// terminal.
    pub fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let body = serde_json::json!({"email": email, "password": password});
        let session =
            with_retry(|| self.auth_request("/auth/v1/token?grant_type=password", &body))?;
        self.set_session(Some(session.clone()))?;
        Ok(session)
    }

    /// Create an account and sign in.
    ///
    /// Retries like [`sign_in`](Self::sign_in).
    ///
    /// # Errors
    ///
    /// Returns [`AuthError`] when all attempts fail or the failure is
    /// terminal.
    pub fn sign_up(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let body = serde_json::json!({"email": email, "password": password});
        let session = with_retry(|| self.auth_request("/auth/v1/signup", &body))?;
        self.set_session(Some(session.clone()))?;
        Ok(session)
    }

    /// Sign out.
    ///
    /// Remote token revocation is best effort; local state is cleared and
    /// observers are notified regardless.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError`] only when the local state cannot be cleared.
    pub fn sign_out(&self) -> Result<(), AuthError> {
        if let Some(session) = self.session()
            && let Err(e) = self.revoke(&session.access_token)
        {
            warn!("sign-out revocation failed: {e}");
        }
        self.set_session(None)
    }

    /// Best-effort recovery from a wedged auth state.
    ///
    /// Signs out and purges every locally persisted `sb-` key so a stale
    /// refresh token cannot wedge the client in a refresh loop. Failures in
    /// either step are swallowed.
    pub fn reset_auth(&self) {
        if let Err(e) = self.sign_out() {
            debug!("reset: sign-out failed: {e}");
        }
        match self.kv.keys_with_prefix(AUTH_KEY_PREFIX) {
            Ok(keys) => {
                for key in keys {
                    if let Err(e) = self.kv.remove(&key) {
                        debug!("reset: failed to remove {key}: {e}");
                    }
                }
            }
            Err(e) => debug!("reset: failed to list auth keys: {e}"),
        }
    }

    fn auth_request(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<Session, AuthError> {
        let url = format!("{}{path}", self.base_url);
        let response = self
            .agent
            .post(&url)
            .header("apikey", &self.api_key)
            .header("Accept", "application/json")
            .send_json(body)?;

        let status = response.status().as_u16();
        let mut body_reader = response.into_body();

        if status >= 400 {
            let message = body_reader
                .read_to_string()
                .unwrap_or_else(|_| "(unable to read error body)".to_owned());
            return Err(AuthError::Backend { status, message });
        }

        Ok(body_reader.read_json()?)
    }

    fn revoke(&self, access_token: &str) -> Result<(), AuthError> {
        let url = format!("{}/auth/v1/logout", self.base_url);
        let response = self
            .agent
            .post(&url)
            .header("apikey", &self.api_key)
            .header("Authorization", &format!("Bearer {access_token}"))
            .send_empty()?;

        let status = response.status().as_u16();
        if status >= 400 {
            let message = response
                .into_body()
                .read_to_string()
                .unwrap_or_else(|_| "(unable to read error body)".to_owned());
            return Err(AuthError::Backend { status, message });
        }
        Ok(())
    }
}
