//! Session and user types, plus local token persistence keys.

use serde::{Deserialize, Serialize};

/// Key prefix used by the backend SDK for locally persisted auth material.
/// [`crate::AuthClient::reset_auth`] purges every key with this prefix.
pub const AUTH_KEY_PREFIX: &str = "sb-";

/// Key the current session is persisted under.
pub const SESSION_KEY: &str = "sb-session";

/// An authenticated user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Backend-assigned user id.
    pub id: String,
    /// Account email address.
    pub email: String,
}

/// An authenticated session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Bearer token for API calls.
    pub access_token: String,
    /// Token used to mint new access tokens.
    pub refresh_token: String,
    /// The signed-in user.
    pub user: User,
}

/// Auth state transition delivered to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    /// A session became active (sign-in or restored session).
    SignedIn(Session),
    /// The session ended.
    SignedOut,
}
