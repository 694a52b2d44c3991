//! Session context for the signed-in user.
//!
//! The session is an explicit handle passed to the components that need it.
//! It is set at login and cleared at logout; nothing reads it from ambient
//! global state.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use secrecy::{ExposeSecret, SecretBox};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::types::{Assignee, UserId};

/// User role as reported by the server. Unknown roles are preserved.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Role {
    Admin,
    Developer,
    Viewer,
    Other(String),
}

impl Role {
    pub fn as_str(&self) -> &str {
        match self {
            Role::Admin => "admin",
            Role::Developer => "developer",
            Role::Viewer => "viewer",
            Role::Other(s) => s,
        }
    }
}

impl From<&str> for Role {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "admin" => Role::Admin,
            "developer" => Role::Developer,
            "viewer" => Role::Viewer,
            _ => Role::Other(s.to_string()),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Role {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Role::from(s.as_str()))
    }
}

/// The signed-in user, as returned by `GET /auth/me`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: UserId,
    pub email: String,
    pub role: Role,
}

impl SessionUser {
    pub fn new(id: u64, email: impl Into<String>, role: Role) -> Self {
        Self {
            id: UserId::new(id),
            email: email.into(),
            role,
        }
    }

    /// The assignee representation used for optimistic self-assignment.
    pub fn as_assignee(&self) -> Assignee {
        Assignee {
            id: self.id,
            email: self.email.clone(),
            role: Some(self.role.clone()),
        }
    }
}

/// Bearer credential. Passed through to the ticket service unmodified.
pub struct Credential(SecretBox<String>);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(SecretBox::new(Box::new(token.into())))
    }

    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl Clone for Credential {
    fn clone(&self) -> Self {
        Credential::new(self.expose())
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential([REDACTED])")
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    pub credential: Credential,
    pub user: Option<SessionUser>,
}

impl Session {
    pub fn new(credential: Credential, user: Option<SessionUser>) -> Self {
        Self { credential, user }
    }
}

/// Shared handle to the current session. Cloning shares the same slot.
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    inner: Arc<RwLock<Option<Session>>>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn logged_in(session: Session) -> Self {
        let context = Self::new();
        context.login(session);
        context
    }

    pub fn login(&self, session: Session) {
        tracing::debug!(
            user = session.user.as_ref().map(|u| u.email.as_str()),
            "session started"
        );
        *self.inner.write() = Some(session);
    }

    pub fn logout(&self) {
        tracing::debug!("session cleared");
        *self.inner.write() = None;
    }

    /// Replace the user details of the active session, keeping the credential.
    pub fn set_user(&self, user: Option<SessionUser>) {
        if let Some(session) = self.inner.write().as_mut() {
            session.user = user;
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.read().is_some()
    }

    pub fn current_user(&self) -> Option<SessionUser> {
        self.inner.read().as_ref().and_then(|s| s.user.clone())
    }

    pub fn credential(&self) -> Option<Credential> {
        self.inner.read().as_ref().map(|s| s.credential.clone())
    }
}
