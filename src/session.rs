//! Explicit session context: the bearer token, the active tenant and the
//! user decoded from the token, hydrated from a persisted store at startup
//! and torn down on logout.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("malformed access token")]
    MalformedToken,
    #[error("access token expired")]
    Expired,
    #[error("session store: {0}")]
    Io(#[from] std::io::Error),
    #[error("session store: {0}")]
    Serde(#[from] serde_json::Error),
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Student,
    Teacher,
    Admin,
    SuperAdmin,
}

impl Role {
    pub fn home_route(self) -> &'static str {
        match self {
            Role::Student => "/student/dashboard",
            Role::Teacher => "/teacher/dashboard",
            Role::Admin => "/admin/dashboard",
            Role::SuperAdmin => "/super-admin/dashboard",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::Student => "student",
            Role::Teacher => "teacher",
            Role::Admin => "admin",
            Role::SuperAdmin => "super_admin",
        })
    }
}

/// JWT payload as issued by the backend. The signature is not checked here.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Claims {
    pub user_id: String,
    pub email: Option<String>,
    pub role: Role,
    pub tenant_id: Option<String>,
    pub student_id: Option<String>,
    pub teacher_id: Option<String>,
    pub admin_id: Option<String>,
    pub full_name: Option<String>,
    pub exp: i64,
    pub iat: Option<i64>,
}

impl Claims {
    pub fn decode(token: &str) -> Result<Self, SessionError> {
        let payload = token.split('.').nth(1).ok_or(SessionError::MalformedToken)?;
        let bytes = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .map_err(|_| SessionError::MalformedToken)?;
        serde_json::from_slice(&bytes).map_err(|_| SessionError::MalformedToken)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.exp < now.timestamp()
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub role: Role,
    pub tenant_id: Option<String>,
    pub student_id: Option<String>,
    pub teacher_id: Option<String>,
    pub admin_id: Option<String>,
    pub full_name: Option<String>,
}

impl From<Claims> for User {
    fn from(c: Claims) -> Self {
        User {
            id: c.user_id,
            email: c.email.unwrap_or_default(),
            role: c.role,
            tenant_id: c.tenant_id,
            student_id: c.student_id,
            teacher_id: c.teacher_id,
            admin_id: c.admin_id,
            full_name: c.full_name,
        }
    }
}

/// What survives a restart: two opaque strings.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSession {
    pub access_token: Option<String>,
    pub tenant_id: Option<String>,
}

pub trait SessionStore: Send + Sync {
    fn load(&self) -> Result<PersistedSession, SessionError>;
    fn save(&self, session: &PersistedSession) -> Result<(), SessionError>;
    fn clear(&self) -> Result<(), SessionError>;
}

/// JSON file on disk.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileSessionStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<PersistedSession, SessionError> {
        match std::fs::read(&self.path) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(PersistedSession::default()),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, session: &PersistedSession) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_vec_pretty(session)?)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        match std::fs::remove_file(&self.path) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Default)]
pub struct MemorySessionStore {
    inner: Mutex<PersistedSession>,
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<PersistedSession, SessionError> {
        Ok(self.inner.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }

    fn save(&self, session: &PersistedSession) -> Result<(), SessionError> {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner) = session.clone();
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner) = PersistedSession::default();
        Ok(())
    }
}

#[derive(Debug, Default, Clone)]
struct State {
    token: Option<String>,
    tenant_id: Option<String>,
    user: Option<User>,
}

/// Shared handle; clones observe the same session.
#[derive(Clone)]
pub struct Session {
    state: Arc<RwLock<State>>,
    store: Arc<dyn SessionStore>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.read();
        f.debug_struct("Session")
            .field("authenticated", &state.token.is_some())
            .field("tenant_id", &state.tenant_id)
            .field("user", &state.user.as_ref().map(|u| &u.id))
            .finish()
    }
}

impl Session {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Session {
            state: Arc::new(RwLock::new(State::default())),
            store,
        }
    }

    pub fn in_memory() -> Self {
        Session::new(Arc::new(MemorySessionStore::default()))
    }

    pub fn hydrate(store: Arc<dyn SessionStore>) -> Result<Self, SessionError> {
        Session::hydrate_at(store, Utc::now())
    }

    /// Restores a persisted token. An undecodable or expired token is
    /// discarded and the store cleared; the session then starts signed out.
    pub fn hydrate_at(store: Arc<dyn SessionStore>, now: DateTime<Utc>) -> Result<Self, SessionError> {
        let persisted = store.load()?;
        let session = Session::new(store);
        let Some(token) = persisted.access_token else {
            return Ok(session);
        };
        match Claims::decode(&token) {
            Ok(claims) if !claims.is_expired_at(now) => {
                session.install(token, claims, persisted.tenant_id)?;
            }
            Ok(_) => {
                tracing::warn!("persisted session expired, signing out");
                session.clear();
            }
            Err(e) => {
                tracing::warn!(error=%e, "discarding unreadable persisted session");
                session.clear();
            }
        }
        Ok(session)
    }

    /// Adopts a freshly issued token.
    pub fn establish(&self, token: String) -> Result<User, SessionError> {
        self.establish_at(token, Utc::now())
    }

    pub fn establish_at(&self, token: String, now: DateTime<Utc>) -> Result<User, SessionError> {
        let claims = Claims::decode(&token)?;
        if claims.is_expired_at(now) {
            self.clear();
            return Err(SessionError::Expired);
        }
        self.install(token, claims, None)
    }

    fn install(&self, token: String, claims: Claims, fallback_tenant: Option<String>) -> Result<User, SessionError> {
        let user = User::from(claims);
        let tenant_id = user.tenant_id.clone().or(fallback_tenant);
        self.store.save(&PersistedSession {
            access_token: Some(token.clone()),
            tenant_id: tenant_id.clone(),
        })?;
        *self.write() = State {
            token: Some(token),
            tenant_id,
            user: Some(user.clone()),
        };
        Ok(user)
    }

    /// Drops token, tenant and user, in memory and in the store.
    pub fn clear(&self) {
        *self.write() = State::default();
        if let Err(e) = self.store.clear() {
            tracing::warn!(error=%e, "failed to clear persisted session");
        }
    }

    pub fn token(&self) -> Option<String> {
        self.read().token.clone()
    }

    pub fn tenant_id(&self) -> Option<String> {
        self.read().tenant_id.clone()
    }

    pub fn user(&self) -> Option<User> {
        self.read().user.clone()
    }

    pub fn role(&self) -> Option<Role> {
        self.read().user.as_ref().map(|u| u.role)
    }

    pub fn is_authenticated(&self) -> bool {
        let state = self.read();
        state.token.is_some() && state.user.is_some()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}
