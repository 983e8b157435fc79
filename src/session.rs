//! Session persistence and the authenticated identity.
//!
//! The session store is the single owner of the Identity and its bearer
//! credential. Both live in one JSON record inside the profile database, so
//! they are committed and cleared atomically: an identity can never be
//! observed without its credential. The only writers are the login flow and
//! the gateway's credential-rejection handler.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, warn};

use crate::models::Identity;

/// Key of the session record inside the profile database.
pub const SESSION_KEY: &str = "session";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredSession {
    user: Identity,
    token: String,
}

// ============================================================================
// Session Store
// ============================================================================

pub struct SessionStore {
    db: sled::Db,
    current: Mutex<Option<StoredSession>>,
}

impl SessionStore {
    /// Open (or create) the profile database at `path` and load any
    /// persisted session into memory.
    pub fn open(path: &Path) -> Result<Self, sled::Error> {
        let db = sled::open(path)?;
        let current = Mutex::new(read_stored(&db));
        Ok(Self { db, current })
    }

    /// In-memory store for tests and throwaway profiles.
    pub fn temporary() -> Result<Self, sled::Error> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(Self {
            db,
            current: Mutex::new(None),
        })
    }

    /// Read the persisted identity and credential. Idempotent and free of
    /// side effects; a record that cannot be parsed reads as "no session".
    pub fn restore(&self) -> Option<(Identity, String)> {
        read_stored(&self.db).map(|s| (s.user, s.token))
    }

    /// Persist `user` and `token`, replacing any prior session.
    pub fn commit(&self, user: Identity, token: &str) {
        let stored = StoredSession {
            user,
            token: token.to_string(),
        };
        match serde_json::to_vec(&stored) {
            Ok(bytes) => {
                if let Err(err) = self.db.insert(SESSION_KEY, bytes) {
                    // Keep the in-memory session; the tab still works, it
                    // just won't survive a restart.
                    warn!(%err, "failed to persist session");
                } else {
                    self.db.flush().ok();
                }
            }
            Err(err) => warn!(%err, "failed to serialize session"),
        }
        debug!(email = %stored.user.email, "session committed");
        *self.lock() = Some(stored);
    }

    /// Erase the session. Called on explicit logout and on credential
    /// rejection.
    pub fn clear(&self) {
        if let Err(err) = self.db.remove(SESSION_KEY) {
            warn!(%err, "failed to erase persisted session");
        } else {
            self.db.flush().ok();
        }
        debug!("session cleared");
        *self.lock() = None;
    }

    /// The current identity, if any.
    pub fn current(&self) -> Option<Identity> {
        self.lock().as_ref().map(|s| s.user.clone())
    }

    /// The current bearer credential, if any.
    pub fn token(&self) -> Option<String> {
        self.lock().as_ref().map(|s| s.token.clone())
    }

    /// Whether the current identity holds the privileged role.
    pub fn is_admin(&self) -> bool {
        self.lock()
            .as_ref()
            .map(|s| s.user.role.is_admin())
            .unwrap_or(false)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<StoredSession>> {
        self.current.lock().unwrap()
    }
}

fn read_stored(db: &sled::Db) -> Option<StoredSession> {
    let bytes = db.get(SESSION_KEY).ok().flatten()?;
    serde_json::from_slice(&bytes).ok()
}

// ============================================================================
// Tests
// ============================================================================
