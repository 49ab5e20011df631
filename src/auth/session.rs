use std::sync::Arc;

use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use tracing::{debug, warn};

use crate::storage::{KvStore, StorageError, StorageResult};

pub const KEY_PREFIX: &str = "sesion-";
pub const REMEMBER_DAYS: i64 = 30;
const SID_LEN: usize = 32;

/// What the login page shows about the signed-in user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    #[serde(skip)]
    pub sid: String,
    #[serde(rename = "userEmail")]
    pub email: String,
    #[serde(rename = "userName")]
    pub name: String,
    #[serde(rename = "rememberMe", default, with = "time::serde::rfc3339::option")]
    pub remember_until: Option<OffsetDateTime>,
}

/// The flags kept for one signed-in client.
#[derive(Debug, Serialize, Deserialize)]
struct Stored {
    #[serde(rename = "isAuthenticated")]
    authenticated: bool,
    #[serde(flatten)]
    session: Session,
}

pub fn new_sid() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SID_LEN)
        .map(char::from)
        .collect()
}

/// Session flags persisted in the key-value store, one record per client.
pub struct SessionStore {
    kv: Arc<dyn KvStore>,
    guard_disabled: bool,
}

impl SessionStore {
    pub fn new(kv: Arc<dyn KvStore>, guard_disabled: bool) -> Self {
        if guard_disabled {
            warn!("session guard disabled: every session check will report authenticated");
        }
        Self { kv, guard_disabled }
    }

    fn key(sid: &str) -> String {
        format!("{KEY_PREFIX}{sid}")
    }

    async fn load(&self, sid: &str) -> StorageResult<Option<Stored>> {
        let Some(raw) = self.kv.get_item(&Self::key(sid)).await? else {
            return Ok(None);
        };
        match serde_json::from_str::<Stored>(&raw) {
            Ok(mut stored) => {
                stored.session.sid = sid.to_string();
                Ok(Some(stored))
            }
            Err(e) => {
                warn!(error = %e, "unreadable session record; treating as signed out");
                Ok(None)
            }
        }
    }

    async fn write(&self, stored: &Stored) -> StorageResult<()> {
        let key = Self::key(&stored.session.sid);
        let raw = serde_json::to_string(stored)
            .map_err(|source| StorageError::Encode { key: key.clone(), source })?;
        self.kv.set_item(&key, &raw).await
    }

    /// Opens a fresh session for a client that just signed in.
    pub async fn begin(&self, email: &str, name: &str, remember: bool) -> StorageResult<Session> {
        let remember_until = remember.then(|| OffsetDateTime::now_utc() + Duration::days(REMEMBER_DAYS));
        let session = Session {
            sid: new_sid(),
            email: email.to_string(),
            name: name.to_string(),
            remember_until,
        };
        self.write(&Stored { authenticated: true, session: session.clone() }).await?;
        debug!(email, remember, "session started");
        Ok(session)
    }

    pub async fn clear(&self, sid: &str) -> StorageResult<()> {
        self.kv.remove_item(&Self::key(sid)).await?;
        debug!("session cleared");
        Ok(())
    }

    /// The client's flag, or always `true` while the guard is disabled.
    pub async fn check(&self, sid: &str) -> StorageResult<bool> {
        if self.guard_disabled {
            warn!("session guard disabled; forcing authenticated");
            if let Some(mut stored) = self.load(sid).await? {
                if !stored.authenticated {
                    stored.authenticated = true;
                    self.write(&stored).await?;
                }
            }
            return Ok(true);
        }
        Ok(self.load(sid).await?.is_some_and(|s| s.authenticated))
    }

    /// Cached session fields; an expired remember-me marker reads as absent.
    pub async fn current(&self, sid: &str) -> StorageResult<Option<Session>> {
        if !self.check(sid).await? {
            return Ok(None);
        }
        Ok(self.load(sid).await?.map(|stored| {
            let mut session = stored.session;
            session.remember_until = session.remember_until.filter(|until| *until > OffsetDateTime::now_utc());
            session
        }))
    }
}
