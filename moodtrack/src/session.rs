/// Local session state: auth tokens, profile snapshot and app preferences, kept in sqlite
use crate::models::{AuthResponse, UserProfile};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use lazy_static::lazy_static;
use log::{debug, warn};
use rusqlite::{params, Connection, OptionalExtension};
use rusqlite_migration::{Migrations, M};
use serde_json::Value;
use std::fmt;
use std::path::Path;
use std::sync::{Arc, Mutex};

lazy_static! {
    static ref MIGRATIONS: Migrations<'static> =
        Migrations::new(vec![M::up(include_str!("session_db.sql")),]);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionKey {
    AccessToken,
    RefreshToken,
    UserProfile,
    AppSettings,
}

impl SessionKey {
    /// The keys that make up a login; cleared together
    pub const SESSION: [SessionKey; 3] = [
        SessionKey::AccessToken,
        SessionKey::RefreshToken,
        SessionKey::UserProfile,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionKey::AccessToken => "userToken",
            SessionKey::RefreshToken => "refreshToken",
            SessionKey::UserProfile => "userData",
            SessionKey::AppSettings => "appSettings",
        }
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Durable key/value storage for session state.
///
/// There is no locking across calls: two writers racing on the same key means the last write
/// wins.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Returns `None` both for missing keys and for a store that can't be read
    async fn get(&self, key: SessionKey) -> Option<String>;

    /// Overwrites any existing value; durable once this returns
    async fn set(&self, key: SessionKey, value: &str) -> Result<()>;

    async fn remove(&self, key: SessionKey) -> Result<()>;

    /// Removes all of `SessionKey::SESSION` in one step. Readers see either all three or none.
    async fn clear_all(&self) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct SqliteSessionStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteSessionStore {
    pub fn open(path: &Path) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        MIGRATIONS.to_latest(&mut conn)?;
        debug!("opened session store: {}", path.display());
        Ok(SqliteSessionStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// In-memory store, eg for tests. Nothing survives the process.
    pub fn open_ephemeral() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        MIGRATIONS.to_latest(&mut conn)?;
        Ok(SqliteSessionStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Runs a closure against the connection on the blocking thread pool
    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|_| anyhow!("session database lock poisoned"))?;
            f(&mut *conn)
        })
        .await?
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn get(&self, key: SessionKey) -> Option<String> {
        let res = self
            .with_conn(move |conn| {
                let mut stmt = conn.prepare_cached("SELECT value FROM kv WHERE key = ?1")?;
                let val: Option<String> = stmt
                    .query_row(params!(key.as_str()), |row| row.get(0))
                    .optional()?;
                Ok(val)
            })
            .await;
        match res {
            Ok(val) => val,
            Err(e) => {
                warn!("failed to read {} from session store: {:#}", key, e);
                None
            }
        }
    }

    async fn set(&self, key: SessionKey, value: &str) -> Result<()> {
        let value = value.to_string();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare_cached(
                "INSERT INTO kv (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP",
            )?;
            stmt.execute(params!(key.as_str(), value))?;
            Ok(())
        })
        .await
    }

    async fn remove(&self, key: SessionKey) -> Result<()> {
        self.with_conn(move |conn| {
            conn.execute("DELETE FROM kv WHERE key = ?1", params!(key.as_str()))?;
            Ok(())
        })
        .await
    }

    async fn clear_all(&self) -> Result<()> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            for key in SessionKey::SESSION {
                tx.execute("DELETE FROM kv WHERE key = ?1", params!(key.as_str()))?;
            }
            tx.commit()?;
            Ok(())
        })
        .await?;
        debug!("session cleared");
        Ok(())
    }
}

/// Snapshot of the three session fields
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub user_profile: Option<Value>,
}

impl Session {
    pub async fn load(store: &dyn SessionStore) -> Self {
        let user_profile = match store.get(SessionKey::UserProfile).await {
            Some(raw) => match serde_json::from_str(&raw) {
                Ok(val) => Some(val),
                Err(e) => {
                    warn!("ignoring unparsable user profile snapshot: {}", e);
                    None
                }
            },
            None => None,
        };
        Session {
            access_token: store.get(SessionKey::AccessToken).await,
            refresh_token: store.get(SessionKey::RefreshToken).await,
            user_profile,
        }
    }

    /// Stores the tokens and user returned by login or registration
    pub async fn persist(store: &dyn SessionStore, auth: &AuthResponse) -> Result<Self> {
        let user_profile = serde_json::to_value(&auth.user)?;
        store
            .set(SessionKey::UserProfile, &user_profile.to_string())
            .await?;
        store
            .set(SessionKey::RefreshToken, &auth.tokens.refresh)
            .await?;
        // written last: its presence is what marks the session as logged in
        store
            .set(SessionKey::AccessToken, &auth.tokens.access)
            .await?;
        Ok(Session {
            access_token: Some(auth.tokens.access.clone()),
            refresh_token: Some(auth.tokens.refresh.clone()),
            user_profile: Some(user_profile),
        })
    }

    pub fn is_logged_in(&self) -> bool {
        self.access_token.is_some()
    }

    /// Typed view of the profile snapshot, if it has the expected shape
    pub fn profile(&self) -> Option<UserProfile> {
        self.user_profile
            .as_ref()
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AuthTokens;
    use serde_json::json;

    #[test]
    fn migrations_test() {
        assert!(MIGRATIONS.validate().is_ok());
    }

    fn auth_response() -> AuthResponse {
        serde_json::from_value(json!({
            "user": {"id": 1, "username": "amara", "email": "amara@example.com"},
            "tokens": {"access": "access-abc", "refresh": "refresh-xyz"}
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let store = SqliteSessionStore::open_ephemeral().unwrap();
        assert_eq!(store.get(SessionKey::AccessToken).await, None);

        store.set(SessionKey::AccessToken, "one").await.unwrap();
        assert_eq!(
            store.get(SessionKey::AccessToken).await.as_deref(),
            Some("one")
        );
        store.set(SessionKey::AccessToken, "two").await.unwrap();
        assert_eq!(
            store.get(SessionKey::AccessToken).await.as_deref(),
            Some("two")
        );
        assert_eq!(store.get(SessionKey::RefreshToken).await, None);

        store.remove(SessionKey::AccessToken).await.unwrap();
        assert_eq!(store.get(SessionKey::AccessToken).await, None);
    }

    #[tokio::test]
    async fn test_clear_all_keeps_settings() {
        let store = SqliteSessionStore::open_ephemeral().unwrap();
        Session::persist(&store, &auth_response()).await.unwrap();
        store
            .set(SessionKey::AppSettings, r#"{"darkMode":true}"#)
            .await
            .unwrap();

        store.clear_all().await.unwrap();
        for key in SessionKey::SESSION {
            assert_eq!(store.get(key).await, None);
        }
        assert!(store.get(SessionKey::AppSettings).await.is_some());

        // clearing an already-empty session is fine
        store.clear_all().await.unwrap();
        assert!(!Session::load(&store).await.is_logged_in());
    }

    #[tokio::test]
    async fn test_persist_and_load() {
        let store = SqliteSessionStore::open_ephemeral().unwrap();
        assert_eq!(Session::load(&store).await, Session::default());

        let auth = auth_response();
        let written = Session::persist(&store, &auth).await.unwrap();
        let loaded = Session::load(&store).await;
        assert_eq!(written, loaded);
        assert!(loaded.is_logged_in());
        assert_eq!(loaded.access_token.as_deref(), Some("access-abc"));
        assert_eq!(loaded.refresh_token.as_deref(), Some("refresh-xyz"));
        assert_eq!(loaded.profile().unwrap().username, "amara");
        assert_eq!(
            AuthTokens {
                access: loaded.access_token.unwrap(),
                refresh: loaded.refresh_token.unwrap(),
            },
            auth.tokens
        );
    }

    #[tokio::test]
    async fn test_bad_profile_snapshot() {
        let store = SqliteSessionStore::open_ephemeral().unwrap();
        store.set(SessionKey::AccessToken, "tok").await.unwrap();
        store
            .set(SessionKey::UserProfile, "{not json")
            .await
            .unwrap();
        let session = Session::load(&store).await;
        assert!(session.is_logged_in());
        assert_eq!(session.user_profile, None);
        assert_eq!(session.profile(), None);
    }

    #[tokio::test]
    async fn test_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.sqlite");
        {
            let store = SqliteSessionStore::open(&path).unwrap();
            store.set(SessionKey::AccessToken, "kept").await.unwrap();
        }
        let store = SqliteSessionStore::open(&path).unwrap();
        assert_eq!(
            store.get(SessionKey::AccessToken).await.as_deref(),
            Some("kept")
        );
    }
}
