//! The application shell: owns the session store and API client and carries out the
//! caller-side half of the login lifecycle.
//!
//! Logging in or registering stores the returned tokens; logging out, or any 401 from the
//! server, clears them. Which surface the user starts on is decided from the stored access token.

use crate::client::{ApiClient, ClearSessionOnUnauthorized, ClientConfig};
use crate::error::{Error, Result};
use crate::models::{EntryRecord, UserProfile};
use crate::session::{Session, SessionKey, SessionStore, SqliteSessionStore};
use crate::settings::AppSettings;
use crate::validation::{validate_login, EntryDraft, RegistrationForm};
use log::{debug, info};
use serde_json::Value;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Where the user lands on startup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Login and registration
    Auth,
    /// Everything behind a login
    Main,
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::Auth => write!(f, "auth"),
            Route::Main => write!(f, "main"),
        }
    }
}

pub struct AppContext {
    store: Arc<dyn SessionStore>,
    client: ApiClient,
}

impl AppContext {
    /// Builds the client and registers the clear-on-401 listener
    pub fn new(config: &ClientConfig, store: Arc<dyn SessionStore>) -> Result<Self> {
        let mut client = ApiClient::new(config, store.clone())?;
        client.add_invalidation_listener(Arc::new(ClearSessionOnUnauthorized::new(
            store.clone(),
        )));
        Ok(AppContext { store, client })
    }

    pub fn open(config: &ClientConfig, session_db: &Path) -> Result<Self> {
        let store = SqliteSessionStore::open(session_db).map_err(Error::Storage)?;
        Self::new(config, Arc::new(store))
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn store(&self) -> &dyn SessionStore {
        self.store.as_ref()
    }

    pub async fn session(&self) -> Session {
        Session::load(self.store()).await
    }

    pub async fn initial_route(&self) -> Route {
        if self.store.get(SessionKey::AccessToken).await.is_some() {
            Route::Main
        } else {
            Route::Auth
        }
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<Session> {
        let req = validate_login(username, password)?;
        let auth = self.client.login(&req.username, &req.password).await?;
        let session = Session::persist(self.store(), &auth)
            .await
            .map_err(Error::Storage)?;
        info!("logged in as {}", auth.user.username);
        Ok(session)
    }

    pub async fn register(&self, form: &RegistrationForm) -> Result<Session> {
        let req = form.validate().map_err(Error::InvalidForm)?;
        let auth = self.client.register(&req).await?;
        let session = Session::persist(self.store(), &auth)
            .await
            .map_err(Error::Storage)?;
        info!("registered and logged in as {}", auth.user.username);
        Ok(session)
    }

    /// Local only; the server keeps no session to tear down
    pub async fn logout(&self) -> Result<()> {
        self.store.clear_all().await.map_err(Error::Storage)?;
        info!("logged out");
        Ok(())
    }

    async fn store_profile(&self, profile: &UserProfile) -> Result<()> {
        let raw = serde_json::to_string(profile).map_err(Error::Decode)?;
        self.store
            .set(SessionKey::UserProfile, &raw)
            .await
            .map_err(Error::Storage)
    }

    /// Fetches the profile and refreshes the stored snapshot
    pub async fn refresh_profile(&self) -> Result<UserProfile> {
        let profile = self.client.get_profile().await?;
        self.store_profile(&profile).await?;
        Ok(profile)
    }

    pub async fn update_profile(&self, changes: &Value) -> Result<UserProfile> {
        let profile = self.client.update_profile(changes).await?;
        self.store_profile(&profile).await?;
        Ok(profile)
    }

    pub async fn submit_entry(&self, draft: &EntryDraft) -> Result<EntryRecord> {
        let entry = draft.validate(crate::today())?;
        debug!("submitting {} entry for {}", entry.mood, entry.date);
        self.client.create_entry(&entry).await
    }

    pub async fn amend_entry(&self, id: i64, draft: &EntryDraft) -> Result<EntryRecord> {
        let update = draft.validate_update()?;
        self.client.update_entry(id, &update).await
    }

    pub async fn load_settings(&self) -> AppSettings {
        AppSettings::load(self.store()).await
    }

    pub async fn save_settings(&self, settings: &AppSettings) -> Result<()> {
        settings.save(self.store()).await.map_err(Error::Storage)
    }

    pub async fn reset_settings(&self) -> Result<AppSettings> {
        AppSettings::reset(self.store())
            .await
            .map_err(Error::Storage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offline_app() -> AppContext {
        // nothing listens on port 9; these tests never get as far as the network
        let config = ClientConfig::new("http://127.0.0.1:9/api");
        let store = SqliteSessionStore::open_ephemeral().unwrap();
        AppContext::new(&config, Arc::new(store)).unwrap()
    }

    #[tokio::test]
    async fn test_initial_route() {
        let app = offline_app();
        assert_eq!(app.initial_route().await, Route::Auth);
        app.store()
            .set(SessionKey::AccessToken, "tok")
            .await
            .unwrap();
        assert_eq!(app.initial_route().await, Route::Main);
        app.logout().await.unwrap();
        assert_eq!(app.initial_route().await, Route::Auth);
    }

    #[tokio::test]
    async fn test_validation_before_network() {
        let app = offline_app();
        let err = app.login("", "secret").await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let err = app
            .submit_entry(&EntryDraft {
                mood: Some("happy".to_string()),
                sleep_hours: Some(0.0),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let err = app
            .register(&RegistrationForm::default())
            .await
            .unwrap_err();
        match err {
            Error::InvalidForm(errors) => assert!(errors.len() >= 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_settings_roundtrip() {
        let app = offline_app();
        let mut settings = app.load_settings().await;
        settings.dark_mode = true;
        app.save_settings(&settings).await.unwrap();
        assert!(app.load_settings().await.dark_mode);
        // logging out leaves preferences alone
        app.logout().await.unwrap();
        assert!(app.load_settings().await.dark_mode);
        assert!(!app.reset_settings().await.unwrap().dark_mode);
    }
}
