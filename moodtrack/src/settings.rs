/// App preferences, stored as JSON next to the session under `appSettings`
use crate::session::{SessionKey, SessionStore};
use anyhow::{anyhow, Result};
use log::warn;
use std::str::FromStr;

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct AppSettings {
    pub notifications: bool,
    pub daily_reminders: bool,
    pub weekly_reports: bool,
    pub dark_mode: bool,
    pub data_sharing: bool,
}

impl Default for AppSettings {
    fn default() -> Self {
        AppSettings {
            notifications: true,
            daily_reminders: true,
            weekly_reports: false,
            dark_mode: false,
            data_sharing: false,
        }
    }
}

/// Names of the individual toggles, as typed on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingName {
    Notifications,
    DailyReminders,
    WeeklyReports,
    DarkMode,
    DataSharing,
}

impl FromStr for SettingName {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.replace('_', "-").to_lowercase().as_str() {
            "notifications" => Ok(SettingName::Notifications),
            "daily-reminders" | "dailyreminders" => Ok(SettingName::DailyReminders),
            "weekly-reports" | "weeklyreports" => Ok(SettingName::WeeklyReports),
            "dark-mode" | "darkmode" => Ok(SettingName::DarkMode),
            "data-sharing" | "datasharing" => Ok(SettingName::DataSharing),
            _ => Err(anyhow!("unknown setting: {}", s)),
        }
    }
}

impl AppSettings {
    /// Missing or unreadable settings fall back to the defaults
    pub async fn load(store: &dyn SessionStore) -> Self {
        match store.get(SessionKey::AppSettings).await {
            Some(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!("ignoring unparsable app settings: {}", e);
                AppSettings::default()
            }),
            None => AppSettings::default(),
        }
    }

    pub async fn save(&self, store: &dyn SessionStore) -> Result<()> {
        store
            .set(SessionKey::AppSettings, &serde_json::to_string(self)?)
            .await
    }

    pub async fn reset(store: &dyn SessionStore) -> Result<Self> {
        let settings = AppSettings::default();
        settings.save(store).await?;
        Ok(settings)
    }

    pub fn set(&mut self, name: SettingName, value: bool) {
        match name {
            SettingName::Notifications => self.notifications = value,
            SettingName::DailyReminders => self.daily_reminders = value,
            SettingName::WeeklyReports => self.weekly_reports = value,
            SettingName::DarkMode => self.dark_mode = value,
            SettingName::DataSharing => self.data_sharing = value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SqliteSessionStore;
    use serde_json::json;

    #[test]
    fn test_setting_name() {
        assert_eq!(
            SettingName::from_str("dark-mode").unwrap(),
            SettingName::DarkMode
        );
        assert_eq!(
            SettingName::from_str("daily_reminders").unwrap(),
            SettingName::DailyReminders
        );
        assert_eq!(
            SettingName::from_str("weeklyReports").unwrap(),
            SettingName::WeeklyReports
        );
        assert!(SettingName::from_str("volume").is_err());
    }

    #[test]
    fn test_wire_format() {
        assert_eq!(
            serde_json::to_value(AppSettings::default()).unwrap(),
            json!({
                "notifications": true,
                "dailyReminders": true,
                "weeklyReports": false,
                "darkMode": false,
                "dataSharing": false,
            })
        );
        // partial objects fill in from the defaults
        let s: AppSettings = serde_json::from_value(json!({"darkMode": true})).unwrap();
        assert!(s.dark_mode);
        assert!(s.notifications);
    }

    #[tokio::test]
    async fn test_load_save_reset() {
        let store = SqliteSessionStore::open_ephemeral().unwrap();
        assert_eq!(AppSettings::load(&store).await, AppSettings::default());

        let mut settings = AppSettings::load(&store).await;
        settings.set(SettingName::WeeklyReports, true);
        settings.set(SettingName::Notifications, false);
        settings.save(&store).await.unwrap();
        let loaded = AppSettings::load(&store).await;
        assert!(loaded.weekly_reports);
        assert!(!loaded.notifications);

        assert_eq!(
            AppSettings::reset(&store).await.unwrap(),
            AppSettings::default()
        );
        assert_eq!(AppSettings::load(&store).await, AppSettings::default());

        store
            .set(SessionKey::AppSettings, "garbage")
            .await
            .unwrap();
        assert_eq!(AppSettings::load(&store).await, AppSettings::default());
    }
}
