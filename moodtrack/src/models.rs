/// Request and response bodies of the moodtrack REST API (manually entered)
use anyhow::anyhow;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use time::Date;

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Happy,
    Sad,
    Angry,
    Anxious,
    Neutral,
}

impl Mood {
    pub const ALL: [Mood; 5] = [
        Mood::Happy,
        Mood::Sad,
        Mood::Angry,
        Mood::Anxious,
        Mood::Neutral,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mood::Happy => "happy",
            Mood::Sad => "sad",
            Mood::Angry => "angry",
            Mood::Anxious => "anxious",
            Mood::Neutral => "neutral",
        }
    }
}

impl FromStr for Mood {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Mood::ALL
            .iter()
            .find(|m| m.as_str() == s.trim().to_lowercase())
            .copied()
            .ok_or(anyhow!("unknown mood: {}", s))
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RiskCategory {
    Low,
    Moderate,
    High,
}

impl fmt::Display for RiskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskCategory::Low => write!(f, "low"),
            RiskCategory::Moderate => write!(f, "moderate"),
            RiskCategory::High => write!(f, "high"),
        }
    }
}

/// A validated daily check-in, as submitted to the server.
///
/// Construct through `validation::EntryDraft::validate()`, which enforces the value ranges.
#[derive(Debug, serde::Serialize, Clone, PartialEq)]
pub struct EmotionEntry {
    pub mood: Mood,
    pub anxiety_level: u8,
    pub sleep_hours: f64,
    pub energy_level: u8,
    pub appetite: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub journal_text: Option<String>,
    #[serde(with = "iso_date")]
    pub date: Date,
}

/// Partial entry for `PUT /emotions/entries/{id}/`; absent fields are left unchanged
#[derive(Debug, serde::Serialize, Clone, Default, PartialEq)]
pub struct EntryUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mood: Option<Mood>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anxiety_level: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sleep_hours: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub energy_level: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub appetite: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub journal_text: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        with = "iso_date::option",
        default
    )]
    pub date: Option<Date>,
}

impl EntryUpdate {
    pub fn is_empty(&self) -> bool {
        self == &EntryUpdate::default()
    }
}

/// An entry as stored by the server, with its derived risk fields
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq)]
pub struct EntryRecord {
    pub id: i64,
    #[serde(with = "iso_date")]
    pub date: Date,
    pub mood: Mood,
    pub anxiety_level: u8,
    pub sleep_hours: f64,
    pub energy_level: u8,
    pub appetite: u8,
    pub journal_text: Option<String>,
    pub risk_score: Option<f64>,
    pub risk_category: Option<RiskCategory>,
    pub created_at: Option<String>,
    /// Only present on create and update responses
    #[serde(default)]
    pub recommendations: Vec<String>,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq)]
pub struct RiskAssessment {
    pub id: i64,
    #[serde(with = "iso_date")]
    pub date: Date,
    pub risk_category: RiskCategory,
    pub risk_score: f64,
    #[serde(default)]
    pub contributing_factors: Value,
    #[serde(default)]
    pub recommendations: Vec<String>,
    pub created_at: Option<String>,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq)]
pub struct RiskTrendPoint {
    pub date: String,
    pub risk_score: f64,
    pub entries: u32,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq)]
pub struct EmotionStats {
    pub avg_anxiety: f64,
    pub avg_sleep: f64,
    pub avg_energy: f64,
    pub avg_appetite: f64,
    #[serde(default)]
    pub mood_distribution: HashMap<String, u32>,
    #[serde(default)]
    pub risk_trend: Vec<RiskTrendPoint>,
    pub entries_count: u32,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq)]
pub struct WeekMood {
    pub date: String,
    pub mood: Mood,
    #[serde(default)]
    pub risk_score: f64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq)]
pub struct DashboardSummary {
    pub today_entry: Option<EntryRecord>,
    pub recent_assessment: Option<RiskAssessment>,
    pub streak: u32,
    #[serde(default)]
    pub week_moods: Vec<WeekMood>,
}

/// Account details. Fields the client does not know about are kept in `extra`, so a
/// snapshot written back to the session store loses nothing.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq)]
pub struct UserProfile {
    pub id: Option<i64>,
    pub username: String,
    #[serde(default)]
    pub email: String,
    pub user_type: Option<String>,
    pub age: Option<u32>,
    pub delivery_date: Option<String>,
    pub support_system: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

#[derive(Debug, serde::Serialize, Clone, PartialEq, Eq)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, serde::Serialize, Clone, PartialEq, Eq)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
    pub age: Option<u32>,
    pub delivery_date: Option<String>,
    pub support_system: Option<String>,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq, Eq)]
pub struct AuthTokens {
    pub access: String,
    pub refresh: String,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq)]
pub struct AuthResponse {
    pub user: UserProfile,
    pub tokens: AuthTokens,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use time::macros::date;

    #[test]
    fn test_mood_from_str() {
        assert_eq!(Mood::from_str("happy").unwrap(), Mood::Happy);
        assert_eq!(Mood::from_str("Anxious").unwrap(), Mood::Anxious);
        assert!(Mood::from_str("elated").is_err());
        assert!(Mood::from_str("").is_err());
        for m in Mood::ALL {
            assert_eq!(Mood::from_str(&m.to_string()).unwrap(), m);
        }
    }

    #[test]
    fn test_entry_body() {
        let entry = EmotionEntry {
            mood: Mood::Neutral,
            anxiety_level: 2,
            sleep_hours: 6.5,
            energy_level: 3,
            appetite: 4,
            journal_text: None,
            date: date!(2024 - 03 - 09),
        };
        assert_eq!(
            serde_json::to_value(&entry).unwrap(),
            json!({
                "mood": "neutral",
                "anxiety_level": 2,
                "sleep_hours": 6.5,
                "energy_level": 3,
                "appetite": 4,
                "date": "2024-03-09",
            })
        );

        let update = EntryUpdate {
            sleep_hours: Some(8.0),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&update).unwrap(),
            json!({"sleep_hours": 8.0})
        );
        assert!(!update.is_empty());
        assert!(EntryUpdate::default().is_empty());
    }

    #[test]
    fn test_dashboard_summary() {
        let summary: DashboardSummary = serde_json::from_value(json!({
            "today_entry": {
                "id": 12,
                "date": "2024-03-09",
                "mood": "sad",
                "anxiety_level": 4,
                "sleep_hours": 4.5,
                "energy_level": 2,
                "appetite": 2,
                "journal_text": "rough night",
                "risk_score": 0.71,
                "risk_category": "high",
                "created_at": "2024-03-09T07:12:44.123456Z"
            },
            "recent_assessment": {
                "id": 3,
                "date": "2024-03-09",
                "risk_category": "high",
                "risk_score": 0.71,
                "contributing_factors": {"sleep_hours": 0.4},
                "recommendations": ["Consider reaching out to a healthcare professional"],
                "created_at": "2024-03-09T07:12:44.223456Z"
            },
            "streak": 3,
            "week_moods": [
                {"date": "2024-03-08", "mood": "neutral", "risk_score": 0.3},
                {"date": "2024-03-09", "mood": "sad", "risk_score": 0.71}
            ]
        }))
        .unwrap();
        let today = summary.today_entry.unwrap();
        assert_eq!(today.date, date!(2024 - 03 - 09));
        assert_eq!(today.risk_category, Some(RiskCategory::High));
        assert!(today.recommendations.is_empty());
        assert_eq!(summary.streak, 3);
        assert_eq!(summary.week_moods[1].mood, Mood::Sad);

        let empty: DashboardSummary = serde_json::from_value(json!({
            "today_entry": null,
            "recent_assessment": null,
            "streak": 0,
            "week_moods": []
        }))
        .unwrap();
        assert!(empty.today_entry.is_none());
    }

    #[test]
    fn test_empty_stats() {
        let stats: EmotionStats = serde_json::from_value(json!({
            "avg_anxiety": 0,
            "avg_sleep": 0,
            "avg_energy": 0,
            "avg_appetite": 0,
            "mood_distribution": {},
            "risk_trend": [],
            "entries_count": 0
        }))
        .unwrap();
        assert_eq!(stats.entries_count, 0);
        assert_eq!(stats.avg_sleep, 0.0);
    }

    #[test]
    fn test_profile_keeps_unknown_fields() {
        let raw = json!({
            "id": 7,
            "username": "amara",
            "email": "amara@example.com",
            "user_type": "mother",
            "age": 31,
            "delivery_date": "2024-01-15",
            "support_system": null,
            "first_name": "Amara"
        });
        let profile: UserProfile = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(profile.username, "amara");
        assert_eq!(profile.extra["first_name"], json!("Amara"));
        assert_eq!(serde_json::to_value(&profile).unwrap(), raw);
    }
}
