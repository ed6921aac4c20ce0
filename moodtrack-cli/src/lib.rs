use anyhow::anyhow;
pub use anyhow::Result;
use lazy_static::lazy_static;
use moodtrack::models::EntryRecord;
use regex::Regex;
use serde_json::Value;
use std::str::FromStr;

pub mod pretty;
pub mod resources;

/// A profile field assignment given on the command line, like `age=31`.
///
/// Values are parsed as JSON if possible, otherwise kept as a plain string, so
/// `support_system=my sister` works without quoting. An empty value clears the field.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ProfileField(pub String, pub Value);

impl FromStr for ProfileField {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        lazy_static! {
            static ref FIELD_RE: Regex = Regex::new(r"^([a-zA-Z_]+)=(.*)$").unwrap();
        }
        if let Some(captures) = FIELD_RE.captures(s) {
            let key = captures[1].to_string();
            let val =
                Value::from_str(&captures[2]).unwrap_or(Value::String(captures[2].to_string()));
            let val = match val {
                Value::String(s) if s.is_empty() => Value::Null,
                _ => val,
            };
            Ok(ProfileField(key, val))
        } else {
            Err(anyhow!("could not parse as a field assignment: {}", s))
        }
    }
}

#[test]
fn test_profile_field() {
    use serde_json::json;
    assert_eq!(
        ProfileField::from_str("age=31").unwrap(),
        ProfileField("age".to_string(), json!(31)),
    );
    assert_eq!(
        ProfileField::from_str("support_system=\"my sister\"").unwrap(),
        ProfileField("support_system".to_string(), json!("my sister"))
    );
    assert_eq!(
        ProfileField::from_str("support_system=my sister").unwrap(),
        ProfileField("support_system".to_string(), json!("my sister"))
    );
    assert_eq!(
        ProfileField::from_str("delivery_date=").unwrap(),
        ProfileField("delivery_date".to_string(), Value::Null),
    );

    assert!(ProfileField::from_str("age").is_err());
    assert!(ProfileField::from_str("").is_err());
    assert!(ProfileField::from_str("age.years=3").is_err());
}

/// Consumes the fields, later assignments to the same key winning
pub fn profile_changes(fields: Vec<ProfileField>) -> Value {
    let mut map = serde_json::Map::new();
    for ProfileField(k, v) in fields.into_iter() {
        map.insert(k, v);
    }
    Value::Object(map)
}

#[test]
fn test_profile_changes() {
    use serde_json::json;
    let fields = vec![
        ProfileField::from_str("age=30").unwrap(),
        ProfileField::from_str("email=new@example.com").unwrap(),
        ProfileField::from_str("age=31").unwrap(),
    ];
    assert_eq!(
        profile_changes(fields),
        json!({"age": 31, "email": "new@example.com"})
    );
    assert_eq!(profile_changes(vec![]), json!({}));
}

/// Parses a settings toggle value as typed on the command line
pub fn parse_toggle(s: &str) -> Result<bool> {
    match s.to_lowercase().as_str() {
        "on" | "true" | "yes" | "1" => Ok(true),
        "off" | "false" | "no" | "0" => Ok(false),
        _ => Err(anyhow!("expected on or off, got: {}", s)),
    }
}

#[test]
fn test_parse_toggle() {
    assert!(parse_toggle("on").unwrap());
    assert!(parse_toggle("TRUE").unwrap());
    assert!(!parse_toggle("off").unwrap());
    assert!(!parse_toggle("no").unwrap());
    assert!(parse_toggle("maybe").is_err());
    assert!(parse_toggle("").is_err());
}

/// Keeps entries whose mood or journal text contains `text`, ignoring case. A blank search
/// keeps everything.
pub fn filter_entries(entries: Vec<EntryRecord>, text: &str) -> Vec<EntryRecord> {
    let needle = text.trim().to_lowercase();
    if needle.is_empty() {
        return entries;
    }
    entries
        .into_iter()
        .filter(|e| {
            e.mood.as_str().contains(&needle)
                || e.journal_text
                    .as_deref()
                    .map(|t| t.to_lowercase().contains(&needle))
                    .unwrap_or(false)
        })
        .collect()
}

#[test]
fn test_filter_entries() {
    use serde_json::json;
    let entry = |id: i64, mood: &str, journal: Value| -> EntryRecord {
        serde_json::from_value(json!({
            "id": id,
            "date": "2024-03-09",
            "mood": mood,
            "anxiety_level": 3,
            "sleep_hours": 7.0,
            "energy_level": 3,
            "appetite": 3,
            "journal_text": journal,
            "risk_score": null,
            "risk_category": null,
            "created_at": null
        }))
        .unwrap()
    };
    let entries = vec![
        entry(1, "happy", json!("Walked to the Park with the baby")),
        entry(2, "anxious", json!(null)),
        entry(3, "sad", json!("couldn't sleep, felt anxious all night")),
    ];
    let ids = |list: Vec<EntryRecord>| list.iter().map(|e| e.id).collect::<Vec<i64>>();

    assert_eq!(ids(filter_entries(entries.clone(), "ANXIOUS")), vec![2, 3]);
    assert_eq!(ids(filter_entries(entries.clone(), "park")), vec![1]);
    assert_eq!(ids(filter_entries(entries.clone(), "  ")), vec![1, 2, 3]);
    assert!(filter_entries(entries, "angry").is_empty());
}
