//! Client-side checks run before anything is sent to the server.

use crate::models::{EmotionEntry, EntryUpdate, LoginRequest, Mood, RegisterRequest};
use lazy_static::lazy_static;
use regex::Regex;
use std::str::FromStr;
use time::macros::format_description;
use time::Date;

/// Scale fields (anxiety, energy, appetite) start out in the middle
pub const DEFAULT_SCALE: i64 = 3;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("please select your mood")]
    MissingMood,

    #[error("unknown mood '{0}' (expected one of: happy, sad, angry, anxious, neutral)")]
    UnknownMood(String),

    #[error("please enter how many hours you slept")]
    MissingSleepHours,

    #[error("sleep hours must be more than 0 and at most 24 (got {0})")]
    SleepHoursOutOfRange(f64),

    #[error("{field} must be between 1 and 5 (got {value})")]
    ScaleOutOfRange { field: &'static str, value: i64 },

    #[error("{0} is required")]
    Required(&'static str),

    #[error("email is invalid")]
    InvalidEmail,

    #[error("password must be at least 8 characters")]
    PasswordTooShort,

    #[error("passwords do not match")]
    PasswordMismatch,

    #[error("please enter a valid age (13-100)")]
    InvalidAge(u32),

    #[error("invalid date '{0}' (expected YYYY-MM-DD)")]
    InvalidDate(String),

    #[error("nothing to update")]
    EmptyUpdate,
}

pub fn parse_date(s: &str) -> Result<Date, ValidationError> {
    Date::parse(s.trim(), format_description!("[year]-[month]-[day]"))
        .map_err(|_| ValidationError::InvalidDate(s.to_string()))
}

fn check_mood(mood: Option<&str>) -> Result<Mood, ValidationError> {
    let mood = mood.map(str::trim).filter(|m| !m.is_empty());
    match mood {
        None => Err(ValidationError::MissingMood),
        Some(m) => Mood::from_str(m).map_err(|_| ValidationError::UnknownMood(m.to_string())),
    }
}

fn check_sleep_hours(hours: Option<f64>) -> Result<f64, ValidationError> {
    match hours {
        None => Err(ValidationError::MissingSleepHours),
        // written so that NaN is rejected too
        Some(h) if h > 0.0 && h <= 24.0 => Ok(h),
        Some(h) => Err(ValidationError::SleepHoursOutOfRange(h)),
    }
}

fn check_scale(field: &'static str, value: i64) -> Result<u8, ValidationError> {
    if (1..=5).contains(&value) {
        Ok(value as u8)
    } else {
        Err(ValidationError::ScaleOutOfRange { field, value })
    }
}

fn clean_text(text: &Option<String>) -> Option<String> {
    text.as_ref()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Unvalidated check-in, as typed in by the user
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryDraft {
    pub mood: Option<String>,
    pub anxiety_level: Option<i64>,
    pub sleep_hours: Option<f64>,
    pub energy_level: Option<i64>,
    pub appetite: Option<i64>,
    pub journal_text: Option<String>,
    pub date: Option<Date>,
}

impl EntryDraft {
    /// Full entry for creation. Missing scales take `DEFAULT_SCALE`, a missing date is `today`.
    pub fn validate(&self, today: Date) -> Result<EmotionEntry, ValidationError> {
        Ok(EmotionEntry {
            mood: check_mood(self.mood.as_deref())?,
            sleep_hours: check_sleep_hours(self.sleep_hours)?,
            anxiety_level: check_scale(
                "anxiety level",
                self.anxiety_level.unwrap_or(DEFAULT_SCALE),
            )?,
            energy_level: check_scale("energy level", self.energy_level.unwrap_or(DEFAULT_SCALE))?,
            appetite: check_scale("appetite", self.appetite.unwrap_or(DEFAULT_SCALE))?,
            journal_text: clean_text(&self.journal_text),
            date: self.date.unwrap_or(today),
        })
    }

    /// Partial entry for an update; only the fields that were given are checked and sent
    pub fn validate_update(&self) -> Result<EntryUpdate, ValidationError> {
        let update = EntryUpdate {
            mood: match &self.mood {
                Some(m) => Some(check_mood(Some(m.as_str()))?),
                None => None,
            },
            anxiety_level: self
                .anxiety_level
                .map(|v| check_scale("anxiety level", v))
                .transpose()?,
            sleep_hours: match self.sleep_hours {
                Some(h) => Some(check_sleep_hours(Some(h))?),
                None => None,
            },
            energy_level: self
                .energy_level
                .map(|v| check_scale("energy level", v))
                .transpose()?,
            appetite: self
                .appetite
                .map(|v| check_scale("appetite", v))
                .transpose()?,
            journal_text: clean_text(&self.journal_text),
            date: self.date,
        };
        if update.is_empty() {
            return Err(ValidationError::EmptyUpdate);
        }
        Ok(update)
    }
}

pub fn validate_login(username: &str, password: &str) -> Result<LoginRequest, ValidationError> {
    if username.trim().is_empty() {
        return Err(ValidationError::Required("username"));
    }
    if password.trim().is_empty() {
        return Err(ValidationError::Required("password"));
    }
    Ok(LoginRequest {
        username: username.trim().to_string(),
        password: password.to_string(),
    })
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegistrationForm {
    pub username: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
    pub age: Option<u32>,
    pub delivery_date: Option<String>,
    pub support_system: Option<String>,
}

impl RegistrationForm {
    /// Checks every field and reports all problems at once
    pub fn validate(&self) -> Result<RegisterRequest, Vec<ValidationError>> {
        lazy_static! {
            static ref EMAIL_RE: Regex = Regex::new(r"^\S+@\S+\.\S+$").unwrap();
        }
        let mut errors = vec![];

        if self.username.trim().is_empty() {
            errors.push(ValidationError::Required("username"));
        }
        if self.email.trim().is_empty() {
            errors.push(ValidationError::Required("email"));
        } else if !EMAIL_RE.is_match(self.email.trim()) {
            errors.push(ValidationError::InvalidEmail);
        }
        if self.password.is_empty() {
            errors.push(ValidationError::Required("password"));
        } else if self.password.chars().count() < 8 {
            errors.push(ValidationError::PasswordTooShort);
        }
        if self.password != self.password_confirm {
            errors.push(ValidationError::PasswordMismatch);
        }
        if let Some(age) = self.age {
            if !(13..=100).contains(&age) {
                errors.push(ValidationError::InvalidAge(age));
            }
        }
        let delivery_date = clean_text(&self.delivery_date);
        if let Some(ref d) = delivery_date {
            if let Err(e) = parse_date(d) {
                errors.push(e);
            }
        }

        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(RegisterRequest {
            username: self.username.trim().to_string(),
            email: self.email.trim().to_string(),
            password: self.password.clone(),
            password_confirm: self.password_confirm.clone(),
            age: self.age,
            delivery_date,
            support_system: clean_text(&self.support_system),
        })
    }
}
