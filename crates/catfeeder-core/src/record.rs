use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FoodType {
    #[default]
    Wet,
    Dry,
}

impl FoodType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Wet => "wet",
            Self::Dry => "dry",
        }
    }

    pub fn parse(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "wet" => Some(Self::Wet),
            "dry" => Some(Self::Dry),
            _ => None,
        }
    }
}

impl fmt::Display for FoodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Appointment category. Unknown categories survive a load/save cycle verbatim.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(from = "String", into = "String")]
pub enum AppointmentKind {
    #[default]
    Vet,
    Grooming,
    Vaccination,
    Checkup,
    Other(String),
}

impl AppointmentKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Vet => "vet",
            Self::Grooming => "grooming",
            Self::Vaccination => "vaccination",
            Self::Checkup => "checkup",
            Self::Other(raw) => raw.as_str(),
        }
    }

    /// Heading used in the home feed.
    pub fn feed_label(&self) -> String {
        match self {
            Self::Vet => "Vet Appointment".to_string(),
            other => capitalize(other.as_str()),
        }
    }

    /// Heading used in the day details panel.
    pub fn day_label(&self) -> String {
        match self {
            Self::Vet => "Vet Visit".to_string(),
            other => capitalize(other.as_str()),
        }
    }
}

impl From<String> for AppointmentKind {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "vet" => Self::Vet,
            "grooming" => Self::Grooming,
            "vaccination" => Self::Vaccination,
            "checkup" => Self::Checkup,
            _ => Self::Other(raw),
        }
    }
}

impl From<AppointmentKind> for String {
    fn from(kind: AppointmentKind) -> Self {
        match kind {
            AppointmentKind::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for AppointmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FeedingEntry {
    pub id: u64,

    pub amount: u32,

    pub food_type: FoodType,

    pub notify_time: String,

    #[serde(default)]
    pub notes: String,

    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Appointment {
    pub id: u64,

    #[serde(rename = "type")]
    pub kind: AppointmentKind,

    pub date: String,

    pub time: String,

    #[serde(default)]
    pub notes: String,

    pub timestamp: String,
}

/// Unsaved feeding form. Defaults match a freshly opened form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedingDraft {
    pub amount: u32,
    pub food_type: FoodType,
    pub notify_time: String,
    pub notes: String,
}

impl Default for FeedingDraft {
    fn default() -> Self {
        Self {
            amount: 50,
            food_type: FoodType::Wet,
            notify_time: "08:00".to_string(),
            notes: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppointmentDraft {
    pub kind: AppointmentKind,
    pub date: String,
    pub time: String,
    pub notes: String,
}

impl Default for AppointmentDraft {
    fn default() -> Self {
        Self {
            kind: AppointmentKind::Vet,
            date: String::new(),
            time: "09:00".to_string(),
            notes: String::new(),
        }
    }
}

impl FeedingEntry {
    pub fn from_draft(draft: FeedingDraft, id: u64, timestamp: String) -> Self {
        Self {
            id,
            amount: draft.amount,
            food_type: draft.food_type,
            notify_time: draft.notify_time,
            notes: draft.notes,
            timestamp,
        }
    }
}

impl Appointment {
    pub fn from_draft(draft: AppointmentDraft, id: u64, timestamp: String) -> Self {
        Self {
            id,
            kind: draft.kind,
            date: draft.date,
            time: draft.time,
            notes: draft.notes,
            timestamp,
        }
    }
}

fn capitalize(raw: &str) -> String {
    let mut chars = raw.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feeding_entry_uses_camel_case_fields() {
        let entry = FeedingEntry::from_draft(
            FeedingDraft::default(),
            1_710_489_600_000,
            "2024-03-15T08:00:00.000Z".to_string(),
        );
        let json = serde_json::to_value(&entry).expect("serialize entry");
        assert_eq!(json["foodType"], "wet");
        assert_eq!(json["notifyTime"], "08:00");
        assert_eq!(json["amount"], 50);
        assert!(json.get("food_type").is_none());
    }

    #[test]
    fn unknown_appointment_type_is_preserved() {
        let raw = r#"{"id":7,"type":"dental","date":"2024-03-20","time":"09:00","notes":"","timestamp":"2024-03-01T10:00:00.000Z"}"#;
        let appointment: Appointment = serde_json::from_str(raw).expect("parse appointment");
        assert_eq!(appointment.kind, AppointmentKind::Other("dental".to_string()));
        assert_eq!(appointment.kind.feed_label(), "Dental");

        let back = serde_json::to_value(&appointment).expect("serialize appointment");
        assert_eq!(back["type"], "dental");
    }

    #[test]
    fn vet_labels_differ_between_feed_and_day_view() {
        assert_eq!(AppointmentKind::Vet.feed_label(), "Vet Appointment");
        assert_eq!(AppointmentKind::Vet.day_label(), "Vet Visit");
        assert_eq!(AppointmentKind::Grooming.day_label(), "Grooming");
    }

    #[test]
    fn missing_notes_default_to_empty() {
        let raw = r#"{"id":3,"amount":40,"foodType":"dry","notifyTime":"07:30","timestamp":"2024-03-15T07:00:00.000Z"}"#;
        let entry: FeedingEntry = serde_json::from_str(raw).expect("parse entry");
        assert_eq!(entry.notes, "");
        assert_eq!(entry.food_type, FoodType::Dry);
    }
}
