use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Maximum title length accepted by the store
pub const MAX_TITLE_LEN: usize = 255;
/// Maximum location length accepted by the store
pub const MAX_LOCATION_LEN: usize = 255;
/// Maximum attendees length accepted by the store
pub const MAX_ATTENDEES_LEN: usize = 512;
/// Maximum timezone label length accepted by the store
pub const MAX_TIMEZONE_LEN: usize = 64;

/// Category of a schedule entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleCategory {
    #[default]
    Work,
    Personal,
    Meeting,
    Reminder,
}

impl ScheduleCategory {
    /// Every accepted category, in prompt order
    pub const ALL: [ScheduleCategory; 4] = [
        ScheduleCategory::Work,
        ScheduleCategory::Personal,
        ScheduleCategory::Meeting,
        ScheduleCategory::Reminder,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ScheduleCategory::Work => "work",
            ScheduleCategory::Personal => "personal",
            ScheduleCategory::Meeting => "meeting",
            ScheduleCategory::Reminder => "reminder",
        }
    }
}

impl FromStr for ScheduleCategory {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|category| category.as_str() == s)
            .ok_or(())
    }
}

impl fmt::Display for ScheduleCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Priority of a schedule entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SchedulePriority {
    High,
    #[default]
    Medium,
    Low,
}

impl SchedulePriority {
    /// Every accepted priority, in prompt order
    pub const ALL: [SchedulePriority; 3] = [
        SchedulePriority::High,
        SchedulePriority::Medium,
        SchedulePriority::Low,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SchedulePriority::High => "high",
            SchedulePriority::Medium => "medium",
            SchedulePriority::Low => "low",
        }
    }
}

impl FromStr for SchedulePriority {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|priority| priority.as_str() == s)
            .ok_or(())
    }
}

impl fmt::Display for SchedulePriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The mutable fields of a schedule entry, fully resolved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleFields {
    pub title: String,
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub category: ScheduleCategory,
    pub priority: SchedulePriority,
    pub is_important: bool,
    pub is_urgent: bool,
    pub location: Option<String>,
    pub attendees: Option<String>,
    /// Label of the timezone the entry was authored in
    pub timezone: Option<String>,
    pub metadata: Option<Map<String, Value>>,
}

/// A persisted schedule entry owned by a single user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEvent {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub category: ScheduleCategory,
    pub priority: SchedulePriority,
    pub is_important: bool,
    pub is_urgent: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attendees: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Tombstone; set events are hidden from every normal read
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl ScheduleEvent {
    /// Build a new event for `owner_id` from resolved fields
    pub fn new(owner_id: &str, fields: ScheduleFields, now: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            owner_id: owner_id.to_string(),
            title: fields.title,
            description: fields.description,
            start_time: fields.start_time,
            end_time: fields.end_time,
            category: fields.category,
            priority: fields.priority,
            is_important: fields.is_important,
            is_urgent: fields.is_urgent,
            location: fields.location,
            attendees: fields.attendees,
            timezone: fields.timezone,
            metadata: fields.metadata,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    /// Snapshot of the mutable fields
    pub fn fields(&self) -> ScheduleFields {
        ScheduleFields {
            title: self.title.clone(),
            description: self.description.clone(),
            start_time: self.start_time,
            end_time: self.end_time,
            category: self.category,
            priority: self.priority,
            is_important: self.is_important,
            is_urgent: self.is_urgent,
            location: self.location.clone(),
            attendees: self.attendees.clone(),
            timezone: self.timezone.clone(),
            metadata: self.metadata.clone(),
        }
    }

    /// Replace the mutable fields and bump `updated_at`
    pub fn apply_fields(&mut self, fields: ScheduleFields, now: DateTime<Utc>) {
        self.title = fields.title;
        self.description = fields.description;
        self.start_time = fields.start_time;
        self.end_time = fields.end_time;
        self.category = fields.category;
        self.priority = fields.priority;
        self.is_important = fields.is_important;
        self.is_urgent = fields.is_urgent;
        self.location = fields.location;
        self.attendees = fields.attendees;
        self.timezone = fields.timezone;
        self.metadata = fields.metadata;
        self.updated_at = now;
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Half-open window `[start, end)` for range reads; either bound may be open
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl EventRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    pub fn contains(&self, time: &DateTime<Utc>) -> bool {
        self.start.map_or(true, |start| *time >= start) && self.end.map_or(true, |end| *time < end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_category_and_priority_guards() {
        assert_eq!("meeting".parse::<ScheduleCategory>(), Ok(ScheduleCategory::Meeting));
        assert!("Meeting".parse::<ScheduleCategory>().is_err());
        assert!("party".parse::<ScheduleCategory>().is_err());
        assert_eq!("low".parse::<SchedulePriority>(), Ok(SchedulePriority::Low));
        assert!("urgent".parse::<SchedulePriority>().is_err());
        assert_eq!(ScheduleCategory::default(), ScheduleCategory::Work);
        assert_eq!(SchedulePriority::default(), SchedulePriority::Medium);
    }

    #[test]
    fn test_range_is_half_open() {
        let start = Utc::now();
        let range = EventRange::new(start, start + Duration::hours(1));
        assert!(range.contains(&start));
        assert!(!range.contains(&(start + Duration::hours(1))));
        assert!(EventRange::default().contains(&start));
    }

    #[test]
    fn test_event_serializes_camel_case() {
        let now = Utc::now();
        let event = ScheduleEvent::new(
            "owner",
            ScheduleFields {
                title: "Standup".to_string(),
                description: None,
                start_time: now,
                end_time: now + Duration::minutes(15),
                category: ScheduleCategory::Meeting,
                priority: SchedulePriority::High,
                is_important: true,
                is_urgent: false,
                location: None,
                attendees: None,
                timezone: Some("UTC".to_string()),
                metadata: None,
            },
            now,
        );
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["ownerId"], "owner");
        assert_eq!(json["category"], "meeting");
        assert_eq!(json["isImportant"], true);
        assert!(json.get("deletedAt").is_none());
    }
}
