use std::cmp::Ordering;

use chrono::NaiveDateTime;

use crate::datetime::{parse_calendar_date, parse_timestamp};
use crate::record::{Appointment, FeedingEntry};

pub const FEED_LIMIT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityItem<'a> {
    Feeding(&'a FeedingEntry),
    Appointment(&'a Appointment),
}

impl ActivityItem<'_> {
    pub fn id(&self) -> u64 {
        match self {
            Self::Feeding(entry) => entry.id,
            Self::Appointment(appointment) => appointment.id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Feeding(_) => "feeding",
            Self::Appointment(_) => "appointment",
        }
    }

    /// Feedings order by creation time, appointments by their scheduled day at
    /// midnight. The appointment's own `time` is not consulted.
    pub fn sort_key(&self) -> Option<NaiveDateTime> {
        match self {
            Self::Feeding(entry) => parse_timestamp(&entry.timestamp),
            Self::Appointment(appointment) => parse_calendar_date(&appointment.date),
        }
    }
}

/// Newest-first merge of both collections, capped at [`FEED_LIMIT`].
#[tracing::instrument(skip_all, fields(feedings = entries.len(), appointments = appointments.len()))]
pub fn activity_feed<'a>(
    entries: &'a [FeedingEntry],
    appointments: &'a [Appointment],
) -> Vec<ActivityItem<'a>> {
    let mut items: Vec<ActivityItem<'a>> = entries
        .iter()
        .map(ActivityItem::Feeding)
        .chain(appointments.iter().map(ActivityItem::Appointment))
        .collect();

    items.sort_by(|a, b| cmp_newest_first(a.sort_key(), b.sort_key()));
    items.truncate(FEED_LIMIT);
    items
}

// Undated items sink below everything that has a usable key.
fn cmp_newest_first(left: Option<NaiveDateTime>, right: Option<NaiveDateTime>) -> Ordering {
    match (left, right) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
