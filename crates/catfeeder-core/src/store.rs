use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate};
use tracing::{debug, info};

use crate::calendar::{self, DaySummary, MonthGrid, YearMonth};
use crate::datetime::local_timestamp;
use crate::feed::{self, ActivityItem};
use crate::record::{Appointment, AppointmentDraft, FeedingDraft, FeedingEntry};
use crate::storage::{self, APPOINTMENTS_KEY, FEEDINGS_KEY, Storage};

/// Confirmation shown once an appointment is saved. Nothing is scheduled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderNotice {
    pub date: String,
    pub time: String,
}

impl fmt::Display for ReminderNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Appointment reminder set for {} at {}", self.date, self.time)
    }
}

/// Both collections, newest first, mirrored to storage after every mutation.
#[derive(Debug)]
pub struct RecordStore<S: Storage> {
    storage: S,
    feedings: Vec<FeedingEntry>,
    appointments: Vec<Appointment>,
    last_id: u64,
}

impl<S: Storage> RecordStore<S> {
    #[tracing::instrument(skip(storage))]
    pub fn load(storage: S) -> Self {
        let feedings: Vec<FeedingEntry> = storage::load_collection(&storage, FEEDINGS_KEY);
        let appointments: Vec<Appointment> = storage::load_collection(&storage, APPOINTMENTS_KEY);

        let last_id = feedings
            .iter()
            .map(|entry| entry.id)
            .chain(appointments.iter().map(|appointment| appointment.id))
            .max()
            .unwrap_or(0);

        info!(
            feedings = feedings.len(),
            appointments = appointments.len(),
            "loaded records"
        );

        Self {
            storage,
            feedings,
            appointments,
            last_id,
        }
    }

    pub fn feedings(&self) -> &[FeedingEntry] {
        &self.feedings
    }

    pub fn appointments(&self) -> &[Appointment] {
        &self.appointments
    }

    pub fn find_feeding(&self, id: u64) -> Option<&FeedingEntry> {
        self.feedings.iter().find(|entry| entry.id == id)
    }

    pub fn find_appointment(&self, id: u64) -> Option<&Appointment> {
        self.appointments.iter().find(|appointment| appointment.id == id)
    }

    /// Backing storage, for state kept beside the records such as view selection.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    #[tracing::instrument(skip(self, draft, now), fields(amount = draft.amount, food = %draft.food_type))]
    pub fn add_feeding(
        &mut self,
        draft: FeedingDraft,
        now: &DateTime<FixedOffset>,
    ) -> anyhow::Result<FeedingEntry> {
        let id = self.next_id(now);
        let entry = FeedingEntry::from_draft(draft, id, local_timestamp(now));

        self.feedings.insert(0, entry.clone());
        if let Err(err) = self.save_feedings() {
            self.feedings.remove(0);
            return Err(err);
        }

        debug!(id, count = self.feedings.len(), "feeding added");
        Ok(entry)
    }

    #[tracing::instrument(skip(self, draft, now), fields(kind = %draft.kind, date = %draft.date))]
    pub fn add_appointment(
        &mut self,
        draft: AppointmentDraft,
        now: &DateTime<FixedOffset>,
    ) -> anyhow::Result<(Appointment, ReminderNotice)> {
        let id = self.next_id(now);
        let appointment = Appointment::from_draft(draft, id, local_timestamp(now));

        self.appointments.insert(0, appointment.clone());
        if let Err(err) = self.save_appointments() {
            self.appointments.remove(0);
            return Err(err);
        }

        debug!(id, count = self.appointments.len(), "appointment added");
        let notice = ReminderNotice {
            date: appointment.date.clone(),
            time: appointment.time.clone(),
        };
        Ok((appointment, notice))
    }

    /// Returns whether a record was removed. Storage is rewritten either way.
    #[tracing::instrument(skip(self))]
    pub fn delete_feeding(&mut self, id: u64) -> anyhow::Result<bool> {
        let before = self.feedings.len();
        self.feedings.retain(|entry| entry.id != id);
        let removed = self.feedings.len() != before;
        self.save_feedings()?;
        debug!(removed, "delete feeding");
        Ok(removed)
    }

    #[tracing::instrument(skip(self))]
    pub fn delete_appointment(&mut self, id: u64) -> anyhow::Result<bool> {
        let before = self.appointments.len();
        self.appointments.retain(|appointment| appointment.id != id);
        let removed = self.appointments.len() != before;
        self.save_appointments()?;
        debug!(removed, "delete appointment");
        Ok(removed)
    }

    pub fn entries_for_date(&self, date: NaiveDate) -> Vec<&FeedingEntry> {
        calendar::entries_for_date(&self.feedings, date)
    }

    pub fn appointments_for_date(&self, date: NaiveDate) -> Vec<&Appointment> {
        calendar::appointments_for_date(&self.appointments, date)
    }

    pub fn has_activity(&self, date: NaiveDate) -> bool {
        calendar::has_activity(&self.feedings, &self.appointments, date)
    }

    pub fn day_summary(&self, date: NaiveDate) -> DaySummary<'_> {
        calendar::day_summary(&self.feedings, &self.appointments, date)
    }

    pub fn month_grid(&self, month: YearMonth, today: NaiveDate) -> MonthGrid {
        calendar::month_grid(month, today, &self.feedings, &self.appointments)
    }

    pub fn activity_feed(&self) -> Vec<ActivityItem<'_>> {
        feed::activity_feed(&self.feedings, &self.appointments)
    }

    // Wall-clock millis, bumped past anything already issued or loaded.
    fn next_id(&mut self, now: &DateTime<FixedOffset>) -> u64 {
        let millis = u64::try_from(now.timestamp_millis()).unwrap_or(0);
        let id = millis.max(self.last_id.saturating_add(1));
        self.last_id = id;
        id
    }

    fn save_feedings(&mut self) -> anyhow::Result<()> {
        storage::save_document(&mut self.storage, FEEDINGS_KEY, &self.feedings)
    }

    fn save_appointments(&mut self) -> anyhow::Result<()> {
        storage::save_document(&mut self.storage, APPOINTMENTS_KEY, &self.appointments)
    }
}
