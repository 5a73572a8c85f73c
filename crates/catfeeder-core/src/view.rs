use anyhow::anyhow;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::calendar::YearMonth;
use crate::storage::{self, Storage, VIEW_STATE_KEY};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum View {
    #[default]
    Home,
    Calendar,
}

/// Which screen is showing, which month the calendar is on and which day is picked.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ViewState {
    pub current_view: View,
    pub current_month: YearMonth,
    #[serde(default)]
    pub selected_date: Option<NaiveDate>,
}

impl ViewState {
    pub fn fresh(today: NaiveDate) -> Self {
        Self {
            current_view: View::Home,
            current_month: YearMonth::of(today),
            selected_date: None,
        }
    }

    #[tracing::instrument(skip(storage))]
    pub fn load<S: Storage>(storage: &S, today: NaiveDate) -> Self {
        let raw = match storage.get_item(VIEW_STATE_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Self::fresh(today),
            Err(err) => {
                warn!(error = %err, "failed reading view state; using defaults");
                return Self::fresh(today);
            }
        };

        match serde_json::from_str::<Self>(&raw) {
            Ok(state) if YearMonth::new(state.current_month.year, state.current_month.month).is_none() => {
                warn!(
                    year = state.current_month.year,
                    month = state.current_month.month,
                    "stored month out of range; using defaults"
                );
                Self::fresh(today)
            }
            Ok(state) => {
                debug!(?state, "loaded view state");
                state
            }
            Err(err) => {
                warn!(error = %err, "view state is malformed; using defaults");
                Self::fresh(today)
            }
        }
    }

    pub fn save<S: Storage>(&self, storage: &mut S) -> anyhow::Result<()> {
        storage::save_document(storage, VIEW_STATE_KEY, self)
    }

    pub fn show_home(&mut self) {
        self.current_view = View::Home;
    }

    pub fn show_calendar(&mut self) {
        self.current_view = View::Calendar;
    }

    pub fn navigate(&mut self, months: i32) -> anyhow::Result<()> {
        let current = self.current_month;
        self.current_month = current
            .shift(months)
            .ok_or_else(|| anyhow!("cannot move {months:+} months from {current}"))?;
        Ok(())
    }

    pub fn focus_month(&mut self, month: YearMonth) {
        self.current_month = month;
    }

    /// Selecting a day also brings its month into view.
    pub fn select_date(&mut self, date: NaiveDate) {
        self.current_view = View::Calendar;
        self.current_month = YearMonth::of(date);
        self.selected_date = Some(date);
    }

    pub fn clear_selection(&mut self) {
        self.selected_date = None;
    }
}
