use std::io::{self, IsTerminal, Write};

use anyhow::anyhow;
use chrono::NaiveDate;
use unicode_width::UnicodeWidthStr;

use crate::calendar::{DayCell, DaySummary, GridCell, MonthGrid, WEEKDAY_LABELS};
use crate::config::Config;
use crate::datetime::{parse_calendar_date, parse_timestamp};
use crate::feed::ActivityItem;
use crate::record::{Appointment, FeedingEntry};
use crate::store::ReminderNotice;

const CELL_WIDTH: usize = 6;

const GREEN: &str = "32";
const RED: &str = "31";
const TODAY: &str = "1;33";
const SELECTED: &str = "7";

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
    legend: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let color_cfg = cfg.get("color").unwrap_or_else(|| "on".to_string());
        let color = match color_cfg.to_ascii_lowercase().as_str() {
            "on" | "yes" | "true" | "1" => io::stdout().is_terminal(),
            "off" | "no" | "false" | "0" => false,
            other => return Err(anyhow!("invalid color setting: {other}")),
        };
        let legend = cfg.get_bool("calendar.legend").unwrap_or(true);

        Ok(Self { color, legend })
    }

    pub fn plain() -> Self {
        Self {
            color: false,
            legend: true,
        }
    }

    #[tracing::instrument(skip(self, items))]
    pub fn print_feed(&mut self, items: &[ActivityItem<'_>]) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        self.write_feed(&mut out, items)
    }

    #[tracing::instrument(skip(self, grid))]
    pub fn print_month(&mut self, grid: &MonthGrid, selected: Option<NaiveDate>) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        self.write_month(&mut out, grid, selected)
    }

    #[tracing::instrument(skip(self, summary))]
    pub fn print_day(&mut self, summary: &DaySummary<'_>) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        self.write_day(&mut out, summary)
    }

    pub fn print_notice(&mut self, notice: &ReminderNotice) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        writeln!(out, "{notice}")?;
        Ok(())
    }

    pub fn write_feed<W: Write>(&self, mut out: W, items: &[ActivityItem<'_>]) -> anyhow::Result<()> {
        writeln!(out, "Recent Activity")?;
        if items.is_empty() {
            writeln!(out, "No activity yet")?;
            writeln!(out, "Add feedings or appointments to get started")?;
            return Ok(());
        }

        let headers = vec![
            "ID".to_string(),
            "When".to_string(),
            "Activity".to_string(),
            "Notes".to_string(),
        ];

        let rows = items
            .iter()
            .map(|item| match item {
                ActivityItem::Feeding(entry) => vec![
                    self.paint(&entry.id.to_string(), GREEN),
                    format_feeding_time(entry),
                    format!("{}g of {} food", entry.amount, entry.food_type),
                    entry.notes.clone(),
                ],
                ActivityItem::Appointment(appointment) => vec![
                    self.paint(&appointment.id.to_string(), RED),
                    format_appointment_when(appointment),
                    appointment.kind.feed_label(),
                    appointment.notes.clone(),
                ],
            })
            .collect();

        write_table(&mut out, headers, rows)?;
        Ok(())
    }

    pub fn write_month<W: Write>(
        &self,
        mut out: W,
        grid: &MonthGrid,
        selected: Option<NaiveDate>,
    ) -> anyhow::Result<()> {
        let title = grid.month.to_string();
        let total_width = CELL_WIDTH * 7 + 6;
        writeln!(out, "{title:^total_width$}")?;

        let header: Vec<String> = WEEKDAY_LABELS
            .iter()
            .map(|label| format!("{label:^width$}", width = CELL_WIDTH))
            .collect();
        writeln!(out, "{}", header.join(" ").trim_end())?;

        for week in grid.weeks() {
            let line: Vec<String> = week
                .iter()
                .map(|cell| match cell {
                    GridCell::Blank => " ".repeat(CELL_WIDTH),
                    GridCell::Day(day) => self.day_cell(day, selected),
                })
                .collect();
            writeln!(out, "{}", line.join(" ").trim_end())?;
        }

        if self.legend {
            writeln!(out)?;
            writeln!(
                out,
                "{} feeding entry  {} appointment  [d] today  (d) selected",
                self.feeding_mark(),
                self.appointment_mark()
            )?;
        }
        Ok(())
    }

    pub fn write_day<W: Write>(&self, mut out: W, summary: &DaySummary<'_>) -> anyhow::Result<()> {
        writeln!(out)?;
        writeln!(out, "{}", summary.date.format("%B %-d, %Y"))?;

        if summary.is_empty() {
            writeln!(out, "No activity on this day")?;
            return Ok(());
        }

        if !summary.appointments.is_empty() {
            writeln!(out, "{}", self.paint("Appointments", RED))?;
            for appointment in &summary.appointments {
                writeln!(
                    out,
                    "  #{}  {}  {}",
                    appointment.id,
                    appointment.kind.day_label(),
                    appointment.time
                )?;
                if !appointment.notes.is_empty() {
                    writeln!(out, "      {}", appointment.notes)?;
                }
            }
        }

        if !summary.feedings.is_empty() {
            writeln!(
                out,
                "{}",
                self.paint(&format!("Feedings ({})", summary.feedings.len()), GREEN)
            )?;
            for entry in &summary.feedings {
                let time = parse_timestamp(&entry.timestamp)
                    .map(|ts| ts.format("%I:%M %p").to_string())
                    .unwrap_or_default();
                writeln!(
                    out,
                    "  #{}  {} {}g  {}",
                    entry.id, entry.food_type, entry.amount, time
                )?;
                if !entry.notes.is_empty() {
                    writeln!(out, "      {}", entry.notes)?;
                }
            }
        }

        Ok(())
    }

    fn day_cell(&self, cell: &DayCell, selected: Option<NaiveDate>) -> String {
        let (open, close, code) = if cell.is_today {
            ('[', ']', Some(TODAY))
        } else if selected == Some(cell.date) {
            ('(', ')', Some(SELECTED))
        } else {
            (' ', ' ', None)
        };

        let number = format!("{open}{:>2}{close}", cell.day);
        let number = match code {
            Some(code) => self.paint(&number, code),
            None => number,
        };
        let feeding = if cell.feedings > 0 {
            self.feeding_mark()
        } else {
            " ".to_string()
        };
        let appointment = if cell.appointments > 0 {
            self.appointment_mark()
        } else {
            " ".to_string()
        };
        format!("{number}{feeding}{appointment}")
    }

    fn feeding_mark(&self) -> String {
        if self.color {
            self.paint("•", GREEN)
        } else {
            "f".to_string()
        }
    }

    fn appointment_mark(&self) -> String {
        if self.color {
            self.paint("•", RED)
        } else {
            "a".to_string()
        }
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

/// `Mar 15, 08:00 AM`; the raw string when it does not parse.
pub fn format_feeding_time(entry: &FeedingEntry) -> String {
    parse_timestamp(&entry.timestamp)
        .map(|ts| ts.format("%b %-d, %I:%M %p").to_string())
        .unwrap_or_else(|| entry.timestamp.clone())
}

/// `3/20/2024 at 09:00`.
pub fn format_appointment_when(appointment: &Appointment) -> String {
    let date = parse_calendar_date(&appointment.date)
        .map(|dt| dt.format("%-m/%-d/%Y").to_string())
        .unwrap_or_else(|| appointment.date.clone());
    format!("{date} at {}", appointment.time)
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for idx in 0..column_count {
        write!(writer, "{:width$} ", headers[idx], width = widths[idx])?;
    }
    writeln!(writer)?;

    for idx in 0..column_count {
        write!(writer, "{:-<width$} ", "", width = widths[idx])?;
    }
    writeln!(writer)?;

    for row in rows {
        for idx in 0..column_count {
            let cell = &row[idx];
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::{YearMonth, day_summary, month_grid};
    use crate::feed::activity_feed;
    use crate::record::{AppointmentKind, FoodType};

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn sample() -> (Vec<FeedingEntry>, Vec<Appointment>) {
        let entries = vec![FeedingEntry {
            id: 11,
            amount: 50,
            food_type: FoodType::Wet,
            notify_time: "08:00".to_string(),
            notes: "ate it all".to_string(),
            timestamp: "2024-03-15T08:00:00.000Z".to_string(),
        }];
        let appointments = vec![Appointment {
            id: 22,
            kind: AppointmentKind::Vet,
            date: "2024-03-20".to_string(),
            time: "09:00".to_string(),
            notes: String::new(),
            timestamp: "2024-03-01T12:00:00.000Z".to_string(),
        }];
        (entries, appointments)
    }

    fn render<F>(f: F) -> String
    where
        F: FnOnce(&mut Vec<u8>) -> anyhow::Result<()>,
    {
        let mut buf = Vec::new();
        f(&mut buf).expect("render");
        String::from_utf8(buf).expect("utf8")
    }

    #[test]
    fn empty_feed_says_so() {
        let out = render(|buf| Renderer::plain().write_feed(buf, &[]));
        assert_eq!(
            out,
            "Recent Activity\nNo activity yet\nAdd feedings or appointments to get started\n"
        );
    }

    #[test]
    fn feed_rows_use_per_kind_formatting() {
        let (entries, appointments) = sample();
        let items = activity_feed(&entries, &appointments);
        let out = render(|buf| Renderer::plain().write_feed(buf, &items));

        assert!(out.contains("50g of wet food"));
        assert!(out.contains("Mar 15, 08:00 AM"));
        assert!(out.contains("Vet Appointment"));
        assert!(out.contains("3/20/2024 at 09:00"));
        assert!(out.contains("ate it all"));

        let appointment_line = out.lines().position(|l| l.contains("Vet Appointment"));
        let feeding_line = out.lines().position(|l| l.contains("50g"));
        assert!(appointment_line < feeding_line);
    }

    #[test]
    fn month_grid_marks_today_selection_and_activity() {
        let (entries, appointments) = sample();
        let grid = month_grid(YearMonth { year: 2024, month: 3 }, day(2024, 3, 15), &entries, &appointments);
        let out = render(|buf| Renderer::plain().write_month(buf, &grid, Some(day(2024, 3, 20))));

        assert!(out.contains("March 2024"));
        assert!(out.contains("Sun"));
        assert!(out.contains("[15]f"));
        assert!(out.contains("(20) a"));
        assert!(out.contains("today"));
    }

    #[test]
    fn day_details_list_appointments_then_feedings() {
        let (entries, appointments) = sample();
        let summary = day_summary(&entries, &appointments, day(2024, 3, 15));
        let out = render(|buf| Renderer::plain().write_day(buf, &summary));
        assert!(out.contains("March 15, 2024"));
        assert!(out.contains("Feedings (1)"));
        assert!(out.contains("#11  wet 50g  08:00 AM"));
        assert!(!out.contains("Appointments"));

        let empty = day_summary(&entries, &appointments, day(2024, 3, 16));
        let out = render(|buf| Renderer::plain().write_day(buf, &empty));
        assert!(out.contains("No activity on this day"));
    }

    #[test]
    fn strip_ansi_removes_escape_codes() {
        assert_eq!(strip_ansi("\x1b[31mred\x1b[0m"), "red");
    }
}
