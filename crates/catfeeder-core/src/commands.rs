use anyhow::{Context, anyhow};
use chrono::{DateTime, FixedOffset, NaiveDate};
use tracing::{debug, info, instrument, warn};

use crate::calendar::{YearMonth, date_key};
use crate::cli::Invocation;
use crate::config::Config;
use crate::datetime::{local_now, parse_clock_expr, parse_date_expr, parse_month_expr};
use crate::record::{AppointmentDraft, AppointmentKind, FeedingDraft, FoodType};
use crate::render::Renderer;
use crate::storage::Storage;
use crate::store::RecordStore;
use crate::view::{View, ViewState};

pub fn known_command_names() -> Vec<&'static str> {
    vec![
        "feed",
        "appoint",
        "delete",
        "home",
        "calendar",
        "day",
        "view",
        "help",
        "version",
        "_commands",
        "_show",
    ]
}

pub fn expand_command_abbrev<'a>(token: &'a str, known: &[&'a str]) -> Option<&'a str> {
    if known.contains(&token) {
        return Some(token);
    }

    let mut matches = known.iter().copied().filter(|name| name.starts_with(token));
    let first = matches.next()?;
    if matches.next().is_some() {
        None
    } else {
        Some(first)
    }
}

#[instrument(skip(store, cfg, renderer, inv))]
pub fn dispatch<S: Storage>(
    store: &mut RecordStore<S>,
    cfg: &Config,
    renderer: &mut Renderer,
    inv: Invocation,
) -> anyhow::Result<()> {
    let now = local_now();
    dispatch_at(store, cfg, renderer, inv, now)
}

/// Same as [`dispatch`] with the clock supplied by the caller.
#[instrument(skip(store, cfg, renderer, inv, now))]
pub fn dispatch_at<S: Storage>(
    store: &mut RecordStore<S>,
    cfg: &Config,
    renderer: &mut Renderer,
    inv: Invocation,
    now: DateTime<FixedOffset>,
) -> anyhow::Result<()> {
    let command = inv.command.as_str();
    debug!(command, args = ?inv.command_args, "dispatching command");

    match command {
        "feed" => cmd_feed(store, &inv.command_args, now),
        "appoint" => cmd_appoint(store, renderer, &inv.command_args, now),
        "delete" => cmd_delete(store, &inv.command_args),
        "home" => cmd_home(store, renderer, now),
        "calendar" => cmd_calendar(store, renderer, &inv.command_args, now),
        "day" => cmd_day(store, renderer, &inv.command_args, now),
        "view" => cmd_view(store, renderer, now),
        "_commands" => cmd_commands(),
        "_show" => cmd_show(cfg),
        "help" => cmd_help(),
        "version" => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        other => Err(anyhow!("unknown command: {other}")),
    }
}

#[instrument(skip(store, args, now))]
fn cmd_feed<S: Storage>(
    store: &mut RecordStore<S>,
    args: &[String],
    now: DateTime<FixedOffset>,
) -> anyhow::Result<()> {
    info!("command feed");

    let draft = parse_feeding_args(args)?;
    let entry = store.add_feeding(draft, &now)?;

    println!(
        "Logged feeding {}: {}g of {} food.",
        entry.id, entry.amount, entry.food_type
    );
    Ok(())
}

#[instrument(skip(store, renderer, args, now))]
fn cmd_appoint<S: Storage>(
    store: &mut RecordStore<S>,
    renderer: &mut Renderer,
    args: &[String],
    now: DateTime<FixedOffset>,
) -> anyhow::Result<()> {
    info!("command appoint");

    let draft = parse_appointment_args(args, now.date_naive())?;
    if draft.date.is_empty() {
        warn!("appointment saved without a date");
    }
    let (appointment, notice) = store.add_appointment(draft, &now)?;

    println!("Saved appointment {}.", appointment.id);
    renderer.print_notice(&notice)?;
    Ok(())
}

#[instrument(skip(store, args))]
fn cmd_delete<S: Storage>(store: &mut RecordStore<S>, args: &[String]) -> anyhow::Result<()> {
    info!("command delete");

    let [kind, id] = args else {
        return Err(anyhow!("delete requires: feeding|appointment ID"));
    };
    let id: u64 = id
        .parse()
        .with_context(|| format!("invalid record id: {id}"))?;

    match RecordKind::parse(kind)? {
        RecordKind::Feeding => {
            if store.delete_feeding(id)? {
                println!("Deleted feeding entry {id}.");
            } else {
                println!("No feeding entry {id}.");
            }
        }
        RecordKind::Appointment => {
            if store.delete_appointment(id)? {
                println!("Deleted appointment {id}.");
            } else {
                println!("No appointment {id}.");
            }
        }
    }
    Ok(())
}

#[instrument(skip(store, renderer, now))]
fn cmd_home<S: Storage>(
    store: &mut RecordStore<S>,
    renderer: &mut Renderer,
    now: DateTime<FixedOffset>,
) -> anyhow::Result<()> {
    info!("command home");

    let mut view = ViewState::load(store.storage(), now.date_naive());
    view.show_home();
    view.save(store.storage_mut())?;

    render_view(store, renderer, &view, now.date_naive())
}

#[instrument(skip(store, renderer, args, now))]
fn cmd_calendar<S: Storage>(
    store: &mut RecordStore<S>,
    renderer: &mut Renderer,
    args: &[String],
    now: DateTime<FixedOffset>,
) -> anyhow::Result<()> {
    info!("command calendar");

    let today = now.date_naive();
    let mut view = ViewState::load(store.storage(), today);
    view.show_calendar();

    for arg in args {
        match arg.to_ascii_lowercase().as_str() {
            "prev" | "previous" | "back" | "-" => view.navigate(-1)?,
            "next" | "forward" | "+" => view.navigate(1)?,
            "today" | "now" => view.focus_month(YearMonth::of(today)),
            other => {
                let (year, month) = parse_month_expr(other, today)?;
                let month = YearMonth::new(year, month)
                    .ok_or_else(|| anyhow!("invalid month: {other}"))?;
                view.focus_month(month);
            }
        }
    }

    debug!(month = %view.current_month, "calendar focus");
    view.save(store.storage_mut())?;
    render_view(store, renderer, &view, today)
}

#[instrument(skip(store, renderer, args, now))]
fn cmd_day<S: Storage>(
    store: &mut RecordStore<S>,
    renderer: &mut Renderer,
    args: &[String],
    now: DateTime<FixedOffset>,
) -> anyhow::Result<()> {
    info!("command day");

    if args.is_empty() {
        return Err(anyhow!("day requires a date (e.g. today, 2024-03-15) or 'clear'"));
    }

    let today = now.date_naive();
    let mut view = ViewState::load(store.storage(), today);
    let expr = args.join(" ");
    if expr.eq_ignore_ascii_case("clear") {
        view.clear_selection();
        view.show_calendar();
    } else {
        let date = parse_date_expr(&expr, today)?;
        view.select_date(date);
    }

    view.save(store.storage_mut())?;
    render_view(store, renderer, &view, today)
}

#[instrument(skip(store, renderer, now))]
fn cmd_view<S: Storage>(
    store: &mut RecordStore<S>,
    renderer: &mut Renderer,
    now: DateTime<FixedOffset>,
) -> anyhow::Result<()> {
    let view = ViewState::load(store.storage(), now.date_naive());
    render_view(store, renderer, &view, now.date_naive())
}

fn render_view<S: Storage>(
    store: &RecordStore<S>,
    renderer: &mut Renderer,
    view: &ViewState,
    today: NaiveDate,
) -> anyhow::Result<()> {
    match view.current_view {
        View::Home => renderer.print_feed(&store.activity_feed()),
        View::Calendar => {
            let grid = store.month_grid(view.current_month, today);
            renderer.print_month(&grid, view.selected_date)?;
            if let Some(selected) = view.selected_date {
                renderer.print_day(&store.day_summary(selected))?;
            }
            Ok(())
        }
    }
}

fn cmd_commands() -> anyhow::Result<()> {
    for name in known_command_names() {
        println!("{name}");
    }
    Ok(())
}

fn cmd_show(cfg: &Config) -> anyhow::Result<()> {
    for (k, v) in cfg.iter() {
        println!("{k}={v}");
    }
    Ok(())
}

fn cmd_help() -> anyhow::Result<()> {
    println!(
        "\
Usage: catfeeder [OPTIONS] [COMMAND] [ARGS...]

Commands:
  feed [amount:G] [food:wet|dry] [notify:HH:MM] [NOTES...]
  appoint [type:vet|grooming|vaccination|checkup|...] date:DATE [time:HH:MM] [NOTES...]
  delete feeding|appointment ID
  home                          recent activity, newest first
  calendar [prev|next|today|YYYY-MM|MONTH]
  day DATE|clear                select a day on the calendar
  view                          show the last view again

Commands may be abbreviated to any unique prefix."
    );
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RecordKind {
    Feeding,
    Appointment,
}

impl RecordKind {
    fn parse(token: &str) -> anyhow::Result<Self> {
        match token.to_ascii_lowercase().as_str() {
            "feeding" | "feed" | "f" => Ok(Self::Feeding),
            "appointment" | "appoint" | "appt" | "a" => Ok(Self::Appointment),
            other => Err(anyhow!("unknown record kind: {other} (expected feeding or appointment)")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Field {
    Amount(u32),
    Food(FoodType),
    Notify(String),
    Kind(AppointmentKind),
    Date(String),
    Time(String),
}

#[instrument(skip(args))]
fn parse_feeding_args(args: &[String]) -> anyhow::Result<FeedingDraft> {
    let mut draft = FeedingDraft::default();
    let (fields, notes) = split_fields_and_notes(args, None)?;

    for field in fields {
        match field {
            Field::Amount(amount) => draft.amount = amount,
            Field::Food(food) => draft.food_type = food,
            Field::Notify(time) => draft.notify_time = time,
            other => return Err(anyhow!("feed does not accept {other:?}")),
        }
    }
    draft.notes = notes;
    Ok(draft)
}

#[instrument(skip(args, today))]
fn parse_appointment_args(args: &[String], today: NaiveDate) -> anyhow::Result<AppointmentDraft> {
    let mut draft = AppointmentDraft::default();
    let (fields, notes) = split_fields_and_notes(args, Some(today))?;

    for field in fields {
        match field {
            Field::Kind(kind) => draft.kind = kind,
            Field::Date(date) => draft.date = date,
            Field::Time(time) => draft.time = time,
            other => return Err(anyhow!("appoint does not accept {other:?}")),
        }
    }
    draft.notes = notes;
    Ok(draft)
}

/// `key:value` tokens become fields, everything else is note text. `--` ends field parsing.
fn split_fields_and_notes(
    args: &[String],
    today: Option<NaiveDate>,
) -> anyhow::Result<(Vec<Field>, String)> {
    let mut fields = Vec::new();
    let mut note_parts = Vec::new();

    let mut literal = false;
    for arg in args {
        if arg == "--" && !literal {
            literal = true;
            continue;
        }

        if !literal && let Some(field) = parse_one_field(arg, today)? {
            fields.push(field);
            continue;
        }

        note_parts.push(arg.clone());
    }

    Ok((fields, note_parts.join(" ")))
}

fn parse_one_field(tok: &str, today: Option<NaiveDate>) -> anyhow::Result<Option<Field>> {
    let (key, value) = if let Some((k, v)) = tok.split_once(':') {
        (k, v)
    } else if let Some((k, v)) = tok.split_once('=') {
        (k, v)
    } else {
        return Ok(None);
    };

    let key = key.to_ascii_lowercase();

    match (key.as_str(), today) {
        ("amount" | "grams" | "g", None) => {
            let amount: u32 = value
                .trim_end_matches('g')
                .parse()
                .with_context(|| format!("invalid amount: {value}"))?;
            Ok(Some(Field::Amount(amount)))
        }
        ("food" | "foodtype", None) => FoodType::parse(value)
            .map(|food| Some(Field::Food(food)))
            .ok_or_else(|| anyhow!("unknown food type: {value} (expected wet or dry)")),
        ("notify" | "notifytime", None) => Ok(Some(Field::Notify(parse_clock_expr(value)?))),
        ("type" | "kind", Some(_)) => Ok(Some(Field::Kind(AppointmentKind::from(
            value.to_ascii_lowercase(),
        )))),
        ("date" | "on", Some(today)) => {
            let date = parse_date_expr(value, today)?;
            Ok(Some(Field::Date(date_key(date))))
        }
        ("time" | "at", Some(_)) => Ok(Some(Field::Time(parse_clock_expr(value)?))),
        _ => Ok(None),
    }
}
