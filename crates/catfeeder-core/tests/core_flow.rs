use catfeeder_core::calendar::{GridCell, YearMonth};
use catfeeder_core::cli::Invocation;
use catfeeder_core::commands::dispatch_at;
use catfeeder_core::config::Config;
use catfeeder_core::feed::{ActivityItem, FEED_LIMIT};
use catfeeder_core::record::{AppointmentDraft, AppointmentKind, FeedingDraft, FoodType};
use catfeeder_core::render::Renderer;
use catfeeder_core::storage::{FileStorage, VIEW_STATE_KEY, Storage};
use catfeeder_core::store::RecordStore;
use catfeeder_core::view::{View, ViewState};
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, TimeZone};
use tempfile::tempdir;

fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<FixedOffset> {
    FixedOffset::east_opt(0)
        .expect("offset")
        .with_ymd_and_hms(y, m, d, h, min, 0)
        .single()
        .expect("valid instant")
}

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

fn invoke(command: &str, args: &[&str]) -> Invocation {
    Invocation {
        command: command.to_string(),
        command_args: args.iter().map(ToString::to_string).collect(),
    }
}

#[test]
fn records_survive_a_restart() {
    let temp = tempdir().expect("tempdir");
    let now = at(2024, 3, 15, 8, 0);

    let entry = {
        let storage = FileStorage::open(temp.path()).expect("open storage");
        let mut store = RecordStore::load(storage);
        let entry = store
            .add_feeding(FeedingDraft::default(), &now)
            .expect("add feeding");
        assert_eq!(entry.amount, 50);
        assert_eq!(entry.food_type, FoodType::Wet);
        assert_eq!(entry.notify_time, "08:00");
        assert_eq!(entry.notes, "");
        assert_eq!(entry.timestamp, "2024-03-15T08:00:00.000Z");
        entry
    };

    let storage = FileStorage::open(temp.path()).expect("reopen storage");
    let store = RecordStore::load(storage);
    assert_eq!(store.feedings(), std::slice::from_ref(&entry));
    assert_eq!(store.entries_for_date(day(2024, 3, 15)), vec![&entry]);
    assert!(store.entries_for_date(day(2024, 3, 16)).is_empty());
    assert!(store.entries_for_date(day(2024, 3, 14)).is_empty());
    assert!(store.has_activity(day(2024, 3, 15)));
    assert!(!store.has_activity(day(2024, 3, 16)));
}

#[test]
fn appointment_add_and_delete_rewrites_file() {
    let temp = tempdir().expect("tempdir");
    let storage = FileStorage::open(temp.path()).expect("open storage");
    let appointments_file = storage.path_for("appointments");
    let mut store = RecordStore::load(storage);

    let draft = AppointmentDraft {
        kind: AppointmentKind::Vet,
        date: "2024-03-20".to_string(),
        ..AppointmentDraft::default()
    };
    let (appointment, notice) = store
        .add_appointment(draft, &at(2024, 3, 15, 10, 0))
        .expect("add appointment");
    assert_eq!(
        notice.to_string(),
        "Appointment reminder set for 2024-03-20 at 09:00"
    );
    assert_eq!(store.appointments_for_date(day(2024, 3, 20)).len(), 1);

    let on_disk = std::fs::read_to_string(&appointments_file).expect("read appointments");
    assert!(on_disk.contains("\"type\": \"vet\"") || on_disk.contains("\"type\":\"vet\""));

    assert!(store.delete_appointment(appointment.id).expect("delete"));
    assert!(!store.delete_appointment(appointment.id).expect("delete again"));

    let on_disk = std::fs::read_to_string(&appointments_file).expect("read appointments");
    assert!(!on_disk.contains(&appointment.id.to_string()));
    assert!(store.appointments_for_date(day(2024, 3, 20)).is_empty());
}

#[test]
fn feed_is_capped_and_newest_first() {
    let temp = tempdir().expect("tempdir");
    let storage = FileStorage::open(temp.path()).expect("open storage");
    let mut store = RecordStore::load(storage);

    let start = at(2024, 3, 1, 8, 0);
    for offset in 0..12 {
        let now = start + Duration::hours(offset);
        store
            .add_feeding(FeedingDraft::default(), &now)
            .expect("add feeding");
    }
    let draft = AppointmentDraft {
        date: "2024-03-02".to_string(),
        ..AppointmentDraft::default()
    };
    store
        .add_appointment(draft, &start)
        .expect("add appointment");

    let feed = store.activity_feed();
    assert_eq!(feed.len(), FEED_LIMIT);
    assert!(matches!(feed[0], ActivityItem::Appointment(_)));
    for pair in feed.windows(2) {
        assert!(pair[0].sort_key() >= pair[1].sort_key());
    }
}

#[test]
fn april_2020_grid_and_year_rollover() {
    let temp = tempdir().expect("tempdir");
    let storage = FileStorage::open(temp.path()).expect("open storage");
    let store = RecordStore::load(storage);

    let april = YearMonth::new(2020, 4).expect("month");
    let grid = store.month_grid(april, day(2020, 4, 15));
    assert_eq!(grid.leading_blanks(), 3);
    assert_eq!(grid.days().count(), 30);
    assert!(grid.days().any(|cell| cell.is_today && cell.day == 15));
    assert!(matches!(grid.cells[0], GridCell::Blank));

    let january = YearMonth::new(2024, 1).expect("month");
    assert_eq!(january.prev(), YearMonth::new(2023, 12));
}

#[test]
fn calendar_commands_persist_view_state() {
    let temp = tempdir().expect("tempdir");
    let storage = FileStorage::open(temp.path()).expect("open storage");
    let mut store = RecordStore::load(storage);
    let cfg = Config::default();
    let mut renderer = Renderer::plain();
    let now = at(2024, 1, 10, 12, 0);

    dispatch_at(&mut store, &cfg, &mut renderer, invoke("calendar", &["prev"]), now)
        .expect("calendar prev");
    let state = ViewState::load(store.storage(), now.date_naive());
    assert_eq!(state.current_view, View::Calendar);
    assert_eq!(state.current_month, YearMonth::new(2023, 12).expect("month"));

    dispatch_at(&mut store, &cfg, &mut renderer, invoke("day", &["2024-02-14"]), now)
        .expect("select day");
    let state = ViewState::load(store.storage(), now.date_naive());
    assert_eq!(state.current_month, YearMonth::new(2024, 2).expect("month"));
    assert_eq!(state.selected_date, Some(day(2024, 2, 14)));

    dispatch_at(&mut store, &cfg, &mut renderer, invoke("home", &[]), now).expect("home");
    let raw = store
        .storage()
        .get_item(VIEW_STATE_KEY)
        .expect("read view state")
        .expect("view state stored");
    assert!(raw.contains("home"));
}

#[test]
fn feed_and_delete_commands_round_trip() {
    let temp = tempdir().expect("tempdir");
    let storage = FileStorage::open(temp.path()).expect("open storage");
    let mut store = RecordStore::load(storage);
    let cfg = Config::default();
    let mut renderer = Renderer::plain();
    let now = at(2024, 3, 15, 8, 0);

    dispatch_at(
        &mut store,
        &cfg,
        &mut renderer,
        invoke("feed", &["amount:30", "food:dry", "picky", "today"]),
        now,
    )
    .expect("feed");
    let entry = store.feedings()[0].clone();
    assert_eq!(entry.amount, 30);
    assert_eq!(entry.food_type, FoodType::Dry);
    assert_eq!(entry.notes, "picky today");

    let id = entry.id.to_string();
    dispatch_at(&mut store, &cfg, &mut renderer, invoke("delete", &["feeding", &id]), now)
        .expect("delete");
    assert!(store.feedings().is_empty());

    assert!(
        dispatch_at(&mut store, &cfg, &mut renderer, invoke("delete", &["feeding", "abc"]), now)
            .is_err()
    );
}

#[test]
fn corrupt_collection_loads_as_empty() {
    let temp = tempdir().expect("tempdir");
    let mut storage = FileStorage::open(temp.path()).expect("open storage");
    storage
        .set_item("feedingEntries", "{not json")
        .expect("write garbage");

    let mut store = RecordStore::load(storage);
    assert!(store.feedings().is_empty());
    store
        .add_feeding(FeedingDraft::default(), &at(2024, 3, 15, 8, 0))
        .expect("add after corruption");
    assert_eq!(store.feedings().len(), 1);
}

#[test]
fn out_of_range_view_state_renders_defaults() {
    let temp = tempdir().expect("tempdir");
    let mut storage = FileStorage::open(temp.path()).expect("open storage");
    storage
        .set_item(
            VIEW_STATE_KEY,
            r#"{"currentView":"calendar","currentMonth":{"year":2147483647,"month":12}}"#,
        )
        .expect("write view state");
    let mut store = RecordStore::load(storage);
    let cfg = Config::default();
    let mut renderer = Renderer::plain();
    let now = at(2024, 3, 15, 8, 0);

    dispatch_at(&mut store, &cfg, &mut renderer, invoke("view", &[]), now).expect("view");
    dispatch_at(&mut store, &cfg, &mut renderer, invoke("calendar", &["next"]), now)
        .expect("calendar next");
    let state = ViewState::load(store.storage(), now.date_naive());
    assert_eq!(state.current_month, YearMonth::new(2024, 4).expect("month"));
}

#[test]
fn huge_relative_day_is_rejected() {
    let temp = tempdir().expect("tempdir");
    let storage = FileStorage::open(temp.path()).expect("open storage");
    let mut store = RecordStore::load(storage);
    let cfg = Config::default();
    let mut renderer = Renderer::plain();
    let now = at(2024, 3, 15, 8, 0);

    assert!(
        dispatch_at(&mut store, &cfg, &mut renderer, invoke("day", &["+99999999999999d"]), now)
            .is_err()
    );
    assert!(
        dispatch_at(
            &mut store,
            &cfg,
            &mut renderer,
            invoke("appoint", &["date:+99999999999999d"]),
            now,
        )
        .is_err()
    );
    assert!(store.appointments().is_empty());
}
