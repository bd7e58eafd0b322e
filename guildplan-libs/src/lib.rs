pub mod blocks;
pub mod cell;
pub mod command;
pub mod matrix;
pub mod migrate;
pub mod room;
pub mod session;
pub mod store;
pub mod week;

pub use blocks::{aggregate, fully_synchronized_hours, Block, BlockError};
pub use cell::{Cell, CellState};
pub use command::{parse_command, EventCommand, ParseError};
pub use matrix::Matrix;
pub use room::{Event, Player, Room, WeekEntry};
pub use session::{Session, SessionError};
pub use store::{FileStore, MemoryStore, RoomStore, StoreError};
pub use week::WeekKey;

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    fn wednesday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 15).unwrap()
    }

    fn roster(names: &[&str]) -> Vec<crate::room::Player> {
        names
            .iter()
            .map(|name| crate::room::Player::with_id(&name.to_lowercase(), name))
            .collect()
    }

    #[test]
    fn cycling_four_times_is_identity() {
        use crate::cell::CellState;
        use crate::room::Room;
        use crate::week::WeekKey;

        let week = WeekKey::this_week(wednesday());
        let (room, player) = Room::default().add_player("Gale");
        let room = room.with_week(week);

        for start in CellState::ALL.iter() {
            let mut state = *start;
            for _ in 0..4 {
                state = state.next();
            }
            assert_eq!(state, *start);
        }

        let cycled = (0..4).fold(room.clone(), |r, _| r.cycle_cell(week, 3, 7, &player.id));
        assert_eq!(cycled, room);

        let once = room.cycle_cell(week, 3, 7, &player.id);
        assert_eq!(once.cell(week, 3, 7, &player.id).state, CellState::Free);
        // copy on write: the original room is untouched
        assert_eq!(room.cell(week, 3, 7, &player.id).state, CellState::Empty);
    }

    #[test]
    fn missing_cells_read_as_empty() {
        use crate::cell::Cell;
        use crate::room::Room;
        use crate::week::WeekKey;

        let week = WeekKey::this_week(wednesday());
        let room = Room::seed(week);
        let player = room.players[0].id.clone();

        assert_eq!(room.cell(week, 0, 0, "nobody"), Cell::default());
        assert_eq!(room.cell(week.plus_weeks(3), 0, 0, &player), Cell::default());
        assert_eq!(room.cell(week, 7, 0, &player), Cell::default());
        assert_eq!(room.cell(week, 0, 16, &player), Cell::default());
    }

    #[test]
    fn notes_are_trimmed_and_cleared() {
        use crate::room::Room;
        use crate::week::WeekKey;

        let week = WeekKey::this_week(wednesday());
        let room = Room::seed(week);
        let player = room.players[0].id.clone();

        let noted = room.set_cell_note(week, 1, 2, &player, "  dentist ");
        assert_eq!(noted.cell(week, 1, 2, &player).note, "dentist");
        assert!(noted.cell(week, 1, 2, &player).has_note());

        let cleared = noted.set_cell_note(week, 1, 2, &player, "");
        assert!(!cleared.cell(week, 1, 2, &player).has_note());
    }

    #[test]
    fn players_get_matrices_in_every_week() {
        use crate::room::Room;
        use crate::week::WeekKey;

        let week = WeekKey::this_week(wednesday());
        let room = Room::seed(week).with_week(week.plus_weeks(1));

        let (room, wyll) = room.add_player("  Wyll ");
        assert_eq!(wyll.name, "Wyll");
        assert!(room
            .weeks
            .values()
            .all(|entry| entry.availability.len() == 2 && entry.matrix(&wyll.id).is_some()));

        let room = room.remove_player(&wyll.id);
        assert_eq!(room.players.len(), 1);
        assert!(room.weeks.values().all(|entry| entry.matrix(&wyll.id).is_none()));

        // a week referenced later is created for the remaining roster
        let later = week.plus_weeks(5);
        let room = room.with_week(later);
        assert_eq!(room.weeks[&later].availability.len(), 1);
    }

    #[test]
    fn reset_clears_states_and_notes() {
        use crate::room::Room;
        use crate::week::WeekKey;

        let week = WeekKey::this_week(wednesday());
        let room = Room::seed(week);
        let player = room.players[0].id.clone();

        let edited = room
            .cycle_cell(week, 0, 0, &player)
            .set_cell_note(week, 0, 0, &player, "late");
        let reset = edited.reset_availability();

        assert!(reset.weeks[&week].availability[&player].is_blank());
    }

    #[test]
    fn week_keys() {
        use crate::week::{WeekKey, WeekKeyError};

        let date = |d| NaiveDate::from_ymd_opt(2025, 1, d).unwrap();

        // Wednesday -> Monday two days before
        assert_eq!(WeekKey::this_week(date(15)).monday(), date(13));
        // Sunday -> Monday six days before, not the day after
        assert_eq!(WeekKey::this_week(date(19)).monday(), date(13));
        // Monday is its own key
        assert_eq!(WeekKey::this_week(date(13)).monday(), date(13));

        assert_eq!(WeekKey::next_week(date(19)).to_string(), "2025-01-20");
        assert_eq!(WeekKey::this_week(date(15)).plus_weeks(52).to_string(), "2026-01-12");

        // crossing a year boundary
        let new_year = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        assert_eq!(WeekKey::this_week(new_year).to_string(), "2025-12-29");

        assert_eq!("2025-01-13".parse::<WeekKey>(), Ok(WeekKey::this_week(date(15))));
        assert_eq!(
            "2025-01-14".parse::<WeekKey>(),
            Err(WeekKeyError::NotMonday(date(14)))
        );
        assert!(matches!(
            "13.1.2025".parse::<WeekKey>(),
            Err(WeekKeyError::Malformed(_))
        ));

        assert_eq!(WeekKey::this_week(date(15)).label(), "13. 1. 2025 – 19. 1. 2025");
    }

    #[test]
    fn parses_commands() {
        use crate::command::{parse_command, EventCommand, ParseError};

        assert_eq!(
            parse_command("so 20-24 raid"),
            Ok(EventCommand {
                week_offset: 0,
                day: 5,
                start_hour: 20,
                end_hour: 24,
                title: "raid".to_string(),
            })
        );

        let command = parse_command("  +2 ČT 9 – 12   Long rest at camp ").unwrap();
        assert_eq!(command.week_offset, 2);
        assert_eq!(command.day, 3);
        assert_eq!((command.start_hour, command.end_hour), (9, 12));
        assert_eq!(command.title, "Long rest at camp");
        assert_eq!(command.summary(), "Čt 09:00–12:00 • Long rest at camp");

        assert_eq!(parse_command("pá 0-1").unwrap().title, "BG3 event");
        assert_eq!(parse_command("út 18-20").unwrap().day, 1);
        assert_eq!(parse_command("ne 18-20").unwrap().day, 6);

        assert!(matches!(parse_command("xx 20-24"), Err(ParseError::Day(_))));
        assert!(matches!(
            parse_command("so 24-20"),
            Err(ParseError::TimeRange { .. })
        ));
        assert!(matches!(
            parse_command("so 20-20"),
            Err(ParseError::TimeRange { .. })
        ));
        assert!(matches!(
            parse_command("so 20-25"),
            Err(ParseError::TimeRange { .. })
        ));
        assert!(matches!(
            parse_command("so 24-24"),
            Err(ParseError::TimeRange { .. })
        ));
        assert!(matches!(
            parse_command("+53 so 20-24"),
            Err(ParseError::WeekOffset(_))
        ));
        assert!(matches!(
            parse_command("+99999999999999999999 so 20-24"),
            Err(ParseError::WeekOffset(_))
        ));
        assert!(matches!(parse_command(""), Err(ParseError::Format)));
        // only ASCII digits count as hours or offsets
        assert_eq!(parse_command("so ٢٠-٢٤ raid"), Err(ParseError::Format));
        assert_eq!(parse_command("+١ so 20-24 raid"), Err(ParseError::Format));
        assert_eq!(parse_command("so 20-２４"), Err(ParseError::Format));
        assert!(matches!(parse_command("so 20"), Err(ParseError::Format)));
        assert!(matches!(parse_command("so 123-124"), Err(ParseError::Format)));
    }

    #[test]
    fn block_spans_free_and_maybe() {
        use crate::blocks::aggregate;
        use crate::cell::CellState;
        use crate::matrix::Matrix;
        use crate::room::WeekEntry;

        let players = roster(&["A", "B"]);
        let mut week = WeekEntry::default();
        week.availability
            .insert("a".into(), Matrix::blank().with_states(0, 0..2, CellState::Free));
        week.availability
            .insert("b".into(), Matrix::blank().with_states(0, 0..2, CellState::Maybe));

        let blocks = aggregate(Some(&week), &players, 2).unwrap();
        assert_eq!(blocks.len(), 1);

        let block = &blocks[0];
        assert_eq!((block.day, block.start_hour, block.end_hour), (0, 8, 10));
        assert_eq!(block.fully_available, vec!["A"]);
        assert_eq!(block.partially_available, vec!["B"]);
        assert!(block.unavailable.is_empty());
        assert!(!block.is_unanimous(players.len()));
        assert_eq!(block.label(), "Po 08:00–10:00");
    }

    #[test]
    fn labels_survive_bad_days() {
        use crate::blocks::Block;
        use crate::command::EventCommand;
        use crate::matrix::day_label;

        assert_eq!(day_label(6), "Ne");
        assert_eq!(day_label(7), "?");

        let block: Block = serde_json::from_value(serde_json::json!({
            "day": 9,
            "startHour": 20,
            "endHour": 22,
            "fullyAvailable": [],
            "partiallyAvailable": [],
            "unavailable": [],
        }))
        .unwrap();
        assert_eq!(block.label(), "? 20:00–22:00");

        let command = EventCommand {
            week_offset: 0,
            day: 200,
            start_hour: 8,
            end_hour: 9,
            title: "raid".to_string(),
        };
        assert_eq!(command.summary(), "? 08:00–09:00 • raid");
    }

    #[test]
    fn block_classification_uses_the_whole_span() {
        use crate::blocks::aggregate;
        use crate::cell::CellState;
        use crate::matrix::Matrix;
        use crate::room::WeekEntry;

        let players = roster(&["Lae'zel", "Minthara", "Halsin"]);
        let mut week = WeekEntry::default();
        // free at 20:00, busy at 21:00
        week.availability.insert(
            "lae'zel".into(),
            Matrix::blank()
                .with_states(5, 12..13, CellState::Free)
                .with_states(5, 13..14, CellState::Busy),
        );
        week.availability
            .insert("minthara".into(), Matrix::blank().with_states(5, 12..14, CellState::Free));
        week.availability
            .insert("halsin".into(), Matrix::blank().with_states(5, 12..14, CellState::Free));

        let blocks = aggregate(Some(&week), &players, 2).unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!((blocks[0].start_hour, blocks[0].end_hour), (20, 22));
        assert_eq!(blocks[0].fully_available, vec!["Minthara", "Halsin"]);
        assert_eq!(blocks[0].partially_available, vec!["Lae'zel"]);

        let blocks = aggregate(Some(&week), &players, 1).unwrap();
        assert_eq!(blocks.len(), 1);

        let blocks = aggregate(Some(&week), &players, 3).unwrap();
        assert_eq!((blocks[0].start_hour, blocks[0].end_hour), (20, 21));
        assert!(blocks[0].is_unanimous(3));
    }

    #[test]
    fn blocks_are_ordered_and_disjoint() {
        use crate::blocks::aggregate;
        use crate::cell::CellState;
        use crate::matrix::Matrix;
        use crate::room::WeekEntry;
        use itertools::Itertools;

        let players = roster(&["A", "B", "C"]);
        let mut week = WeekEntry::default();
        week.availability.insert(
            "a".into(),
            Matrix::blank()
                .with_states(2, 0..16, CellState::Free)
                .with_states(6, 15..16, CellState::Maybe),
        );
        week.availability.insert(
            "b".into(),
            Matrix::blank()
                .with_states(2, 0..3, CellState::Free)
                .with_states(2, 5..9, CellState::Maybe)
                .with_states(2, 12..16, CellState::Free)
                .with_states(6, 15..16, CellState::Free),
        );
        week.availability
            .insert("c".into(), Matrix::blank().with_states(2, 7..14, CellState::Busy));

        let blocks = aggregate(Some(&week), &players, 2).unwrap();
        let spans = blocks
            .iter()
            .map(|b| (b.day, b.start_hour, b.end_hour))
            .collect::<Vec<_>>();
        assert_eq!(
            spans,
            vec![(2, 8, 11), (2, 13, 17), (2, 20, 24), (6, 23, 24)]
        );

        assert!(blocks
            .iter()
            .tuple_windows()
            .all(|(a, b)| (a.day, a.end_hour) <= (b.day, b.start_hour)));

        // C is busy or empty throughout
        assert!(blocks.iter().all(|b| b.unavailable == vec!["C"]));
        assert_eq!(blocks[2].fully_available, vec!["A", "B"]);
        assert_eq!(blocks[3].fully_available, vec!["B"]);
        assert_eq!(blocks[3].partially_available, vec!["A"]);
    }

    #[test]
    fn block_thresholds() {
        use crate::blocks::{aggregate, BlockError};
        use crate::cell::CellState;
        use crate::matrix::Matrix;
        use crate::room::WeekEntry;

        let players = roster(&["A", "B"]);
        let mut week = WeekEntry::default();
        for player in &players {
            week.availability.insert(
                player.id.clone(),
                Matrix::blank().with_states(4, 0..16, CellState::Free),
            );
        }

        assert_eq!(
            aggregate(Some(&week), &players, 0),
            Err(BlockError::InvalidThreshold(0))
        );
        assert_eq!(aggregate(Some(&week), &players, 3), Ok(vec![]));
        assert_eq!(aggregate(None, &players, 1), Ok(vec![]));
        assert_eq!(aggregate(Some(&week), &[], 1), Ok(vec![]));

        // a whole free day is one block up to midnight
        let blocks = aggregate(Some(&week), &players, 2).unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!((blocks[0].start_hour, blocks[0].end_hour, blocks[0].hours()), (8, 24, 16));
    }

    #[test]
    fn players_without_a_matrix_are_unavailable() {
        use crate::blocks::aggregate;
        use crate::cell::CellState;
        use crate::matrix::Matrix;
        use crate::room::WeekEntry;

        let players = roster(&["A", "Ghost"]);
        let mut week = WeekEntry::default();
        week.availability
            .insert("a".into(), Matrix::blank().with_states(1, 3..5, CellState::Free));

        let blocks = aggregate(Some(&week), &players, 1).unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].unavailable, vec!["Ghost"]);
    }

    #[test]
    fn duplicate_names_are_classified_separately() {
        use crate::blocks::aggregate;
        use crate::cell::CellState;
        use crate::matrix::Matrix;
        use crate::room::{Player, WeekEntry};

        let players = vec![Player::with_id("1", "Tav"), Player::with_id("2", "Tav")];
        let mut week = WeekEntry::default();
        week.availability
            .insert("1".into(), Matrix::blank().with_states(0, 0..1, CellState::Free));
        week.availability
            .insert("2".into(), Matrix::blank().with_states(0, 0..1, CellState::Maybe));

        let blocks = aggregate(Some(&week), &players, 2).unwrap();
        assert_eq!(blocks[0].fully_available, vec!["Tav"]);
        assert_eq!(blocks[0].partially_available, vec!["Tav"]);
    }

    #[test]
    fn synchronized_hours_ignore_maybe() {
        use crate::blocks::fully_synchronized_hours;
        use crate::cell::CellState;
        use crate::matrix::Matrix;
        use crate::room::WeekEntry;

        let players = roster(&["A", "B"]);
        let mut week = WeekEntry::default();
        week.availability.insert(
            "a".into(),
            Matrix::blank()
                .with_states(0, 0..4, CellState::Free)
                .with_states(3, 0..2, CellState::Free),
        );
        week.availability.insert(
            "b".into(),
            Matrix::blank()
                .with_states(0, 0..2, CellState::Free)
                .with_states(0, 2..4, CellState::Maybe)
                .with_states(3, 1..2, CellState::Free),
        );

        assert_eq!(fully_synchronized_hours(Some(&week), &players), 3);
        assert_eq!(fully_synchronized_hours(Some(&week), &[]), 0);
        assert_eq!(fully_synchronized_hours(None, &players), 0);
    }

    #[test]
    fn events_sort_and_cover_hours() {
        use crate::room::{Event, Room};
        use crate::week::WeekKey;
        use chrono::Utc;

        let week = WeekKey::this_week(wednesday());
        let event = |id: &str, day, start_hour, end_hour| Event {
            id: id.to_string(),
            title: id.to_string(),
            day,
            start_hour,
            end_hour,
            created_at: Utc::now(),
            created_by: "discord".to_string(),
        };

        let room = Room::default()
            .push_event(week, event("late", 5, 20, 24))
            .push_event(week, event("early", 5, 9, 11))
            .push_event(week, event("monday", 0, 18, 20));

        // stored in insertion order, listed in calendar order
        assert_eq!(room.events[&week][0].id, "late");
        let listed = room.events_for(week).iter().map(|e| e.id.as_str()).collect::<Vec<_>>();
        assert_eq!(listed, vec!["monday", "early", "late"]);

        assert!(room.has_event(week, 5, 12)); // 20:00
        assert!(room.has_event(week, 5, 15)); // 23:00
        assert!(!room.has_event(week, 5, 11)); // 19:00
        assert!(!room.has_event(week, 5, 3)); // 11:00, end is exclusive
        assert!(!room.has_event(week.plus_weeks(1), 5, 12));
    }

    #[test]
    fn room_json_shape() {
        use crate::cell::CellState;
        use crate::room::{Player, Room};
        use crate::week::WeekKey;
        use serde_json::json;

        let week = WeekKey::this_week(wednesday());
        let room = Room {
            players: vec![Player::with_id("p1", "Jaheira")],
            ..Room::default()
        }
        .with_week(week)
        .cycle_cell(week, 0, 0, "p1");

        let blob = serde_json::to_value(&room).unwrap();
        let matrix = &blob["weeks"]["2025-01-13"]["availability"]["p1"];
        assert_eq!(matrix.as_array().unwrap().len(), 7);
        assert_eq!(matrix[0].as_array().unwrap().len(), 16);
        assert_eq!(matrix[0][0], json!({ "state": "free", "note": "" }));
        assert_eq!(blob["players"], json!([{ "id": "p1", "name": "Jaheira" }]));
        assert_eq!(blob["events"], json!({}));

        let decoded: Room = serde_json::from_value(blob).unwrap();
        assert_eq!(decoded.cell(week, 0, 0, "p1").state, CellState::Free);

        // jagged grids are rejected
        let mut jagged = serde_json::to_value(&room).unwrap();
        jagged["weeks"]["2025-01-13"]["availability"]["p1"][0]
            .as_array_mut()
            .unwrap()
            .pop();
        assert!(serde_json::from_value::<Room>(jagged).is_err());
    }

    #[test]
    fn upgrades_legacy_rooms() {
        use crate::cell::CellState;
        use crate::matrix::Matrix;
        use crate::migrate::{detect, upgrade, MigrationError, SchemaVersion};
        use crate::week::WeekKey;
        use serde_json::json;

        let matrix = Matrix::blank().with_states(2, 4..6, CellState::Maybe);
        let legacy = json!({
            "players": [{ "id": "p1", "name": "Karlach" }],
            "availability": { "p1": matrix },
        });
        assert_eq!(detect(legacy.as_object().unwrap()), SchemaVersion::Legacy);

        let room = upgrade(legacy, wednesday()).unwrap();
        let week = WeekKey::this_week(wednesday());
        assert_eq!(room.weeks.len(), 1);
        assert_eq!(room.cell(week, 2, 5, "p1").state, CellState::Maybe);
        assert!(room.events.is_empty());

        // weeks without events
        let partial = json!({ "players": [], "weeks": { "2025-01-13": { "availability": {} } } });
        assert_eq!(detect(partial.as_object().unwrap()), SchemaVersion::Current);
        assert!(upgrade(partial, wednesday()).unwrap().events.is_empty());

        assert!(matches!(upgrade(json!([]), wednesday()), Err(MigrationError::NotAnObject)));
        assert!(matches!(
            upgrade(json!({ "weeks": { "monday": {} } }), wednesday()),
            Err(MigrationError::Decode(_))
        ));
    }

    #[test]
    fn memory_store_seeds_once() {
        use crate::room::{Player, Room};
        use crate::store::{MemoryStore, RoomStore};

        let store = MemoryStore::new();
        let seed = Room {
            players: vec![Player::with_id("p1", "Gale")],
            ..Room::default()
        };

        let first = store.load("bg3", &seed, wednesday()).unwrap();
        assert_eq!(first, seed);

        let other_seed = Room::default();
        let second = store.load("bg3", &other_seed, wednesday()).unwrap();
        assert_eq!(second, seed);
        assert_eq!(store.writes(), 1);
    }

    #[test]
    fn save_is_idempotent() {
        use crate::room::Room;
        use crate::store::{MemoryStore, RoomStore};
        use crate::week::WeekKey;

        let store = MemoryStore::new();
        let room = Room::seed(WeekKey::this_week(wednesday()));

        store.save("bg3", &room).unwrap();
        let once = store.fetch("bg3").unwrap();
        store.save("bg3", &room).unwrap();
        let twice = store.fetch("bg3").unwrap();

        assert_eq!(once, twice);
        assert_eq!(store.load("bg3", &Room::default(), wednesday()).unwrap(), room);
    }

    #[test]
    fn concurrent_first_access_keeps_the_winner() {
        use crate::room::{Player, Room};
        use crate::store::{MemoryStore, RoomStore};
        use std::sync::{Arc, Barrier};
        use std::thread;

        let store = Arc::new(MemoryStore::new());
        let barrier = Arc::new(Barrier::new(8));

        let handles = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    let seed = Room {
                        players: vec![Player::with_id(&i.to_string(), "racer")],
                        ..Room::default()
                    };
                    barrier.wait();
                    store.load("race", &seed, wednesday()).unwrap()
                })
            })
            .collect::<Vec<_>>();

        let rooms = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .collect::<Vec<_>>();

        assert!(rooms.iter().all(|room| *room == rooms[0]));
        assert_eq!(store.writes(), 1);
    }

    #[test]
    fn file_store_round_trip() {
        use crate::room::Room;
        use crate::store::{FileStore, RoomStore, StoreError};
        use crate::week::WeekKey;
        use serde_json::json;

        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        let week = WeekKey::this_week(wednesday());
        let seed = Room::seed(week);

        assert_eq!(store.fetch("bg3").unwrap(), None);
        assert_eq!(store.load("bg3", &seed, wednesday()).unwrap(), seed);
        assert!(matches!(
            store.create("bg3", &json!({})),
            Err(StoreError::AlreadyExists(_))
        ));

        let player = seed.players[0].id.clone();
        let edited = seed.cycle_cell(week, 0, 0, &player);
        store.save("bg3", &edited).unwrap();
        assert_eq!(store.load("bg3", &seed, wednesday()).unwrap(), edited);

        // no temp files are left behind
        let files = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(files, 1);

        for slug in ["", "../etc", "a/b", "room.json"] {
            assert!(matches!(store.fetch(slug), Err(StoreError::InvalidSlug(_))));
        }
    }

    #[test]
    fn file_store_tolerates_creation_race() {
        use crate::room::{Player, Room};
        use crate::store::{FileStore, RoomStore};
        use std::sync::{Arc, Barrier};
        use std::thread;

        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FileStore::open(dir.path()).unwrap());
        let barrier = Arc::new(Barrier::new(4));

        let rooms = (0..4)
            .map(|i| {
                let store = Arc::clone(&store);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    let seed = Room {
                        players: vec![Player::with_id(&i.to_string(), "racer")],
                        ..Room::default()
                    };
                    barrier.wait();
                    store.load("race", &seed, wednesday()).unwrap()
                })
            })
            .collect::<Vec<_>>()
            .into_iter()
            .map(|h| h.join().unwrap())
            .collect::<Vec<_>>();

        assert!(rooms.iter().all(|room| *room == rooms[0]));
    }

    #[test]
    fn session_edits() {
        use crate::cell::CellState;
        use crate::session::{Session, SessionError};
        use crate::store::{MemoryStore, RoomStore};

        let store = MemoryStore::new();
        let mut session = Session::open(&store, "bg3", wednesday()).unwrap();

        // seeded with one player, this and next week
        assert_eq!(session.room().players.len(), 1);
        assert_eq!(session.room().weeks.len(), 2);
        assert_eq!(session.min_free(), 1);
        let me = session.active_player().unwrap().clone();
        assert_eq!(me.name, "Já");

        let week = session.this_week();
        let before = session.room().clone();
        let after = session.cycle_cell(week, 5, 12).unwrap();
        assert_eq!(after.cell(week, 5, 12, &me.id).state, CellState::Free);
        assert_eq!(before.cell(week, 5, 12, &me.id).state, CellState::Empty);
        assert_eq!(session.room(), &after);

        let after = session.edit_note(week, 5, 12, " after work ").unwrap();
        assert_eq!(after.cell(week, 5, 12, &me.id).note, "after work");

        assert!(matches!(
            session.cycle_cell(week, 7, 0),
            Err(SessionError::OffGrid { day: 7, hour: 0 })
        ));

        let (room, astarion) = session.add_player("Astarion").unwrap();
        assert_eq!(room.players.len(), 2);
        assert_eq!(session.active_player().unwrap().id, astarion.id);
        assert_eq!(session.min_free(), 2);
        assert!(matches!(session.add_player("   "), Err(SessionError::EmptyName)));

        session.cycle_cell(week, 5, 12).unwrap();
        let blocks = session.blocks().unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].fully_available, vec!["Já", "Astarion"]);
        assert_eq!(session.fully_synchronized_hours(), 1);

        session.set_min_free(10);
        assert_eq!(session.min_free(), 2);
        session.set_min_free(0);
        assert_eq!(session.min_free(), 1);

        let (room, removed) = session.remove_active_player().unwrap();
        assert_eq!(removed.id, astarion.id);
        assert_eq!(room.players, vec![me.clone()]);
        assert_eq!(session.active_player().unwrap().id, me.id);

        let reset = session.reset_all();
        assert!(reset.weeks.values().all(|w| w.availability[&me.id].is_blank()));

        // nothing was persisted by the session itself
        assert_eq!(store.writes(), 1);
    }

    #[test]
    fn session_selection() {
        use crate::room::Room;
        use crate::session::{Session, SessionError};

        let mut session = Session::from_room("empty", Room::default(), wednesday());
        assert!(session.active_player().is_none());
        assert_eq!(session.min_free(), 1);
        assert!(matches!(
            session.cycle_cell(session.this_week(), 0, 0),
            Err(SessionError::NoActivePlayer)
        ));
        assert!(matches!(
            session.remove_active_player(),
            Err(SessionError::NoActivePlayer)
        ));
        assert!(matches!(
            session.select_player("nobody"),
            Err(SessionError::UnknownPlayer(_))
        ));

        let next = session.next_week();
        session.select_week(next).unwrap();
        assert_eq!(session.selected_week(), next);
        assert_eq!(session.week_label(), "20. 1. 2025 – 26. 1. 2025");
        assert!(matches!(
            session.select_week(next.plus_weeks(1)),
            Err(SessionError::WeekNotSelectable { .. })
        ));
    }

    #[test]
    fn session_edits_stay_within_two_weeks() {
        use crate::room::Room;
        use crate::session::{Session, SessionError};
        use crate::week::WeekKey;

        let mut session = Session::from_room("bg3", Room::seed(WeekKey::this_week(wednesday())), wednesday());
        let far = session.next_week().plus_weeks(10);
        let last_week = WeekKey::containing(wednesday() - chrono::Duration::days(7));

        for week in [far, last_week] {
            assert!(matches!(
                session.cycle_cell(week, 0, 0),
                Err(SessionError::WeekNotSelectable { .. })
            ));
            assert!(matches!(
                session.edit_note(week, 0, 0, "late"),
                Err(SessionError::WeekNotSelectable { .. })
            ));
        }
        assert_eq!(session.room().weeks.len(), 2);

        assert!(session.cycle_cell(session.next_week(), 0, 0).is_ok());
    }

    #[test]
    fn session_records_bot_events() {
        use crate::room::{Event, Room};
        use crate::session::Session;
        use crate::store::{MemoryStore, RoomStore};
        use crate::week::WeekKey;
        use chrono::Utc;

        let store = MemoryStore::new();
        let mut session = Session::open_seeded(&store, "bot", &Room::default(), wednesday()).unwrap();
        assert!(session.room().players.is_empty());
        assert_eq!(store.fetch("bot").unwrap(), Some(serde_json::json!({
            "players": [],
            "weeks": {},
            "events": {},
        })));

        // the bot may book weeks the grid cannot edit
        let week = WeekKey::this_week(wednesday()).plus_weeks(4);
        let room = session.record_event(
            week,
            Event {
                id: "e1".to_string(),
                title: "raid".to_string(),
                day: 5,
                start_hour: 20,
                end_hour: 24,
                created_at: Utc::now(),
                created_by: "discord".to_string(),
            },
        );
        assert_eq!(room.events[&week][0].id, "e1");
        assert_eq!(session.room(), &room);
    }
}
