use crate::blocks::{self, Block, BlockError};
use crate::matrix::{DAYS, HOURS};
use crate::room::{Event, Player, Room};
use crate::store::{RoomStore, StoreError};
use crate::week::WeekKey;
use chrono::NaiveDate;
use log::debug;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("No player is selected")]
    NoActivePlayer,
    #[error("Unknown player `{0}`")]
    UnknownPlayer(String),
    #[error("Player name must not be empty")]
    EmptyName,
    #[error("Cell ({day}, {hour}) is outside of the {}x{} grid", DAYS, HOURS)]
    OffGrid { day: usize, hour: usize },
    #[error("Only {this_week} and {next_week} can be selected, got {requested}")]
    WeekNotSelectable {
        requested: WeekKey,
        this_week: WeekKey,
        next_week: WeekKey,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// One editor's view of a room: an in-memory copy plus what they have
/// selected. Created when a room is opened, dropped when it is left.
///
/// Edits never change the room in place. Each one builds the next room,
/// swaps it in and hands a copy back so the caller can persist it.
#[derive(Debug, Clone)]
pub struct Session {
    slug: String,
    room: Room,
    active_player: Option<String>,
    min_free: usize,
    this_week: WeekKey,
    next_week: WeekKey,
    selected_week: WeekKey,
}

impl Session {
    /// Loads `slug`, seeding it with a default player if it is new
    pub fn open(store: &dyn RoomStore, slug: &str, today: NaiveDate) -> Result<Session, SessionError> {
        let seed = Room::seed(WeekKey::this_week(today));
        Session::open_seeded(store, slug, &seed, today)
    }

    /// Loads `slug`, creating it from `seed` if it is new
    pub fn open_seeded(
        store: &dyn RoomStore,
        slug: &str,
        seed: &Room,
        today: NaiveDate,
    ) -> Result<Session, SessionError> {
        let room = store.load(slug, seed, today)?;
        Ok(Session::from_room(slug, room, today))
    }

    pub fn from_room(slug: &str, room: Room, today: NaiveDate) -> Session {
        let this_week = WeekKey::this_week(today);
        let next_week = WeekKey::next_week(today);

        let mut room = room;
        room.ensure_week(this_week);
        room.ensure_week(next_week);

        let active_player = room.players.first().map(|p| p.id.clone());
        let min_free = room.players.len().max(1);
        debug!("opened {} with {} player(s)", slug, room.players.len());

        Session {
            slug: slug.to_string(),
            room,
            active_player,
            min_free,
            this_week,
            next_week,
            selected_week: this_week,
        }
    }

    pub fn slug(&self) -> &str {
        &self.slug
    }

    pub fn room(&self) -> &Room {
        &self.room
    }

    pub fn active_player(&self) -> Option<&Player> {
        self.active_player
            .as_deref()
            .and_then(|id| self.room.player(id))
    }

    pub fn min_free(&self) -> usize {
        self.min_free
    }

    pub fn this_week(&self) -> WeekKey {
        self.this_week
    }

    pub fn next_week(&self) -> WeekKey {
        self.next_week
    }

    pub fn selected_week(&self) -> WeekKey {
        self.selected_week
    }

    pub fn select_player(&mut self, player_id: &str) -> Result<(), SessionError> {
        if self.room.player(player_id).is_none() {
            return Err(SessionError::UnknownPlayer(player_id.to_string()));
        }
        self.active_player = Some(player_id.to_string());
        Ok(())
    }

    pub fn select_week(&mut self, week: WeekKey) -> Result<(), SessionError> {
        self.check_week(week)?;
        self.selected_week = week;
        Ok(())
    }

    /// Only this week and next week are editable
    fn check_week(&self, week: WeekKey) -> Result<(), SessionError> {
        if week != self.this_week && week != self.next_week {
            return Err(SessionError::WeekNotSelectable {
                requested: week,
                this_week: self.this_week,
                next_week: self.next_week,
            });
        }
        Ok(())
    }

    /// Clamped to `1..=players`, an empty roster still allows 1
    pub fn set_min_free(&mut self, min_free: usize) {
        self.min_free = min_free.clamp(1, self.room.players.len().max(1));
    }

    fn active_id(&self) -> Result<String, SessionError> {
        self.active_player()
            .map(|p| p.id.clone())
            .ok_or(SessionError::NoActivePlayer)
    }

    fn check_grid(day: usize, hour: usize) -> Result<(), SessionError> {
        if day < DAYS && hour < HOURS {
            Ok(())
        } else {
            Err(SessionError::OffGrid { day, hour })
        }
    }

    fn replace(&mut self, next: Room) -> Room {
        self.room = next;
        self.room.clone()
    }

    fn reset_min_free(&mut self) {
        self.min_free = self.room.players.len().max(1);
    }

    /// Cycles the active player's cell
    pub fn cycle_cell(&mut self, week: WeekKey, day: usize, hour: usize) -> Result<Room, SessionError> {
        self.check_week(week)?;
        Session::check_grid(day, hour)?;
        let player_id = self.active_id()?;
        let next = self.room.cycle_cell(week, day, hour, &player_id);
        Ok(self.replace(next))
    }

    /// Sets the active player's note for a cell; blank text removes it
    pub fn edit_note(
        &mut self,
        week: WeekKey,
        day: usize,
        hour: usize,
        note: &str,
    ) -> Result<Room, SessionError> {
        self.check_week(week)?;
        Session::check_grid(day, hour)?;
        let player_id = self.active_id()?;
        let next = self.room.set_cell_note(week, day, hour, &player_id, note);
        Ok(self.replace(next))
    }

    /// Adds a player and makes them the active one
    pub fn add_player(&mut self, name: &str) -> Result<(Room, Player), SessionError> {
        if name.trim().is_empty() {
            return Err(SessionError::EmptyName);
        }

        let (next, player) = self.room.add_player(name);
        let room = self.replace(next);
        self.active_player = Some(player.id.clone());
        self.reset_min_free();
        Ok((room, player))
    }

    /// Removes the active player; the first remaining one takes over
    pub fn remove_active_player(&mut self) -> Result<(Room, Player), SessionError> {
        let removed = self
            .active_player()
            .cloned()
            .ok_or(SessionError::NoActivePlayer)?;

        let next = self.room.remove_player(&removed.id);
        let room = self.replace(next);
        self.active_player = self.room.players.first().map(|p| p.id.clone());
        self.reset_min_free();
        Ok((room, removed))
    }

    /// Files an event under `week`, which may lie beyond next week
    pub fn record_event(&mut self, week: WeekKey, event: Event) -> Room {
        let next = self.room.push_event(week, event);
        self.replace(next)
    }

    pub fn reset_all(&mut self) -> Room {
        let next = self.room.reset_availability();
        self.replace(next)
    }

    /// Overlap blocks of the selected week at the current threshold
    pub fn blocks(&self) -> Result<Vec<Block>, BlockError> {
        blocks::aggregate(
            self.room.week(self.selected_week),
            &self.room.players,
            self.min_free,
        )
    }

    pub fn fully_synchronized_hours(&self) -> usize {
        blocks::fully_synchronized_hours(self.room.week(self.selected_week), &self.room.players)
    }

    pub fn events(&self) -> Vec<&Event> {
        self.room.events_for(self.selected_week)
    }

    pub fn week_label(&self) -> String {
        self.selected_week.label()
    }
}
