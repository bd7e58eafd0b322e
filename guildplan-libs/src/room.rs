use crate::cell::Cell;
use crate::matrix::{clock_hour, Matrix, DAYS, HOURS};
use crate::week::WeekKey;
use chrono::{DateTime, Utc};
use itertools::Itertools;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Name given to the single player of a freshly seeded room
pub const DEFAULT_PLAYER_NAME: &str = "Já";

pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub id: String,
    pub name: String,
}

impl Player {
    pub fn new(name: &str) -> Player {
        Player {
            id: new_id(),
            name: name.trim().to_string(),
        }
    }

    pub fn with_id(id: &str, name: &str) -> Player {
        Player {
            id: id.to_string(),
            name: name.to_string(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(default)]
pub struct WeekEntry {
    pub availability: BTreeMap<String, Matrix>,
}

impl WeekEntry {
    pub fn matrix(&self, player_id: &str) -> Option<&Matrix> {
        self.availability.get(player_id)
    }
}

/// Something booked from the chat bot. Hours are clock hours, `end_hour`
/// exclusive, so `20..24` runs until midnight.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    pub title: String,
    pub day: u8,
    pub start_hour: u8,
    pub end_hour: u8,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
}

impl Event {
    /// Whether the event overlaps grid row `hour` of `day`
    pub fn covers(&self, day: usize, hour: usize) -> bool {
        let clock = clock_hour(hour);
        self.day as usize == day && clock >= self.start_hour && clock < self.end_hour
    }
}

/// Everything stored for one slug. It is read and written as one blob.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct Room {
    #[serde(default)]
    pub players: Vec<Player>,
    #[serde(default)]
    pub weeks: BTreeMap<WeekKey, WeekEntry>,
    #[serde(default)]
    pub events: BTreeMap<WeekKey, Vec<Event>>,
}

impl Room {
    /// What a UI session stores for a slug nobody opened before: one default
    /// player and an empty grid for the current week.
    pub fn seed(week: WeekKey) -> Room {
        let room = Room {
            players: vec![Player::new(DEFAULT_PLAYER_NAME)],
            ..Room::default()
        };
        room.with_week(week)
    }

    pub fn player(&self, player_id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.id == player_id)
    }

    pub fn week(&self, week: WeekKey) -> Option<&WeekEntry> {
        self.weeks.get(&week)
    }

    /// Never fails: anything missing reads as an empty cell
    pub fn cell(&self, week: WeekKey, day: usize, hour: usize, player_id: &str) -> Cell {
        self.weeks
            .get(&week)
            .and_then(|entry| entry.matrix(player_id))
            .and_then(|matrix| matrix.get(day, hour))
            .cloned()
            .unwrap_or_default()
    }

    /// Creates `week` if needed and gives every current player a matrix in it
    pub fn ensure_week(&mut self, week: WeekKey) {
        let entry = self.weeks.entry(week).or_default();
        for player in &self.players {
            entry
                .availability
                .entry(player.id.clone())
                .or_insert_with(Matrix::blank);
        }
    }

    pub fn with_week(&self, week: WeekKey) -> Room {
        let mut next = self.clone();
        next.ensure_week(week);
        next
    }

    /// Moves one cell to its next state.
    ///
    /// `day` and `hour` must lie inside the grid; unknown players leave the
    /// room as it was.
    pub fn cycle_cell(&self, week: WeekKey, day: usize, hour: usize, player_id: &str) -> Room {
        debug_assert!(day < DAYS && hour < HOURS, "cell ({}, {}) is off the grid", day, hour);

        let mut next = self.clone();
        if next.player(player_id).is_none() {
            return next;
        }

        next.ensure_week(week);
        if let Some(cell) = next.cell_mut(week, day, hour, player_id) {
            cell.state = cell.state.next();
            debug!("{} {}/{} -> {}", player_id, day, hour, cell.state);
        }
        next
    }

    /// Replaces a cell note with the trimmed `note`; an empty note clears it
    pub fn set_cell_note(
        &self,
        week: WeekKey,
        day: usize,
        hour: usize,
        player_id: &str,
        note: &str,
    ) -> Room {
        debug_assert!(day < DAYS && hour < HOURS, "cell ({}, {}) is off the grid", day, hour);

        let mut next = self.clone();
        if next.player(player_id).is_none() {
            return next;
        }

        next.ensure_week(week);
        if let Some(cell) = next.cell_mut(week, day, hour, player_id) {
            cell.note = note.trim().to_string();
        }
        next
    }

    fn cell_mut(
        &mut self,
        week: WeekKey,
        day: usize,
        hour: usize,
        player_id: &str,
    ) -> Option<&mut Cell> {
        self.weeks
            .get_mut(&week)
            .and_then(|entry| entry.availability.get_mut(player_id))
            .and_then(|matrix| matrix.get_mut(day, hour))
    }

    /// Appends a player with an empty matrix in every known week
    pub fn add_player(&self, name: &str) -> (Room, Player) {
        let player = Player::new(name);
        let mut next = self.clone();

        for entry in next.weeks.values_mut() {
            entry
                .availability
                .insert(player.id.clone(), Matrix::blank());
        }
        next.players.push(player.clone());

        (next, player)
    }

    /// Drops the player and their matrix from every week
    pub fn remove_player(&self, player_id: &str) -> Room {
        let mut next = self.clone();
        next.players.retain(|p| p.id != player_id);
        for entry in next.weeks.values_mut() {
            entry.availability.remove(player_id);
        }
        next
    }

    /// Every player's grid in every week goes back to empty, notes included
    pub fn reset_availability(&self) -> Room {
        let mut next = self.clone();
        for entry in next.weeks.values_mut() {
            for player in &next.players {
                entry
                    .availability
                    .insert(player.id.clone(), Matrix::blank());
            }
        }
        next
    }

    pub fn push_event(&self, week: WeekKey, event: Event) -> Room {
        let mut next = self.clone();
        next.events.entry(week).or_default().push(event);
        next
    }

    /// Events of `week` ordered by day, then start hour
    pub fn events_for(&self, week: WeekKey) -> Vec<&Event> {
        self.events
            .get(&week)
            .map(|events| {
                events
                    .iter()
                    .sorted_by_key(|e| (e.day, e.start_hour))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Whether any event of `week` overlaps grid row `hour` of `day`
    pub fn has_event(&self, week: WeekKey, day: usize, hour: usize) -> bool {
        self.events
            .get(&week)
            .map_or(false, |events| events.iter().any(|e| e.covers(day, hour)))
    }
}
