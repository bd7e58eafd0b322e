use crate::cell::CellState;
use crate::matrix::{clock_hour, day_label, Matrix, DAYS, HOURS};
use crate::room::{Player, WeekEntry};
use itertools::Itertools;
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Serialize, Error, Debug, Eq, PartialEq)]
pub enum BlockError {
    #[error("At least one player has to be free, got a threshold of {0}")]
    InvalidThreshold(usize),
}

/// A maximal run of hours on one day with at least `min_free` players
/// available, plus who can make it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub day: u8,
    /// Clock hour the block starts at
    pub start_hour: u8,
    /// Clock hour the block ends at, exclusive
    pub end_hour: u8,
    /// `free` for every hour of the block
    pub fully_available: Vec<String>,
    /// `free` or `maybe` for some of it
    pub partially_available: Vec<String>,
    pub unavailable: Vec<String>,
}

impl Block {
    pub fn hours(&self) -> u8 {
        self.end_hour - self.start_hour
    }

    /// Everyone on the roster can stay for the whole block
    pub fn is_unanimous(&self, player_count: usize) -> bool {
        self.fully_available.len() == player_count
    }

    /// `So 20:00–24:00`
    pub fn label(&self) -> String {
        format!(
            "{} {:02}:00–{:02}:00",
            day_label(self.day as usize), self.start_hour, self.end_hour
        )
    }
}

/// The distinct states a player went through over a block
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
struct StateSet(u8);

impl StateSet {
    fn insert(&mut self, state: CellState) {
        self.0 |= 1 << state as u8;
    }

    fn contains(self, state: CellState) -> bool {
        self.0 & (1 << state as u8) != 0
    }

    fn only(state: CellState) -> StateSet {
        let mut set = StateSet::default();
        set.insert(state);
        set
    }
}

impl FromIterator<CellState> for StateSet {
    fn from_iter<I: IntoIterator<Item = CellState>>(iter: I) -> Self {
        let mut set = StateSet::default();
        for state in iter {
            set.insert(state);
        }
        set
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Involvement {
    Full,
    Partial,
    Unavailable,
}

impl From<StateSet> for Involvement {
    fn from(seen: StateSet) -> Self {
        if seen == StateSet::only(CellState::Free) {
            Involvement::Full
        } else if seen.contains(CellState::Free) || seen.contains(CellState::Maybe) {
            Involvement::Partial
        } else {
            Involvement::Unavailable
        }
    }
}

/// Grid lookup for a roster; players without a matrix read as empty
struct Grid<'a> {
    matrices: Vec<Option<&'a Matrix>>,
}

impl<'a> Grid<'a> {
    fn new(week: Option<&'a WeekEntry>, players: &[Player]) -> Grid<'a> {
        Grid {
            matrices: players
                .iter()
                .map(|p| week.and_then(|w| w.matrix(&p.id)))
                .collect(),
        }
    }

    fn state(&self, player: usize, day: usize, hour: usize) -> CellState {
        self.matrices[player].map_or(CellState::Empty, |m| m.state(day, hour))
    }

    fn available(&self, day: usize, hour: usize) -> usize {
        (0..self.matrices.len())
            .filter(|&p| self.state(p, day, hour).is_available())
            .count()
    }
}

/// Finds the overlap blocks of one week.
///
/// Each day is scanned from the first hour. Wherever at least `min_free`
/// players are `free` or `maybe`, a block opens and grows for as long as
/// the threshold holds. Scanning resumes right after it, so blocks of one
/// day never share an hour. Every player is then classified by all the
/// states they had across the block. Names keep roster order.
///
/// # Errors
/// A threshold of zero is rejected with `BlockError::InvalidThreshold`.
/// A threshold above the roster size simply yields no blocks.
///
/// # Examples
/// ```
/// use guildplan_libs::blocks::aggregate;
/// use guildplan_libs::cell::CellState;
/// use guildplan_libs::matrix::Matrix;
/// use guildplan_libs::room::{Player, WeekEntry};
///
/// let players = vec![Player::with_id("a", "Astarion"), Player::with_id("b", "Karlach")];
/// let mut week = WeekEntry::default();
/// week.availability.insert("a".into(), Matrix::blank().with_states(0, 0..2, CellState::Free));
/// week.availability.insert("b".into(), Matrix::blank().with_states(0, 0..2, CellState::Maybe));
///
/// let blocks = aggregate(Some(&week), &players, 2).unwrap();
/// assert_eq!(blocks.len(), 1);
/// assert_eq!((blocks[0].start_hour, blocks[0].end_hour), (8, 10));
/// assert_eq!(blocks[0].fully_available, vec!["Astarion"]);
/// assert_eq!(blocks[0].partially_available, vec!["Karlach"]);
/// ```
pub fn aggregate(
    week: Option<&WeekEntry>,
    players: &[Player],
    min_free: usize,
) -> Result<Vec<Block>, BlockError> {
    if min_free == 0 {
        return Err(BlockError::InvalidThreshold(min_free));
    }
    if min_free > players.len() {
        trace!("threshold {} above roster of {}", min_free, players.len());
        return Ok(vec![]);
    }

    let grid = Grid::new(week, players);
    let mut blocks = Vec::new();

    for day in 0..DAYS {
        let mut hour = 0;

        while hour < HOURS {
            if grid.available(day, hour) < min_free {
                hour += 1;
                continue;
            }

            let start = hour;
            let mut end = hour + 1;
            while end < HOURS && grid.available(day, end) >= min_free {
                end += 1;
            }

            let mut block = Block {
                day: day as u8,
                start_hour: clock_hour(start),
                end_hour: clock_hour(end - 1) + 1,
                fully_available: vec![],
                partially_available: vec![],
                unavailable: vec![],
            };

            for (index, player) in players.iter().enumerate() {
                let seen: StateSet = (start..end).map(|h| grid.state(index, day, h)).collect();
                let bucket = match Involvement::from(seen) {
                    Involvement::Full => &mut block.fully_available,
                    Involvement::Partial => &mut block.partially_available,
                    Involvement::Unavailable => &mut block.unavailable,
                };
                bucket.push(player.name.clone());
            }

            trace!(
                "{} with [{}]",
                block.label(),
                block.fully_available.iter().join(", ")
            );
            blocks.push(block);
            hour = end;
        }
    }

    debug!("{} block(s) for threshold {}", blocks.len(), min_free);
    Ok(blocks)
}

/// Counts single hours where every player is exactly `free`.
///
/// Unlike `aggregate`, `maybe` does not count here. An empty roster has no
/// such hours.
pub fn fully_synchronized_hours(week: Option<&WeekEntry>, players: &[Player]) -> usize {
    if players.is_empty() {
        return 0;
    }

    let grid = Grid::new(week, players);
    (0..DAYS)
        .cartesian_product(0..HOURS)
        .filter(|&(day, hour)| {
            (0..players.len()).all(|p| grid.state(p, day, hour) == CellState::Free)
        })
        .count()
}
