use crate::cell::{Cell, CellState};
use serde::{Deserialize, Serialize};

/// Days in a week row, Monday first
pub const DAYS: usize = 7;
/// Hour rows per day, 08:00 through 23:00
pub const HOURS: usize = 16;
/// Clock hour of the first row
pub const FIRST_HOUR: u8 = 8;

pub const DAY_LABELS: [&str; DAYS] = ["Po", "Út", "St", "Čt", "Pá", "So", "Ne"];

/// Short Czech name of day `day`, `?` past Sunday
pub fn day_label(day: usize) -> &'static str {
    DAY_LABELS.get(day).copied().unwrap_or("?")
}

/// Clock hour shown for an hour row index, `0 -> 8`, `15 -> 23`
pub fn clock_hour(hour: usize) -> u8 {
    FIRST_HOUR + hour as u8
}

/// One player's week: `DAYS` x `HOURS` cells.
///
/// The shape is part of the type, so a matrix is never jagged. Persisted
/// data of any other shape is rejected when decoded.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
#[serde(transparent)]
pub struct Matrix(pub [[Cell; HOURS]; DAYS]);

impl Matrix {
    pub fn blank() -> Matrix {
        Matrix::default()
    }

    pub fn get(&self, day: usize, hour: usize) -> Option<&Cell> {
        self.0.get(day).and_then(|row| row.get(hour))
    }

    pub fn get_mut(&mut self, day: usize, hour: usize) -> Option<&mut Cell> {
        self.0.get_mut(day).and_then(|row| row.get_mut(hour))
    }

    /// State at (day, hour), `Empty` outside of the grid
    pub fn state(&self, day: usize, hour: usize) -> CellState {
        self.get(day, hour).map(|cell| cell.state).unwrap_or_default()
    }

    /// Builds a matrix where every cell of `day` in `hours` holds `state`.
    /// Mostly useful to set up fixtures.
    ///
    /// # Examples
    /// ```
    /// use guildplan_libs::cell::CellState;
    /// use guildplan_libs::matrix::Matrix;
    ///
    /// let matrix = Matrix::blank().with_states(5, 12..16, CellState::Free);
    /// assert_eq!(matrix.state(5, 12), CellState::Free);
    /// assert_eq!(matrix.state(5, 11), CellState::Empty);
    /// ```
    pub fn with_states<R>(mut self, day: usize, hours: R, state: CellState) -> Matrix
    where
        R: IntoIterator<Item = usize>,
    {
        for hour in hours {
            if let Some(cell) = self.get_mut(day, hour) {
                cell.state = state;
            }
        }
        self
    }

    pub fn is_blank(&self) -> bool {
        self.0.iter().flatten().all(|cell| *cell == Cell::default())
    }
}
