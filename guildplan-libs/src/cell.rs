use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// Availability of one player for one hour.
///
/// `Empty` is what a fresh grid holds. It is treated exactly like `Busy` when
/// looking for overlap, it only renders differently.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
#[serde(rename_all = "lowercase")]
pub enum CellState {
    #[default]
    Empty,
    Free,
    Maybe,
    Busy,
}

impl CellState {
    pub const ALL: [CellState; 4] = [
        CellState::Empty,
        CellState::Free,
        CellState::Maybe,
        CellState::Busy,
    ];

    /// The state a click moves to: `empty -> free -> maybe -> busy -> empty`
    ///
    /// # Examples
    /// ```
    /// use guildplan_libs::cell::CellState;
    ///
    /// let mut state = CellState::Maybe;
    /// state = state.next();
    /// assert_eq!(state, CellState::Busy);
    /// assert_eq!(state.next(), CellState::Empty);
    /// ```
    pub fn next(self) -> CellState {
        match self {
            CellState::Empty => CellState::Free,
            CellState::Free => CellState::Maybe,
            CellState::Maybe => CellState::Busy,
            CellState::Busy => CellState::Empty,
        }
    }

    /// `free` and `maybe` both count towards a block's threshold
    pub fn is_available(self) -> bool {
        matches!(self, CellState::Free | CellState::Maybe)
    }

    pub fn label(self) -> &'static str {
        match self {
            CellState::Empty => "—",
            CellState::Free => "free",
            CellState::Maybe => "možná",
            CellState::Busy => "busy",
        }
    }
}

impl Display for CellState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CellState::Empty => "empty",
            CellState::Free => "free",
            CellState::Maybe => "maybe",
            CellState::Busy => "busy",
        })
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
#[serde(default)]
pub struct Cell {
    pub state: CellState,
    pub note: String,
}

impl Cell {
    pub fn new(state: CellState, note: &str) -> Cell {
        Cell {
            state,
            note: note.to_string(),
        }
    }

    pub fn has_note(&self) -> bool {
        !self.note.trim().is_empty()
    }
}
