/// Grid primitives: cell positions, the 9x9 digit board, pencil-mark sets,
/// and puzzle difficulty.
///
/// Everything here mirrors the wire format of the game service:
///   - a board is `[[u8; 9]; 9]` with 0 for empty cells
///   - a note grid is `[[[u8]; 9]; 9]`, each cell a list of candidates 1-9
///
/// Boards coming off the wire are range-checked on decode, so the rest of
/// the crate can rely on every stored value being 0..=9.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const SIZE: usize = 9;
pub const BOX: usize = 3;
pub const CELL_COUNT: usize = SIZE * SIZE;

// ── Pos ──

/// A cell coordinate, always inside the grid.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct Pos {
    pub row: usize,
    pub col: usize,
}

impl Pos {
    pub fn new(row: usize, col: usize) -> Option<Self> {
        if row < SIZE && col < SIZE {
            Some(Pos { row, col })
        } else {
            None
        }
    }

    /// Top-left corner of the 3x3 box containing this cell.
    pub fn box_origin(self) -> (usize, usize) {
        ((self.row / BOX) * BOX, (self.col / BOX) * BOX)
    }

    /// Row-major iteration over all 81 cells.
    pub fn all() -> impl Iterator<Item = Pos> {
        (0..SIZE).flat_map(|row| (0..SIZE).map(move |col| Pos { row, col }))
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}c{}", self.row + 1, self.col + 1)
    }
}

// ── Board ──

#[derive(Debug, Error, PartialEq, Eq)]
#[error("cell ({row}, {col}) holds {value}, expected 0-9")]
pub struct BoardRangeError {
    pub row: usize,
    pub col: usize,
    pub value: u8,
}

/// 9x9 digits, 0 = empty.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
#[serde(try_from = "[[u8; SIZE]; SIZE]", into = "[[u8; SIZE]; SIZE]")]
pub struct Board {
    cells: [[u8; SIZE]; SIZE],
}

impl Board {
    pub fn empty() -> Self {
        Board::default()
    }

    pub fn get(&self, pos: Pos) -> u8 {
        self.cells[pos.row][pos.col]
    }

    /// Number of non-zero cells.
    pub fn filled_count(&self) -> usize {
        self.cells.iter().flatten().filter(|&&v| v != 0).count()
    }

    pub fn rows(&self) -> &[[u8; SIZE]; SIZE] {
        &self.cells
    }
}

impl TryFrom<[[u8; SIZE]; SIZE]> for Board {
    type Error = BoardRangeError;

    fn try_from(cells: [[u8; SIZE]; SIZE]) -> Result<Self, Self::Error> {
        for (row, line) in cells.iter().enumerate() {
            for (col, &value) in line.iter().enumerate() {
                if value > 9 {
                    return Err(BoardRangeError { row, col, value });
                }
            }
        }
        Ok(Board { cells })
    }
}

impl From<Board> for [[u8; SIZE]; SIZE] {
    fn from(board: Board) -> Self {
        board.cells
    }
}

// ── NoteSet ──

/// Pencil-mark candidates for one cell, stored as a bitmask over 1..=9.
/// Serialized as the sorted list of digits, which is what the service sends.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
#[serde(from = "Vec<u8>", into = "Vec<u8>")]
pub struct NoteSet(u16);

impl NoteSet {
    pub fn contains(self, digit: u8) -> bool {
        (1..=9).contains(&digit) && self.0 & (1 << digit) != 0
    }

    pub fn insert(&mut self, digit: u8) {
        if (1..=9).contains(&digit) {
            self.0 |= 1 << digit;
        }
    }

    pub fn toggle(&mut self, digit: u8) {
        if (1..=9).contains(&digit) {
            self.0 ^= 1 << digit;
        }
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn iter(self) -> impl Iterator<Item = u8> {
        (1..=9u8).filter(move |&d| self.contains(d))
    }
}

impl From<Vec<u8>> for NoteSet {
    // Out-of-range digits are dropped rather than rejected; notes are cosmetic.
    fn from(digits: Vec<u8>) -> Self {
        let mut set = NoteSet::default();
        for d in digits {
            set.insert(d);
        }
        set
    }
}

impl From<NoteSet> for Vec<u8> {
    fn from(set: NoteSet) -> Self {
        set.iter().collect()
    }
}

// ── NoteGrid ──

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteGrid {
    cells: [[NoteSet; SIZE]; SIZE],
}

impl NoteGrid {
    pub fn get(&self, pos: Pos) -> NoteSet {
        self.cells[pos.row][pos.col]
    }

    #[cfg(test)]
    pub fn set(&mut self, pos: Pos, notes: NoteSet) {
        self.cells[pos.row][pos.col] = notes;
    }
}

// ── Difficulty ──

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
    Expert,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown difficulty `{0}` (expected easy, medium, hard or expert)")]
pub struct ParseDifficultyError(pub String);

impl Difficulty {
    pub const ALL: [Difficulty; 4] = [
        Difficulty::Easy,
        Difficulty::Medium,
        Difficulty::Hard,
        Difficulty::Expert,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
            Difficulty::Expert => "expert",
        }
    }

    /// Capitalized form for headings and the win summary.
    pub fn label(self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
            Difficulty::Expert => "Expert",
        }
    }

    pub fn next(self) -> Self {
        let i = Self::ALL.iter().position(|&d| d == self).unwrap_or(0);
        Self::ALL[(i + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> Self {
        let i = Self::ALL.iter().position(|&d| d == self).unwrap_or(0);
        Self::ALL[(i + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

impl FromStr for Difficulty {
    type Err = ParseDifficultyError;

    // Exact lowercase match only; the launch shortcut ignores anything else.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            "expert" => Ok(Difficulty::Expert),
            other => Err(ParseDifficultyError(other.to_string())),
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Test helpers ──

/// Build a board from a row diagram: digits 1-9, and `0` or `.` for empty.
#[cfg(test)]
pub fn board_from(rows: &[&str]) -> Board {
    let mut cells = [[0u8; SIZE]; SIZE];
    for (r, line) in rows.iter().enumerate() {
        for (c, ch) in line.chars().filter(|ch| !ch.is_whitespace()).enumerate() {
            cells[r][c] = ch.to_digit(10).unwrap_or(0) as u8;
        }
    }
    Board::try_from(cells).expect("diagram digits are 0-9")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pos_rejects_out_of_grid() {
        assert!(Pos::new(8, 8).is_some());
        assert!(Pos::new(9, 0).is_none());
        assert!(Pos::new(0, 9).is_none());
    }

    #[test]
    fn box_origin_snaps_to_three() {
        assert_eq!(Pos { row: 4, col: 7 }.box_origin(), (3, 6));
        assert_eq!(Pos { row: 2, col: 2 }.box_origin(), (0, 0));
    }

    #[test]
    fn board_decode_rejects_out_of_range_digit() {
        let mut raw = [[0u8; SIZE]; SIZE];
        raw[3][4] = 12;
        let json = serde_json::to_string(&raw).unwrap();
        let err = serde_json::from_str::<Board>(&json).unwrap_err();
        assert!(err.to_string().contains("(3, 4)"));
    }

    #[test]
    fn filled_count_ignores_zeroes() {
        let b = board_from(&["123000000", "000000009"]);
        assert_eq!(b.filled_count(), 4);
    }

    #[test]
    fn note_set_decodes_from_digit_list_and_drops_junk() {
        let set: NoteSet = serde_json::from_str("[7, 2, 0, 10, 2]").unwrap();
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![2, 7]);
        assert_eq!(serde_json::to_string(&set).unwrap(), "[2,7]");
    }

    #[test]
    fn note_set_toggle_flips_membership() {
        let mut set = NoteSet::default();
        set.toggle(5);
        assert!(set.contains(5));
        set.toggle(5);
        assert!(set.is_empty());
    }

    #[test]
    fn note_grid_decodes_nested_lists() {
        let mut raw = vec![vec![Vec::<u8>::new(); SIZE]; SIZE];
        raw[0][1] = vec![1, 4];
        let json = serde_json::to_string(&raw).unwrap();
        let grid: NoteGrid = serde_json::from_str(&json).unwrap();
        assert_eq!(grid.get(Pos { row: 0, col: 1 }).len(), 2);
        assert!(grid.get(Pos { row: 0, col: 0 }).is_empty());
    }

    #[test]
    fn difficulty_parses_only_known_names() {
        assert_eq!("hard".parse::<Difficulty>(), Ok(Difficulty::Hard));
        assert!("Hard".parse::<Difficulty>().is_err());
        assert!("nightmare".parse::<Difficulty>().is_err());
        assert_eq!(serde_json::to_string(&Difficulty::Expert).unwrap(), "\"expert\"");
    }

    #[test]
    fn difficulty_cycles_both_ways() {
        assert_eq!(Difficulty::Expert.next(), Difficulty::Easy);
        assert_eq!(Difficulty::Easy.prev(), Difficulty::Expert);
    }
}
