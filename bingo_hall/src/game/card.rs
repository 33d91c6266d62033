//! Bingo cards: cell values, random generation, the normalization policy
//! for user-entered cells, and the authoritative winning-line check.
//!
//! Cells serialize as the wire format the clients speak: a zero-padded
//! two-digit number (`"01"`..`"99"`), `"FREE"`, or the empty string for a
//! blank cell.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::constants::{CARD_CELLS, FREE_CELL_INDEX, NUMBER_POOL_SIZE};

/// Errors from card construction and validation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CardError {
    #[error("card must have exactly {CARD_CELLS} cells, got {0}")]
    WrongCellCount(usize),
    #[error("'{0}' is not a ball number")]
    NotANumber(String),
    #[error("ball number {0} is outside [01,99]")]
    OutOfRange(u8),
    #[error("number {0} appears on the card more than once")]
    DuplicateNumber(BallNumber),
    #[error("center cell must be FREE")]
    CenterNotFree,
}

/// A drawable number in `[01, 99]`.
///
/// Displayed and serialized as a zero-padded two-digit string to match the
/// stored card format and the broadcast payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct BallNumber(u8);

impl BallNumber {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = NUMBER_POOL_SIZE as u8;

    pub fn new(value: u8) -> Result<Self, CardError> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(CardError::OutOfRange(value))
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl fmt::Display for BallNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}", self.0)
    }
}

impl FromStr for BallNumber {
    type Err = CardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: u8 = s
            .parse()
            .map_err(|_| CardError::NotANumber(s.to_string()))?;
        Self::new(value)
    }
}

impl From<BallNumber> for String {
    fn from(number: BallNumber) -> Self {
        number.to_string()
    }
}

impl TryFrom<String> for BallNumber {
    type Error = CardError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// One cell of a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Cell {
    /// The fixed center cell, always counted as satisfied.
    Free,
    /// A cell left empty or blanked during normalization. Never satisfied.
    Blank,
    /// A regular numbered cell, satisfied once its number has been drawn.
    Number(BallNumber),
}

impl Cell {
    fn is_satisfied_by(self, drawn: &HashSet<BallNumber>) -> bool {
        match self {
            Cell::Free => true,
            Cell::Blank => false,
            Cell::Number(number) => drawn.contains(&number),
        }
    }
}

impl From<Cell> for String {
    fn from(cell: Cell) -> Self {
        match cell {
            Cell::Free => "FREE".to_string(),
            Cell::Blank => String::new(),
            Cell::Number(number) => number.to_string(),
        }
    }
}

impl TryFrom<String> for Cell {
    type Error = CardError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "" => Ok(Cell::Blank),
            "FREE" => Ok(Cell::Free),
            s => s.parse().map(Cell::Number),
        }
    }
}

/// The 12 winning lines of a 5x5 card: 5 rows, 5 columns, 2 diagonals.
pub const WINNING_LINES: [[usize; 5]; 12] = [
    [0, 1, 2, 3, 4],
    [5, 6, 7, 8, 9],
    [10, 11, 12, 13, 14],
    [15, 16, 17, 18, 19],
    [20, 21, 22, 23, 24],
    [0, 5, 10, 15, 20],
    [1, 6, 11, 16, 21],
    [2, 7, 12, 17, 22],
    [3, 8, 13, 18, 23],
    [4, 9, 14, 19, 24],
    [0, 6, 12, 18, 24],
    [4, 8, 12, 16, 20],
];

/// A finalized 25-cell card grid.
///
/// Construction goes through [`CardCells::strict`] (generated cards) or
/// [`CardCells::normalized`] (user input), both of which guarantee the
/// center cell is FREE and no number appears twice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardCells([Cell; CARD_CELLS]);

impl CardCells {
    /// Build a card from already-typed cells, rejecting any grid that
    /// breaks the card invariants.
    pub fn strict(cells: [Cell; CARD_CELLS]) -> Result<Self, CardError> {
        if cells[FREE_CELL_INDEX] != Cell::Free {
            return Err(CardError::CenterNotFree);
        }
        let mut seen = HashSet::new();
        for cell in &cells {
            if let Cell::Number(number) = cell {
                if !seen.insert(*number) {
                    return Err(CardError::DuplicateNumber(*number));
                }
            }
        }
        Ok(Self(cells))
    }

    /// Build a card from raw user-entered strings, applying the fill
    /// policy: non-numeric and out-of-range values become blank, every
    /// occurrence of a duplicated number becomes blank, and the center is
    /// forced to FREE regardless of input. All other values are kept.
    ///
    /// Only the cell count can make this fail; the policy absorbs every
    /// per-cell problem.
    pub fn normalized(raw: &[String]) -> Result<Self, CardError> {
        if raw.len() != CARD_CELLS {
            return Err(CardError::WrongCellCount(raw.len()));
        }

        let mut cells = [Cell::Blank; CARD_CELLS];
        let mut counts: HashMap<BallNumber, usize> = HashMap::new();
        for (index, value) in raw.iter().enumerate() {
            if index == FREE_CELL_INDEX {
                cells[index] = Cell::Free;
                continue;
            }
            if let Ok(number) = value.trim().parse::<BallNumber>() {
                *counts.entry(number).or_insert(0) += 1;
                cells[index] = Cell::Number(number);
            }
        }

        for cell in &mut cells {
            if let Cell::Number(number) = cell {
                if counts[number] > 1 {
                    *cell = Cell::Blank;
                }
            }
        }

        Ok(Self(cells))
    }

    pub fn cells(&self) -> &[Cell; CARD_CELLS] {
        &self.0
    }

    /// Numbers present on the card, in grid order.
    pub fn numbers(&self) -> impl Iterator<Item = BallNumber> + '_ {
        self.0.iter().filter_map(|cell| match cell {
            Cell::Number(number) => Some(*number),
            _ => None,
        })
    }
}

/// Generate a random card: 24 distinct numbers sampled uniformly without
/// replacement from the pool, with the FREE cell at the center.
pub fn generate_random_card<R: Rng + ?Sized>(rng: &mut R) -> CardCells {
    let picks = rand::seq::index::sample(rng, NUMBER_POOL_SIZE, CARD_CELLS - 1);
    let mut numbers = picks.into_iter().map(|i| BallNumber(i as u8 + 1));
    let mut cells = [Cell::Blank; CARD_CELLS];
    for (index, cell) in cells.iter_mut().enumerate() {
        *cell = if index == FREE_CELL_INDEX {
            Cell::Free
        } else {
            Cell::Number(numbers.next().expect("sample yields 24 numbers"))
        };
    }
    CardCells(cells)
}

/// The authoritative winning-pattern check: returns the index of the first
/// line in [`WINNING_LINES`] whose five cells are all satisfied by the
/// drawn numbers (the FREE cell always counts).
///
/// Every claim path must go through this function; a client's own check is
/// only a responsiveness optimization and is never trusted.
pub fn winning_line(cells: &CardCells, drawn: &[BallNumber]) -> Option<usize> {
    let drawn: HashSet<BallNumber> = drawn.iter().copied().collect();
    WINNING_LINES
        .iter()
        .position(|line| line.iter().all(|&index| cells.0[index].is_satisfied_by(&drawn)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ball(value: u8) -> BallNumber {
        BallNumber::new(value).unwrap()
    }

    /// Card with the first row 01..05 and the rest 10..=29 (skipping the
    /// center, which is FREE).
    fn row_card() -> CardCells {
        let raw: Vec<String> = (0..CARD_CELLS)
            .map(|index| {
                if index == FREE_CELL_INDEX {
                    "FREE".to_string()
                } else if index < 5 {
                    format!("{:02}", index + 1)
                } else {
                    format!("{:02}", index + 10)
                }
            })
            .collect();
        CardCells::normalized(&raw).unwrap()
    }

    #[test]
    fn ball_number_bounds() {
        assert!(BallNumber::new(0).is_err());
        assert!(BallNumber::new(100).is_err());
        assert_eq!(ball(7).to_string(), "07");
        assert_eq!("07".parse::<BallNumber>().unwrap(), ball(7));
        assert_eq!("7".parse::<BallNumber>().unwrap(), ball(7));
        assert!("bingo".parse::<BallNumber>().is_err());
    }

    #[test]
    fn cell_wire_format_round_trip() {
        for (text, cell) in [
            ("\"FREE\"", Cell::Free),
            ("\"\"", Cell::Blank),
            ("\"42\"", Cell::Number(ball(42))),
        ] {
            let parsed: Cell = serde_json::from_str(text).unwrap();
            assert_eq!(parsed, cell);
            assert_eq!(serde_json::to_string(&cell).unwrap(), text);
        }
    }

    #[test]
    fn winning_lines_cover_grid_geometry() {
        // Every line has 5 in-bounds cells; the diagonals share the center.
        for line in &WINNING_LINES {
            assert!(line.iter().all(|&index| index < CARD_CELLS));
        }
        assert!(WINNING_LINES[10].contains(&FREE_CELL_INDEX));
        assert!(WINNING_LINES[11].contains(&FREE_CELL_INDEX));
    }

    #[test]
    fn complete_row_wins() {
        let card = row_card();
        let drawn: Vec<BallNumber> = (1..=5).map(ball).collect();
        assert_eq!(winning_line(&card, &drawn), Some(0));
    }

    #[test]
    fn four_of_five_does_not_win() {
        let card = row_card();
        let drawn: Vec<BallNumber> = (1..=4).map(ball).collect();
        assert_eq!(winning_line(&card, &drawn), None);
    }

    #[test]
    fn free_center_counts_toward_its_lines() {
        // Middle row is cells 10..15 with the FREE center; drawing the
        // other four completes the line.
        let card = row_card();
        let drawn: Vec<BallNumber> = [20, 21, 23, 24].map(ball).to_vec();
        assert_eq!(winning_line(&card, &drawn), Some(2));
    }

    #[test]
    fn blank_cells_never_satisfy() {
        let mut raw: Vec<String> = (0..CARD_CELLS).map(|_| String::new()).collect();
        raw[FREE_CELL_INDEX] = "FREE".to_string();
        let card = CardCells::normalized(&raw).unwrap();
        let drawn: Vec<BallNumber> = (1..=99).map(ball).collect();
        // Even with everything drawn, a blank card has no complete line.
        assert_eq!(winning_line(&card, &drawn), None);
    }

    #[test]
    fn normalization_blanks_invalid_and_duplicates() {
        let mut raw: Vec<String> = (0..CARD_CELLS).map(|i| format!("{:02}", i + 30)).collect();
        raw[0] = "17".to_string();
        raw[1] = "17".to_string(); // duplicate pair, both blanked
        raw[2] = "0".to_string(); // out of range
        raw[3] = "100".to_string(); // out of range
        raw[4] = "abc".to_string(); // not a number
        raw[5] = "".to_string(); // intentionally blank
        raw[FREE_CELL_INDEX] = "whatever".to_string(); // center forced FREE

        let card = CardCells::normalized(&raw).unwrap();
        let cells = card.cells();
        for index in 0..=5 {
            assert_eq!(cells[index], Cell::Blank, "cell {index}");
        }
        assert_eq!(cells[FREE_CELL_INDEX], Cell::Free);
        assert_eq!(cells[6], Cell::Number(ball(36)));
    }

    #[test]
    fn normalization_rejects_wrong_cell_count() {
        let raw = vec!["01".to_string(); 24];
        assert_eq!(
            CardCells::normalized(&raw),
            Err(CardError::WrongCellCount(24))
        );
    }

    #[test]
    fn strict_rejects_duplicates_and_bad_center() {
        let mut cells = [Cell::Blank; CARD_CELLS];
        cells[FREE_CELL_INDEX] = Cell::Free;
        cells[0] = Cell::Number(ball(9));
        cells[1] = Cell::Number(ball(9));
        assert_eq!(
            CardCells::strict(cells),
            Err(CardError::DuplicateNumber(ball(9)))
        );

        let cells = [Cell::Blank; CARD_CELLS];
        assert_eq!(CardCells::strict(cells), Err(CardError::CenterNotFree));
    }

    #[test]
    fn generated_cards_are_valid() {
        let mut rng = rand::rng();
        for _ in 0..50 {
            let card = generate_random_card(&mut rng);
            assert_eq!(card.cells()[FREE_CELL_INDEX], Cell::Free);
            let numbers: Vec<BallNumber> = card.numbers().collect();
            assert_eq!(numbers.len(), CARD_CELLS - 1);
            let distinct: HashSet<BallNumber> = numbers.iter().copied().collect();
            assert_eq!(distinct.len(), CARD_CELLS - 1);
        }
    }
}
