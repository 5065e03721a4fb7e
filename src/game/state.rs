use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::rules::RuleError;

/// 1-based, row-major square index (1 = top-left, 9 = bottom-right).
pub type Square = u8;

pub const BOARD_SIZE: usize = 3;
pub const SQUARE_COUNT: Square = 9;

/// Every row, column and diagonal as 1-based squares.
pub const LINES: [[Square; 3]; 8] = [
    [1, 2, 3],
    [4, 5, 6],
    [7, 8, 9],
    [1, 4, 7],
    [2, 5, 8],
    [3, 6, 9],
    [1, 5, 9],
    [3, 5, 7],
];

/// One of the two real players. The third board state, "nobody", is `Cell::Empty`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Mark {
    X,
    O,
}

impl Mark {
    pub const ALL: [Mark; 2] = [Mark::X, Mark::O];

    /// Numeric cell value. X is the maximizing player in search despite the negative sign.
    pub fn value(self) -> i8 {
        match self {
            Mark::X => -1,
            Mark::O => 1,
        }
    }

    pub fn letter(self) -> &'static str {
        match self {
            Mark::X => "X",
            Mark::O => "O",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Mark::X => "player 1",
            Mark::O => "player 2",
        }
    }

    pub fn opponent(self) -> Mark {
        match self {
            Mark::X => Mark::O,
            Mark::O => Mark::X,
        }
    }

    pub fn index(self) -> usize {
        match self {
            Mark::X => 0,
            Mark::O => 1,
        }
    }

    /// Seat number as exposed to the front end: 1 for X, 2 for O.
    pub fn seat(self) -> u8 {
        self.index() as u8 + 1
    }

    pub fn from_seat(seat: u8) -> Option<Mark> {
        match seat {
            1 => Some(Mark::X),
            2 => Some(Mark::O),
            _ => None,
        }
    }
}

impl fmt::Display for Mark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.letter())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(into = "i8", try_from = "i8")]
pub enum Cell {
    #[default]
    Empty,
    X,
    O,
}

impl Cell {
    pub fn value(self) -> i8 {
        match self {
            Cell::Empty => 0,
            Cell::X => Mark::X.value(),
            Cell::O => Mark::O.value(),
        }
    }

    pub fn mark(self) -> Option<Mark> {
        match self {
            Cell::Empty => None,
            Cell::X => Some(Mark::X),
            Cell::O => Some(Mark::O),
        }
    }

    pub fn is_empty(self) -> bool {
        self == Cell::Empty
    }

    pub fn letter(self) -> &'static str {
        self.mark().map(Mark::letter).unwrap_or(" ")
    }
}

impl From<Mark> for Cell {
    fn from(mark: Mark) -> Self {
        match mark {
            Mark::X => Cell::X,
            Mark::O => Cell::O,
        }
    }
}

impl From<Cell> for i8 {
    fn from(cell: Cell) -> Self {
        cell.value()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("cell value {_0} is not one of -1, 0, 1")]
pub struct InvalidCellValue(#[error(not(source))] pub i8);

impl TryFrom<i8> for Cell {
    type Error = InvalidCellValue;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Cell::Empty),
            -1 => Ok(Cell::X),
            1 => Ok(Cell::O),
            other => Err(InvalidCellValue(other)),
        }
    }
}

fn line_sum(line: [Cell; 3]) -> i8 {
    line.iter().map(|cell| cell.value()).sum()
}

pub(crate) fn square_coords(square: Square) -> Result<(usize, usize), RuleError> {
    if !(1..=SQUARE_COUNT).contains(&square) {
        return Err(RuleError::OutOfRangeSquare {
            square: square.into(),
        });
    }
    let index = usize::from(square - 1);
    Ok((index / BOARD_SIZE, index % BOARD_SIZE))
}

/// 3×3 grid of cells. `Copy`, so every candidate position is its own value.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(transparent)]
pub struct Board {
    cells: [[Cell; BOARD_SIZE]; BOARD_SIZE],
}

impl Board {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a board from line-sum values (-1 for X, 1 for O, 0 for empty).
    pub fn from_values(values: [[i8; BOARD_SIZE]; BOARD_SIZE]) -> Result<Self, InvalidCellValue> {
        let mut board = Board::new();
        for (row, line) in values.iter().enumerate() {
            for (col, value) in line.iter().enumerate() {
                board.cells[row][col] = Cell::try_from(*value)?;
            }
        }
        Ok(board)
    }

    /// `i` must be below 3.
    pub fn row(&self, i: usize) -> [Cell; 3] {
        self.cells[i]
    }

    /// `j` must be below 3.
    pub fn column(&self, j: usize) -> [Cell; 3] {
        [self.cells[0][j], self.cells[1][j], self.cells[2][j]]
    }

    /// `0` is top-left to bottom-right, anything else top-right to bottom-left.
    pub fn diagonal(&self, which: usize) -> [Cell; 3] {
        if which == 0 {
            [self.cells[0][0], self.cells[1][1], self.cells[2][2]]
        } else {
            [self.cells[0][2], self.cells[1][1], self.cells[2][0]]
        }
    }

    pub fn check_win(&self, mark: Mark) -> bool {
        let target = mark.value() * 3;
        (0..BOARD_SIZE).any(|i| line_sum(self.row(i)) == target || line_sum(self.column(i)) == target)
            || line_sum(self.diagonal(0)) == target
            || line_sum(self.diagonal(1)) == target
    }

    pub fn winner(&self) -> Option<Mark> {
        Mark::ALL.into_iter().find(|mark| self.check_win(*mark))
    }

    pub fn is_full(&self) -> bool {
        self.cells.iter().flatten().all(|cell| !cell.is_empty())
    }

    pub fn is_tie(&self) -> bool {
        !self.check_win(Mark::X) && !self.check_win(Mark::O) && self.is_full()
    }

    pub fn is_game_over(&self) -> bool {
        self.check_win(Mark::X) || self.check_win(Mark::O) || self.is_tie()
    }

    pub fn empty_squares(&self) -> Vec<Square> {
        (1..=SQUARE_COUNT)
            .filter(|&square| self.cell(square).is_empty())
            .collect()
    }

    pub fn empty_count(&self) -> usize {
        self.cells.iter().flatten().filter(|cell| cell.is_empty()).count()
    }

    pub fn mark_count(&self, mark: Mark) -> usize {
        let target = Cell::from(mark);
        self.cells.iter().flatten().filter(|cell| **cell == target).count()
    }

    pub fn square_owner(&self, square: Square) -> Result<Cell, RuleError> {
        let (row, col) = square_coords(square)?;
        Ok(self.cells[row][col])
    }

    pub fn is_empty(&self, square: Square) -> Result<bool, RuleError> {
        Ok(self.square_owner(square)?.is_empty())
    }

    /// Writes `mark` without checking occupancy; callers validate turns.
    pub fn set_square(&mut self, square: Square, mark: Mark) -> Result<(), RuleError> {
        let (row, col) = square_coords(square)?;
        self.cells[row][col] = Cell::from(mark);
        Ok(())
    }

    /// Undo for `set_square`.
    pub fn clear_square(&mut self, square: Square) -> Result<(), RuleError> {
        let (row, col) = square_coords(square)?;
        self.cells[row][col] = Cell::Empty;
        Ok(())
    }

    pub fn letter_at(&self, square: Square) -> Result<&'static str, RuleError> {
        Ok(self.square_owner(square)?.letter())
    }

    pub fn reset(&mut self) {
        self.cells = [[Cell::Empty; BOARD_SIZE]; BOARD_SIZE];
    }

    /// Squares whose cells differ between the two boards, ascending.
    pub fn diff(&self, other: &Board) -> Vec<Square> {
        (1..=SQUARE_COUNT)
            .filter(|&square| self.cell(square) != other.cell(square))
            .collect()
    }

    // Only called with squares from 1..=9.
    fn cell(&self, square: Square) -> Cell {
        let index = usize::from(square - 1);
        self.cells[index / BOARD_SIZE][index % BOARD_SIZE]
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, row) in self.cells.iter().enumerate() {
            writeln!(f, "{} | {} | {}", row[0].letter(), row[1].letter(), row[2].letter())?;
            if i + 1 < BOARD_SIZE {
                writeln!(f, "---------")?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl FromStr for Difficulty {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" | "normal" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            _ => Err(()),
        }
    }
}

/// Who controls a seat. Difficulty only exists for AI seats.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Identity {
    #[default]
    Human,
    Ai { difficulty: Difficulty },
}

impl Identity {
    pub fn ai(difficulty: Difficulty) -> Self {
        Identity::Ai { difficulty }
    }

    /// Parses "human" / "ai" plus an optional difficulty; AI seats default to medium.
    pub fn parse(identity: &str, difficulty: Option<&str>) -> Option<Self> {
        match identity.to_ascii_lowercase().as_str() {
            "human" => Some(Identity::Human),
            "ai" | "computer" | "cpu" => {
                let difficulty = match difficulty {
                    Some(value) => Difficulty::from_str(value).ok()?,
                    None => Difficulty::default(),
                };
                Some(Identity::Ai { difficulty })
            }
            _ => None,
        }
    }
}

/// A seat at the table. Survives rematches; only the board is cleared.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Player {
    pub mark: Mark,
    #[serde(default)]
    pub identity: Identity,
}

impl Player {
    pub fn new(mark: Mark, identity: Identity) -> Self {
        Self { mark, identity }
    }

    pub fn name(&self) -> &'static str {
        self.mark.name()
    }

    pub fn letter(&self) -> &'static str {
        self.mark.letter()
    }

    pub fn value(&self) -> i8 {
        self.mark.value()
    }

    pub fn is_ai(&self) -> bool {
        matches!(self.identity, Identity::Ai { .. })
    }

    pub fn is_human(&self) -> bool {
        self.identity == Identity::Human
    }

    pub fn difficulty(&self) -> Option<Difficulty> {
        match self.identity {
            Identity::Ai { difficulty } => Some(difficulty),
            Identity::Human => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[serde(tag = "type")]
pub enum IntegrityError {
    #[display("mark counts are unbalanced: {x} X against {o} O")]
    MarkImbalance { x: usize, o: usize },
    #[display("both players have three in a row")]
    DoubleWinner,
    #[display("{mark} is to move on a board where that is impossible")]
    WrongTurn { mark: Mark },
}

/// Board, the two seats, and whose turn it is (`None` before a match starts).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameState {
    #[serde(default)]
    pub board: Board,
    pub players: [Player; 2],
    #[serde(default)]
    pub current_player: Option<Mark>,
}

impl GameState {
    pub fn new() -> Self {
        Self {
            board: Board::new(),
            players: [
                Player::new(Mark::X, Identity::Human),
                Player::new(Mark::O, Identity::Human),
            ],
            current_player: None,
        }
    }

    pub fn with_board(mut self, board: Board, current_player: Mark) -> Self {
        self.board = board;
        self.current_player = Some(current_player);
        self
    }

    pub fn player(&self, mark: Mark) -> &Player {
        &self.players[mark.index()]
    }

    pub fn with_players(mut self, x: Identity, o: Identity) -> Self {
        self.players = [Player::new(Mark::X, x), Player::new(Mark::O, o)];
        self
    }

    /// Changes who controls a seat. Refused once a match has moves on the board
    /// and is still running; between matches any seat may change.
    pub fn configure_player(&mut self, mark: Mark, identity: Identity) -> Result<(), RuleError> {
        if self.is_in_progress() {
            return Err(RuleError::invalid_state(format!(
                "{} cannot be reconfigured mid-match",
                mark.name()
            )));
        }
        self.players[mark.index()].identity = identity;
        Ok(())
    }

    /// A match has started, at least one move is on the board, and nobody has won or tied yet.
    pub fn is_in_progress(&self) -> bool {
        self.current_player.is_some()
            && self.board.empty_count() < usize::from(SQUARE_COUNT)
            && !self.board.is_game_over()
    }

    pub fn current(&self) -> Option<&Player> {
        self.current_player.map(|mark| self.player(mark))
    }

    pub fn reset_board(&mut self) {
        self.board.reset();
    }

    pub fn choose_starting_player<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Mark {
        let mark = if rng.gen_bool(0.5) { Mark::X } else { Mark::O };
        self.current_player = Some(mark);
        mark
    }

    pub fn swap_current_player(&mut self) {
        self.current_player = self.current_player.map(Mark::opponent);
    }

    pub fn is_game_over(&self) -> bool {
        self.board.is_game_over()
    }

    pub fn is_tie(&self) -> bool {
        self.board.is_tie()
    }

    /// Checks that the board could have come from alternating single-cell moves.
    pub fn integrity_check(&self) -> Result<(), IntegrityError> {
        let x = self.board.mark_count(Mark::X);
        let o = self.board.mark_count(Mark::O);
        if x.abs_diff(o) > 1 {
            return Err(IntegrityError::MarkImbalance { x, o });
        }
        if self.board.check_win(Mark::X) && self.board.check_win(Mark::O) {
            return Err(IntegrityError::DoubleWinner);
        }
        if let Some(mark) = self.current_player {
            let (mine, theirs) = if mark == Mark::X { (x, o) } else { (o, x) };
            if !self.board.is_game_over() && mine > theirs {
                return Err(IntegrityError::WrongTurn { mark });
            }
        }
        Ok(())
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}
