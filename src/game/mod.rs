//! Board, seats, turn order and move legality.

pub mod moves;
pub mod rules;
pub mod state;

pub use moves::{possible_moves, Successor};
pub use rules::{GameStatus, MoveReport, RuleEngine, RuleError};
pub use state::{
    Board,
    Cell,
    Difficulty,
    GameState,
    Identity,
    IntegrityError,
    InvalidCellValue,
    Mark,
    Player,
    Square,
    LINES,
    SQUARE_COUNT,
};
