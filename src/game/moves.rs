use serde::{Deserialize, Serialize};

use super::rules::RuleError;
use super::state::{Board, Mark, Square};

/// A candidate position: `board` is the input with `square` taken.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Successor {
    pub square: Square,
    pub board: Board,
}

/// Every position `mark` can reach in one move, in ascending square order.
///
/// Search relies on that order for tie-breaking. A finished board has no
/// legal moves and is reported as a caller error rather than an empty list.
pub fn possible_moves(board: &Board, mark: Mark) -> Result<Vec<Successor>, RuleError> {
    if board.is_game_over() {
        return Err(RuleError::invalid_state(
            "no moves can be generated for a finished game",
        ));
    }

    board
        .empty_squares()
        .into_iter()
        .map(|square| {
            let mut next = *board;
            next.set_square(square, mark)?;
            Ok(Successor {
                square,
                board: next,
            })
        })
        .collect()
}
