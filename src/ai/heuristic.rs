use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::game::{Board, Mark, Square, LINES};

/// Finds a line where `owner` holds two cells and the third is open.
///
/// Lines are scanned rows first, then columns, then the two diagonals.
pub fn two_in_a_row(board: &Board, owner: Mark) -> Option<Square> {
    let target = owner.value() * 2;
    LINES.iter().find_map(|line| {
        let cells = line.map(|square| board.square_owner(square).unwrap_or_default());
        let sum: i8 = cells.iter().map(|cell| cell.value()).sum();
        if sum != target {
            return None;
        }
        line.iter()
            .zip(cells)
            .find(|(_, cell)| cell.is_empty())
            .map(|(square, _)| *square)
    })
}

/// Uniformly random open square, or `None` on a full board.
pub fn random_square<R: Rng + ?Sized>(board: &Board, rng: &mut R) -> Option<Square> {
    let mut squares = board.empty_squares();
    squares.shuffle(rng);
    squares
        .into_iter()
        .find(|&square| board.is_empty(square).unwrap_or(false))
}

/// Which rule produced a medium-tier move.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Tactic {
    Win,
    Block,
    Random,
}

/// Completes an own two-in-a-row, else blocks the opponent's, else plays randomly.
pub fn medium_square<R: Rng + ?Sized>(
    board: &Board,
    mark: Mark,
    rng: &mut R,
) -> Option<(Square, Tactic)> {
    if let Some(square) = two_in_a_row(board, mark) {
        return Some((square, Tactic::Win));
    }
    if let Some(square) = two_in_a_row(board, mark.opponent()) {
        return Some((square, Tactic::Block));
    }
    random_square(board, rng).map(|square| (square, Tactic::Random))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn board(values: [[i8; 3]; 3]) -> Board {
        Board::from_values(values).expect("valid cell values")
    }

    #[test]
    fn completes_own_line_before_blocking() {
        // X X _ / _ O _ / _ _ O
        let board = board([[-1, -1, 0], [0, 1, 0], [0, 0, 1]]);
        let mut rng = SmallRng::seed_from_u64(1);
        assert_eq!(medium_square(&board, Mark::X, &mut rng), Some((3, Tactic::Win)));
        assert_eq!(two_in_a_row(&board, Mark::O), None);
        assert_eq!(medium_square(&board, Mark::O, &mut rng), Some((3, Tactic::Block)));
    }

    #[test]
    fn blocks_when_it_cannot_win() {
        let board = board([[-1, 0, 0], [-1, 1, 0], [0, 0, 0]]);
        let mut rng = SmallRng::seed_from_u64(2);
        assert_eq!(medium_square(&board, Mark::O, &mut rng), Some((7, Tactic::Block)));
    }

    #[test]
    fn finds_threats_on_every_kind_of_line() {
        let column = board([[0, 1, 0], [0, 1, 0], [0, 0, 0]]);
        assert_eq!(two_in_a_row(&column, Mark::O), Some(8));
        let anti = board([[0, 0, -1], [0, 0, 0], [-1, 0, 0]]);
        assert_eq!(two_in_a_row(&anti, Mark::X), Some(5));
        let blocked = board([[-1, -1, 1], [0, 0, 0], [0, 0, 0]]);
        assert_eq!(two_in_a_row(&blocked, Mark::X), None);
    }

    #[test]
    fn falls_back_to_an_open_square() {
        let board = board([[-1, 1, 0], [0, 0, 0], [0, 0, 0]]);
        let mut rng = SmallRng::seed_from_u64(9);
        let (square, tactic) = medium_square(&board, Mark::X, &mut rng).expect("open squares");
        assert_eq!(tactic, Tactic::Random);
        assert!(board.empty_squares().contains(&square));
    }

    #[test]
    fn random_square_is_seeded_and_covers_all_open_squares() {
        let board = board([[-1, 0, 0], [0, 1, 0], [0, 0, 0]]);
        let first = random_square(&board, &mut SmallRng::seed_from_u64(5));
        let again = random_square(&board, &mut SmallRng::seed_from_u64(5));
        assert_eq!(first, again);

        let mut rng = SmallRng::seed_from_u64(11);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..500 {
            seen.insert(random_square(&board, &mut rng).expect("open squares"));
        }
        assert_eq!(seen.len(), 7);
        assert!(!seen.contains(&1) && !seen.contains(&5));
    }

    #[test]
    fn full_board_has_no_random_square() {
        let full = board([[-1, 1, -1], [1, -1, 1], [1, -1, 1]]);
        assert_eq!(random_square(&full, &mut SmallRng::seed_from_u64(0)), None);
    }
}
