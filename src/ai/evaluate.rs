use crate::game::{Board, Mark};

/// Scores a finished board from X's (the maximizer's) point of view.
///
/// Wins are worth one more than the number of empty squares left, so a quicker
/// win scores higher and a slower loss hurts less. The `+ 1` keeps a win on a
/// full board away from zero, which is reserved for ties and unfinished boards.
pub fn evaluate(board: &Board) -> i32 {
    let remaining = board.empty_count() as i32;
    if board.check_win(Mark::X) {
        remaining + 1
    } else if board.check_win(Mark::O) {
        -(remaining + 1)
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board(values: [[i8; 3]; 3]) -> Board {
        Board::from_values(values).expect("valid cell values")
    }

    #[test]
    fn faster_wins_score_higher() {
        let quick = board([[-1, -1, -1], [1, 1, 0], [0, 0, 0]]);
        let slow = board([[-1, -1, -1], [1, 1, -1], [1, -1, 1]]);
        assert_eq!(evaluate(&quick), 5);
        assert_eq!(evaluate(&slow), 1);
    }

    #[test]
    fn o_wins_are_negative() {
        let won = board([[1, 1, 1], [-1, -1, 0], [-1, 0, 0]]);
        assert_eq!(evaluate(&won), -4);
    }

    #[test]
    fn ties_and_open_boards_are_zero() {
        assert_eq!(evaluate(&Board::new()), 0);
        assert_eq!(evaluate(&board([[-1, 1, -1], [1, -1, 1], [1, -1, 1]])), 0);
        assert_eq!(evaluate(&board([[-1, -1, 0], [0, 1, 0], [0, 0, 1]])), 0);
    }
}
