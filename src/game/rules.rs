use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use super::state::{Board, GameState, Mark, Square};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[serde(tag = "type")]
pub enum RuleError {
    #[display("square {square} is out of range, expected 1-9")]
    OutOfRangeSquare { square: u32 },
    #[display("square {square} is already occupied")]
    OccupiedSquare { square: Square },
    #[display("invalid state query: {reason}")]
    InvalidStateQuery { reason: String },
}

impl RuleError {
    pub fn invalid_state(reason: impl Into<String>) -> Self {
        RuleError::InvalidStateQuery {
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum GameStatus {
    Ongoing,
    Won { winner: Mark },
    Tie,
}

impl GameStatus {
    pub fn of(board: &Board) -> Self {
        match board.winner() {
            Some(winner) => GameStatus::Won { winner },
            None if board.is_full() => GameStatus::Tie,
            None => GameStatus::Ongoing,
        }
    }

    pub fn is_over(&self) -> bool {
        !matches!(self, GameStatus::Ongoing)
    }

    pub fn is_tie(&self) -> bool {
        matches!(self, GameStatus::Tie)
    }

    pub fn winner(&self) -> Option<Mark> {
        match self {
            GameStatus::Won { winner } => Some(*winner),
            _ => None,
        }
    }
}

/// What a single applied move did to the game.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MoveReport {
    pub mark: Mark,
    pub square: Square,
    pub status: GameStatus,
    pub board: Board,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_player: Option<Mark>,
}

impl MoveReport {
    pub fn is_game_over(&self) -> bool {
        self.status.is_over()
    }

    pub fn is_tie(&self) -> bool {
        self.status.is_tie()
    }

    pub fn winner(&self) -> Option<Mark> {
        self.status.winner()
    }
}

pub struct RuleEngine;

impl RuleEngine {
    /// Clears the board and picks who opens. Player seats are untouched.
    #[instrument(skip(state, rng))]
    pub fn start_match<R: Rng + ?Sized>(state: &mut GameState, rng: &mut R) -> Mark {
        state.reset_board();
        let first = state.choose_starting_player(rng);
        info!(first = %first, "match started");
        first
    }

    fn ensure_in_progress(state: &GameState) -> Result<Mark, RuleError> {
        let Some(mark) = state.current_player else {
            return Err(RuleError::invalid_state("match has not started"));
        };
        if state.is_game_over() {
            return Err(RuleError::invalid_state("game is already over"));
        }
        Ok(mark)
    }

    fn ensure_square_free(board: &Board, square: Square) -> Result<(), RuleError> {
        if !board.is_empty(square)? {
            return Err(RuleError::OccupiedSquare { square });
        }
        Ok(())
    }

    /// Plays `square` for whoever is to move, then hands the turn over unless the game ended.
    #[instrument(skip(state))]
    pub fn apply_move(state: &mut GameState, square: Square) -> Result<MoveReport, RuleError> {
        let mark = Self::ensure_in_progress(state)?;
        if let Err(err) = Self::ensure_square_free(&state.board, square) {
            warn!(%err, "move rejected");
            return Err(err);
        }
        state.board.set_square(square, mark)?;
        Ok(Self::finish_turn(state, mark, square))
    }

    #[instrument(skip(state))]
    pub fn apply_human_move(state: &mut GameState, square: Square) -> Result<MoveReport, RuleError> {
        if let Some(player) = state.current() {
            if player.is_ai() {
                return Err(RuleError::invalid_state(format!(
                    "{} is AI-controlled",
                    player.name()
                )));
            }
        }
        Self::apply_move(state, square)
    }

    /// Replaces the board with `next`, which must be the current one plus a single `mark`.
    #[instrument(skip(state, next))]
    pub fn adopt_board(
        state: &mut GameState,
        mark: Mark,
        next: Board,
    ) -> Result<MoveReport, RuleError> {
        let to_move = Self::ensure_in_progress(state)?;
        if to_move != mark {
            return Err(RuleError::invalid_state(format!("it is not {mark}'s turn")));
        }
        let changed = state.board.diff(&next);
        let &[square] = changed.as_slice() else {
            return Err(RuleError::invalid_state(
                "successor board must differ in exactly one square",
            ));
        };
        Self::ensure_square_free(&state.board, square)?;
        if next.square_owner(square)?.mark() != Some(mark) {
            return Err(RuleError::invalid_state(format!(
                "square {square} was not taken by {mark}"
            )));
        }
        state.board = next;
        Ok(Self::finish_turn(state, mark, square))
    }

    fn finish_turn(state: &mut GameState, mark: Mark, square: Square) -> MoveReport {
        let status = GameStatus::of(&state.board);
        match status {
            GameStatus::Ongoing => state.swap_current_player(),
            GameStatus::Won { winner } => info!(winner = %winner, "game won"),
            GameStatus::Tie => info!("game tied"),
        }
        MoveReport {
            mark,
            square,
            status,
            board: state.board,
            next_player: if status.is_over() {
                None
            } else {
                state.current_player
            },
        }
    }

    pub fn status(state: &GameState) -> GameStatus {
        GameStatus::of(&state.board)
    }

    /// `Ok(None)` for a tie; an error while the game is still running.
    pub fn winner(state: &GameState) -> Result<Option<Mark>, RuleError> {
        match Self::status(state) {
            GameStatus::Ongoing => Err(RuleError::invalid_state(
                "winner requested before the game is over",
            )),
            status => Ok(status.winner()),
        }
    }

    pub fn validate(state: &GameState) -> Result<(), RuleError> {
        state
            .integrity_check()
            .map_err(|error| RuleError::invalid_state(error.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::state::{Difficulty, Identity};
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn started(first: Mark) -> GameState {
        let mut state = GameState::new();
        state.current_player = Some(first);
        state
    }

    fn board(values: [[i8; 3]; 3]) -> Board {
        Board::from_values(values).expect("valid cell values")
    }

    #[test]
    fn start_match_clears_board_and_picks_a_player() {
        let mut rng = SmallRng::seed_from_u64(3);
        let mut state = started(Mark::X);
        state.board.set_square(1, Mark::X).expect("in range");
        let first = RuleEngine::start_match(&mut state, &mut rng);
        assert_eq!(state.board, Board::new());
        assert_eq!(state.current_player, Some(first));
    }

    #[test]
    fn moves_alternate_until_the_game_ends() {
        let mut state = started(Mark::X);
        for (square, expected) in [(1, Mark::X), (4, Mark::O), (2, Mark::X), (5, Mark::O)] {
            let report = RuleEngine::apply_move(&mut state, square).expect("legal move");
            assert_eq!(report.mark, expected);
            assert_eq!(report.status, GameStatus::Ongoing);
            assert_eq!(report.next_player, Some(expected.opponent()));
        }

        let report = RuleEngine::apply_move(&mut state, 3).expect("winning move");
        assert_eq!(report.status, GameStatus::Won { winner: Mark::X });
        assert_eq!(report.next_player, None);
        assert_eq!(state.current_player, Some(Mark::X));
        assert_eq!(RuleEngine::winner(&state), Ok(Some(Mark::X)));

        assert!(matches!(
            RuleEngine::apply_move(&mut state, 9),
            Err(RuleError::InvalidStateQuery { .. })
        ));
    }

    #[test]
    fn rejected_moves_leave_state_untouched() {
        let mut state = started(Mark::O);
        RuleEngine::apply_move(&mut state, 5).expect("legal move");
        let snapshot = state.clone();

        assert_eq!(
            RuleEngine::apply_move(&mut state, 5),
            Err(RuleError::OccupiedSquare { square: 5 })
        );
        assert_eq!(
            RuleEngine::apply_move(&mut state, 10),
            Err(RuleError::OutOfRangeSquare { square: 10 })
        );
        assert_eq!(state, snapshot);
    }

    #[test]
    fn moves_before_start_are_invalid() {
        let mut state = GameState::new();
        assert!(matches!(
            RuleEngine::apply_move(&mut state, 1),
            Err(RuleError::InvalidStateQuery { .. })
        ));
    }

    #[test]
    fn winner_query_requires_a_finished_game() {
        let state = started(Mark::X);
        assert!(matches!(
            RuleEngine::winner(&state),
            Err(RuleError::InvalidStateQuery { .. })
        ));

        let tie = started(Mark::X).with_board(board([[-1, 1, -1], [1, -1, 1], [1, -1, 1]]), Mark::O);
        assert_eq!(RuleEngine::winner(&tie), Ok(None));
        assert_eq!(RuleEngine::status(&tie), GameStatus::Tie);
    }

    #[test]
    fn human_moves_are_refused_on_ai_turns() {
        let mut state = started(Mark::O);
        state
            .configure_player(Mark::O, Identity::ai(Difficulty::Easy))
            .expect("empty board");
        assert!(matches!(
            RuleEngine::apply_human_move(&mut state, 1),
            Err(RuleError::InvalidStateQuery { .. })
        ));
        state.current_player = Some(Mark::X);
        assert!(RuleEngine::apply_human_move(&mut state, 1).is_ok());
    }

    #[test]
    fn adopt_board_accepts_exactly_one_new_mark() {
        let mut state = started(Mark::X);
        let mut next = state.board;
        next.set_square(7, Mark::X).expect("in range");
        let report = RuleEngine::adopt_board(&mut state, Mark::X, next).expect("one new mark");
        assert_eq!(report.square, 7);
        assert_eq!(state.board, next);
        assert_eq!(state.current_player, Some(Mark::O));

        let mut twice = state.board;
        twice.set_square(1, Mark::O).expect("in range");
        twice.set_square(2, Mark::O).expect("in range");
        assert!(RuleEngine::adopt_board(&mut state, Mark::O, twice).is_err());

        let mut wrong_mark = state.board;
        wrong_mark.set_square(1, Mark::X).expect("in range");
        assert!(RuleEngine::adopt_board(&mut state, Mark::O, wrong_mark).is_err());
        assert!(RuleEngine::adopt_board(&mut state, Mark::X, wrong_mark).is_err());
    }

    #[test]
    fn errors_render_for_users() {
        assert_eq!(
            RuleError::OccupiedSquare { square: 4 }.to_string(),
            "square 4 is already occupied"
        );
        let json = serde_json::to_string(&RuleError::OutOfRangeSquare { square: 0 })
            .expect("serialize");
        assert_eq!(json, r#"{"type":"OutOfRangeSquare","square":0}"#);
    }
}
