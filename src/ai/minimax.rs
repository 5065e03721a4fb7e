use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::evaluate::evaluate;
use super::heuristic::{medium_square, random_square, Tactic};
use crate::game::{
    possible_moves, Board, Difficulty, GameState, Mark, MoveReport, RuleEngine, RuleError, Square,
};

/// Stand-ins for ±∞ in the alpha-beta window. Real scores stay within ±10.
pub const NEG_INFINITY: i32 = i32::MIN;
pub const INFINITY: i32 = i32::MAX;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AiStrategy {
    Random,
    Heuristic,
    Minimax,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct AiConfig {
    pub difficulty: Difficulty,
    pub strategy: AiStrategy,
}

impl AiConfig {
    pub fn from_difficulty(difficulty: Difficulty) -> Self {
        match difficulty {
            Difficulty::Easy => Self {
                difficulty,
                strategy: AiStrategy::Random,
            },
            Difficulty::Medium => Self {
                difficulty,
                strategy: AiStrategy::Heuristic,
            },
            Difficulty::Hard => Self {
                difficulty,
                strategy: AiStrategy::Minimax,
            },
        }
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        AiConfig::from_difficulty(Difficulty::default())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AiDecision {
    pub mark: Mark,
    pub square: Square,
    pub board: Board,
    pub evaluation: i32,
    pub strategy: AiStrategy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tactic: Option<Tactic>,
    pub nodes: u64,
    pub cutoffs: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchStats {
    pub nodes: u64,
    pub cutoffs: u64,
}

/// Exhaustive alpha-beta search. X maximizes, O minimizes.
///
/// Returns the score of `board` with `to_move` playing next, together with the
/// successor board that achieves it (or `board` itself when it is terminal).
/// Equal scores keep the earliest square in ascending order.
pub fn minimax(
    board: &Board,
    to_move: Mark,
    alpha: i32,
    beta: i32,
) -> Result<(i32, Board), RuleError> {
    let mut stats = SearchStats::default();
    search(board, to_move, alpha, beta, &mut stats)
}

fn search(
    board: &Board,
    to_move: Mark,
    mut alpha: i32,
    mut beta: i32,
    stats: &mut SearchStats,
) -> Result<(i32, Board), RuleError> {
    stats.nodes += 1;

    if board.is_game_over() {
        return Ok((evaluate(board), *board));
    }

    let mut best_board = *board;
    if to_move == Mark::X {
        let mut best = NEG_INFINITY;
        for successor in possible_moves(board, to_move)? {
            let (score, _) = search(&successor.board, Mark::O, alpha, beta, stats)?;
            if score > best {
                best = score;
                best_board = successor.board;
            }
            alpha = alpha.max(score);
            if beta <= alpha {
                stats.cutoffs += 1;
                break;
            }
        }
        Ok((best, best_board))
    } else {
        let mut best = INFINITY;
        for successor in possible_moves(board, to_move)? {
            let (score, _) = search(&successor.board, Mark::X, alpha, beta, stats)?;
            if score < best {
                best = score;
                best_board = successor.board;
            }
            beta = beta.min(score);
            if beta <= alpha {
                stats.cutoffs += 1;
                break;
            }
        }
        Ok((best, best_board))
    }
}

/// Picks moves for whichever seat is to move. Holds no state between turns
/// beyond its random source.
pub struct AiAgent {
    config: AiConfig,
    rng: SmallRng,
}

impl AiAgent {
    pub fn new(config: AiConfig) -> Self {
        Self {
            config,
            rng: SmallRng::from_entropy(),
        }
    }

    pub fn with_seed(config: AiConfig, seed: u64) -> Self {
        Self {
            config,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    #[instrument(skip(self, state), fields(strategy = ?self.config.strategy))]
    pub fn decide_move(&mut self, state: &GameState) -> Result<AiDecision, RuleError> {
        let Some(mark) = state.current_player else {
            return Err(RuleError::invalid_state("match has not started"));
        };
        if state.is_game_over() {
            return Err(RuleError::invalid_state("game is already over"));
        }

        let decision = match self.config.strategy {
            AiStrategy::Minimax => self.search_decision(&state.board, mark)?,
            AiStrategy::Heuristic => {
                let Some((square, tactic)) = medium_square(&state.board, mark, &mut self.rng)
                else {
                    return Err(RuleError::invalid_state("no open squares"));
                };
                self.placed(&state.board, mark, square, Some(tactic))?
            }
            AiStrategy::Random => {
                let Some(square) = random_square(&state.board, &mut self.rng) else {
                    return Err(RuleError::invalid_state("no open squares"));
                };
                self.placed(&state.board, mark, square, None)?
            }
        };

        debug!(
            mark = %decision.mark,
            square = decision.square,
            evaluation = decision.evaluation,
            nodes = decision.nodes,
            cutoffs = decision.cutoffs,
            "ai decided"
        );
        Ok(decision)
    }

    /// Decides and plays. Minimax results replace the board wholesale.
    pub fn apply_move(
        &mut self,
        state: &mut GameState,
    ) -> Result<(AiDecision, MoveReport), RuleError> {
        let decision = self.decide_move(state)?;
        let report = RuleEngine::adopt_board(state, decision.mark, decision.board)?;
        Ok((decision, report))
    }

    fn search_decision(&self, board: &Board, mark: Mark) -> Result<AiDecision, RuleError> {
        let mut stats = SearchStats::default();
        let (evaluation, best) = search(board, mark, NEG_INFINITY, INFINITY, &mut stats)?;
        let changed = board.diff(&best);
        let Some(&square) = changed.first() else {
            return Err(RuleError::invalid_state("search returned the input board"));
        };
        Ok(AiDecision {
            mark,
            square,
            board: best,
            evaluation,
            strategy: self.config.strategy,
            tactic: None,
            nodes: stats.nodes,
            cutoffs: stats.cutoffs,
        })
    }

    fn placed(
        &self,
        board: &Board,
        mark: Mark,
        square: Square,
        tactic: Option<Tactic>,
    ) -> Result<AiDecision, RuleError> {
        let mut next = *board;
        next.set_square(square, mark)?;
        Ok(AiDecision {
            mark,
            square,
            board: next,
            evaluation: evaluate(&next),
            strategy: self.config.strategy,
            tactic,
            nodes: 0,
            cutoffs: 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{Cell, GameStatus};

    fn board(values: [[i8; 3]; 3]) -> Board {
        Board::from_values(values).expect("valid cell values")
    }

    fn state(values: [[i8; 3]; 3], to_move: Mark) -> GameState {
        GameState::new().with_board(board(values), to_move)
    }

    #[test]
    fn minimax_takes_the_last_winning_square() {
        // X X _ / O O X / X O O
        let start = board([[-1, -1, 0], [1, 1, -1], [-1, 1, 1]]);
        let (evaluation, best) = minimax(&start, Mark::X, NEG_INFINITY, INFINITY).expect("search");
        assert!(evaluation > 0);
        assert_eq!(start.diff(&best), vec![3]);
        assert_eq!(best.square_owner(3), Ok(Cell::X));
    }

    #[test]
    fn minimax_on_terminal_board_returns_it_unchanged() {
        let won = board([[1, 1, 1], [-1, -1, 0], [-1, 0, 0]]);
        let (evaluation, best) = minimax(&won, Mark::X, NEG_INFINITY, INFINITY).expect("search");
        assert_eq!(evaluation, -4);
        assert_eq!(best, won);
    }

    #[test]
    fn minimax_prefers_the_quicker_win() {
        // X can win at once on square 3, or set up slower wins elsewhere.
        let start = board([[-1, -1, 0], [1, 1, 0], [0, 0, 0]]);
        let (evaluation, best) = minimax(&start, Mark::X, NEG_INFINITY, INFINITY).expect("search");
        assert_eq!(evaluation, 5);
        assert_eq!(start.diff(&best), vec![3]);

        let (evaluation, best) = minimax(&start, Mark::O, NEG_INFINITY, INFINITY).expect("search");
        assert_eq!(evaluation, -5);
        assert_eq!(start.diff(&best), vec![6]);
    }

    #[test]
    fn equal_scores_keep_the_lowest_square() {
        // Every reply draws with perfect play from an empty board; the first square wins the tie.
        let (evaluation, best) =
            minimax(&Board::new(), Mark::X, NEG_INFINITY, INFINITY).expect("search");
        assert_eq!(evaluation, 0);
        assert_eq!(Board::new().diff(&best), vec![1]);
    }

    #[test]
    fn pruning_visits_fewer_nodes_than_the_full_tree() {
        let mut stats = SearchStats::default();
        search(&Board::new(), Mark::X, NEG_INFINITY, INFINITY, &mut stats).expect("search");
        assert!(stats.cutoffs > 0);
        assert!(stats.nodes < 549_946, "visited {} nodes", stats.nodes);
    }

    #[test]
    fn hard_agent_blocks_an_open_line() {
        // O must block X on square 3.
        let mut game = state([[-1, -1, 0], [0, 1, 0], [0, 0, 0]], Mark::O);
        let mut agent = AiAgent::with_seed(AiConfig::from_difficulty(Difficulty::Hard), 1);
        let (decision, report) = agent.apply_move(&mut game).expect("ai move");
        assert_eq!(decision.square, 3);
        assert_eq!(decision.strategy, AiStrategy::Minimax);
        assert!(decision.nodes > 0);
        assert_eq!(report.status, GameStatus::Ongoing);
        assert_eq!(game.current_player, Some(Mark::X));
    }

    #[test]
    fn medium_agent_completes_its_line() {
        let mut game = state([[-1, -1, 0], [0, 1, 0], [0, 0, 1]], Mark::X);
        let mut agent = AiAgent::with_seed(AiConfig::from_difficulty(Difficulty::Medium), 4);
        let (decision, report) = agent.apply_move(&mut game).expect("ai move");
        assert_eq!(decision.square, 3);
        assert_eq!(decision.tactic, Some(Tactic::Win));
        assert!(game.board.check_win(Mark::X));
        assert_eq!(report.winner(), Some(Mark::X));
    }

    #[test]
    fn easy_agent_plays_some_open_square() {
        let mut game = state([[-1, 0, 0], [0, 1, 0], [0, 0, 0]], Mark::X);
        let open = game.board.empty_squares();
        let mut agent = AiAgent::with_seed(AiConfig::from_difficulty(Difficulty::Easy), 8);
        let (decision, _) = agent.apply_move(&mut game).expect("ai move");
        assert!(open.contains(&decision.square));
        assert_eq!(game.board.empty_count(), open.len() - 1);
    }

    #[test]
    fn seeded_agents_repeat_themselves() {
        let game = state([[0, 0, 0], [0, 0, 0], [0, 0, 0]], Mark::O);
        let config = AiConfig::from_difficulty(Difficulty::Easy);
        let a = AiAgent::with_seed(config, 42).decide_move(&game).expect("decision");
        let b = AiAgent::with_seed(config, 42).decide_move(&game).expect("decision");
        assert_eq!(a, b);
    }

    #[test]
    fn finished_or_unstarted_games_are_refused() {
        let mut agent = AiAgent::with_seed(AiConfig::default(), 0);
        let unstarted = GameState::new();
        assert!(matches!(
            agent.decide_move(&unstarted),
            Err(RuleError::InvalidStateQuery { .. })
        ));
        let finished = state([[-1, -1, -1], [1, 1, 0], [0, 0, 0]], Mark::X);
        assert!(matches!(
            agent.decide_move(&finished),
            Err(RuleError::InvalidStateQuery { .. })
        ));
    }
}
