//! A single table: one board, two seats, and the random source that drives
//! starting-player choice and AI play.
//!
//! This is the surface a front end talks to. Seats keep their identity and
//! difficulty across rematches; only the board is cleared by `start_match`.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::ai::{AiAgent, AiConfig, AiDecision};
use crate::game::{
    Board, GameState, GameStatus, Identity, Mark, MoveReport, RuleEngine, RuleError, Square,
};

/// Seat setup and optional seed, usually supplied as JSON by the front end.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct MatchConfig {
    #[serde(default)]
    pub x: Identity,
    #[serde(default)]
    pub o: Identity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

/// One AI turn: what the agent chose and what it did to the game.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AiTurn {
    pub decision: AiDecision,
    pub report: MoveReport,
}

/// A match between two seats.
#[derive(Debug, Clone)]
pub struct MatchSession {
    state: GameState,
    rng: SmallRng,
}

impl MatchSession {
    /// Creates a session with two human seats and an entropy-seeded random source.
    pub fn new() -> Self {
        Self {
            state: GameState::new(),
            rng: SmallRng::from_entropy(),
        }
    }

    /// Creates a session whose starting players and AI moves are reproducible.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            state: GameState::new(),
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// Applies a [`MatchConfig`].
    #[instrument]
    pub fn from_config(config: &MatchConfig) -> Self {
        let mut session = match config.seed {
            Some(seed) => Self::with_seed(seed),
            None => Self::new(),
        };
        session.state = GameState::new().with_players(config.x, config.o);
        session
    }

    /// Replaces the whole game state, e.g. one restored by the front end.
    ///
    /// The state must pass the integrity check.
    pub fn load_state(&mut self, state: GameState) -> Result<(), RuleError> {
        RuleEngine::validate(&state)?;
        self.state = state;
        Ok(())
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn board(&self) -> &Board {
        &self.state.board
    }

    /// Sets whether a seat is human or AI (and at which difficulty).
    ///
    /// Fails with `InvalidStateQuery` while a match is under way.
    #[instrument(skip(self))]
    pub fn configure_player(&mut self, mark: Mark, identity: Identity) -> Result<(), RuleError> {
        self.state.configure_player(mark, identity)
    }

    /// Clears the board and randomly chooses who opens.
    pub fn start_match(&mut self) -> Mark {
        RuleEngine::start_match(&mut self.state, &mut self.rng)
    }

    /// Plays `square` for the human whose turn it is.
    ///
    /// Fails with `OutOfRangeSquare` or `OccupiedSquare` for bad squares, and
    /// with `InvalidStateQuery` when the game is over, has not started, or an
    /// AI seat is to move.
    pub fn apply_human_move(&mut self, square: Square) -> Result<MoveReport, RuleError> {
        RuleEngine::apply_human_move(&mut self.state, square)
    }

    /// Runs the configured strategy for the AI seat whose turn it is.
    #[instrument(skip(self))]
    pub fn apply_ai_move(&mut self) -> Result<AiTurn, RuleError> {
        let mut agent = Self::agent_for(&self.state, &mut self.rng)?;
        let (decision, report) = agent.apply_move(&mut self.state)?;
        Ok(AiTurn { decision, report })
    }

    /// Works out what the AI to move would play, without playing it.
    ///
    /// The session's random source is not advanced, so the next
    /// `apply_ai_move` plays the same square.
    pub fn think_ai(&self) -> Result<AiDecision, RuleError> {
        let mut rng = self.rng.clone();
        let mut agent = Self::agent_for(&self.state, &mut rng)?;
        agent.decide_move(&self.state)
    }

    /// Plays AI turns until a human is to move or the game ends.
    pub fn advance_ai(&mut self) -> Result<Vec<AiTurn>, RuleError> {
        let mut turns = Vec::new();
        while !self.is_game_over()
            && self.state.current().is_some_and(|player| player.is_ai())
        {
            turns.push(self.apply_ai_move()?);
        }
        if let Some(last) = turns.last() {
            if last.report.is_game_over() {
                info!(status = ?last.report.status, turns = turns.len(), "ai finished the game");
            }
        }
        Ok(turns)
    }

    fn agent_for(state: &GameState, rng: &mut SmallRng) -> Result<AiAgent, RuleError> {
        let Some(player) = state.current() else {
            return Err(RuleError::invalid_state("match has not started"));
        };
        let Some(difficulty) = player.difficulty() else {
            return Err(RuleError::invalid_state(format!(
                "{} is not AI-controlled",
                player.name()
            )));
        };
        let seed = rng.gen();
        Ok(AiAgent::with_seed(AiConfig::from_difficulty(difficulty), seed))
    }

    pub fn current_player(&self) -> Option<Mark> {
        self.state.current_player
    }

    pub fn status(&self) -> GameStatus {
        RuleEngine::status(&self.state)
    }

    pub fn is_game_over(&self) -> bool {
        self.state.is_game_over()
    }

    pub fn is_tie(&self) -> bool {
        self.state.is_tie()
    }

    /// Winning mark, `None` for a tie; an error while the game is running.
    pub fn winner(&self) -> Result<Option<Mark>, RuleError> {
        RuleEngine::winner(&self.state)
    }

    pub fn empty_squares(&self) -> Vec<Square> {
        self.state.board.empty_squares()
    }

    pub fn letter_at(&self, square: Square) -> Result<&'static str, RuleError> {
        self.state.board.letter_at(square)
    }

    /// "Player 1 wins!", "Player 2 wins!" or "It's a tie!".
    pub fn result_message(&self) -> Result<String, RuleError> {
        Ok(match self.winner()? {
            Some(mark) => format!("{} wins!", capitalize(mark.name())),
            None => "It's a tie!".to_string(),
        })
    }
}

impl Default for MatchSession {
    fn default() -> Self {
        Self::new()
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
