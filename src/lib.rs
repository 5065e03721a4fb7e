pub mod ai;
pub mod game;
pub mod session;

use gloo_timers::future::TimeoutFuture;
use serde::Serialize;
use serde_wasm_bindgen::{from_value, to_value};
use std::str::FromStr;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;
use web_sys::js_sys::Promise;

pub use ai::{AiAgent, AiConfig, AiDecision, AiStrategy, Tactic};
pub use game::{
    possible_moves, Board, Cell, Difficulty, GameState, GameStatus, Identity, IntegrityError,
    Mark, MoveReport, Player, RuleEngine, RuleError, Square, Successor,
};
pub use session::{AiTurn, MatchConfig, MatchSession};

#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

#[wasm_bindgen(start)]
pub fn start() {
    set_panic_hook();
}

fn to_js_error(error: RuleError) -> JsValue {
    web_sys::console::warn_1(&JsValue::from_str(&error.to_string()));
    to_value(&error).unwrap_or_else(|serialize_err| JsValue::from_str(&serialize_err.to_string()))
}

fn serde_to_js_error<E: std::fmt::Display>(error: E) -> JsValue {
    JsValue::from_str(&error.to_string())
}

fn to_json<T: Serialize>(value: &T) -> Result<String, JsValue> {
    serde_json::to_string(value).map_err(serde_to_js_error)
}

// JS numbers arrive as u32; narrowing here keeps 257 from wrapping onto square 1.
fn parse_square(square: u32) -> Result<Square, JsValue> {
    Square::try_from(square).map_err(|_| to_js_error(RuleError::OutOfRangeSquare { square }))
}

fn parse_mark(seat: u32) -> Result<Mark, JsValue> {
    u8::try_from(seat)
        .ok()
        .and_then(Mark::from_seat)
        .ok_or_else(|| JsValue::from_str("seat must be 1 (X) or 2 (O)"))
}

fn parse_difficulty(difficulty: Option<&str>) -> Result<Difficulty, JsValue> {
    match difficulty {
        Some(value) => Difficulty::from_str(value)
            .map_err(|_| JsValue::from_str("difficulty must be easy, medium or hard")),
        None => Ok(Difficulty::default()),
    }
}

fn parse_identity(identity: &str, difficulty: Option<&str>) -> Result<Identity, JsValue> {
    Identity::parse(identity, difficulty).ok_or_else(|| {
        JsValue::from_str("identity must be \"human\" or \"ai\" with difficulty easy, medium or hard")
    })
}

#[wasm_bindgen]
pub struct GameEngine {
    session: MatchSession,
}

#[wasm_bindgen]
impl GameEngine {
    /// `config_json` is a serialized `MatchConfig`; both seats are human when omitted.
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>) -> Result<GameEngine, JsValue> {
        let config = match config_json {
            Some(json) => serde_json::from_str::<MatchConfig>(&json).map_err(serde_to_js_error)?,
            None => MatchConfig::default(),
        };
        Ok(GameEngine {
            session: MatchSession::from_config(&config),
        })
    }

    #[wasm_bindgen(js_name = "stateJson")]
    pub fn state_json(&self) -> Result<String, JsValue> {
        to_json(self.session.state())
    }

    #[wasm_bindgen(js_name = "setStateJson")]
    pub fn set_state_json(&mut self, json: &str) -> Result<(), JsValue> {
        let state: GameState = serde_json::from_str(json).map_err(serde_to_js_error)?;
        self.session.load_state(state).map_err(to_js_error)
    }

    #[wasm_bindgen(js_name = "configurePlayer")]
    pub fn configure_player(
        &mut self,
        seat: u32,
        identity: &str,
        difficulty: Option<String>,
    ) -> Result<(), JsValue> {
        let mark = parse_mark(seat)?;
        let identity = parse_identity(identity, difficulty.as_deref())?;
        self.session
            .configure_player(mark, identity)
            .map_err(to_js_error)
    }

    /// Returns the opening seat (1 or 2).
    #[wasm_bindgen(js_name = "startMatch")]
    pub fn start_match(&mut self) -> u8 {
        self.session.start_match().seat()
    }

    #[wasm_bindgen(js_name = "applyHumanMove")]
    pub fn apply_human_move(&mut self, square: u32) -> Result<String, JsValue> {
        let square = parse_square(square)?;
        let report = self.session.apply_human_move(square).map_err(to_js_error)?;
        to_json(&report)
    }

    #[wasm_bindgen(js_name = "applyAiMove")]
    pub fn apply_ai_move(&mut self) -> Result<String, JsValue> {
        let turn = self.session.apply_ai_move().map_err(to_js_error)?;
        to_json(&turn)
    }

    #[wasm_bindgen(js_name = "advanceAi")]
    pub fn advance_ai(&mut self) -> Result<String, JsValue> {
        let turns = self.session.advance_ai().map_err(to_js_error)?;
        to_json(&turns)
    }

    /// Resolves to the decision JSON after `delay_ms`, leaving the board untouched.
    #[wasm_bindgen(js_name = "thinkAi")]
    pub fn think_ai(&self, delay_ms: Option<u32>) -> Promise {
        let session = self.session.clone();
        let delay = delay_ms.unwrap_or(0);

        future_to_promise(async move {
            if delay > 0 {
                TimeoutFuture::new(delay).await;
            }
            let decision = session.think_ai().map_err(to_js_error)?;
            let json = to_json(&decision)?;
            Ok(JsValue::from_str(&json))
        })
    }

    #[wasm_bindgen(js_name = "isGameOver")]
    pub fn is_game_over(&self) -> bool {
        self.session.is_game_over()
    }

    #[wasm_bindgen(js_name = "isTie")]
    pub fn is_tie(&self) -> bool {
        self.session.is_tie()
    }

    /// Winning seat, `undefined` for a tie.
    pub fn winner(&self) -> Result<Option<u8>, JsValue> {
        let winner = self.session.winner().map_err(to_js_error)?;
        Ok(winner.map(Mark::seat))
    }

    #[wasm_bindgen(js_name = "currentPlayer")]
    pub fn current_player(&self) -> Option<u8> {
        self.session.current_player().map(Mark::seat)
    }

    #[wasm_bindgen(js_name = "emptySquares")]
    pub fn empty_squares(&self) -> Vec<u8> {
        self.session.empty_squares()
    }

    #[wasm_bindgen(js_name = "letterAt")]
    pub fn letter_at(&self, square: u32) -> Result<String, JsValue> {
        let letter = self
            .session
            .letter_at(parse_square(square)?)
            .map_err(to_js_error)?;
        Ok(letter.to_string())
    }

    #[wasm_bindgen(js_name = "resultMessage")]
    pub fn result_message(&self) -> Result<String, JsValue> {
        self.session.result_message().map_err(to_js_error)
    }
}

/// A fresh game state with two human seats and nobody to move.
#[wasm_bindgen(js_name = "createGameState")]
pub fn create_game_state() -> Result<JsValue, JsValue> {
    to_value(&GameState::new()).map_err(JsValue::from)
}

#[wasm_bindgen(js_name = "validateState")]
pub fn validate_state(state: JsValue) -> Result<(), JsValue> {
    let state: GameState = from_value(state).map_err(JsValue::from)?;
    RuleEngine::validate(&state).map_err(to_js_error)
}

/// Decides a move for whoever is to move in `state`, without applying it.
#[wasm_bindgen(js_name = "computeAiMove")]
pub fn compute_ai_move(
    state: JsValue,
    difficulty: Option<String>,
    seed: Option<u64>,
) -> Result<JsValue, JsValue> {
    let state: GameState = from_value(state).map_err(JsValue::from)?;
    let difficulty = parse_difficulty(difficulty.as_deref())?;
    let config = AiConfig::from_difficulty(difficulty);
    let mut agent = match seed {
        Some(seed) => AiAgent::with_seed(config, seed),
        None => AiAgent::new(config),
    };
    let decision = agent.decide_move(&state).map_err(to_js_error)?;
    to_value(&decision).map_err(JsValue::from)
}

#[cfg(feature = "console_error_panic_hook")]
fn set_panic_hook() {
    console_error_panic_hook::set_once();
}

#[cfg(not(feature = "console_error_panic_hook"))]
fn set_panic_hook() {}
