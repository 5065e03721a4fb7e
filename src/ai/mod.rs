//! Move selection for AI-controlled seats: random, heuristic and minimax tiers.

pub mod evaluate;
pub mod heuristic;
pub mod minimax;

pub use evaluate::evaluate;
pub use heuristic::{medium_square, random_square, two_in_a_row, Tactic};
pub use minimax::{
    minimax, AiAgent, AiConfig, AiDecision, AiStrategy, SearchStats, INFINITY, NEG_INFINITY,
};
