pub mod engine;

pub use engine::{evaluate, evaluate_in, Capture, Match, MatchRecord, Matches};
