//! Core domain types and logic.

pub mod candle;
pub mod error;
pub mod indicator;
pub mod expr;
pub mod expr_parser;
pub mod expr_eval;
pub mod signal;
pub mod strategy;
pub mod simulator;
pub mod risk;
