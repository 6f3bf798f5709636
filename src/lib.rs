//! codescreen library crate
//!
//! First-tier screening for code-quality analysis: a batch of candidate files
//! is filtered, compressed, classified by a small language model and summarised
//! into a report for the detection stage.

pub mod config;
pub mod filter;
pub mod input;
pub mod language;
pub mod llm;
pub mod optimizer;
pub mod screening;
pub mod util;
