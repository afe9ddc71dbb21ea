//! Interactive question-and-answer loop over the loaded documents.
//!
//! Streams answers as they arrive, renders summaries as markdown and lets
//! Ctrl+C cancel whatever is running. Entry point: `loop_runner::run_repl`.

pub mod banner;
pub mod commands;
pub mod input;
pub mod loop_runner;
pub mod renderer;
