//! Shared domain types for Lectern.
//!
//! This crate contains the data shapes used across the Lectern workspace:
//! oracle requests and streaming events, conversation messages and sessions,
//! document chunks, extraction schemas, configuration, and error types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod chat;
pub mod config;
pub mod document;
pub mod error;
pub mod extraction;
pub mod llm;
