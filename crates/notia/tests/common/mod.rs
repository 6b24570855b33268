//! Shared test utilities for notia integration tests.
//!
//! This module provides:
//! - `TestHarness` with a tempfile-backed database
//! - `MockMailbox` and `ScriptedModel` standing in for IMAP and the LLM
//! - Builders for raw RFC 822 messages

pub mod builders;
pub mod harness;
pub mod mocks;

pub use builders::*;
pub use harness::TestHarness;
pub use mocks::{MockMailbox, ScriptedModel};
