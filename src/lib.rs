// src/lib.rs
// Draftsmith - AI action orchestration core for a writing app

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod actions;
pub mod applier;
pub mod artifacts;
pub mod config;
pub mod error;
pub mod executor;
pub mod mapping;
pub mod orchestrator;
pub mod pipeline;
pub mod providers;
pub mod router;
pub mod streaming;
pub mod types;
pub mod usage;

pub use error::{AiError, Result};
pub use orchestrator::{AiOrchestrator, OrchestratorBuilder, StreamingCapability};
