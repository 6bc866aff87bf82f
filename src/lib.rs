//! Atende Gateway - Conversational-commerce WhatsApp bot pipeline
//!
//! Receives chat-platform webhook events, resolves the sending customer,
//! normalizes text/audio/image payloads, generates a tool-augmented reply,
//! splits it into humanlike chunks, and delivers them with typing cues and
//! retries.
//!
//! # Architecture
//!
//! ```text
//! webhook ──▶ validate ──▶ lookup ◀──▶ register
//!                            │
//!                        route_media ──▶ resolve {audio,image,text}
//!                            │
//!                     generate_response (model + tools, bounded loop)
//!                            │
//!                      fragment_reply ──▶ deliver ──▶ terminal
//! ```

pub mod agent;
pub mod api;
pub mod config;
pub mod db;
pub mod delivery;
pub mod engine;
pub mod error;
pub mod fragment;
pub mod gateway;
pub mod llm;
pub mod media;
pub mod retry;
pub mod serialize;
pub mod state;
pub mod tools;
pub mod webhook;

pub use config::Config;
pub use engine::{run_pipeline, PipelineDeps};
pub use error::{Error, Result};
pub use state::{MessageKind, NextAction, PipelineState};
