//! Runwatch: live progress for multi-cycle backend runs.
//!
//! The crate follows one run's execution events over a push channel (SSE),
//! falls back to polling when the channel fails, and splits the flat event
//! timeline into per-cycle buckets so a front end can show "what happened in
//! cycle N" together with the streamed answer text.
//!
//! # Quick start
//!
//! ```no_run
//! use runwatch::api::{ApiClient, RunApi};
//! use runwatch::config::load_config;
//! use runwatch::live::spawn_session;
//! use std::sync::Arc;
//!
//! # async fn example() {
//! let config = load_config(None).unwrap();
//! let api: Arc<dyn RunApi> = Arc::new(ApiClient::new(&config.api));
//! let (handle, mut events) = spawn_session(api, "run_123", config.live.clone());
//! while events.snapshots.changed().await.is_ok() {
//!     let snap = handle.snapshot();
//!     println!("{} events, {}", snap.events.len(), snap.mode);
//! }
//! # }
//! ```

pub mod api;
pub mod build_info;
pub mod config;
pub mod error;
pub mod live;
pub mod render;
#[cfg(test)]
pub mod testsupport;
pub mod types;
