//! # sensei-core
//!
//! Canonical-task deduplication and linking core for the Sensei
//! productivity tracker.
//!
//! Every newly logged task is judged against the canonical tasks already in
//! its (domain, version) scope — via a generative-language similarity oracle
//! with an exact-match fallback — and linked to an existing canonical task or
//! a fresh one. Orphaned instances (no canonical link) are batch-repaired on
//! demand. Persistence (Postgres via sqlx) and the oracle (Gemini via
//! rig-core) sit behind injected traits.

pub mod config;
pub mod error;
pub mod matcher;
pub mod model;
pub mod oracle;
pub mod store;
pub mod tasks;
pub mod telemetry;
