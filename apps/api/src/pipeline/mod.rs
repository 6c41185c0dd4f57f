//! Orchestration: per-item pipeline, batch fan-out, retry, heartbeat and
//! stuck-job recovery, plus the HTTP handlers driving them.

pub mod batch;
pub mod handlers;
pub mod heartbeat;
pub mod retry;
pub mod runner;
