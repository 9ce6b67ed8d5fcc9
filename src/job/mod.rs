//! Single-job background execution.
//!
//! A job runs one blocking synthesis call on its own thread and reports
//! `progress*` followed by exactly one terminal event over an ordered
//! channel. Cancellation is a flag checked before and after the call.

mod runner;
mod types;

pub use runner::{JobHandle, JobRunner, PROGRESS_PREPARING, PROGRESS_RUNNING};
pub use types::{JobError, JobEvent, JobEventKind, JobId, JobStatus, classify};
