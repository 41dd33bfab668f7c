//! Asynchronous post-processing for uploaded recordings.
//!
//! - [`lifecycle::VideoLifecycle`]: guarded status transitions and the
//!   job fan-out that follows them.
//! - [`transcription::TranscriptionPipeline`]: speech-to-text with its own
//!   status sub-state-machine and a bounded concurrency gate.
//! - [`cue_repair::CueRepairWorker`] and
//!   [`lifecycle_email::LifecycleEmailWorker`]: periodic poll-batch-mark
//!   workers driven by [`schedule::PeriodicWorker`].
//! - [`cleanup`]: the storage cascade run after a soft delete.
//!
//! All database access goes through the [`store`] traits so the logic can
//! be exercised without PostgreSQL.

pub mod cleanup;
pub mod cue_repair;
pub mod enqueue;
pub mod error;
pub mod lifecycle;
pub mod lifecycle_email;
pub mod media;
pub mod runner;
pub mod schedule;
pub mod store;
pub mod transcription;

#[cfg(test)]
pub(crate) mod testing;

pub use error::PipelineError;
