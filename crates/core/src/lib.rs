//! Domain types and pure logic for the recording post-processing pipeline.
//!
//! Nothing in this crate talks to the database or object storage. The only
//! side effects are the external media tools driven from [`ffmpeg`] and
//! [`whisper`].

pub mod dispatch;
pub mod error;
pub mod ffmpeg;
pub mod process;
pub mod status;
pub mod transcript;
pub mod types;
pub mod upload;
pub mod video;
pub mod whisper;
