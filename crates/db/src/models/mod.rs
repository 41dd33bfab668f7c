//! Row models.

pub mod job;
pub mod user;
pub mod video;
