//! Background worker process: configuration and service wiring.

pub mod app;
pub mod config;
