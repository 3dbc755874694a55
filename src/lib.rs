pub mod app;
pub mod config;
pub mod core;
pub mod display;
pub mod engine;
pub mod error;
pub mod orchestrator;
pub mod record;
