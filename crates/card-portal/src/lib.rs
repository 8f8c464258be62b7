pub mod client;
pub mod config;
pub mod error;
pub mod sandbox;
pub mod telemetry;
pub mod wire;
pub mod workflows;
