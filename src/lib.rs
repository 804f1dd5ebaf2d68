pub mod aggregate;
pub mod analysis;
pub mod bridge;
pub mod config;
pub mod domain;
pub mod error;
pub mod orchestrator;
pub mod provider;
pub mod runner;
pub mod selection;
#[cfg(feature = "sim")]
pub mod simulation;
pub mod store;
pub mod telemetry;
