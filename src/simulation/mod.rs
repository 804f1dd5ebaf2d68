//! # Simulated collaborators
//!
//! Deterministic stand-ins for the external systems a batch depends on, used
//! by the binary when the `sim` feature is enabled and by the tests.
//!
//! - **Interface**: hourly feed-in potential and conventional dispatch, seeded by bus id and scenario
//! - **Network**: single-feeder grid model whose reinforcement adds lines and transformers
//! - **Clustering**: k-means over synthetic grid attributes (wind, solar, farthest node)
//!
//! ## Usage
//!
//! ```rust
//! use grid_batch::simulation::{AttributeClustering, SimulatedAnalysisEngine, SimulatedInterfaceProvider};
//!
//! let interface = SimulatedInterfaceProvider::new(24);
//! let engine = SimulatedAnalysisEngine::new();
//! let clustering = AttributeClustering::new();
//! ```

pub mod clustering;
pub mod interface;
pub mod network;

pub use clustering::{AttributeClustering, GridAttributes};
pub use interface::SimulatedInterfaceProvider;
pub use network::{SimulatedAnalysisEngine, SimulatedNetwork};
