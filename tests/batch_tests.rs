//! End-to-end batch tests against the simulated collaborators.
//!
//! ```bash
//! cargo test --test batch_tests
//! ```

#![cfg(feature = "sim")]

mod batch;
