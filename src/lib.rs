//! # annwire
//!
//! Test-and-stimulus harness for a P4-programmed data plane implementing an
//! artificial-neuron forward pass inside an emulated multi-switch network.
//!
//! The harness crafts Ethernet frames carrying fixed-point neuron inputs,
//! injects them on the interfaces bound to each feature, captures response
//! frames from the output interfaces, and correlates them back to the
//! originating test case by `run_id`, producing a result table for offline
//! accuracy comparison.
//!
//! ## Architecture
//!
//! - **Protocol**: bit-field frame layout under ethertype `0x88B5`, with
//!   Q-format fixed-point conversion
//! - **Capture**: one worker per listen interface, funneled into a single
//!   FIFO inbox with a blocking-with-timeout take
//! - **Dispatch**: one stimulus frame per feature binding, idempotent on
//!   retransmission
//! - **Engine**: sequential per-test-case dispatch / wait / match / retry /
//!   complete loop
//!
//! ## Example
//!
//! ```no_run
//! use annwire::{Harness, HarnessConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = HarnessConfig::from_file("harness.json".as_ref())?;
//!     let table = Harness::new(config)?.run().await?;
//!     println!("{} cases completed", table.rows.len());
//!     Ok(())
//! }
//! ```

pub mod capture;
pub mod config;
pub mod dataset;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod protocol;
pub mod report;
pub mod transport;

mod harness;

pub use config::{FeatureBinding, HarnessConfig, OutputBinding};
pub use error::{AnnwireError, Result};
pub use harness::Harness;
