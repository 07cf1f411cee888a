//! # Ledgerflow Pipeline
//!
//! The bounded-parallelism processing pipeline: five lanes (deposit,
//! withdraw, transfer, book, unbook) fed from one broadcast gateway
//! handle, each lane capping its own in-flight work and funneling results
//! into a single sink consumer.
//!
//! Fail-fast semantics: one [`CancellationToken`] is shared by every lane
//! of a run. Any unexpected failure — a lookup error while synthesizing
//! operands, or a worker panic — trips it, and no lane starts new work
//! once it has observed the signal. Business outcomes never cancel.
//!
//! [`CancellationToken`]: tokio_util::sync::CancellationToken

pub mod config;
pub mod lane;
pub mod orchestrator;

pub use config::{AmountRange, PipelineConfig};
pub use lane::{LaneReport, OperationKind};
pub use orchestrator::{Pipeline, RunReport};
