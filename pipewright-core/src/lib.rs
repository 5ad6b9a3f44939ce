// pipewright-core/src/lib.rs

#![allow(missing_docs)]
// Memory safety
#![deny(unsafe_code)]
// Robustness
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
// Performance
#![warn(clippy::perf)]

// --- HEXAGONAL MODULES ---

// 1. Ports (Interfaces / Traits)
// Contracts between the use cases and the outside world (Connector, Notifier).
pub mod ports;

// 2. Domain
// Dataset model, transformations, descriptors, SQL dialects.
// Depends on nothing else in the crate.
pub mod domain;

// 3. Infrastructure (Adapters)
// Files, SQL drivers, YAML configuration, registry.
pub mod infrastructure;

// 4. Application (Use Cases)
// Load-mode dispatch, pipeline runs, pipeline manager.
pub mod application;

// --- GLOBAL ERROR HANDLING ---
pub mod error;

// --- RE-EXPORTS (FACADE) ---
pub use application::{Pipeline, PipelineManager};
pub use domain::dataset::{DataType, Dataset, Value};
pub use domain::pipeline::RunStatus;
pub use error::EtlError;
