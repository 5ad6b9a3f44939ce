pub mod dataset;
pub mod error;
pub mod pipeline;
pub mod sql;
pub mod transform;

pub use error::DomainError;
