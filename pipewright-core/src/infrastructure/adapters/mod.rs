// pipewright-core/src/infrastructure/adapters/mod.rs

pub mod csv;
pub mod excel;
pub mod registry;
pub mod sql;
