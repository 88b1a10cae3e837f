pub mod aggregation;
pub mod common;
pub mod data_loader;
pub mod errors;
pub mod export;
pub mod field;
pub mod graph;
pub mod plan;
pub mod plan_execution;
pub mod state;
