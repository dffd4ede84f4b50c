//! Academic performance engine: turns per-term grade entries into bimester
//! averages, recovery-adjusted final grades, student outcomes and
//! knowledge-area aggregates.

pub mod catalog;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod filters;
pub mod ledger;
pub mod logging;
pub mod models;
pub mod report;
pub mod sorting;

pub use error::ValidationError;
