//! Entry points driven by the binary.
//!
//! - [`migrate`]: the per-repository orchestration
//! - [`batch`]: sequential processing of a job list and the run summary

pub mod batch;
pub mod migrate;
