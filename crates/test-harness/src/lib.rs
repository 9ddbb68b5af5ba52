//! Test harness for weld scenarios.
//!
//! Scripts weld features against a regenerated `MockKernel` scene, checks
//! the outcome at every step and renders readable reports.
//!
//! # Key Components
//!
//! - [`WeldBench`]: Fluent API for building scenes and running weld features
//! - [`report`]: Structured text weld reports
//! - [`helpers`]: Error type, tracing setup, scene geometry
//! - [`assertions`]: Assertion helpers with diagnostics

pub mod assertions;
pub mod helpers;
pub mod report;
pub mod workflow;

pub use helpers::{deg, init_tracing, HarnessError, Side};
pub use report::WeldReport;
pub use workflow::WeldBench;
