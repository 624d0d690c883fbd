//! # warden-coverage
//!
//! Coverage scoring: checks whether a frame's declared domain, action, mode
//! and constraints actually justify a specific tool call.
//!
//! The score starts at 1.0 and each failing check class subtracts a fixed
//! weight, once, independently of the others:
//!
//! | Check | Weight |
//! |---|---|
//! | domain coverage | 0.3 |
//! | action coverage | 0.3 |
//! | risk / mode coverage | 0.2 |
//! | argument scope | 0.2 |
//!
//! Tool metadata (domains, compatible actions, risk weight, category) lives in
//! a [`ToolRegistry`] so the tables can be swapped without touching the
//! scoring logic.

#![deny(unsafe_code)]

pub mod calculator;
pub mod error;
pub mod registry;
pub mod scope;

pub use calculator::{CoverageCalculator, CoverageLimits, CoverageResult, CoverageWeights};
pub use error::CoverageError;
pub use registry::{ToolCategory, ToolProfile, ToolRegistry, UNKNOWN_TOOL_RISK};
pub use scope::{find_external_target, ExternalTarget};
