//! Plugin Test Runner Module
//!
//! Registration and execution of per-plugin test cases with timeout
//! enforcement and panic isolation.

pub mod error;
pub mod runner;

pub use error::{TesterError, TesterResult};
pub use runner::{CaseOutcome, TestResult, TestRunner, DEFAULT_TIMEOUT};
