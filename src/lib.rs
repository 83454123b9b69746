//! Plugin lifecycle and automation toolkit
//!
//! A registry of plugins with dependency-aware lifecycle control, a
//! concurrent build/test/deploy pipeline engine, a timeout-guarded test
//! runner and a facade tying them together for end-to-end workflows.

pub mod automation;
pub mod cli;
pub mod config;
pub mod logging;
pub mod pipeline;
pub mod plugin;
pub mod tester;
pub mod version;
