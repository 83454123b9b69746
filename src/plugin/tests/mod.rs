//! Plugin System Tests
//!
//! Shared mock plugins plus scenario tests for the plugin system.
