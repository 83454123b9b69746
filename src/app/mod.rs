//! Application orchestration module

pub mod initialization;
pub mod execution;

pub use initialization::{
    build_automation,
    configure_colors,
    configure_logging,
    load_configuration,
    load_plugins,
    register_descriptors,
    AppContext,
};
pub use execution::dispatch_commands;
