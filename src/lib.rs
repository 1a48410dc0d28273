pub use taskdeck_cli::cli;
pub use taskdeck_cli::commands;
pub use taskdeck_cli::config;
pub use taskdeck_cli::render;
pub use taskdeck_cli::{init_tracing, run, AppConfig, ConsoleNotifier};

pub use taskdeck_core as core;
pub use taskdeck_core::model;
pub use taskdeck_core::store;
