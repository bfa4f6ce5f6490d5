//! Command-line interface

pub mod commands;
pub mod logging;

pub use commands::{
    handle_installed_command, handle_repository_command, InstalledCommand, NamespaceFlags,
    RepositoryCommand, WaitFlags,
};
pub use logging::init_logging;
