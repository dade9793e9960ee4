pub mod args;
pub mod commands;

pub use args::{BatchType, Cli, Commands};
pub use commands::run;
