//! Settings are read from a TOML file (`--settings`, default `settings/dev.toml`
//! in debug builds). Key files named there are read once at startup.

mod cli;
pub use clap::Parser;
pub use cli::*;

mod settings;
pub use settings::*;
