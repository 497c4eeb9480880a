//! CLI subcommand implementations for the linkscout binary.

pub mod discover_cmd;
pub mod doctor;
pub mod output;
pub mod progress_view;
pub mod seeds_cmd;
pub mod sites_cmd;
