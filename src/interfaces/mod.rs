//! User-facing interfaces (CLI)

pub mod cli;
