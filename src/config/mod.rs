mod r#impl;
mod structs;
pub mod validators;

pub use r#impl::{get_config, init_config, init_config_from, init_config_with, update_config};
pub use structs::*;
pub use validators::validate_config;
