//! CLI commands

pub mod auth;
pub mod chart;
pub mod config;
pub mod init;
pub mod lore;
pub mod render;
pub mod schema;
pub mod test;
pub mod values;
