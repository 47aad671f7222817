pub mod config;
pub mod discovery;
pub mod shell;
pub mod target;
