pub mod checker;
pub mod checks;
pub mod config;
pub mod connection;
pub mod diagnostic;
pub mod exclusion;
pub mod generator;
pub mod models;
pub mod reporter;
