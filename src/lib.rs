pub mod app;
pub mod config;
pub mod error;
pub mod fixtures;
pub mod state;
pub mod users;
