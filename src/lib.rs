pub mod commands;
pub mod config;
pub mod deps;
pub mod error;
pub mod events;
pub mod health;
pub mod logging;
pub mod model;
pub mod output;
pub mod schedule;
pub mod store;

#[cfg(test)]
mod test_support;
