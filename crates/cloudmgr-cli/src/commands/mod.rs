pub mod config;
pub mod migrate;
pub mod provider;
