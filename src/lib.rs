pub mod account;
pub mod cli;
pub mod client;
pub mod config;
pub mod discovery;
pub mod error;
pub mod logging;
pub mod output;
pub mod store;
