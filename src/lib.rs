pub mod apis;
pub mod cli;
pub mod config;
pub mod constants;
pub mod country;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod storage;
pub mod types;
pub mod warehouse;

// HTTP plumbing behind the API client
pub mod infra;
