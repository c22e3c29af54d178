pub mod aggregate;
pub mod api;
pub mod classifier;
pub mod config;
pub mod dates;
pub mod error;
pub mod fetcher;
pub mod report;
pub mod session;
pub mod types;
