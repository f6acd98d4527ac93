//! Sync a GitHub user's push and commit activity into an event ingestion stream.
//!
//! The pipeline lives in [`synchronise`]; each stage has its own module and
//! every outside system sits behind a trait in [`contract`].

pub mod cli;
pub mod config;
pub mod contract;
pub mod dispatch;
pub mod enrich;
pub mod error;
pub mod fan_in;
pub mod fetch;
pub mod github;
pub mod ingestion;
pub mod load_config;
pub mod logger;
pub mod model;
pub mod normalize;
pub mod repository;
pub mod server;
pub mod synchronise;
pub mod token;
pub mod watermark;

pub use cli::{run, Cli, Commands};
