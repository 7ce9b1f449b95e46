pub mod catalog;
pub mod config;
pub mod error;
pub mod indexer;
pub mod metadata;
pub mod processor;
pub mod query;
pub mod search;
pub mod sync;
pub mod walker;
pub mod web_server;
