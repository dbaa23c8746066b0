pub mod assembler;
pub mod config;
pub mod corpus;
pub mod db;
pub mod error;
pub mod favorites;
pub mod filter;
pub mod models;
pub mod query;
pub mod utils;

pub use error::{ExplorerError, Result};
