pub mod config;
pub mod error;
pub mod message;
pub mod models;
pub mod stream;
pub mod trace;
