//! unified-agent: per-agent conversations with OpenAI reasoning models.
//!
//! - [`runtime`] -- the [`runtime::Agent`] context and the turn stream
//! - [`inclusion`] -- `{filename}` expansion in user messages
//! - [`export`] -- conversation export
//! - [`cli`] -- the `unified-agent` command line

pub mod cli;
pub mod export;
pub mod inclusion;
pub mod logging;
pub mod runtime;
