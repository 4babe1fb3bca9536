//! toolrelay: external tool invocation engine for a chat backend.
//!
//! Chat messages may carry an `@{{ToolName}} input` directive. The named
//! tool's stored definition drives a templated, authenticated HTTP call
//! whose (optionally extracted) response replaces the message before it is
//! forwarded to the completion API.

pub mod chat;
pub mod config;
pub mod error;
pub mod server;
pub mod setup;
pub mod state;
pub mod tools;
pub mod types;
