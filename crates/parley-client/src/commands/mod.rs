//! Command handlers.
//!
//! Each sub-module groups related commands by domain.  Every command takes
//! the [`SharedState`](crate::state::SharedState), performs one user action
//! against it, persists the touched snapshot and emits the matching events.
//! Results are camelCase-serializable DTOs for the presentation layer.

pub mod auth;
pub mod chat;
pub mod countries;
