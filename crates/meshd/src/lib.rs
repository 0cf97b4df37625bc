//! Mesh support daemon library - exposes modules for testing.

pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod logging;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod supabase;
