//! Shared helpers for handlers and middleware.

pub mod cookies;
