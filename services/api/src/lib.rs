//! services/api/src/lib.rs
//!
//! The `navigator` web service: adapters for the hosted store, the identity
//! provider and the paper search API, plus the HTTP and WebSocket surface.

pub mod adapters;
pub mod config;
pub mod error;
pub mod web;
