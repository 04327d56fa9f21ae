//! Tollgate - Fixed-Window Rate Limiting Service
//!
//! This crate grants or denies permits to named callers so that no key
//! exceeds a configured quota within a recurring, epoch-aligned time window.
//! The core is [`ratelimit::RateLimiter`]; the [`http`] module exposes it to
//! API gateways and services.

pub mod config;
pub mod error;
pub mod http;
pub mod ratelimit;
