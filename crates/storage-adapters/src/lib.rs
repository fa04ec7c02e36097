//! # Storage Adapters
//!
//! Implementations of the `domains` ports. The only adapter shipped here
//! is [`MemoryBackend`], an in-memory stand-in for the managed backend
//! used by the integration suite and local development. It enforces the
//! same constraints the real tables do (unique like pairs, unique
//! friendship pairs, missing-row deletes) and publishes change-feed
//! events on every mutation, so services exercise the exact error and
//! realtime paths they see in production.

mod memory;

pub use memory::MemoryBackend;
