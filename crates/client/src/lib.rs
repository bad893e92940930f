//! HTTP client for swkit.
//!
//! Provides [`HttpNetwork`], the reqwest-backed implementation of the engine's
//! [`swkit_core::Network`] seam used by the worker binary.

pub mod fetch;

pub use fetch::{FetchConfig, HttpNetwork};
