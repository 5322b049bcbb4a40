//! Remote processing gateway: the backend that performs the hashing work.
//!
//! The engine only sees the [`Gateway`] trait. [`HttpGateway`] talks to the
//! real backend over JSON/HTTP; tests substitute scripted doubles.

pub mod client;
pub mod types;

pub use client::{Gateway, HttpGateway};
pub use types::*;
