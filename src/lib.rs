//! pixvend - image variant vending with a namespaced on-disk store.
//!
//! This crate keeps per-owner image variants (scaled, circular, blurred,
//! grayscale) in a single-flight in-memory cache and optionally persists them
//! to a variant store with per-retention storage roots.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

/// Application layer containing use cases and DTOs.
pub mod application;
/// Domain layer containing entities, errors, and port definitions.
pub mod domain;
/// Infrastructure layer containing image, storage and configuration adapters.
pub mod infrastructure;

/// Current version of the application.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name.
pub const NAME: &str = "pixvend";
