//! photo-search - Flickr photo search and image fetch orchestration.
//!
//! This crate provides paged photo search with stale-result suppression,
//! a deduplicating image fetch coordinator backed by an in-memory cache,
//! and per-row image slots for recycling list views.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

/// Application layer containing the search session and row image state.
pub mod application;
/// Domain layer containing entities, errors, and port definitions.
pub mod domain;
/// Infrastructure layer containing adapters for external services.
pub mod infrastructure;

/// Current version of the application.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name.
pub const NAME: &str = "photo-search";
