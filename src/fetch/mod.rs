// src/fetch/mod.rs
// =============================================================================
// This module contains the HTTP side of the mirror.
//
// Submodules:
// - client: the Fetcher (GET with streaming bodies) and FetchResult
// - error: FetchError, the classified reasons a fetch can fail
//
// The fetcher does not resolve relative links and does not know about
// directories on disk. It is a leaf: everything else depends on it, it
// depends on nothing else in the crate.
// =============================================================================

mod client;
mod error;

pub use client::{FetchResult, Fetcher};
pub use error::FetchError;
