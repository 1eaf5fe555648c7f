//! Top-level module for the trigram model store.
//!
//! This crate provides a word-trigram sentence model, including:
//! - A persistent store layered on a transactional KV engine (`TrigramStore`)
//! - Typed operation errors (`ModelError`)
//! - Internal key encoding (`Prefix`)
//! - Internal posting-list codec and weighted sampling (`PostingList`)
//! - Internal single-pass uniform sampling (`reservoir_choose`)

/// Errors surfaced to callers of the store.
///
/// Engine and encoding faults propagate as-is; decode faults are absorbed
/// by local recovery and never appear here.
pub mod error;

/// Persistent word-trigram store (`TrigramStore`).
///
/// Exposes sentence learning, batched learning, and pseudo-sentence
/// generation on top of two KV tables.
pub mod store;

/// Internal posting-list representation.
///
/// Handles the order- and duplicate-preserving codec, corruption recovery,
/// and frequency-weighted sampling. Not exposed publicly.
mod postings;

/// Internal two-token prefix key.
///
/// Encodes and parses the `"w1 w2"` key form shared by both tables.
mod prefix;

/// Internal single-pass uniform sampling over unknown-size sequences.
mod sampling;
