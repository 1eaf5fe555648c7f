//! Persistent word-trigram model with pseudo-sentence generation.
//!
//! This crate provides a durable statistical sentence model including:
//! - Trigram statistics kept on an embedded transactional KV store
//! - Single-sentence and batched learning
//! - Random-walk generation with single-pass start sampling
//!
//! Only the high-level store API is exposed publicly. Low-level components
//! (key encoding, posting lists, sampling) are kept internal to ensure
//! consistency and prevent misuse.

/// Core trigram store and generation logic.
///
/// This module exposes the high-level store interface while keeping
/// internal model representations private.
pub mod model;
