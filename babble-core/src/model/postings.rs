use log::warn;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::error::Result;

/// The ordered sequence of tokens observed immediately after one prefix.
///
/// Entries are appended in learning order and duplicates are retained on
/// purpose: a token recorded three times is three times as likely to be
/// picked as one recorded once. The list is the model's only probability
/// representation, there are no separate counters.
///
/// # Invariants
/// - Entry order and duplicates survive an encode/decode round trip
/// - The reserved terminator (empty string) is an ordinary entry, a list
///   containing it still accepts further real tokens
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct PostingList(Vec<String>);

impl PostingList {
	/// Creates an empty posting list.
	pub fn new() -> Self {
		Self(Vec::new())
	}

	/// Decodes a stored posting list, recovering from malformed values.
	///
	/// A value that fails to decode is logged and replaced by an empty
	/// list: the generate path then treats the key as having no postings,
	/// and the learn path overwrites the corrupt value with a fresh list
	/// containing only the new entry.
	pub fn decode(key: &str, raw: &[u8]) -> Self {
		match postcard::from_bytes(raw) {
			Ok(list) => list,
			Err(err) => {
				warn!("cannot decode posting list for key '{key}': {err}; starting new empty list");
				Self::new()
			}
		}
	}

	/// Encodes the list for storage.
	///
	/// # Errors
	/// Returns a serialization error, which the store surfaces as a failure
	/// of the whole operation.
	pub fn encode(&self) -> Result<Vec<u8>> {
		Ok(postcard::to_stdvec(self)?)
	}

	/// Appends one observed successor token.
	pub fn push(&mut self, token: &str) {
		self.0.push(token.to_owned());
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Picks one entry uniformly at random by index across the full list.
	///
	/// Uniformity over indices is what turns retained duplicates into
	/// empirical transition weights. Returns `None` for an empty list.
	pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&str> {
		if self.0.is_empty() {
			return None;
		}
		Some(self.0[rng.random_range(0..self.0.len())].as_str())
	}
}
